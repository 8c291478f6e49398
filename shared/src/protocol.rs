/// Collection path for subscriptions
pub const SUBSCRIPTIONS_PATH: &str = "/rni/v2/subscriptions";

/// Path segment appended to a subscription path for controller callbacks
pub const CALLBACK_INGRESS_SEGMENT: &str = "ch";

/// MEC service advertisement constants
pub const SER_NAME: &str = "Radio Network Information Service";
pub const SER_CATEGORY_HREF: &str = "/rni/v2/";
pub const SER_CATEGORY_ID: &str = "rni";
pub const SER_CATEGORY_VERSION: &str = "2.0";
pub const SER_VERSION: &str = "1.0";
pub const SER_SERIALIZER: &str = "JSON";

/// Version tag injected into every controller POST body
pub const CONTROLLER_BODY_VERSION: &str = "1.0";

/// Href of a single subscription resource
pub fn subscription_href(subscription_id: &str) -> String {
    format!("{}/{}", SUBSCRIPTIONS_PATH, subscription_id)
}

/// Path the controller posts events to for a given subscription
pub fn callback_ingress_path(subscription_id: &str) -> String {
    format!(
        "{}/{}/{}",
        SUBSCRIPTIONS_PATH, subscription_id, CALLBACK_INGRESS_SEGMENT
    )
}
