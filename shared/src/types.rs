use serde::{Deserialize, Serialize};
use crate::protocol;

/// Advertisement of this manager in the MEC service registry.
/// Rebuilt on every heartbeat from the manager's instance id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MecService {
    pub ser_instance_id: String,
    pub ser_name: String,
    pub ser_category: SerCategory,
    pub version: String,
    pub state: ServiceState,
    pub serializer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerCategory {
    pub href: String,
    pub id: String,
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceState {
    Active,
}

impl MecService {
    pub fn rnis(ser_instance_id: impl Into<String>) -> Self {
        Self {
            ser_instance_id: ser_instance_id.into(),
            ser_name: protocol::SER_NAME.to_string(),
            ser_category: SerCategory {
                href: protocol::SER_CATEGORY_HREF.to_string(),
                id: protocol::SER_CATEGORY_ID.to_string(),
                name: protocol::SER_NAME.to_string(),
                version: protocol::SER_CATEGORY_VERSION.to_string(),
            },
            version: protocol::SER_VERSION.to_string(),
            state: ServiceState::Active,
            serializer: protocol::SER_SERIALIZER.to_string(),
        }
    }
}

/// Whether the last heartbeat was accepted by the registry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationState {
    #[default]
    Unregistered,
    Registered,
}

/// Discovery document returned by `GET /rni/v2/subscriptions`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionLinkList {
    #[serde(rename = "_links")]
    pub links: SubscriptionLinks,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionLinks {
    #[serde(rename = "self")]
    pub self_href: String,
    pub subscription: Vec<SubscriptionLink>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionLink {
    pub href: String,
    pub subscription_type: String,
}
