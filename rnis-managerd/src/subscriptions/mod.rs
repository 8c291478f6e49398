pub mod callback;
pub mod lifecycle;
pub mod store;

use std::fmt;
use std::str::FromStr;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::task::JoinHandle;
use crate::error::{ManagerError, ManagerResult};
use crate::http::HttpResponse;
use crate::workers;
use self::callback::{CallbackDispatcher, CallbackSink, CallbackType};

/// Subscription types this manager can serve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionType {
    MeasRepUe,
}

impl SubscriptionType {
    pub const ALL: [SubscriptionType; 1] = [SubscriptionType::MeasRepUe];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionType::MeasRepUe => "MeasRepUeSubscription",
        }
    }

    /// Factory name of the worker serving this type
    pub fn worker(&self) -> &'static str {
        match self {
            SubscriptionType::MeasRepUe => workers::meas_rep_ue::NAME,
        }
    }
}

impl fmt::Display for SubscriptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionType {
    type Err = ManagerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ManagerError::UnknownSubscriptionType(s.to_string()))
    }
}

/// State shared by every subscription worker: identity, the request that
/// created it, and the sinks its notifications go to.
pub struct SubscriptionCore {
    subscription_id: String,
    subscription_type: SubscriptionType,
    callback_reference: String,
    params: Value,
    callbacks: Mutex<Vec<CallbackSink>>,
    dispatcher: CallbackDispatcher,
}

impl SubscriptionCore {
    /// Build from the `{subscription: params}` envelope the lifecycle
    /// controller hands to the environment.
    pub fn from_envelope(
        subscription_id: &str,
        envelope: Value,
        dispatcher: CallbackDispatcher,
    ) -> ManagerResult<Self> {
        let params = match envelope {
            Value::Object(mut map) => map.remove("subscription"),
            _ => None,
        }
        .filter(Value::is_object)
        .ok_or_else(|| ManagerError::InvalidSubscription("missing subscription object".to_string()))?;

        let subscription_type = params
            .get("subscriptionType")
            .and_then(Value::as_str)
            .ok_or_else(|| ManagerError::InvalidSubscription("missing subscriptionType".to_string()))?
            .parse()?;

        let callback_reference = params
            .get("callbackReference")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                ManagerError::InvalidSubscription("missing callbackReference".to_string())
            })?
            .to_string();

        Ok(Self {
            subscription_id: subscription_id.to_string(),
            subscription_type,
            callback_reference,
            params,
            callbacks: Mutex::new(Vec::new()),
            dispatcher,
        })
    }
}

/// Contract implemented by every subscription worker. The store recognizes
/// subscriptions through `ManagedService::as_subscription`.
pub trait Subscription: Send + Sync {
    fn core(&self) -> &SubscriptionCore;

    /// Turn a controller event into the notification pushed to consumers
    fn notification(&self, event: Value) -> Value {
        event
    }

    fn subscription_id(&self) -> &str {
        &self.core().subscription_id
    }

    fn subscription_type(&self) -> SubscriptionType {
        self.core().subscription_type
    }

    fn callback_reference(&self) -> &str {
        &self.core().callback_reference
    }

    /// The request body the subscription was created with
    fn representation(&self) -> &Value {
        &self.core().params
    }

    /// Add a sink, replacing any sink with the same name
    fn add_callback(&self, name: &str, callback: &str, callback_type: CallbackType) {
        let mut callbacks = self.core().callbacks.lock();
        callbacks.retain(|sink| sink.name != name);
        callbacks.push(CallbackSink {
            name: name.to_string(),
            callback: callback.to_string(),
            callback_type,
        });
    }

    fn callbacks(&self) -> Vec<CallbackSink> {
        self.core().callbacks.lock().clone()
    }

    /// Push an inbound event to every sink. Delivery is not awaited here.
    fn handle_callback(&self, event: Value) -> Vec<JoinHandle<HttpResponse>> {
        tracing::info!("Received callback for subscription {}", self.subscription_id());

        let notification = self.notification(event);
        let core = self.core();
        self.callbacks()
            .into_iter()
            .map(|sink| core.dispatcher.dispatch(&core.subscription_id, sink, notification.clone()))
            .collect()
    }
}
