use std::sync::Arc;
use serde_json::{json, Value};
use crate::env_manager::EnvHandle;
use crate::error::{ManagerError, ManagerResult};
use super::callback::{CallbackType, DEFAULT_CALLBACK};
use super::store::SubscriptionStore;
use super::{Subscription, SubscriptionType};

/// Creates and tears down subscriptions in the service environment
#[derive(Clone)]
pub struct SubscriptionController {
    env: EnvHandle,
    store: SubscriptionStore,
}

impl SubscriptionController {
    pub fn new(env: EnvHandle) -> Self {
        Self {
            store: SubscriptionStore::new(env.clone()),
            env,
        }
    }

    pub fn store(&self) -> &SubscriptionStore {
        &self.store
    }

    pub async fn create(
        &self,
        subscription_id: &str,
        params: Value,
    ) -> ManagerResult<Arc<dyn Subscription>> {
        if self.store.list().await?.contains_key(subscription_id) {
            return Err(ManagerError::DuplicateSubscription(subscription_id.to_string()));
        }

        let subscription_type: SubscriptionType = params
            .get("subscriptionType")
            .and_then(Value::as_str)
            .ok_or_else(|| ManagerError::InvalidSubscription("missing subscriptionType".to_string()))?
            .parse()?;

        let envelope = json!({ "subscription": params });

        // The environment is the final arbiter of duplicate ids
        let service = self
            .env
            .register_service(subscription_type.worker(), envelope, subscription_id)
            .await
            .map_err(|e| match e {
                ManagerError::DuplicateService(id) => ManagerError::DuplicateSubscription(id),
                other => other,
            })?;

        let Some(sub) = service.as_subscription() else {
            self.env.unregister_service(subscription_id).await?;
            return Err(ManagerError::UnknownService(subscription_type.worker().to_string()));
        };

        sub.add_callback(DEFAULT_CALLBACK, sub.callback_reference(), CallbackType::Rest);

        tracing::info!(
            "Created subscription {} ({}) for {}",
            subscription_id,
            subscription_type,
            sub.callback_reference()
        );

        Ok(sub)
    }

    /// Remove one subscription, or every subscription when `subscription_id`
    /// is `None`. Returns the number removed.
    ///
    /// Bulk removal works on a single snapshot; subscriptions created while it
    /// runs may survive.
    pub async fn remove(&self, subscription_id: Option<&str>) -> ManagerResult<usize> {
        let snapshot = self.store.list().await?;

        let targets: Vec<String> = match subscription_id {
            Some(id) => {
                if !snapshot.contains_key(id) {
                    return Err(ManagerError::SubscriptionNotFound(id.to_string()));
                }
                vec![id.to_string()]
            }
            None => snapshot.into_keys().collect(),
        };

        let mut removed = 0;
        for id in &targets {
            match self.env.unregister_service(id).await {
                Ok(()) => {
                    tracing::info!("Removed subscription {}", id);
                    removed += 1;
                }
                // Already gone, removed by an interleaved request
                Err(ManagerError::UnknownService(_)) if subscription_id.is_none() => {}
                Err(ManagerError::UnknownService(_)) => {
                    return Err(ManagerError::SubscriptionNotFound(id.clone()));
                }
                Err(e) => return Err(e),
            }
        }

        Ok(removed)
    }
}
