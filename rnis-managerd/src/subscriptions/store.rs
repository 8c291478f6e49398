use std::collections::BTreeMap;
use std::sync::Arc;
use shared::protocol::{subscription_href, SUBSCRIPTIONS_PATH};
use shared::types::{SubscriptionLink, SubscriptionLinkList, SubscriptionLinks};
use crate::env_manager::EnvHandle;
use crate::error::{ManagerError, ManagerResult};
use super::Subscription;

/// View of the environment restricted to subscriptions. Nothing is cached;
/// every call reads the environment's current services.
#[derive(Clone)]
pub struct SubscriptionStore {
    env: EnvHandle,
}

impl SubscriptionStore {
    pub fn new(env: EnvHandle) -> Self {
        Self { env }
    }

    pub async fn list(&self) -> ManagerResult<BTreeMap<String, Arc<dyn Subscription>>> {
        let services = self.env.services().await?;

        Ok(services
            .into_iter()
            .filter_map(|service| service.as_subscription())
            .map(|sub| (sub.subscription_id().to_string(), sub))
            .collect())
    }

    pub async fn get(&self, subscription_id: &str) -> ManagerResult<Arc<dyn Subscription>> {
        self.list()
            .await?
            .remove(subscription_id)
            .ok_or_else(|| ManagerError::SubscriptionNotFound(subscription_id.to_string()))
    }

    pub async fn links_view(&self) -> ManagerResult<SubscriptionLinkList> {
        let subscription = self
            .list()
            .await?
            .values()
            .map(|sub| SubscriptionLink {
                href: subscription_href(sub.subscription_id()),
                subscription_type: sub.subscription_type().to_string(),
            })
            .collect();

        Ok(SubscriptionLinkList {
            links: SubscriptionLinks {
                self_href: SUBSCRIPTIONS_PATH.to_string(),
                subscription,
            },
        })
    }
}
