use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use serde_json::Value;
use crate::error::ManagerResult;
use crate::subscriptions::Subscription;

/// A service living in the environment. The environment drives `tick`
/// every `every()` until the service is unregistered, then calls `stop`.
#[async_trait]
pub trait ManagedService: Send + Sync + 'static {
    fn service_id(&self) -> &str;

    /// Factory name this service was built from
    fn name(&self) -> &str;

    /// Loop period, `None` for services without a periodic job
    fn every(&self) -> Option<Duration>;

    async fn tick(&self) {}

    async fn stop(&self) {}

    /// Capability marker: services implementing the subscription contract
    /// return themselves here.
    fn as_subscription(self: Arc<Self>) -> Option<Arc<dyn Subscription>> {
        None
    }
}

/// Builds a service from its id and launch params
pub type ServiceFactory =
    Arc<dyn Fn(&str, Value) -> ManagerResult<Arc<dyn ManagedService>> + Send + Sync>;
