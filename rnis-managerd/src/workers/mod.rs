pub mod identity;
pub mod meas_rep_ue;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use serde_json::Value;
use crate::controller::ControllerClient;
use crate::error::ManagerResult;
use crate::service::{ManagedService, ServiceFactory};
use crate::subscriptions::callback::CallbackDispatcher;

/// What every subscription worker gets from the manager
#[derive(Clone)]
pub struct WorkerContext {
    pub controller: ControllerClient,
    pub dispatcher: CallbackDispatcher,
    /// Base URL the controller posts events back to
    pub public_uri: String,
    pub every: Duration,
}

/// Factories keyed by worker name, for `EnvHandle::spawn`
pub fn factories(ctx: WorkerContext) -> HashMap<String, ServiceFactory> {
    let meas_rep_ue_factory: ServiceFactory = Arc::new(
        move |service_id: &str, params: Value| -> ManagerResult<Arc<dyn ManagedService>> {
            let worker = meas_rep_ue::MeasRepUe::new(ctx.clone(), service_id, params)?;
            Ok(Arc::new(worker))
        },
    );

    HashMap::from([(meas_rep_ue::NAME.to_string(), meas_rep_ue_factory)])
}

#[cfg(test)]
pub(crate) fn test_context(ctrl_host: &str, ctrl_port: u16) -> WorkerContext {
    use crate::controller::ControllerCredentials;
    use crate::http::HttpClient;

    let mut credentials = ControllerCredentials::default();
    credentials.set_host(ctrl_host).unwrap();
    credentials.set_port(ctrl_port).unwrap();
    credentials.set_user("root").unwrap();
    credentials.set_password("root").unwrap();

    WorkerContext {
        controller: ControllerClient::new(HttpClient::new(), credentials),
        dispatcher: CallbackDispatcher::default(),
        public_uri: "http://127.0.0.1:8890".to_string(),
        every: Duration::from_secs(60),
    }
}
