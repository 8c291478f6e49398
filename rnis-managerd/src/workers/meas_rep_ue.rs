use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use shared::protocol::callback_ingress_path;
use crate::error::{ManagerError, ManagerResult};
use crate::service::ManagedService;
use crate::subscriptions::callback::{CallbackType, DEFAULT_CALLBACK};
use crate::subscriptions::{Subscription, SubscriptionCore, SubscriptionType};
use super::identity::{Imsi, PlmnId};
use super::WorkerContext;

/// Worker name in the environment
pub const NAME: &str = "meas_rep_ue";

const UE_MEASUREMENTS_APP: &str = "empower.apps.uemeasurements.uemeasurements";
const NOTIFICATION_TYPE: &str = "MeasRepUeNotification";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FilterCriteriaAssocTri {
    #[serde(default)]
    associate_id: Vec<AssociateId>,
    ecgi: Option<Ecgi>,
}

#[derive(Debug, Deserialize)]
struct AssociateId {
    #[serde(rename = "type")]
    kind: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct Ecgi {
    plmn: Plmn,
}

#[derive(Debug, Deserialize)]
struct Plmn {
    mcc: String,
    mnc: String,
}

/// Ids of the measurement app started on the controller for us
#[derive(Debug, Default)]
struct RemoteApp {
    project_id: Option<String>,
    app_id: Option<String>,
}

/// Measurement report UE subscription. Each tick makes sure a UE
/// measurements app runs on the controller and reports back to our
/// callback ingress path.
pub struct MeasRepUe {
    core: SubscriptionCore,
    ctx: WorkerContext,
    plmn: Option<PlmnId>,
    imsi: Option<Imsi>,
    remote: Mutex<RemoteApp>,
}

impl MeasRepUe {
    pub fn new(ctx: WorkerContext, service_id: &str, params: Value) -> ManagerResult<Self> {
        let filter = params
            .get("subscription")
            .and_then(|s| s.get("filterCriteriaAssocTri"))
            .map(|f| FilterCriteriaAssocTri::deserialize(f))
            .transpose()
            .map_err(|e| ManagerError::InvalidSubscription(format!("filterCriteriaAssocTri: {}", e)))?;

        let plmn = filter
            .as_ref()
            .and_then(|f| f.ecgi.as_ref())
            .map(|ecgi| PlmnId::from_parts(&ecgi.plmn.mcc, &ecgi.plmn.mnc))
            .transpose()
            .map_err(ManagerError::InvalidSubscription)?;

        // Only IMSI associate ids can be measured
        let imsi = filter
            .as_ref()
            .and_then(|f| f.associate_id.first())
            .filter(|a| a.kind == "IMSI")
            .map(|a| a.value.parse::<Imsi>())
            .transpose()
            .map_err(ManagerError::InvalidSubscription)?;

        let core = SubscriptionCore::from_envelope(service_id, params, ctx.dispatcher.clone())?;

        let worker = Self {
            core,
            ctx,
            plmn,
            imsi,
            remote: Mutex::new(RemoteApp::default()),
        };

        if worker.subscription_type() != SubscriptionType::MeasRepUe {
            return Err(ManagerError::InvalidSubscription(format!(
                "{} can not serve {}",
                NAME,
                worker.subscription_type()
            )));
        }

        Ok(worker)
    }

    /// Configure the remote worker on the controller unless it is already
    /// up. Any failure is logged and retried on the next tick.
    async fn register(&self) {
        let known = {
            let remote = self.remote.lock();
            remote.project_id.clone().zip(remote.app_id.clone())
        };

        if let Some((project_id, app_id)) = known {
            let url = format!("/projects/{}/apps/{}/callbacks/{}", project_id, app_id, DEFAULT_CALLBACK);
            if self.ctx.controller.get(&url).await.is(StatusCode::OK) {
                return;
            }
        }

        let Some(plmn) = &self.plmn else {
            tracing::debug!("Subscription {} has no PLMN filter", self.subscription_id());
            return;
        };

        let Some(project_id) = self.find_project(plmn).await else {
            return;
        };
        self.remote.lock().project_id = Some(project_id.clone());

        let Some(imsi) = &self.imsi else {
            tracing::debug!("Subscription {} has no IMSI associate id", self.subscription_id());
            return;
        };

        let Some(app_id) = self.start_app(&project_id, imsi).await else {
            return;
        };
        self.remote.lock().app_id = Some(app_id.clone());

        if self.add_remote_callback(&project_id, &app_id).await {
            tracing::info!("Remote worker for {} successfully configured", self.subscription_id());
        }
    }

    async fn find_project(&self, plmn: &PlmnId) -> Option<String> {
        let resp = self.ctx.controller.get("/projects").await;

        if !resp.is(StatusCode::OK) {
            tracing::error!("Unable to find PLMN {}, response {}", plmn, resp.code());
            return None;
        }

        let projects = resp.json()?;
        let project_id = projects.as_object()?.values().find_map(|project| {
            let current: PlmnId = project["lte_props"]["plmnid"].as_str()?.parse().ok()?;
            if current != *plmn {
                return None;
            }
            project["project_id"].as_str().map(str::to_string)
        });

        let Some(project_id) = project_id else {
            tracing::error!("Unable to find PLMN {}", plmn);
            return None;
        };

        let resp = self.ctx.controller.get(&format!("/projects/{}", project_id)).await;
        if !resp.is(StatusCode::OK) {
            tracing::error!("Unable to find PLMN {}, response {}", plmn, resp.code());
            return None;
        }

        Some(project_id)
    }

    async fn start_app(&self, project_id: &str, imsi: &Imsi) -> Option<String> {
        let data = json!({
            "name": UE_MEASUREMENTS_APP,
            "params": {
                "imsi": imsi.to_string(),
                "meas_id": 1,
                "interval": "MS2048",
                "amount": "INFINITY"
            }
        });

        let resp = self
            .ctx
            .controller
            .post(&format!("/projects/{}/apps", project_id), data)
            .await;

        if !resp.is(StatusCode::CREATED) {
            tracing::error!("Unable to start worker, error {}", resp.code());
            return None;
        }

        let app_id = resp
            .location
            .as_deref()
            .and_then(|location| location.trim_end_matches('/').rsplit('/').next())
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        if app_id.is_none() {
            tracing::error!("Controller did not return the location of the new worker");
        }

        app_id
    }

    async fn add_remote_callback(&self, project_id: &str, app_id: &str) -> bool {
        let callback = format!(
            "{}{}",
            self.ctx.public_uri.trim_end_matches('/'),
            callback_ingress_path(self.subscription_id())
        );

        let data = json!({
            "name": DEFAULT_CALLBACK,
            "callback": callback,
            "callback_type": CallbackType::Rest,
        });

        let url = format!("/projects/{}/apps/{}/callbacks", project_id, app_id);
        let resp = self.ctx.controller.post(&url, data).await;

        if !resp.is(StatusCode::CREATED) {
            tracing::error!("Unable to add callback, error {}", resp.code());
            return false;
        }

        true
    }
}

#[async_trait]
impl ManagedService for MeasRepUe {
    fn service_id(&self) -> &str {
        self.subscription_id()
    }

    fn name(&self) -> &str {
        NAME
    }

    fn every(&self) -> Option<Duration> {
        Some(self.ctx.every)
    }

    async fn tick(&self) {
        self.register().await;
    }

    /// Tear down the remote app, if one was started
    async fn stop(&self) {
        let remote = std::mem::take(&mut *self.remote.lock());
        let (Some(project_id), Some(app_id)) = (remote.project_id, remote.app_id) else {
            return;
        };

        let resp = self
            .ctx
            .controller
            .delete(&format!("/projects/{}/apps/{}", project_id, app_id))
            .await;

        if resp.status.is_some_and(|s| s.is_success()) {
            tracing::info!("Remote worker {} removed", app_id);
        } else {
            tracing::warn!("Unable to remove remote worker {}, error {}", app_id, resp.code());
        }
    }

    fn as_subscription(self: Arc<Self>) -> Option<Arc<dyn Subscription>> {
        Some(self)
    }
}

impl Subscription for MeasRepUe {
    fn core(&self) -> &SubscriptionCore {
        &self.core
    }

    fn notification(&self, event: Value) -> Value {
        let mut notification = match event {
            Value::Object(map) => map,
            other => {
                let mut map = serde_json::Map::new();
                map.insert("report".to_string(), other);
                map
            }
        };

        let now = Utc::now();
        notification
            .entry("notificationType")
            .or_insert_with(|| json!(NOTIFICATION_TYPE));
        notification.entry("timeStamp").or_insert_with(|| {
            json!({
                "seconds": now.timestamp(),
                "nanoSeconds": now.timestamp_subsec_nanos()
            })
        });

        Value::Object(notification)
    }
}
