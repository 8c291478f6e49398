use std::time::Duration;
use async_trait::async_trait;
use reqwest::StatusCode;
use tokio::sync::watch;
use shared::types::{MecService, RegistrationState};
use crate::http::HttpClient;
use crate::service::ManagedService;

/// Service name of the manager itself in the environment
pub const NAME: &str = "rnis_manager";

/// Keeps this manager registered with the MEC service registry. The
/// environment calls `tick` every `every`; each tick is one heartbeat.
pub struct RegistrationLoop {
    service_id: String,
    registry_url: String,
    every: Duration,
    http: HttpClient,
    state_tx: watch::Sender<RegistrationState>,
}

impl RegistrationLoop {
    pub fn new(
        service_id: impl Into<String>,
        registry_url: impl Into<String>,
        every: Duration,
        http: HttpClient,
    ) -> Self {
        let (state_tx, _) = watch::channel(RegistrationState::Unregistered);

        Self {
            service_id: service_id.into(),
            registry_url: registry_url.into(),
            every,
            http,
            state_tx,
        }
    }

    /// Advertisement sent with every heartbeat
    pub fn mec_service(&self) -> MecService {
        MecService::rnis(&self.service_id)
    }

    pub fn state(&self) -> RegistrationState {
        *self.state_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<RegistrationState> {
        self.state_tx.subscribe()
    }

    /// Send one heartbeat. Only a 201 counts as registered.
    pub async fn heartbeat(&self) -> RegistrationState {
        let url = format!("{}/{}", self.registry_url.trim_end_matches('/'), self.service_id);
        let resp = self.http.post(&url, &self.mec_service()).await;

        let state = if resp.is(StatusCode::CREATED) {
            RegistrationState::Registered
        } else {
            RegistrationState::Unregistered
        };
        self.state_tx.send_replace(state);

        tracing::info!("Sending periodic keep-alive, response {}", resp.code());

        state
    }
}

#[async_trait]
impl ManagedService for RegistrationLoop {
    fn service_id(&self) -> &str {
        &self.service_id
    }

    fn name(&self) -> &str {
        NAME
    }

    fn every(&self) -> Option<Duration> {
        Some(self.every)
    }

    async fn tick(&self) {
        self.heartbeat().await;
    }
}
