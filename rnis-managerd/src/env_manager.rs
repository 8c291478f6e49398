use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use futures::future::join_all;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use crate::error::{ManagerError, ManagerResult};
use crate::service::{ManagedService, ServiceFactory};

/// Commands sent to the environment task
pub enum EnvCommand {
    Register {
        name: String,
        params: Value,
        service_id: String,
        reply: oneshot::Sender<ManagerResult<Arc<dyn ManagedService>>>,
    },
    Attach(Arc<dyn ManagedService>, oneshot::Sender<ManagerResult<()>>),
    Unregister(String, oneshot::Sender<ManagerResult<()>>),
    Services(oneshot::Sender<Vec<Arc<dyn ManagedService>>>),
    Shutdown(oneshot::Sender<()>),
}

struct Running {
    service: Arc<dyn ManagedService>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Running {
    /// Cancel the loop, wait for an in-flight tick, then run the stop hook
    async fn stop(self) {
        self.cancel.cancel();
        if let Some(task) = self.task {
            let _ = task.await;
        }
        self.service.stop().await;
    }
}

/// Handle to the registry of running services
#[derive(Clone)]
pub struct EnvHandle {
    tx: mpsc::Sender<EnvCommand>,
}

impl EnvHandle {
    /// Spawn the environment task. Service loops are children of `cancel`.
    pub fn spawn(factories: HashMap<String, ServiceFactory>, cancel: CancellationToken) -> Self {
        let (tx, mut rx) = mpsc::channel::<EnvCommand>(256);

        tokio::spawn(async move {
            let mut services: BTreeMap<String, Running> = BTreeMap::new();

            while let Some(cmd) = rx.recv().await {
                match cmd {
                    EnvCommand::Register { name, params, service_id, reply } => {
                        let result = if services.contains_key(&service_id) {
                            Err(ManagerError::DuplicateService(service_id))
                        } else {
                            match factories.get(&name) {
                                Some(factory) => factory(&service_id, params).map(|service| {
                                    let running = start(service.clone(), &cancel);
                                    services.insert(service_id.clone(), running);
                                    tracing::info!("Registered service {} ({})", service_id, name);
                                    service
                                }),
                                None => Err(ManagerError::UnknownService(name)),
                            }
                        };
                        let _ = reply.send(result);
                    }
                    EnvCommand::Attach(service, reply) => {
                        let service_id = service.service_id().to_string();
                        let result = if services.contains_key(&service_id) {
                            Err(ManagerError::DuplicateService(service_id))
                        } else {
                            tracing::info!("Attached service {} ({})", service_id, service.name());
                            services.insert(service_id, start(service, &cancel));
                            Ok(())
                        };
                        let _ = reply.send(result);
                    }
                    EnvCommand::Unregister(service_id, reply) => {
                        let result = match services.remove(&service_id) {
                            Some(running) => {
                                tracing::info!("Unregistered service {}", service_id);
                                tokio::spawn(running.stop());
                                Ok(())
                            }
                            None => Err(ManagerError::UnknownService(service_id)),
                        };
                        let _ = reply.send(result);
                    }
                    EnvCommand::Services(reply) => {
                        let snapshot = services.values().map(|r| r.service.clone()).collect();
                        let _ = reply.send(snapshot);
                    }
                    EnvCommand::Shutdown(reply) => {
                        tracing::info!("Environment shutting down, stopping {} services", services.len());
                        join_all(std::mem::take(&mut services).into_values().map(Running::stop)).await;
                        let _ = reply.send(());
                        break;
                    }
                }
            }
        });

        Self { tx }
    }

    /// Build a service through the factory registered under `name` and start it
    pub async fn register_service(
        &self,
        name: &str,
        params: Value,
        service_id: &str,
    ) -> ManagerResult<Arc<dyn ManagedService>> {
        let (reply, rx) = oneshot::channel();
        self.send(EnvCommand::Register {
            name: name.to_string(),
            params,
            service_id: service_id.to_string(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| ManagerError::EnvUnavailable)?
    }

    /// Start an already built service
    pub async fn attach(&self, service: Arc<dyn ManagedService>) -> ManagerResult<()> {
        let (reply, rx) = oneshot::channel();
        self.send(EnvCommand::Attach(service, reply)).await?;
        rx.await.map_err(|_| ManagerError::EnvUnavailable)?
    }

    pub async fn unregister_service(&self, service_id: &str) -> ManagerResult<()> {
        let (reply, rx) = oneshot::channel();
        self.send(EnvCommand::Unregister(service_id.to_string(), reply)).await?;
        rx.await.map_err(|_| ManagerError::EnvUnavailable)?
    }

    /// Snapshot of running services, ordered by id
    pub async fn services(&self) -> ManagerResult<Vec<Arc<dyn ManagedService>>> {
        let (reply, rx) = oneshot::channel();
        self.send(EnvCommand::Services(reply)).await?;
        rx.await.map_err(|_| ManagerError::EnvUnavailable)
    }

    /// Stop every service and the environment task
    pub async fn shutdown(&self) -> ManagerResult<()> {
        let (reply, rx) = oneshot::channel();
        self.send(EnvCommand::Shutdown(reply)).await?;
        rx.await.map_err(|_| ManagerError::EnvUnavailable)
    }

    async fn send(&self, cmd: EnvCommand) -> ManagerResult<()> {
        self.tx.send(cmd).await.map_err(|_| ManagerError::EnvUnavailable)
    }
}

fn start(service: Arc<dyn ManagedService>, parent: &CancellationToken) -> Running {
    let cancel = parent.child_token();
    let task = service
        .every()
        .map(|every| tokio::spawn(run_loop(service.clone(), every, cancel.clone())));

    Running { service, cancel, task }
}

/// Periodic job of one service
async fn run_loop(service: Arc<dyn ManagedService>, every: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => service.tick().await,
            _ = cancel.cancelled() => {
                tracing::debug!("Loop of {} stopped", service.service_id());
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use async_trait::async_trait;

    struct Counter {
        id: String,
        ticks: AtomicUsize,
        stopped: AtomicUsize,
    }

    #[async_trait]
    impl ManagedService for Counter {
        fn service_id(&self) -> &str {
            &self.id
        }

        fn name(&self) -> &str {
            "counter"
        }

        fn every(&self) -> Option<Duration> {
            Some(Duration::from_millis(10))
        }

        async fn tick(&self) {
            self.ticks.fetch_add(1, Ordering::SeqCst);
        }

        async fn stop(&self) {
            self.stopped.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn counter(id: &str) -> Arc<Counter> {
        Arc::new(Counter {
            id: id.to_string(),
            ticks: AtomicUsize::new(0),
            stopped: AtomicUsize::new(0),
        })
    }

    fn test_env() -> EnvHandle {
        let factory: ServiceFactory = Arc::new(
            |id: &str, _params: Value| -> ManagerResult<Arc<dyn ManagedService>> { Ok(counter(id)) },
        );
        EnvHandle::spawn(
            HashMap::from([("counter".to_string(), factory)]),
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn test_register_and_unregister() {
        let env = test_env();

        let service = env.register_service("counter", Value::Null, "a").await.unwrap();
        assert_eq!(service.service_id(), "a");
        assert_eq!(env.services().await.unwrap().len(), 1);

        env.unregister_service("a").await.unwrap();
        assert!(env.services().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let env = test_env();
        env.register_service("counter", Value::Null, "a").await.unwrap();

        let result = env.register_service("counter", Value::Null, "a").await;

        assert!(matches!(result, Err(ManagerError::DuplicateService(id)) if id == "a"));
        assert_eq!(env.services().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_factory() {
        let env = test_env();

        let result = env.register_service("missing", Value::Null, "a").await;

        assert!(matches!(result, Err(ManagerError::UnknownService(_))));
        assert!(env.services().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unregister_unknown_id() {
        let env = test_env();

        assert!(matches!(
            env.unregister_service("nope").await,
            Err(ManagerError::UnknownService(_))
        ));
    }

    #[tokio::test]
    async fn test_loop_ticks_until_shutdown() {
        let env = test_env();
        let service = counter("b");
        env.attach(service.clone()).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        env.shutdown().await.unwrap();

        assert!(service.ticks.load(Ordering::SeqCst) >= 1);
        assert_eq!(service.stopped.load(Ordering::SeqCst), 1);

        let ticks = service.ticks.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(service.ticks.load(Ordering::SeqCst), ticks);
        assert!(matches!(env.services().await, Err(ManagerError::EnvUnavailable)));
    }
}
