//! Refresh cycle that keeps the command registry in step with the engine
//!
//! At most one cycle runs at a time. A trigger that arrives while a cycle is
//! in flight is dropped, not queued. Each finished cycle publishes its result
//! on a watch channel; front ends render from that and never touch engine
//! data directly.

use crate::{synthesize, CommandRegistry, ContainerSnapshot, LaunchCommand, RefreshSnapshot, Result};
use chrono::Utc;
use dockmgr_provider::ContainerProvider;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

/// Outcome of a refresh cycle, as seen by subscribers
#[derive(Debug, Clone)]
pub enum RefreshEvent {
    Completed(Arc<RefreshSnapshot>),
    Failed(String),
}

/// Clears the in-flight flag when the cycle ends, whatever the outcome
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs refresh cycles against a provider and owns the registry writes
pub struct Reconciler {
    provider: Arc<dyn ContainerProvider>,
    registry: Mutex<CommandRegistry>,
    in_flight: Arc<AtomicBool>,
    events: watch::Sender<Option<RefreshEvent>>,
}

impl Reconciler {
    pub fn new(provider: Arc<dyn ContainerProvider>, registry: CommandRegistry) -> Arc<Self> {
        let (events, _) = watch::channel(None);
        Arc::new(Self {
            provider,
            registry: Mutex::new(registry),
            in_flight: Arc::new(AtomicBool::new(false)),
            events,
        })
    }

    /// Receive the result of every cycle from now on
    pub fn subscribe(&self) -> watch::Receiver<Option<RefreshEvent>> {
        self.events.subscribe()
    }

    /// Whether a cycle is currently running
    pub fn is_refreshing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Start a cycle in the background.
    ///
    /// Returns `false` without doing anything if a cycle is already running.
    /// Must be called from within a tokio runtime.
    pub fn request_refresh(self: &Arc<Self>) -> bool {
        let Some(guard) = self.try_begin() else {
            tracing::debug!("Refresh already in progress, ignoring trigger");
            return false;
        };

        let this = Arc::clone(self);
        tokio::spawn(async move {
            let _guard = guard;
            if let Err(e) = this.publish_cycle().await {
                tracing::debug!("Background refresh ended with an error: {}", e);
            }
        });
        true
    }

    /// Run a cycle on the caller's task.
    ///
    /// Returns `None` if another cycle is already running.
    pub async fn refresh_now(&self) -> Option<Result<Arc<RefreshSnapshot>>> {
        let _guard = self.try_begin()?;
        Some(self.publish_cycle().await)
    }

    /// Current registry view without touching the engine
    pub async fn commands(&self) -> Vec<(LaunchCommand, String)> {
        self.registry.lock().await.by_command().to_vec()
    }

    /// Recorded command for a container identity
    pub async fn command_for(&self, identity: &str) -> Option<LaunchCommand> {
        self.registry.lock().await.get(identity).cloned()
    }

    fn try_begin(&self) -> Option<InFlight> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(Arc::clone(&self.in_flight)))
    }

    async fn publish_cycle(&self) -> Result<Arc<RefreshSnapshot>> {
        match self.run_cycle().await {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                self.events
                    .send_replace(Some(RefreshEvent::Completed(Arc::clone(&snapshot))));
                Ok(snapshot)
            }
            Err(e) => {
                tracing::error!("Refresh failed: {}", e);
                self.events.send_replace(Some(RefreshEvent::Failed(e.to_string())));
                Err(e)
            }
        }
    }

    async fn run_cycle(&self) -> Result<RefreshSnapshot> {
        let containers = self.provider.list(true).await?;
        tracing::debug!("Refreshing {} containers", containers.len());

        let mut rows = Vec::with_capacity(containers.len());
        let mut synthesized = 0;

        for info in &containers {
            rows.push(ContainerSnapshot::from_info(info));

            let identity = info.short_id();
            if self.registry.lock().await.contains(identity) {
                continue;
            }

            let record = match self.provider.inspect(&info.id).await {
                Ok(record) => record,
                Err(e) if e.is_not_found() => {
                    tracing::debug!("Container {} disappeared before inspection", identity);
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Failed to inspect {}: {}", identity, e);
                    continue;
                }
            };

            let Some(command) = synthesize(&record) else {
                continue;
            };

            match self.registry.lock().await.put(identity, command) {
                Ok(()) => {
                    tracing::info!("Recorded launch command for {} ({})", info.name, identity);
                    synthesized += 1;
                }
                Err(e) => tracing::error!("Failed to persist command registry: {}", e),
            }
        }

        let commands = self.registry.lock().await.by_command().to_vec();

        Ok(RefreshSnapshot {
            containers: rows,
            commands,
            synthesized,
            refreshed_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use dockmgr_provider::{ContainerStatus, ProviderError, ProviderType};
    use std::time::Duration;

    const ID_A: &str = "aaaaaaaaaaaa0000000000000000";
    const ID_B: &str = "bbbbbbbbbbbb0000000000000000";
    const ID_C: &str = "cccccccccccc0000000000000000";

    fn setup(tmp: &tempfile::TempDir) -> (MockProvider, Arc<Reconciler>) {
        let mock = MockProvider::new(ProviderType::Docker);
        let registry = CommandRegistry::load(tmp.path().join("container-commands.json"));
        let reconciler = Reconciler::new(Arc::new(mock.clone()), registry);
        (mock, reconciler)
    }

    fn three_containers(mock: &MockProvider) {
        mock.set_containers(vec![
            mock_container_info(ID_A, "alpha", ContainerStatus::Running),
            mock_container_info(ID_B, "beta", ContainerStatus::Exited),
            mock_container_info(ID_C, "gamma", ContainerStatus::Running),
        ]);
        mock.set_record(ID_A, mock_record(ID_A, "alpha", "nginx"));
        mock.set_record(ID_B, mock_record(ID_B, "beta", "redis"));
        mock.set_record(ID_C, mock_record(ID_C, "gamma", "postgres"));
    }

    fn inspect_count(mock: &MockProvider) -> usize {
        mock.count_calls(|c| matches!(c, MockCall::Inspect { .. }))
    }

    #[tokio::test]
    async fn test_only_unknown_containers_are_inspected() {
        let tmp = tempfile::tempdir().unwrap();
        let mut registry = CommandRegistry::load(tmp.path().join("container-commands.json"));
        registry
            .put("aaaaaaaaaaaa", LaunchCommand::new("run --name alpha nginx"))
            .unwrap();

        let mock = MockProvider::new(ProviderType::Docker);
        three_containers(&mock);
        let reconciler = Reconciler::new(Arc::new(mock.clone()), registry);

        let snapshot = reconciler.refresh_now().await.unwrap().unwrap();

        assert_eq!(inspect_count(&mock), 2);
        assert!(!mock.was_called(&MockCall::Inspect { id: ID_A.to_string() }));
        assert_eq!(snapshot.synthesized, 2);
        assert_eq!(snapshot.containers.len(), 3);
        assert_eq!(snapshot.commands.len(), 3);

        let reloaded = CommandRegistry::load(tmp.path().join("container-commands.json"));
        assert_eq!(
            reloaded.get("bbbbbbbbbbbb").map(|c| c.as_str()),
            Some("run --name beta redis")
        );
    }

    #[tokio::test]
    async fn test_second_cycle_inspects_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let (mock, reconciler) = setup(&tmp);
        three_containers(&mock);

        reconciler.refresh_now().await.unwrap().unwrap();
        assert_eq!(inspect_count(&mock), 3);

        let snapshot = reconciler.refresh_now().await.unwrap().unwrap();
        assert_eq!(inspect_count(&mock), 3);
        assert_eq!(snapshot.synthesized, 0);
    }

    #[tokio::test]
    async fn test_snapshot_rows_follow_listing_order() {
        let tmp = tempfile::tempdir().unwrap();
        let (mock, reconciler) = setup(&tmp);
        three_containers(&mock);

        let snapshot = reconciler.refresh_now().await.unwrap().unwrap();
        let names: Vec<&str> = snapshot.containers.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta", "gamma"]);
        assert_eq!(snapshot.find("bbbbbbbbbbbb").unwrap().run_status, crate::RunStatus::Stopped);
    }

    #[tokio::test]
    async fn test_vanished_container_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let (mock, reconciler) = setup(&tmp);
        mock.set_containers(vec![
            mock_container_info(ID_A, "alpha", ContainerStatus::Running),
            mock_container_info(ID_B, "beta", ContainerStatus::Running),
        ]);
        // Only beta can still be inspected
        mock.set_record(ID_B, mock_record(ID_B, "beta", "redis"));

        let snapshot = reconciler.refresh_now().await.unwrap().unwrap();

        assert_eq!(snapshot.containers.len(), 2);
        assert_eq!(snapshot.synthesized, 1);
        assert_eq!(reconciler.command_for("aaaaaaaaaaaa").await, None);
        assert!(reconciler.command_for("bbbbbbbbbbbb").await.is_some());
    }

    #[tokio::test]
    async fn test_record_without_image_is_not_registered() {
        let tmp = tempfile::tempdir().unwrap();
        let (mock, reconciler) = setup(&tmp);
        mock.set_containers(vec![mock_container_info(ID_A, "alpha", ContainerStatus::Running)]);
        mock.set_record(ID_A, mock_record(ID_A, "alpha", ""));

        let snapshot = reconciler.refresh_now().await.unwrap().unwrap();
        assert_eq!(snapshot.synthesized, 0);
        assert!(reconciler.commands().await.is_empty());
    }

    #[tokio::test]
    async fn test_unpersisted_commands_are_not_counted() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("container-commands.json");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), "x").unwrap();

        let mock = MockProvider::new(ProviderType::Docker);
        three_containers(&mock);
        let reconciler = Reconciler::new(Arc::new(mock.clone()), CommandRegistry::load(&path));

        let snapshot = reconciler.refresh_now().await.unwrap().unwrap();
        assert_eq!(snapshot.synthesized, 0);
        assert_eq!(snapshot.commands.len(), 3);
    }

    #[tokio::test]
    async fn test_list_failure_publishes_failed_event() {
        let tmp = tempfile::tempdir().unwrap();
        let (mock, reconciler) = setup(&tmp);
        *mock.list_result.lock().unwrap() =
            Err(ProviderError::ConnectionError("daemon gone".to_string()));
        let rx = reconciler.subscribe();

        let result = reconciler.refresh_now().await.unwrap();
        assert!(result.is_err());

        match rx.borrow().clone() {
            Some(RefreshEvent::Failed(msg)) => assert!(msg.contains("daemon gone")),
            other => panic!("expected failure event, got {:?}", other),
        }
        assert!(!reconciler.is_refreshing());
    }

    #[tokio::test]
    async fn test_trigger_while_in_flight_is_dropped() {
        let tmp = tempfile::tempdir().unwrap();
        let (mock, reconciler) = setup(&tmp);
        three_containers(&mock);
        let gate = mock.gate_list();
        let mut rx = reconciler.subscribe();

        assert!(reconciler.request_refresh());
        mock.list_entered.notified().await;

        assert!(reconciler.is_refreshing());
        assert!(!reconciler.request_refresh());
        assert!(reconciler.refresh_now().await.is_none());

        gate.notify_one();
        tokio::time::timeout(Duration::from_secs(5), rx.changed())
            .await
            .unwrap()
            .unwrap();

        assert!(matches!(&*rx.borrow(), Some(RefreshEvent::Completed(_))));
        assert_eq!(mock.count_calls(|c| matches!(c, MockCall::List { .. })), 1);
        assert_eq!(inspect_count(&mock), 3);
    }

    #[tokio::test]
    async fn test_background_cycle_releases_gate() {
        let tmp = tempfile::tempdir().unwrap();
        let (mock, reconciler) = setup(&tmp);
        three_containers(&mock);
        let mut rx = reconciler.subscribe();

        assert!(reconciler.request_refresh());
        tokio::time::timeout(Duration::from_secs(5), rx.changed())
            .await
            .unwrap()
            .unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            while reconciler.is_refreshing() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        assert!(reconciler.request_refresh());
    }
}
