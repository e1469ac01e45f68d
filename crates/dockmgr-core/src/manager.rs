//! Container manager: the operations a front end can ask for

use crate::{
    log_session, parse_launch_command, shell_session, CommandRegistry, CoreError, LaunchCommand,
    LaunchPlan, ProcessSpawner, Reconciler, Result, SystemSpawner, TerminalCommand,
};
use dockmgr_config::GlobalConfig;
use dockmgr_provider::{
    ContainerId, ContainerInfo, ContainerProvider, LogConfig, LogStream, ProviderType,
};
use std::sync::Arc;
use std::time::Duration;

/// What a toggle did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Started,
    Stopped,
}

/// Ties the provider, the refresh loop and the external processes together
pub struct ContainerManager {
    provider: Arc<dyn ContainerProvider>,
    reconciler: Arc<Reconciler>,
    spawner: Arc<dyn ProcessSpawner>,
    global_config: GlobalConfig,
}

impl ContainerManager {
    /// Create a manager using the registry location from `global_config`
    pub fn new(provider: Box<dyn ContainerProvider>, global_config: GlobalConfig) -> Result<Self> {
        let registry = CommandRegistry::load(global_config.registry_path()?);
        Ok(Self::from_parts(
            Arc::from(provider),
            registry,
            Arc::new(SystemSpawner),
            global_config,
        ))
    }

    /// Create a manager with an explicit registry and process spawner
    #[cfg(any(test, feature = "test-support"))]
    pub fn new_for_testing(
        provider: Box<dyn ContainerProvider>,
        registry: CommandRegistry,
        spawner: Arc<dyn ProcessSpawner>,
        global_config: GlobalConfig,
    ) -> Self {
        Self::from_parts(Arc::from(provider), registry, spawner, global_config)
    }

    fn from_parts(
        provider: Arc<dyn ContainerProvider>,
        registry: CommandRegistry,
        spawner: Arc<dyn ProcessSpawner>,
        global_config: GlobalConfig,
    ) -> Self {
        let reconciler = Reconciler::new(Arc::clone(&provider), registry);
        Self {
            provider,
            reconciler,
            spawner,
            global_config,
        }
    }

    pub fn provider_type(&self) -> ProviderType {
        self.provider.info().provider_type
    }

    pub fn global_config(&self) -> &GlobalConfig {
        &self.global_config
    }

    pub fn reconciler(&self) -> &Arc<Reconciler> {
        &self.reconciler
    }

    /// How long to wait after a launch before refreshing
    pub fn launch_refresh_delay(&self) -> Duration {
        Duration::from_millis(self.global_config.defaults.launch_refresh_delay_ms)
    }

    /// All containers, running or not, sorted by name
    pub async fn list(&self) -> Result<Vec<ContainerInfo>> {
        self.provider
            .list(true)
            .await
            .map_err(CoreError::from)
            .inspect_err(|e| tracing::error!("Failed to list containers: {}", e))
    }

    /// Resolve a container by full id, short id, name, or unique id prefix
    pub async fn find(&self, query: &str) -> Result<ContainerInfo> {
        let containers = self.list().await?;

        if let Some(info) = containers
            .iter()
            .find(|c| c.id.as_str() == query || c.short_id() == query || c.name == query)
        {
            return Ok(info.clone());
        }

        let mut matches = containers.iter().filter(|c| c.id.as_str().starts_with(query));
        match (matches.next(), matches.next()) {
            (Some(info), None) if !query.is_empty() => Ok(info.clone()),
            (Some(_), Some(_)) => Err(CoreError::ContainerNotFound(format!(
                "'{}' matches more than one container",
                query
            ))),
            _ => Err(CoreError::ContainerNotFound(query.to_string())),
        }
    }

    pub async fn start(&self, id: &ContainerId) -> Result<()> {
        self.start_container(id)
            .await
            .inspect_err(|e| tracing::error!("Failed to start {}: {}", id.short(), e))
    }

    pub async fn stop(&self, id: &ContainerId) -> Result<()> {
        self.stop_container(id)
            .await
            .inspect_err(|e| tracing::error!("Failed to stop {}: {}", id.short(), e))
    }

    /// Stop the container if it is running, otherwise start it.
    ///
    /// The decision uses the engine's current state, not a cached one.
    pub async fn toggle(&self, id: &ContainerId) -> Result<ToggleOutcome> {
        self.toggle_container(id)
            .await
            .inspect_err(|e| tracing::error!("Failed to toggle {}: {}", id.short(), e))
    }

    pub async fn remove(&self, id: &ContainerId, force: bool) -> Result<()> {
        tracing::info!("Removing container {} (force={})", id.short(), force);
        self.provider
            .remove(id, force)
            .await
            .map_err(CoreError::from)
            .inspect_err(|e| tracing::error!("Failed to remove {}: {}", id.short(), e))
    }

    pub async fn logs(&self, id: &ContainerId, config: &LogConfig) -> Result<LogStream> {
        self.provider
            .logs(id, config)
            .await
            .map_err(CoreError::from)
            .inspect_err(|e| tracing::error!("Failed to read logs of {}: {}", id.short(), e))
    }

    /// Open an interactive shell in an external terminal.
    ///
    /// Shells from `[terminal] shells` are probed in order; the first one that
    /// exits 0 is used. Returns the chosen shell.
    pub async fn open_shell(&self, id: &ContainerId) -> Result<String> {
        self.open_shell_session(id)
            .await
            .inspect_err(|e| tracing::error!("Failed to open a shell in {}: {}", id.short(), e))
    }

    /// Follow a container's logs in an external terminal
    pub async fn open_logs(&self, id: &ContainerId) -> Result<()> {
        self.open_log_session(id)
            .await
            .inspect_err(|e| tracing::error!("Failed to follow logs of {}: {}", id.short(), e))
    }

    /// Relaunch the command recorded for `identity`
    pub async fn launch(&self, identity: &str) -> Result<LaunchPlan> {
        self.launch_recorded(identity)
            .await
            .inspect_err(|e| tracing::error!("Failed to launch {}: {}", identity, e))
    }

    /// Run a launch command through the engine binary.
    ///
    /// A container already holding the command's `--name` is force-removed
    /// first. The engine process runs detached; callers refresh after
    /// [`Self::launch_refresh_delay`] to pick up the new container.
    pub async fn launch_command(&self, command: &LaunchCommand) -> Result<LaunchPlan> {
        self.run_launch(command)
            .await
            .inspect_err(|e| tracing::error!("Failed to launch '{}': {}", command, e))
    }

    async fn start_container(&self, id: &ContainerId) -> Result<()> {
        tracing::info!("Starting container {}", id.short());
        self.provider.start(id).await?;
        Ok(())
    }

    async fn stop_container(&self, id: &ContainerId) -> Result<()> {
        tracing::info!("Stopping container {}", id.short());
        let timeout = self.global_config.defaults.stop_timeout_secs;
        self.provider.stop(id, Some(timeout)).await?;
        Ok(())
    }

    async fn toggle_container(&self, id: &ContainerId) -> Result<ToggleOutcome> {
        let info = self.current(id).await?;
        if info.status.is_running() {
            self.stop_container(&info.id).await?;
            Ok(ToggleOutcome::Stopped)
        } else {
            self.start_container(&info.id).await?;
            Ok(ToggleOutcome::Started)
        }
    }

    async fn open_shell_session(&self, id: &ContainerId) -> Result<String> {
        let info = self.current(id).await?;
        if !info.status.is_running() {
            return Err(CoreError::NotRunning(info.name));
        }

        let shell = self.probe_shell(&info.id).await?;
        let engine = self.provider_type().cli_binary();
        let session = shell_session(&self.global_config.terminal, engine, info.id.as_str(), &shell);
        self.spawn_terminal(&session)?;

        tracing::info!("Opened {} in {} for {}", shell, session.program, info.name);
        Ok(shell)
    }

    async fn open_log_session(&self, id: &ContainerId) -> Result<()> {
        let info = self.current(id).await?;
        let engine = self.provider_type().cli_binary();
        let session = log_session(&self.global_config.terminal, engine, info.id.as_str());
        self.spawn_terminal(&session)?;

        tracing::info!("Following logs of {} in {}", info.name, session.program);
        Ok(())
    }

    async fn launch_recorded(&self, identity: &str) -> Result<LaunchPlan> {
        let command = self
            .reconciler
            .command_for(identity)
            .await
            .ok_or_else(|| CoreError::RegistryEntryMissing(identity.to_string()))?;
        self.run_launch(&command).await
    }

    async fn run_launch(&self, command: &LaunchCommand) -> Result<LaunchPlan> {
        let plan = parse_launch_command(command.as_str())?;

        if let Some(name) = &plan.container_name {
            match self.provider.remove(&ContainerId::new(name.as_str()), true).await {
                Ok(()) => tracing::info!("Removed existing container '{}' before launch", name),
                Err(e) if e.is_not_found() => {}
                Err(e) => tracing::warn!("Could not remove existing container '{}': {}", name, e),
            }
        }

        let engine = self.provider_type().cli_binary();
        self.spawner
            .spawn_detached(engine, &plan.args)
            .map_err(|source| CoreError::SpawnFailed {
                program: engine.to_string(),
                source,
            })?;

        tracing::info!("Launched: {}", command.with_binary(engine));
        Ok(plan)
    }

    async fn current(&self, id: &ContainerId) -> Result<ContainerInfo> {
        self.provider
            .list(true)
            .await?
            .into_iter()
            .find(|c| &c.id == id || c.short_id() == id.as_str())
            .ok_or_else(|| CoreError::ContainerNotFound(id.to_string()))
    }

    async fn probe_shell(&self, id: &ContainerId) -> Result<String> {
        for shell in &self.global_config.terminal.shells {
            match self.provider.exec_probe(id, shell).await {
                Ok(0) => return Ok(shell.clone()),
                Ok(code) => tracing::debug!("{} not usable in {} (exit {})", shell, id.short(), code),
                Err(e) if e.is_not_found() => return Err(e.into()),
                Err(e) => tracing::debug!("Probing {} in {} failed: {}", shell, id.short(), e),
            }
        }
        Err(CoreError::NoShellAvailable(id.short().to_string()))
    }

    fn spawn_terminal(&self, session: &TerminalCommand) -> Result<()> {
        self.spawner
            .spawn_detached(&session.program, &session.args)
            .map_err(|source| match source.kind() {
                std::io::ErrorKind::NotFound => CoreError::TerminalUnavailable(session.program.clone()),
                _ => CoreError::SpawnFailed {
                    program: session.program.clone(),
                    source,
                },
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use dockmgr_provider::{ContainerStatus, ProviderError};

    const WEB_ID: &str = "4f66ad9a0b2e1111222233334444";
    const DB_ID: &str = "9c0ffee00000aaaabbbbccccdddd";

    struct Harness {
        mock: MockProvider,
        spawner: RecordingSpawner,
        manager: ContainerManager,
        _tmp: tempfile::TempDir,
    }

    fn harness() -> Harness {
        let tmp = tempfile::tempdir().unwrap();
        let mock = MockProvider::new(ProviderType::Docker);
        mock.set_containers(vec![
            mock_container_info(WEB_ID, "web", ContainerStatus::Running),
            mock_container_info(DB_ID, "db", ContainerStatus::Exited),
        ]);
        let spawner = RecordingSpawner::new();
        let registry = CommandRegistry::load(tmp.path().join("container-commands.json"));
        let manager = ContainerManager::new_for_testing(
            Box::new(mock.clone()),
            registry,
            Arc::new(spawner.clone()),
            GlobalConfig::default(),
        );
        Harness {
            mock,
            spawner,
            manager,
            _tmp: tmp,
        }
    }

    #[tokio::test]
    async fn test_find_by_name_short_id_and_prefix() {
        let h = harness();
        assert_eq!(h.manager.find("web").await.unwrap().id.as_str(), WEB_ID);
        assert_eq!(h.manager.find("9c0ffee00000").await.unwrap().name, "db");
        assert_eq!(h.manager.find("4f6").await.unwrap().name, "web");
        assert!(h.manager.find("nope").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_toggle_uses_current_state() {
        let h = harness();

        let outcome = h.manager.toggle(&ContainerId::new(WEB_ID)).await.unwrap();
        assert_eq!(outcome, ToggleOutcome::Stopped);
        assert!(h.mock.was_called(&MockCall::Stop {
            id: WEB_ID.to_string(),
            timeout: Some(10),
        }));

        let outcome = h.manager.toggle(&ContainerId::new(DB_ID)).await.unwrap();
        assert_eq!(outcome, ToggleOutcome::Started);
        assert!(h.mock.was_called(&MockCall::Start { id: DB_ID.to_string() }));
    }

    #[tokio::test]
    async fn test_toggle_missing_container() {
        let h = harness();
        let err = h.manager.toggle(&ContainerId::new("ffffffffffff")).await.unwrap_err();
        assert!(matches!(err, CoreError::ContainerNotFound(_)));
    }

    #[tokio::test]
    async fn test_open_shell_falls_back_to_sh() {
        let h = harness();
        h.mock.set_probe("bash", Ok(126));
        h.mock.set_probe("sh", Ok(0));

        let shell = h.manager.open_shell(&ContainerId::new(WEB_ID)).await.unwrap();
        assert_eq!(shell, "sh");

        let spawned = h.spawner.spawned();
        assert_eq!(spawned.len(), 1);
        assert_eq!(spawned[0].0, "xterm");
        assert_eq!(
            spawned[0].1,
            vec!["-e".to_string(), format!("docker exec -it {} sh", WEB_ID)]
        );
    }

    #[tokio::test]
    async fn test_open_shell_prefers_first_shell() {
        let h = harness();
        h.mock.set_probe("bash", Ok(0));
        h.mock.set_probe("sh", Ok(0));

        assert_eq!(h.manager.open_shell(&ContainerId::new(WEB_ID)).await.unwrap(), "bash");
        assert!(!h.mock.was_called(&MockCall::ExecProbe {
            id: WEB_ID.to_string(),
            shell: "sh".to_string(),
        }));
    }

    #[tokio::test]
    async fn test_open_shell_rejected_probe_moves_on() {
        let h = harness();
        h.mock
            .set_probe("bash", Err(ProviderError::Rejected("executable not found".to_string())));
        h.mock.set_probe("sh", Ok(0));

        assert_eq!(h.manager.open_shell(&ContainerId::new(WEB_ID)).await.unwrap(), "sh");
    }

    #[tokio::test]
    async fn test_open_shell_without_any_shell() {
        let h = harness();
        let err = h.manager.open_shell(&ContainerId::new(WEB_ID)).await.unwrap_err();
        assert!(matches!(err, CoreError::NoShellAvailable(_)));
        assert!(h.spawner.spawned().is_empty());
    }

    #[tokio::test]
    async fn test_open_shell_requires_running_container() {
        let h = harness();
        let err = h.manager.open_shell(&ContainerId::new(DB_ID)).await.unwrap_err();
        assert!(matches!(err, CoreError::NotRunning(name) if name == "db"));
        assert_eq!(
            h.mock.count_calls(|c| matches!(c, MockCall::ExecProbe { .. })),
            0
        );
    }

    #[tokio::test]
    async fn test_missing_terminal_is_reported() {
        let h = harness();
        h.spawner.fail_with(std::io::ErrorKind::NotFound);

        let err = h.manager.open_logs(&ContainerId::new(DB_ID)).await.unwrap_err();
        assert!(matches!(err, CoreError::TerminalUnavailable(program) if program == "xterm"));
    }

    #[tokio::test]
    async fn test_open_logs_spawns_follow_session() {
        let h = harness();
        h.manager.open_logs(&ContainerId::new(DB_ID)).await.unwrap();

        let spawned = h.spawner.spawned();
        assert_eq!(
            spawned[0].1[1],
            format!("docker logs --follow {}", DB_ID)
        );
    }

    #[tokio::test]
    async fn test_launch_unknown_identity() {
        let h = harness();
        let err = h.manager.launch("000000000000").await.unwrap_err();
        assert!(matches!(err, CoreError::RegistryEntryMissing(_)));
    }

    #[tokio::test]
    async fn test_launch_replaces_named_container() {
        let h = harness();
        h.mock.set_record(WEB_ID, mock_record(WEB_ID, "web", "nginx:latest"));
        h.manager.reconciler().refresh_now().await.unwrap().unwrap();

        let plan = h.manager.launch("4f66ad9a0b2e").await.unwrap();
        assert_eq!(plan.container_name.as_deref(), Some("web"));

        assert!(h.mock.was_called(&MockCall::Remove {
            id: "web".to_string(),
            force: true,
        }));
        assert_eq!(
            h.spawner.spawned(),
            vec![(
                "docker".to_string(),
                vec!["run".to_string(), "--name".to_string(), "web".to_string(), "nginx:latest".to_string()]
            )]
        );
    }

    #[tokio::test]
    async fn test_launch_ignores_missing_previous_container() {
        let h = harness();
        *h.mock.remove_result.lock().unwrap() =
            Err(ProviderError::ContainerNotFound("web".to_string()));

        h.manager
            .launch_command(&LaunchCommand::new("run --name web nginx"))
            .await
            .unwrap();
        assert_eq!(h.spawner.spawned().len(), 1);
    }

    #[tokio::test]
    async fn test_launch_malformed_command_spawns_nothing() {
        let h = harness();
        let err = h
            .manager
            .launch_command(&LaunchCommand::new("run 'oops"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::MalformedCommandLine(_)));
        assert!(h.spawner.spawned().is_empty());
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(move || writer.clone())
            .finish();
        (logs, tracing::subscriber::set_default(subscriber))
    }

    #[tokio::test]
    async fn test_failed_operations_are_logged() {
        let h = harness();
        let (logs, _guard) = capture_logs();

        h.manager
            .launch_command(&LaunchCommand::new("run 'oops"))
            .await
            .unwrap_err();

        *h.mock.start_result.lock().unwrap() =
            Err(ProviderError::Rejected("already started".to_string()));
        h.manager.start(&ContainerId::new(DB_ID)).await.unwrap_err();

        h.manager.launch("000000000000").await.unwrap_err();

        let output = logs.contents();
        assert!(
            output.contains("ERROR") && output.contains("Failed to launch 'run 'oops'"),
            "malformed launch not logged: {}",
            output
        );
        assert!(
            output.contains("Failed to start 9c0ffee00000: Provider error"),
            "rejected start not logged: {}",
            output
        );
        assert!(output.contains("Failed to launch 000000000000"), "{}", output);
    }

    #[tokio::test]
    async fn test_failed_toggle_is_logged_once() {
        let h = harness();
        *h.mock.stop_result.lock().unwrap() =
            Err(ProviderError::Rejected("cannot stop".to_string()));
        let (logs, _guard) = capture_logs();

        h.manager.toggle(&ContainerId::new(WEB_ID)).await.unwrap_err();

        let output = logs.contents();
        assert_eq!(output.matches("ERROR").count(), 1, "{}", output);
        assert!(output.contains("Failed to toggle 4f66ad9a0b2e"), "{}", output);
    }

    #[tokio::test]
    async fn test_launch_without_name_removes_nothing() {
        let h = harness();
        h.manager
            .launch_command(&LaunchCommand::new("run -p 8080:80 nginx"))
            .await
            .unwrap();
        assert_eq!(
            h.mock.count_calls(|c| matches!(c, MockCall::Remove { .. })),
            0
        );
    }
}
