//! Test support utilities for dockmgr-core
//!
//! Provides MockProvider and helpers for unit testing the Reconciler and
//! ContainerManager without requiring a real Docker/Podman engine.

use crate::ProcessSpawner;
use async_trait::async_trait;
use dockmgr_provider::*;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Records which methods were called on the mock
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    List { all: bool },
    Inspect { id: String },
    Start { id: String },
    Stop { id: String, timeout: Option<u32> },
    Remove { id: String, force: bool },
    ExecProbe { id: String, shell: String },
    Logs { id: String },
    Ping,
}

/// Configurable mock container provider for testing
#[derive(Clone)]
pub struct MockProvider {
    pub provider_type: ProviderType,
    pub calls: Arc<Mutex<Vec<MockCall>>>,
    /// Result for list calls
    pub list_result: Arc<Mutex<Result<Vec<ContainerInfo>>>>,
    /// Inspect results keyed by the id passed in; missing ids are not found
    pub inspect_results: Arc<Mutex<HashMap<String, Result<ContainerConfigRecord>>>>,
    /// Result for start calls
    pub start_result: Arc<Mutex<Result<()>>>,
    /// Result for stop calls
    pub stop_result: Arc<Mutex<Result<()>>>,
    /// Result for remove calls
    pub remove_result: Arc<Mutex<Result<()>>>,
    /// Probe results keyed by shell; missing shells exit with 127
    pub probe_results: Arc<Mutex<HashMap<String, Result<i64>>>>,
    /// Bytes returned by logs calls
    pub logs_output: Arc<Mutex<String>>,
    /// Result for ping calls
    pub ping_result: Arc<Mutex<Result<()>>>,
    /// When set, list waits for a notification before answering
    pub list_gate: Arc<Mutex<Option<Arc<Notify>>>>,
    /// Notified every time list is entered
    pub list_entered: Arc<Notify>,
}

impl MockProvider {
    /// Create a new mock provider with default success results
    pub fn new(provider_type: ProviderType) -> Self {
        Self {
            provider_type,
            calls: Arc::new(Mutex::new(Vec::new())),
            list_result: Arc::new(Mutex::new(Ok(Vec::new()))),
            inspect_results: Arc::new(Mutex::new(HashMap::new())),
            start_result: Arc::new(Mutex::new(Ok(()))),
            stop_result: Arc::new(Mutex::new(Ok(()))),
            remove_result: Arc::new(Mutex::new(Ok(()))),
            probe_results: Arc::new(Mutex::new(HashMap::new())),
            logs_output: Arc::new(Mutex::new(String::new())),
            ping_result: Arc::new(Mutex::new(Ok(()))),
            list_gate: Arc::new(Mutex::new(None)),
            list_entered: Arc::new(Notify::new()),
        }
    }

    /// Set the containers returned by list
    pub fn set_containers(&self, containers: Vec<ContainerInfo>) {
        *self.list_result.lock().unwrap() = Ok(containers);
    }

    /// Set the record returned when inspecting `id`
    pub fn set_record(&self, id: &str, record: ContainerConfigRecord) {
        self.inspect_results
            .lock()
            .unwrap()
            .insert(id.to_string(), Ok(record));
    }

    /// Set the exit code of the probe for `shell`
    pub fn set_probe(&self, shell: &str, result: Result<i64>) {
        self.probe_results
            .lock()
            .unwrap()
            .insert(shell.to_string(), result);
    }

    /// Make list block until the returned handle is notified
    pub fn gate_list(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.list_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Record a call
    fn record(&self, call: MockCall) {
        self.calls.lock().unwrap().push(call);
    }

    /// Check if a specific call was made
    pub fn was_called(&self, call: &MockCall) -> bool {
        self.calls.lock().unwrap().contains(call)
    }

    /// Number of recorded calls matching a predicate
    pub fn count_calls(&self, pred: impl Fn(&MockCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }
}

/// Helper to clone a Result<T> from an Arc<Mutex<Result<T>>>
fn clone_result<T: Clone>(r: &Arc<Mutex<Result<T>>>) -> Result<T> {
    let guard = r.lock().unwrap();
    clone_ref_result(&guard)
}

fn clone_ref_result<T: Clone>(r: &Result<T>) -> Result<T> {
    match r {
        Ok(v) => Ok(v.clone()),
        Err(e) => Err(clone_provider_error(e)),
    }
}

/// Clone a ProviderError (thiserror types don't implement Clone)
pub fn clone_provider_error(e: &ProviderError) -> ProviderError {
    match e {
        ProviderError::ConnectionError(s) => ProviderError::ConnectionError(s.clone()),
        ProviderError::ContainerNotFound(s) => ProviderError::ContainerNotFound(s.clone()),
        ProviderError::Rejected(s) => ProviderError::Rejected(s.clone()),
        ProviderError::InvalidResponse(s) => ProviderError::InvalidResponse(s.clone()),
        ProviderError::ExecError(s) => ProviderError::ExecError(s.clone()),
        ProviderError::IoError(e) => {
            ProviderError::IoError(std::io::Error::new(e.kind(), e.to_string()))
        }
    }
}

/// Create a mock ContainerInfo
pub fn mock_container_info(id: &str, name: &str, status: ContainerStatus) -> ContainerInfo {
    ContainerInfo {
        id: ContainerId::new(id),
        name: name.to_string(),
        image: "mock_image:latest".to_string(),
        status,
        ports: Vec::new(),
    }
}

/// Create a mock inspection record for a named container
pub fn mock_record(id: &str, name: &str, image: &str) -> ContainerConfigRecord {
    let mut record = ContainerConfigRecord::new(id, image);
    record.name = Some(format!("/{}", name));
    record.networks = vec!["bridge".to_string()];
    record
}

#[async_trait]
impl ContainerProvider for MockProvider {
    async fn list(&self, all: bool) -> Result<Vec<ContainerInfo>> {
        self.record(MockCall::List { all });
        self.list_entered.notify_one();

        let gate = self.list_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mut containers = clone_result(&self.list_result)?;
        containers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(containers)
    }

    async fn inspect(&self, id: &ContainerId) -> Result<ContainerConfigRecord> {
        self.record(MockCall::Inspect { id: id.0.clone() });
        match self.inspect_results.lock().unwrap().get(&id.0) {
            Some(result) => clone_ref_result(result),
            None => Err(ProviderError::ContainerNotFound(id.0.clone())),
        }
    }

    async fn start(&self, id: &ContainerId) -> Result<()> {
        self.record(MockCall::Start { id: id.0.clone() });
        clone_result(&self.start_result)
    }

    async fn stop(&self, id: &ContainerId, timeout: Option<u32>) -> Result<()> {
        self.record(MockCall::Stop {
            id: id.0.clone(),
            timeout,
        });
        clone_result(&self.stop_result)
    }

    async fn remove(&self, id: &ContainerId, force: bool) -> Result<()> {
        self.record(MockCall::Remove {
            id: id.0.clone(),
            force,
        });
        clone_result(&self.remove_result)
    }

    async fn exec_probe(&self, id: &ContainerId, shell: &str) -> Result<i64> {
        self.record(MockCall::ExecProbe {
            id: id.0.clone(),
            shell: shell.to_string(),
        });
        match self.probe_results.lock().unwrap().get(shell) {
            Some(result) => clone_ref_result(result),
            None => Ok(127),
        }
    }

    async fn logs(&self, id: &ContainerId, _config: &LogConfig) -> Result<LogStream> {
        self.record(MockCall::Logs { id: id.0.clone() });
        let output = self.logs_output.lock().unwrap().clone();
        Ok(LogStream {
            stream: Box::pin(std::io::Cursor::new(output.into_bytes())),
        })
    }

    async fn ping(&self) -> Result<()> {
        self.record(MockCall::Ping);
        clone_result(&self.ping_result)
    }

    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            provider_type: self.provider_type,
            api_version: "mock".to_string(),
        }
    }
}

/// Spawner that records what would have been started
#[derive(Clone, Default)]
pub struct RecordingSpawner {
    pub spawned: Arc<Mutex<Vec<(String, Vec<String>)>>>,
    /// When set, spawning fails with this error kind
    pub fail_with: Arc<Mutex<Option<std::io::ErrorKind>>>,
}

impl RecordingSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawned(&self) -> Vec<(String, Vec<String>)> {
        self.spawned.lock().unwrap().clone()
    }

    pub fn fail_with(&self, kind: std::io::ErrorKind) {
        *self.fail_with.lock().unwrap() = Some(kind);
    }
}

impl ProcessSpawner for RecordingSpawner {
    fn spawn_detached(&self, program: &str, args: &[String]) -> std::io::Result<()> {
        if let Some(kind) = *self.fail_with.lock().unwrap() {
            return Err(std::io::Error::new(kind, format!("cannot spawn {}", program)));
        }
        self.spawned
            .lock()
            .unwrap()
            .push((program.to_string(), args.to_vec()));
        Ok(())
    }
}
