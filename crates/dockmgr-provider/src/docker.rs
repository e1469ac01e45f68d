//! Docker provider implementation using bollard

use crate::{
    ContainerConfigRecord, ContainerId, ContainerInfo, ContainerProvider, ContainerStatus,
    HostBinding, LogConfig, LogStream, PortBindings, ProviderError, ProviderInfo, ProviderType,
    PublishedPort, Result,
};
use async_trait::async_trait;
use bollard::container::{
    ListContainersOptions, LogOutput, LogsOptions, RemoveContainerOptions, StartContainerOptions,
    StopContainerOptions,
};
use bollard::exec::{CreateExecOptions, StartExecOptions, StartExecResults};
use bollard::models::{ContainerInspectResponse, ContainerSummary, PortMap, PortTypeEnum};
use bollard::Docker;
use futures::StreamExt;
use std::pin::Pin;
use std::time::Duration;
use tokio::io::AsyncRead;

/// Docker provider using bollard crate
pub struct DockerProvider {
    client: Docker,
    provider_type: ProviderType,
}

impl DockerProvider {
    /// Create a new Docker provider
    pub async fn new(socket_path: &str) -> Result<Self> {
        let client = if socket_path.starts_with("http://") || socket_path.starts_with("https://") {
            Docker::connect_with_http(socket_path, 120, bollard::API_DEFAULT_VERSION)
                .map_err(|e| ProviderError::ConnectionError(e.to_string()))?
        } else {
            let path = socket_path.trim_start_matches("unix://");
            Docker::connect_with_socket(path, 120, bollard::API_DEFAULT_VERSION)
                .map_err(|e| ProviderError::ConnectionError(e.to_string()))?
        };

        // Test connection
        client
            .ping()
            .await
            .map_err(|e| ProviderError::ConnectionError(e.to_string()))?;

        tracing::debug!("Connected to container engine at {}", socket_path);

        Ok(Self {
            client,
            provider_type: ProviderType::Docker,
        })
    }

    /// Create a new provider for Podman (uses Docker-compatible API)
    pub async fn new_podman(socket_path: &str) -> Result<Self> {
        let mut provider = Self::new(socket_path).await?;
        provider.provider_type = ProviderType::Podman;
        Ok(provider)
    }
}

#[async_trait]
impl ContainerProvider for DockerProvider {
    async fn list(&self, all: bool) -> Result<Vec<ContainerInfo>> {
        let options = ListContainersOptions::<String> {
            all,
            ..Default::default()
        };

        let summaries = self.client.list_containers(Some(options)).await?;

        let mut containers: Vec<ContainerInfo> =
            summaries.into_iter().map(container_info_from_summary).collect();
        containers.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(containers)
    }

    async fn inspect(&self, id: &ContainerId) -> Result<ContainerConfigRecord> {
        let info = self.client.inspect_container(&id.0, None).await?;
        Ok(config_record_from_inspect(id, info))
    }

    async fn start(&self, id: &ContainerId) -> Result<()> {
        self.client
            .start_container(&id.0, None::<StartContainerOptions<String>>)
            .await?;
        Ok(())
    }

    async fn stop(&self, id: &ContainerId, timeout: Option<u32>) -> Result<()> {
        let options = StopContainerOptions {
            t: timeout.unwrap_or(10) as i64,
        };
        self.client.stop_container(&id.0, Some(options)).await?;
        Ok(())
    }

    async fn remove(&self, id: &ContainerId, force: bool) -> Result<()> {
        let options = RemoveContainerOptions {
            force,
            ..Default::default()
        };
        self.client.remove_container(&id.0, Some(options)).await?;
        Ok(())
    }

    async fn exec_probe(&self, id: &ContainerId, shell: &str) -> Result<i64> {
        let options = CreateExecOptions {
            cmd: Some(vec![
                shell.to_string(),
                "-c".to_string(),
                "exit 0".to_string(),
            ]),
            attach_stdout: Some(false),
            attach_stderr: Some(true),
            ..Default::default()
        };

        let exec = self.client.create_exec(&id.0, options).await?;

        let start_options = StartExecOptions {
            detach: false,
            ..Default::default()
        };

        match self.client.start_exec(&exec.id, Some(start_options)).await? {
            StartExecResults::Attached { mut output, .. } => {
                while let Some(chunk) = output.next().await {
                    if let Ok(LogOutput::StdErr { message }) = chunk {
                        tracing::debug!("{} probe: {}", shell, String::from_utf8_lossy(&message).trim());
                    }
                }
            }
            StartExecResults::Detached => {
                return Err(ProviderError::ExecError(
                    "Exec started in detached mode".to_string(),
                ));
            }
        }

        // The exit code can lag a moment behind the end of the output stream
        for _ in 0..10 {
            let inspect = self.client.inspect_exec(&exec.id).await?;
            if inspect.running != Some(true) {
                return Ok(inspect.exit_code.unwrap_or(-1));
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        Err(ProviderError::ExecError(format!(
            "{} probe did not finish",
            shell
        )))
    }

    async fn logs(&self, id: &ContainerId, config: &LogConfig) -> Result<LogStream> {
        let options = LogsOptions {
            follow: config.follow,
            stdout: true,
            stderr: true,
            tail: config
                .tail
                .map(|t| t.to_string())
                .unwrap_or_else(|| "all".to_string()),
            timestamps: config.timestamps,
            since: 0,
            until: 0,
        };

        let stream = self.client.logs(&id.0, Some(options));
        let reader = LogOutputReader::new(stream);

        Ok(LogStream {
            stream: Box::pin(reader),
        })
    }

    async fn ping(&self) -> Result<()> {
        self.client
            .ping()
            .await
            .map_err(|e| ProviderError::ConnectionError(e.to_string()))?;
        Ok(())
    }

    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            provider_type: self.provider_type,
            api_version: bollard::API_DEFAULT_VERSION.to_string(),
        }
    }
}

fn container_info_from_summary(c: ContainerSummary) -> ContainerInfo {
    let mut ports: Vec<PublishedPort> = c
        .ports
        .unwrap_or_default()
        .into_iter()
        .map(|p| PublishedPort {
            host_ip: p.ip.filter(|ip| !ip.is_empty()),
            host_port: p.public_port,
            container_port: p.private_port,
            protocol: match p.typ {
                Some(PortTypeEnum::UDP) => "udp",
                Some(PortTypeEnum::SCTP) => "sctp",
                _ => "tcp",
            }
            .to_string(),
        })
        .collect();
    ports.sort_by(|a, b| {
        (a.container_port, &a.protocol, a.host_port, &a.host_ip)
            .cmp(&(b.container_port, &b.protocol, b.host_port, &b.host_ip))
    });

    ContainerInfo {
        id: ContainerId::new(c.id.unwrap_or_default()),
        name: c
            .names
            .and_then(|n| n.first().cloned())
            .unwrap_or_default()
            .trim_start_matches('/')
            .to_string(),
        image: c.image.unwrap_or_default(),
        status: c
            .state
            .as_deref()
            .map(ContainerStatus::from)
            .unwrap_or(ContainerStatus::Unknown),
        ports,
    }
}

/// Convert an inspection payload into a typed record.
///
/// Port and network maps arrive as hash maps; they are re-sorted by key,
/// which is the order the engine itself serializes them in.
pub(crate) fn config_record_from_inspect(
    id: &ContainerId,
    info: ContainerInspectResponse,
) -> ContainerConfigRecord {
    let config = info.config.unwrap_or_default();
    let host_config = info.host_config.unwrap_or_default();
    let network_settings = info.network_settings.unwrap_or_default();

    let mut networks: Vec<String> = network_settings
        .networks
        .map(|nets| nets.into_keys().collect())
        .unwrap_or_default();
    networks.sort();

    ContainerConfigRecord {
        id: id.clone(),
        name: info.name.filter(|n| !n.is_empty()),
        image: config.image.unwrap_or_default(),
        command: config.cmd,
        auto_remove: host_config.auto_remove.unwrap_or(false),
        live_ports: network_settings.ports.map(port_bindings_from_map),
        declared_ports: host_config.port_bindings.map(port_bindings_from_map),
        binds: host_config.binds.unwrap_or_default(),
        networks,
    }
}

fn port_bindings_from_map(map: PortMap) -> Vec<PortBindings> {
    let mut ports: Vec<PortBindings> = map
        .into_iter()
        .map(|(container_port, bindings)| PortBindings {
            container_port,
            bindings: bindings.map(|list| {
                list.into_iter()
                    .map(|b| HostBinding {
                        host_ip: b.host_ip.filter(|ip| !ip.is_empty()),
                        host_port: b.host_port.filter(|port| !port.is_empty()),
                    })
                    .collect()
            }),
        })
        .collect();
    ports.sort_by(|a, b| a.container_port.cmp(&b.container_port));
    ports
}

/// Reader that converts log output stream to AsyncRead
struct LogOutputReader<S> {
    stream: S,
    buffer: Vec<u8>,
    pos: usize,
}

impl<S> LogOutputReader<S> {
    fn new(stream: S) -> Self {
        Self {
            stream,
            buffer: Vec::new(),
            pos: 0,
        }
    }
}

impl<S> AsyncRead for LogOutputReader<S>
where
    S: futures::Stream<Item = std::result::Result<LogOutput, bollard::errors::Error>> + Unpin,
{
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        // If we have buffered data, return it first
        if self.pos < self.buffer.len() {
            let remaining = &self.buffer[self.pos..];
            let to_copy = std::cmp::min(remaining.len(), buf.remaining());
            buf.put_slice(&remaining[..to_copy]);
            self.pos += to_copy;
            return std::task::Poll::Ready(Ok(()));
        }

        self.buffer.clear();
        self.pos = 0;

        match Pin::new(&mut self.stream).poll_next(cx) {
            std::task::Poll::Ready(Some(Ok(output))) => {
                let data = match output {
                    LogOutput::StdOut { message } => message,
                    LogOutput::StdErr { message } => message,
                    LogOutput::StdIn { message } => message,
                    LogOutput::Console { message } => message,
                };
                self.buffer = data.to_vec();

                let to_copy = std::cmp::min(self.buffer.len(), buf.remaining());
                buf.put_slice(&self.buffer[..to_copy]);
                self.pos = to_copy;
                std::task::Poll::Ready(Ok(()))
            }
            std::task::Poll::Ready(Some(Err(e))) => {
                std::task::Poll::Ready(Err(std::io::Error::other(e.to_string())))
            }
            std::task::Poll::Ready(None) => std::task::Poll::Ready(Ok(())),
            std::task::Poll::Pending => std::task::Poll::Pending,
        }
    }
}
