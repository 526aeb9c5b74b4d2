//! Docker/Podman client wrapper.
//!
//! Provides the bollard-backed [`Engine`] implementation with automatic
//! connection handling, fallback strategies, and health checking.

use crate::container::engine::{
    BuildRequest, ContainerSnapshot, CreateRequest, Engine, EngineStream, NetworkSummary,
};
use crate::container::{ContainerError, Result};
use async_trait::async_trait;
use bollard::Docker;
use bollard::container::LogOutput;
use bollard::models::{BuildInfo, ContainerSummary, CreateImageInfo};
use bollard::query_parameters::{
    BuildImageOptionsBuilder, CreateContainerOptionsBuilder, CreateImageOptionsBuilder,
    InspectContainerOptions, ListContainersOptionsBuilder, LogsOptionsBuilder,
    RemoveContainerOptionsBuilder, StartContainerOptions, StopContainerOptionsBuilder,
    WaitContainerOptionsBuilder,
};
use futures::stream::{StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Container client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerClientConfig {
    /// Explicit daemon endpoint (`unix://...`, `tcp://...` or `http://...`).
    /// When unset the environment and well-known sockets are tried.
    pub host: Option<String>,
    /// Request timeout in seconds
    pub timeout: u64,
}

impl Default for ContainerClientConfig {
    fn default() -> Self {
        Self {
            host: None,
            timeout: 120,
        }
    }
}

/// Docker/Podman API client wrapper.
///
/// Manages connection to Docker or Podman daemon with automatic fallback
/// and health checking.
#[derive(Clone)]
pub struct ContainerClient {
    docker: Arc<Docker>,
    config: ContainerClientConfig,
}

impl std::fmt::Debug for ContainerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ContainerClient {
    /// Create a new container client with default configuration.
    ///
    /// Attempts to connect to Docker first, then falls back to Podman if available.
    ///
    /// # Errors
    ///
    /// Returns error if neither Docker nor Podman are available or connection fails.
    pub async fn new() -> Result<Self> {
        Self::with_config(ContainerClientConfig::default()).await
    }

    /// Create a new container client with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns error if connection to container runtime fails.
    pub async fn with_config(config: ContainerClientConfig) -> Result<Self> {
        let docker = Self::connect(&config).await?;

        let client = Self {
            docker: Arc::new(docker),
            config,
        };

        // Verify connection works
        client.ping().await?;

        Ok(client)
    }

    /// Connect to Docker or Podman daemon.
    ///
    /// Tries multiple connection strategies in order:
    /// 1. Configured host
    /// 2. Environment defaults (DOCKER_HOST, Unix socket or Windows named pipe)
    /// 3. Podman sockets (rootless, then system)
    async fn connect(config: &ContainerClientConfig) -> Result<Docker> {
        debug!("Attempting to connect to container runtime...");

        let docker = match Self::connect_configured(config)? {
            Some(docker) => docker,
            None => Self::connect_fallback(config.timeout)?,
        };

        docker.negotiate_version().await.map_err(|e| {
            ContainerError::Other(format!(
                "Failed to negotiate API version with container runtime: {}",
                e
            ))
        })
    }

    fn connect_configured(config: &ContainerClientConfig) -> Result<Option<Docker>> {
        let Some(host) = config.host.as_deref() else {
            return Ok(None);
        };

        debug!("Connecting to configured host: {}", host);
        let docker = if host.starts_with("unix://") {
            Docker::connect_with_socket(host, config.timeout, bollard::API_DEFAULT_VERSION)
        } else if host.starts_with("tcp://") || host.starts_with("http://") {
            Docker::connect_with_http(host, config.timeout, bollard::API_DEFAULT_VERSION)
        } else {
            return Err(ContainerError::ConfigError(format!(
                "unsupported container host '{}': expected unix://, tcp:// or http://",
                host
            )));
        };

        let docker = docker.map_err(|e| {
            ContainerError::Other(format!("Failed to connect to {}: {}", host, e))
        })?;
        info!("Connected to container runtime at {}", host);
        Ok(Some(docker))
    }

    #[cfg_attr(not(unix), allow(unused_variables))]
    fn connect_fallback(timeout: u64) -> Result<Docker> {
        match Docker::connect_with_defaults() {
            Ok(docker) => {
                info!("Connected to container runtime via environment defaults");
                return Ok(docker);
            }
            Err(e) => {
                debug!("Environment defaults failed: {}", e);
            }
        }

        #[cfg(unix)]
        {
            let mut sockets = Vec::new();
            if let Ok(home) = std::env::var("HOME") {
                sockets.push(format!("unix://{}/run/podman/podman.sock", home));
            }
            if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
                sockets.push(format!("unix://{}/podman/podman.sock", runtime_dir));
            }
            sockets.push("unix:///run/podman/podman.sock".to_string());

            for socket in sockets {
                debug!("Trying Podman socket: {}", socket);
                match Docker::connect_with_socket(&socket, timeout, bollard::API_DEFAULT_VERSION) {
                    Ok(docker) => {
                        info!("Connected to Podman via {}", socket);
                        return Ok(docker);
                    }
                    Err(e) => {
                        debug!("Podman socket {} failed: {}", socket, e);
                    }
                }
            }
        }

        Err(ContainerError::Other(
            "Failed to connect to Docker or Podman. Please ensure Docker or Podman is installed and running.".to_string()
        ))
    }

    /// Ping the container runtime to verify connectivity.
    ///
    /// # Errors
    ///
    /// Returns error if ping fails.
    pub async fn ping(&self) -> Result<()> {
        self.docker.ping().await.map_err(|e| {
            ContainerError::Other(format!("Failed to ping container runtime: {}", e))
        })?;
        debug!("Container runtime ping successful");
        Ok(())
    }

    /// Get version information from the container runtime.
    ///
    /// # Errors
    ///
    /// Returns error if version query fails.
    pub async fn version(&self) -> Result<bollard::models::SystemVersion> {
        self.docker
            .version()
            .await
            .map_err(|e| ContainerError::Other(format!("Failed to get version: {}", e)))
    }

    /// Check if the runtime is Docker or Podman.
    ///
    /// # Errors
    ///
    /// Returns error if runtime detection fails.
    pub async fn runtime_type(&self) -> Result<RuntimeType> {
        let version = self.version().await?;
        Ok(RuntimeType::detect(&version))
    }

    /// Configuration this client was connected with.
    pub fn config(&self) -> &ContainerClientConfig {
        &self.config
    }
}

/// Map a bollard error, turning a 404 into [`ContainerError::NotFound`].
fn not_found_or(e: bollard::errors::Error, what: &str) -> ContainerError {
    match e {
        bollard::errors::Error::DockerResponseServerError {
            status_code: 404, ..
        } => ContainerError::NotFound(what.to_string()),
        e => ContainerError::ApiError(e),
    }
}

#[async_trait]
impl Engine for ContainerClient {
    async fn list_containers(&self) -> Result<Vec<ContainerSummary>> {
        let options = ListContainersOptionsBuilder::new().all(true).build();
        Ok(self.docker.list_containers(Some(options)).await?)
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerSnapshot> {
        let inspect = self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await
            .map_err(|e| not_found_or(e, id))?;

        let state = inspect.state.unwrap_or_default();
        Ok(ContainerSnapshot {
            id: inspect.id.unwrap_or_else(|| id.to_string()),
            status: state.status,
            running: state.running.unwrap_or(false),
        })
    }

    fn container_logs<'a>(&'a self, id: &'a str) -> EngineStream<'a, LogOutput> {
        let options = LogsOptionsBuilder::new()
            .stdout(true)
            .stderr(true)
            .follow(false)
            .build();
        self.docker
            .logs(id, Some(options))
            .map_err(move |e| not_found_or(e, id))
            .boxed()
    }

    async fn create_container(&self, request: CreateRequest) -> Result<String> {
        let platform = request.platform.map(|p| p.to_string());
        let mut options = CreateContainerOptionsBuilder::new();
        if let Some(name) = request.name.as_deref() {
            options = options.name(name);
        }
        if let Some(platform) = platform.as_deref() {
            options = options.platform(platform);
        }
        let label = request.name.unwrap_or_default();

        let response = self
            .docker
            .create_container(Some(options.build()), request.body)
            .await?;
        for warning in &response.warnings {
            debug!("Engine warning creating {}: {}", label, warning);
        }
        Ok(response.id)
    }

    async fn start_container(&self, id: &str) -> Result<()> {
        self.docker
            .start_container(id, None::<StartContainerOptions>)
            .await
            .map_err(|e| not_found_or(e, id))
    }

    async fn stop_container(&self, id: &str, timeout: Option<i32>) -> Result<()> {
        let mut options = StopContainerOptionsBuilder::new();
        if let Some(t) = timeout {
            options = options.t(t);
        }
        self.docker
            .stop_container(id, Some(options.build()))
            .await
            .map_err(|e| not_found_or(e, id))
    }

    async fn wait_container(&self, id: &str) -> Result<i64> {
        let options = WaitContainerOptionsBuilder::new()
            .condition("not-running")
            .build();
        let mut stream = self.docker.wait_container(id, Some(options));

        match stream.next().await {
            Some(Ok(response)) => Ok(response.status_code),
            // A non-zero exit arrives as an error carrying the code.
            Some(Err(bollard::errors::Error::DockerContainerWaitError { code, .. })) => Ok(code),
            Some(Err(e)) => Err(not_found_or(e, id)),
            None => Err(ContainerError::Other(format!(
                "wait stream for container {} closed unexpectedly",
                id
            ))),
        }
    }

    async fn remove_container(&self, id: &str) -> Result<()> {
        let options = RemoveContainerOptionsBuilder::new().v(true).build();
        self.docker
            .remove_container(id, Some(options))
            .await
            .map_err(|e| not_found_or(e, id))
    }

    fn pull_image<'a>(&'a self, reference: &'a str) -> EngineStream<'a, CreateImageInfo> {
        let options = CreateImageOptionsBuilder::new().from_image(reference).build();
        self.docker
            .create_image(Some(options), None, None)
            .map_err(move |e| not_found_or(e, reference))
            .boxed()
    }

    fn build_image<'a>(&'a self, request: BuildRequest) -> EngineStream<'a, String> {
        let mut options = BuildImageOptionsBuilder::new()
            .dockerfile(&request.dockerfile)
            .t(&request.tag)
            .rm(true);
        if let Some(platform) = request.platform.as_deref() {
            options = options.platform(platform);
        }

        self.docker
            .build_image(
                options.build(),
                None,
                Some(bollard::body_full(request.context.into())),
            )
            .map(|item| match item {
                Ok(info) => Ok(build_output_line(&info)),
                // bollard lifts in-band errors out of the stream; put them back
                // so callers see the same line the daemon sent.
                Err(bollard::errors::Error::DockerStreamError { error }) => {
                    Ok(serde_json::json!({ "error": error }).to_string())
                }
                Err(e) => Err(e.into()),
            })
            .boxed()
    }

    async fn list_networks(&self) -> Result<Vec<NetworkSummary>> {
        let networks = self
            .docker
            .list_networks(None::<bollard::network::ListNetworksOptions<String>>)
            .await?;

        Ok(networks
            .into_iter()
            .map(|n| NetworkSummary {
                id: n.id.unwrap_or_default(),
                name: n.name.unwrap_or_default(),
            })
            .collect())
    }

    async fn create_network(&self, name: &str) -> Result<String> {
        let response = self
            .docker
            .create_network(bollard::network::CreateNetworkOptions {
                name,
                attachable: true,
                ..Default::default()
            })
            .await?;
        Ok(response.id)
    }
}

/// Render one build progress message as a JSON line.
///
/// Only the fields a reader of the build log cares about are kept.
fn build_output_line(info: &BuildInfo) -> String {
    let mut line = serde_json::Map::new();
    let text_fields = [
        ("id", &info.id),
        ("stream", &info.stream),
        ("status", &info.status),
        ("progress", &info.progress),
        ("error", &info.error),
    ];
    for (key, value) in text_fields {
        if let Some(value) = value {
            line.insert(key.to_string(), serde_json::Value::String(value.clone()));
        }
    }
    if let Some(message) = info.error_detail.as_ref().and_then(|d| d.message.as_ref()) {
        line.insert(
            "errorDetail".to_string(),
            serde_json::json!({ "message": message }),
        );
    }
    serde_json::Value::Object(line).to_string()
}

/// Type of container runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeType {
    /// Docker runtime
    Docker,
    /// Podman runtime
    Podman,
}

impl RuntimeType {
    /// Classify a runtime from its version report.
    pub fn detect(version: &bollard::models::SystemVersion) -> Self {
        let is_podman = version
            .components
            .iter()
            .flatten()
            .any(|c| c.name.to_lowercase().contains("podman"));

        if is_podman {
            RuntimeType::Podman
        } else {
            RuntimeType::Docker
        }
    }
}

impl std::fmt::Display for RuntimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeType::Docker => write!(f, "Docker"),
            RuntimeType::Podman => write!(f, "Podman"),
        }
    }
}
