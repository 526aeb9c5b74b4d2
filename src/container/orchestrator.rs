//! Container lifecycle orchestration.
//!
//! Containers are started with auto-removal enabled, so the engine deletes
//! them the moment they stop. Every operation here therefore treats a
//! container that is already gone (or on its way out) as success, and log
//! capture is strictly sequenced before the stop request that would make the
//! logs unreachable.

use crate::container::engine::{CreateRequest, Engine};
use crate::container::image::Image;
use crate::container::logs::print_container_logs;
use crate::container::network::Network;
use crate::container::options::StartOptions;
use crate::container::Result;
use bollard::container::LogOutput;
use bollard::models::{ContainerCreateBody, HostConfig};
use futures::stream::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Container orchestrator configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Seconds the engine waits for a graceful stop before killing the
    /// container; `None` uses the engine default.
    pub stop_timeout: Option<i32>,
}

/// Handle to a started container.
#[derive(Clone)]
pub struct Container {
    /// Container ID
    pub id: String,
    /// Name the container was started under, the image name when unnamed.
    ///
    /// An unnamed start from an image reference the engine rejects as a
    /// container name (`alpine:3.20`) lets the engine pick the name, so
    /// there `name` is a label only and [`ContainerOperations::find`] will
    /// not locate the container by it.
    pub name: String,
    engine: Arc<dyn Engine>,
    stop_timeout: Option<i32>,
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Container {
    /// Stop the container, printing its output first when `capture_logs` is set.
    ///
    /// Stopping a container that no longer exists, or that the engine is
    /// already removing, succeeds without contacting the engine again.
    ///
    /// # Errors
    ///
    /// Returns error if inspection or the stop request fails.
    pub async fn stop(&self, capture_logs: bool) -> Result<()> {
        stop_container(
            self.engine.as_ref(),
            &self.id,
            &self.name,
            capture_logs,
            self.stop_timeout,
        )
        .await
    }
}

/// Container lifecycle operations over a shared engine handle.
#[derive(Clone)]
pub struct ContainerOperations {
    engine: Arc<dyn Engine>,
    config: OrchestratorConfig,
}

impl ContainerOperations {
    /// Create container operations with default configuration.
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self::with_config(engine, OrchestratorConfig::default())
    }

    /// Create container operations with custom configuration.
    pub fn with_config(engine: Arc<dyn Engine>, config: OrchestratorConfig) -> Self {
        Self { engine, config }
    }

    /// Find the ID of the container called `name`, stopped ones included.
    ///
    /// # Errors
    ///
    /// Returns error if listing fails.
    pub async fn resolve_id_by_name(&self, name: &str) -> Result<Option<String>> {
        let canonical = format!("/{}", name);
        let containers = self.engine.list_containers().await?;

        Ok(containers
            .into_iter()
            .find(|c| c.names.iter().flatten().any(|n| *n == canonical))
            .and_then(|c| c.id))
    }

    /// Get a handle to an existing container by name.
    ///
    /// # Errors
    ///
    /// Returns error if listing fails.
    pub async fn find(&self, name: &str) -> Result<Option<Container>> {
        Ok(self
            .resolve_id_by_name(name)
            .await?
            .map(|id| self.handle(id, name.to_string())))
    }

    /// Start a container from `image`, optionally attached to `network`.
    ///
    /// A named start replaces any existing container with that name.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::ValidationError`](crate::container::ContainerError::ValidationError) for malformed port or
    /// platform options (before any engine state is touched), or the engine
    /// error if replacing, creating or starting the container fails.
    pub async fn start(
        &self,
        image: &Image,
        network: Option<&Network>,
        options: &StartOptions,
    ) -> Result<Container> {
        let (exposed_ports, port_bindings) = options.ports()?;
        let platform = options.platform()?;

        let name = options.name().unwrap_or(&image.name).to_string();
        let hostname = match options.name() {
            Some(explicit) => explicit.to_string(),
            None => hostname_for(&image.name),
        };

        if let Some(explicit) = options.name() {
            match self.remove_by_name(explicit, false).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {
                    debug!(container = %explicit, "Nothing to replace: {}", e);
                }
                Err(e) => return Err(e),
            }
        }

        let capabilities = options.capabilities();
        let body = ContainerCreateBody {
            image: Some(image.name.clone()),
            hostname: Some(hostname),
            exposed_ports: Some(exposed_ports),
            env: Some(options.environment_variables()),
            tty: Some(false),
            host_config: Some(HostConfig {
                auto_remove: Some(true),
                port_bindings: Some(port_bindings),
                cap_add: (!capabilities.is_empty()).then(|| capabilities.to_vec()),
                network_mode: network.map(|n| n.id.clone()),
                ..Default::default()
            }),
            ..Default::default()
        };

        debug!(container = %name, "Creating container from {}", image.name);
        let id = self
            .engine
            .create_container(CreateRequest {
                name: is_container_name(&name).then(|| name.clone()),
                platform,
                body,
            })
            .await?;
        info!(container = %name, "Created container: {}", id);

        self.engine.start_container(&id).await?;
        info!(container = %name, "Started container: {}", id);

        Ok(self.handle(id, name))
    }

    /// Stop and remove the container called `name`, if there is one.
    ///
    /// # Errors
    ///
    /// Returns error if listing, stopping or removing fails. A container the
    /// engine has already removed is not an error.
    pub async fn remove_by_name(&self, name: &str, capture_logs: bool) -> Result<()> {
        let Some(id) = self.resolve_id_by_name(name).await? else {
            debug!(container = %name, "No container to remove");
            return Ok(());
        };

        stop_container(
            self.engine.as_ref(),
            &id,
            name,
            capture_logs,
            self.config.stop_timeout,
        )
        .await?;

        match self.engine.remove_container(&id).await {
            Ok(()) => info!(container = %name, "Removed container: {}", id),
            Err(e) if e.is_not_found() => {
                debug!(container = %name, "Container {} already removed by the engine", id);
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    fn handle(&self, id: String, name: String) -> Container {
        Container {
            id,
            name,
            engine: self.engine.clone(),
            stop_timeout: self.config.stop_timeout,
        }
    }
}

async fn stop_container(
    engine: &dyn Engine,
    id: &str,
    name: &str,
    capture_logs: bool,
    timeout: Option<i32>,
) -> Result<()> {
    let snapshot = match engine.inspect_container(id).await {
        Ok(snapshot) if snapshot.is_removing() => {
            debug!(container = %name, "Container is already being removed");
            return Ok(());
        }
        Ok(snapshot) => snapshot,
        Err(e) if e.is_not_found() => {
            debug!(container = %name, "Container is already gone");
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    // Auto-removal discards the logs once the stop completes.
    if capture_logs && snapshot.running {
        let logs = collect_logs(engine, id, name).await;
        print_container_logs(name, logs);
    }

    debug!(container = %name, "Stopping container: {}", id);
    match engine.stop_container(id, timeout).await {
        Ok(()) => {}
        Err(e) if e.is_not_found() => {
            debug!(container = %name, "Container vanished before it could be stopped");
            return Ok(());
        }
        Err(e) => {
            error!(container = %name, "Failed to stop container: {}", e);
            return Err(e);
        }
    }

    match engine.wait_container(id).await {
        Ok(code) => info!(container = %name, exit_code = code, "Stopped container: {}", id),
        Err(e) if e.is_not_found() => {
            info!(container = %name, "Stopped container: {}", id);
        }
        Err(e) => warn!(container = %name, "Failed waiting for container to stop: {}", e),
    }
    Ok(())
}

/// Drain the container's existing output. A fetch error keeps what arrived.
async fn collect_logs(engine: &dyn Engine, id: &str, name: &str) -> Vec<LogOutput> {
    let mut chunks = Vec::new();
    let mut stream = engine.container_logs(id);
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(chunk) => chunks.push(chunk),
            Err(e) => {
                warn!(container = %name, "Failed to fetch container logs: {}", e);
                break;
            }
        }
    }
    chunks
}

/// Whether the engine accepts `name` as a container name
/// (`[a-zA-Z0-9][a-zA-Z0-9_.-]+`).
fn is_container_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphanumeric())
        && name.len() > 1
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

/// RFC 1123 hostname label derived from an image reference.
fn hostname_for(name: &str) -> String {
    let label: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '-' })
        .collect();
    let label = label.trim_matches(|c| c == '-' || c == '.');
    if label.is_empty() {
        "container".to_string()
    } else {
        label.chars().take(63).collect()
    }
}
