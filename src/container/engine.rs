//! Engine API seam.
//!
//! Every call the lifecycle, image and network operations make against the
//! remote daemon goes through [`Engine`]. The production implementation is
//! [`ContainerClient`](super::ContainerClient); tests substitute recording
//! doubles so call ordering can be asserted without a daemon.
//!
//! Implementations map the daemon's "404" answers to
//! [`ContainerError::NotFound`](super::ContainerError::NotFound).

use super::Result;
use super::options::Platform;
use async_trait::async_trait;
use bollard::container::LogOutput;
use bollard::models::{ContainerCreateBody, ContainerStateStatusEnum, ContainerSummary, CreateImageInfo};
use futures::stream::BoxStream;

/// Stream of engine results borrowed from the engine handle.
pub type EngineStream<'a, T> = BoxStream<'a, Result<T>>;

/// Observed engine-side state of a single container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerSnapshot {
    /// Container ID
    pub id: String,
    /// Engine-reported status (created, running, removing, exited, ...)
    pub status: Option<ContainerStateStatusEnum>,
    /// Whether the engine reports the container as running
    pub running: bool,
}

impl ContainerSnapshot {
    /// The engine is already tearing this container down.
    pub fn is_removing(&self) -> bool {
        self.status == Some(ContainerStateStatusEnum::REMOVING)
    }
}

/// A fully-translated container creation request.
#[derive(Debug, Clone, Default)]
pub struct CreateRequest {
    /// Container name; `None` lets the engine assign one
    pub name: Option<String>,
    /// Optional OS/architecture constraint
    pub platform: Option<Platform>,
    /// Engine creation body (image, env, ports, host config)
    pub body: ContainerCreateBody,
}

/// An image build submission.
#[derive(Debug, Clone, Default)]
pub struct BuildRequest {
    /// Tag applied to the resulting image
    pub tag: String,
    /// Dockerfile path relative to the context root
    pub dockerfile: String,
    /// Optional target platform ("os/arch")
    pub platform: Option<String>,
    /// Tar archive of the build context
    pub context: Vec<u8>,
}

/// Network as reported by the engine listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkSummary {
    /// Network ID
    pub id: String,
    /// Network name
    pub name: String,
}

/// Remote container engine operations.
#[async_trait]
pub trait Engine: Send + Sync {
    /// List every container, including stopped and exited ones.
    async fn list_containers(&self) -> Result<Vec<ContainerSummary>>;

    /// Inspect a container's current state.
    async fn inspect_container(&self, id: &str) -> Result<ContainerSnapshot>;

    /// Fetch the container's existing stdout/stderr without following.
    fn container_logs<'a>(&'a self, id: &'a str) -> EngineStream<'a, LogOutput>;

    /// Create a container, returning its ID.
    async fn create_container(&self, request: CreateRequest) -> Result<String>;

    /// Start a created container.
    async fn start_container(&self, id: &str) -> Result<()>;

    /// Ask the engine to stop a container, waiting at most `timeout` seconds
    /// before it is killed (`None` uses the engine default).
    async fn stop_container(&self, id: &str, timeout: Option<i32>) -> Result<()>;

    /// Block until the container is no longer running, returning its exit code.
    async fn wait_container(&self, id: &str) -> Result<i64>;

    /// Remove a container together with its anonymous volumes.
    async fn remove_container(&self, id: &str) -> Result<()>;

    /// Pull an image, yielding the engine's progress entries.
    fn pull_image<'a>(&'a self, reference: &'a str) -> EngineStream<'a, CreateImageInfo>;

    /// Build an image, yielding the raw JSON build-output lines.
    fn build_image<'a>(&'a self, request: BuildRequest) -> EngineStream<'a, String>;

    /// List all networks.
    async fn list_networks(&self) -> Result<Vec<NetworkSummary>>;

    /// Create an attachable network, returning its ID.
    async fn create_network(&self, name: &str) -> Result<String>;
}
