//! Container engine convenience layer.
//!
//! This module wraps the Docker/Podman API (via bollard) with idempotent
//! lifecycle operations: start-or-replace by name, stop with log draining,
//! removal, image pull/build and network find-or-create.
//!
//! ## Architecture
//!
//! - [`engine`]: the [`Engine`] trait, the only seam to the remote daemon
//! - [`client`]: bollard-backed [`Engine`] with connection management
//! - [`options`]: start/build option values and their engine translations
//! - [`orchestrator`]: container lifecycle (resolve, start, stop, remove)
//! - [`image`]: image pull and build with in-band error detection
//! - [`network`]: network find-or-create
//! - [`logs`]: stdout/stderr log demultiplexing with per-line prefixes
//! - [`context`]: build context archiving
//! - [`toolkit`]: facade grouping the operation sets over one engine handle
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dockhand::container::{ContainerClientConfig, StartOptions, Toolkit};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let toolkit = Toolkit::connect(&ContainerClientConfig::default()).await?;
//!
//!     let network = toolkit.networks.create("simple-api-integration").await?;
//!     let image = toolkit.images.build("simple-api", "./", &Default::default()).await?;
//!
//!     let options = StartOptions::builder()
//!         .name("simple-api")
//!         .port_binding(10000, 10000, "tcp")
//!         .build();
//!     let container = toolkit.containers.start(&image, Some(&network), &options).await?;
//!
//!     // ... exercise the service ...
//!
//!     container.stop(true).await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod context;
pub mod engine;
pub mod image;
pub mod logs;
pub mod network;
pub mod options;
pub mod orchestrator;
pub mod toolkit;

#[cfg(test)]
pub(crate) mod fake;

pub use client::{ContainerClient, ContainerClientConfig, RuntimeType};
pub use engine::{
    BuildRequest, ContainerSnapshot, CreateRequest, Engine, EngineStream, NetworkSummary,
};
pub use image::{Image, ImageOperations, inspect_build_line};
pub use logs::{ContainerLogWriter, demux_logs, print_container_logs};
pub use network::{Network, NetworkOperations};
pub use options::{BuildOptions, BuildOptionsBuilder, Platform, StartOptions, StartOptionsBuilder};
pub use orchestrator::{Container, ContainerOperations, OrchestratorConfig};
pub use toolkit::{Toolkit, with_deadline};

/// Container runtime errors.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    /// Docker/Podman API error
    #[error("Container API error: {0}")]
    ApiError(#[from] bollard::errors::Error),

    /// Container, image or network not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed caller-supplied option (port spec, platform string)
    #[error("Invalid option: {0}")]
    ValidationError(String),

    /// Image build failure reported in-band by the engine
    #[error("Failed to build image: {0}")]
    BuildError(String),

    /// Network error
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The caller's deadline expired before the engine answered
    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// General error
    #[error("Container error: {0}")]
    Other(String),
}

impl ContainerError {
    /// Whether this error means the target resource does not exist (anymore).
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ContainerError::NotFound(_)
                | ContainerError::ApiError(bollard::errors::Error::DockerResponseServerError {
                    status_code: 404,
                    ..
                })
        )
    }
}

impl ContainerError {
    /// The message of an error the engine reported inside a progress stream.
    pub fn stream_error(&self) -> Option<&str> {
        match self {
            ContainerError::ApiError(bollard::errors::Error::DockerStreamError { error }) => {
                Some(error)
            }
            _ => None,
        }
    }
}

/// Result type for container operations.
pub type Result<T> = std::result::Result<T, ContainerError>;
