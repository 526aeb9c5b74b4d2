//! Facade grouping the container, image and network operations over a
//! single engine handle.

use crate::container::client::{ContainerClient, ContainerClientConfig};
use crate::container::engine::Engine;
use crate::container::image::ImageOperations;
use crate::container::network::NetworkOperations;
use crate::container::orchestrator::{ContainerOperations, OrchestratorConfig};
use crate::container::{ContainerError, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Container, image and network operations sharing one engine connection.
#[derive(Clone)]
pub struct Toolkit {
    pub containers: ContainerOperations,
    pub images: ImageOperations,
    pub networks: NetworkOperations,
}

impl Toolkit {
    /// Connect to the container runtime and build a toolkit over it.
    ///
    /// # Errors
    ///
    /// Returns error if connection to container runtime fails.
    pub async fn connect(config: &ContainerClientConfig) -> Result<Self> {
        let client = ContainerClient::with_config(config.clone()).await?;
        Ok(Self::with_engine(Arc::new(client)))
    }

    /// Build a toolkit over any engine, using default lifecycle settings.
    pub fn with_engine(engine: Arc<dyn Engine>) -> Self {
        Self::with_config(engine, OrchestratorConfig::default())
    }

    pub fn with_config(engine: Arc<dyn Engine>, config: OrchestratorConfig) -> Self {
        Self {
            containers: ContainerOperations::with_config(engine.clone(), config),
            images: ImageOperations::new(engine.clone()),
            networks: NetworkOperations::new(engine),
        }
    }
}

/// Run `operation` under a deadline.
///
/// When the deadline expires the pending engine call is dropped and
/// [`ContainerError::Cancelled`] is returned. Nothing is retried.
///
/// # Errors
///
/// Returns the operation's own error, or `Cancelled` on expiry.
pub async fn with_deadline<T, F>(deadline: Duration, operation: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(deadline, operation)
        .await
        .map_err(|_| {
            ContainerError::Cancelled(format!("deadline of {:?} exceeded", deadline))
        })?
}
