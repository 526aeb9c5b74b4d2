//! Container network reconciliation.
//!
//! Networks are looked up by exact name over the full listing and created
//! (attachable) only when absent.

use crate::container::engine::Engine;
use crate::container::{ContainerError, Result};
use std::sync::Arc;
use tracing::{debug, info};

/// A network containers can be attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    /// Network ID
    pub id: String,
}

/// Network operations over a shared engine handle.
#[derive(Clone)]
pub struct NetworkOperations {
    engine: Arc<dyn Engine>,
}

impl NetworkOperations {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self { engine }
    }

    /// Look up a network by exact name.
    ///
    /// # Errors
    ///
    /// Returns error if listing fails.
    pub async fn find(&self, name: &str) -> Result<Option<Network>> {
        let networks = self.engine.list_networks().await?;
        Ok(networks
            .into_iter()
            .find(|n| n.name == name)
            .map(|n| Network { id: n.id }))
    }

    /// Return the network called `name`, creating it if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns error if listing fails, or [`ContainerError::NetworkError`]
    /// if the engine refuses to create the network.
    pub async fn create(&self, name: &str) -> Result<Network> {
        if let Some(network) = self.find(name).await? {
            debug!("Network {} already exists ({})", name, network.id);
            return Ok(network);
        }

        let id = self.engine.create_network(name).await.map_err(|e| {
            ContainerError::NetworkError(format!("failed to create network {}: {}", name, e))
        })?;
        info!("Created network: {} ({})", name, id);

        Ok(Network { id })
    }
}
