//! # dockhand
//!
//! Client-side convenience layer over the Docker/Podman Engine API, built
//! for integration tests and local development loops that run against a
//! long-lived daemon.
//!
//! ## Architecture Overview
//!
//! - **[`container`]**: engine seam, lifecycle orchestration, image and
//!   network operations, log demultiplexing
//! - **[`cli`]**: argument parsing and configuration discovery for the
//!   `dockhand` binary
//! - **[`env`]**: file names and path helpers
//!
//! ## Features
//!
//! - **Start-or-replace**: starting a named container first stops and
//!   removes any existing container with that name
//! - **Log drain**: stopping a container can print its output before the
//!   engine auto-removes it
//! - **In-band build errors**: build output is inspected line by line, so an
//!   engine-reported error fails the build even when the request succeeded
//! - **Network find-or-create**
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dockhand::container::{ContainerClientConfig, StartOptions, Toolkit};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let toolkit = Toolkit::connect(&ContainerClientConfig::default()).await?;
//!
//!     let image = toolkit.images.pull("nginx:alpine").await?;
//!     let options = StartOptions::builder().name("web").expose(80).build();
//!     let container = toolkit.containers.start(&image, None, &options).await?;
//!
//!     container.stop(true).await?;
//!     Ok(())
//! }
//! ```

/// Container engine convenience layer.
///
/// Idempotent lifecycle operations over a shared, reference-counted engine
/// handle.
pub mod container;

/// Command line interface and configuration discovery.
pub mod cli;

/// Environment constants and path utilities.
pub mod env;

pub use container::{
    Container, ContainerError, Image, Network, Result, StartOptions, Toolkit,
};
