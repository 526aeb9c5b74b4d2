//! CLI-specific functionality for dockhand
//!
//! This module contains all CLI-related code including argument parsing
//! and configuration discovery.

pub mod args;
pub mod config;

pub use args::{Args, Commands, PortSpec, parse_env_pair, parse_port_spec};
pub use config::{ConfigDiscovery, DockhandConfig};
