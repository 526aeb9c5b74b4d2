//! Command line argument parsing
//!
//! This module handles CLI argument parsing with subcommands:
//! - `pull`: Pull an image
//! - `build`: Build an image from a directory
//! - `network`: Ensure a network exists
//! - `run`: Start (or replace) a container
//! - `stop`: Stop a named container
//! - `rm`: Stop and remove a named container
//! - `init-config`: Write a default configuration file
//! - `show-config`: Show configuration discovery information

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// A `-p` port publication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSpec {
    pub host: u16,
    pub container: u16,
    pub protocol: String,
}

#[derive(Debug, Parser)]
#[command(name = "dockhand")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Idempotent container lifecycle helpers: start-or-replace, stop with log drain, image build/pull and networks"
)]
#[command(long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,
    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,
    /// Abort the operation if it takes longer than this many seconds
    #[arg(long = "timeout", value_name = "SECS", global = true)]
    pub timeout: Option<u64>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Pull an image from a registry
    Pull {
        /// Image reference (repo[:tag])
        reference: String,
    },
    /// Build an image from a directory
    Build {
        /// Tag for the built image
        name: String,
        /// Build context directory
        #[arg(default_value = ".")]
        context: PathBuf,
        /// Dockerfile path relative to the context
        #[arg(short = 'f', long = "dockerfile")]
        dockerfile: Option<String>,
        /// Target platform (os/arch)
        #[arg(long = "platform")]
        platform: Option<String>,
    },
    /// Find or create a network
    Network {
        /// Network name
        name: String,
    },
    /// Start a container, replacing any existing one with the same name
    Run {
        /// Image to run
        image: String,
        /// Container name
        #[arg(long = "name")]
        name: Option<String>,
        /// Publish a port: HOST:CONTAINER[/PROTO] or PORT
        #[arg(short = 'p', long = "publish", value_name = "SPEC", value_parser = parse_port_spec)]
        ports: Vec<PortSpec>,
        /// Environment variable: KEY=VALUE
        #[arg(short = 'e', long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair)]
        env: Vec<(String, String)>,
        /// Platform constraint (os/arch)
        #[arg(long = "platform")]
        platform: Option<String>,
        /// Extra kernel capability
        #[arg(long = "cap-add", value_name = "CAP")]
        cap_add: Vec<String>,
        /// Network to attach to (created if missing)
        #[arg(long = "network")]
        network: Option<String>,
        /// Pull the image before starting
        #[arg(long = "pull")]
        pull: bool,
    },
    /// Stop a container by name
    Stop {
        /// Container name
        name: String,
        /// Print the container's output before stopping it
        #[arg(long = "logs")]
        logs: bool,
    },
    /// Stop and remove a container by name
    Rm {
        /// Container name
        name: String,
        /// Print the container's output before stopping it
        #[arg(long = "logs")]
        logs: bool,
    },
    /// Write a default configuration file
    InitConfig {
        /// Write ~/.dockhand/config.toml instead of ./dockhand.toml
        #[arg(long = "user")]
        user: bool,
    },
    /// Show configuration discovery information
    ShowConfig,
}

impl Args {
    pub fn parse() -> Self {
        Parser::parse()
    }
}

/// Parse `HOST:CONTAINER[/PROTO]` or a bare `PORT` (same port on both sides).
/// The protocol defaults to `tcp`.
pub fn parse_port_spec(spec: &str) -> Result<PortSpec, String> {
    let (ports, protocol) = match spec.split_once('/') {
        Some((ports, protocol)) => (ports, protocol.to_string()),
        None => (spec, "tcp".to_string()),
    };
    if protocol.is_empty() {
        return Err(format!("missing protocol in '{}'", spec));
    }

    let parse = |value: &str| {
        value
            .parse::<u16>()
            .map_err(|e| format!("invalid port '{}' in '{}': {}", value, spec, e))
    };
    let (host, container) = match ports.split_once(':') {
        Some((host, container)) => (parse(host)?, parse(container)?),
        None => {
            let port = parse(ports)?;
            (port, port)
        }
    };

    Ok(PortSpec {
        host,
        container,
        protocol,
    })
}

/// Parse `KEY=VALUE`; the value may be empty or contain further `=`.
pub fn parse_env_pair(pair: &str) -> Result<(String, String), String> {
    match pair.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", pair)),
    }
}
