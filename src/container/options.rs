//! Start and build option values.
//!
//! Options are assembled with consuming builders and are immutable once
//! built. Translation into engine structures (port sets, bindings, platform
//! constraints) happens on demand and reports malformed input as
//! [`ContainerError::ValidationError`].

use crate::container::{ContainerError, Result};
use crate::env::DEFAULT_DOCKERFILE;
use bollard::models::PortBinding;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

/// Exposed container ports keyed by `"<port>/<protocol>"`.
pub type PortSet = HashMap<String, HashMap<(), ()>>;

/// Host bindings keyed by `"<port>/<protocol>"`.
pub type PortMap = HashMap<String, Option<Vec<PortBinding>>>;

const PROTOCOLS: [&str; 3] = ["tcp", "udp", "sctp"];

/// Platform shorthand for 64-bit x86 Linux.
pub const LINUX_AMD64: &str = "linux/amd64";

/// An `os/arch` platform constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    /// Operating system (e.g. `linux`)
    pub os: String,
    /// CPU architecture (e.g. `amd64`)
    pub arch: String,
}

impl FromStr for Platform {
    type Err = ContainerError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('/').collect();
        match parts.as_slice() {
            [os, arch] if !os.is_empty() && !arch.is_empty() => Ok(Platform {
                os: os.to_string(),
                arch: arch.to_string(),
            }),
            _ => Err(ContainerError::ValidationError(format!(
                "platform '{}' must have the form <os>/<arch>",
                s
            ))),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

/// Builder for [`StartOptions`].
#[derive(Debug, Clone, Default)]
pub struct StartOptionsBuilder {
    name: Option<String>,
    ports: BTreeMap<u16, String>,
    environment: BTreeMap<String, String>,
    platform: Option<String>,
    capabilities: Vec<String>,
}

impl StartOptionsBuilder {
    /// Create a builder with no name, ports, environment or platform.
    pub fn new() -> Self {
        Self::default()
    }

    /// Name the container. A named start replaces any existing container
    /// with the same name.
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Bind `host` on the host to `container/protocol` in the container.
    pub fn port_binding<S: AsRef<str>>(mut self, host: u16, container: u16, protocol: S) -> Self {
        self.ports
            .insert(host, format!("{}/{}", container, protocol.as_ref()));
        self
    }

    /// Expose a TCP port on the same port number on the host.
    pub fn expose(self, port: u16) -> Self {
        self.port_binding(port, port, "tcp")
    }

    /// Add an environment variable.
    pub fn env<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.environment.insert(name.into(), value.into());
        self
    }

    /// Add multiple environment variables.
    pub fn envs<I, K, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in values {
            self.environment.insert(name.into(), value.into());
        }
        self
    }

    /// Constrain the container to an `os/arch` platform.
    pub fn platform<S: Into<String>>(mut self, platform: S) -> Self {
        self.platform = Some(platform.into());
        self
    }

    /// Run as `linux/amd64`.
    pub fn linux_amd64(self) -> Self {
        self.platform(LINUX_AMD64)
    }

    /// Grant an extra kernel capability (e.g. `NET_ADMIN`).
    pub fn cap_add<S: Into<String>>(mut self, capability: S) -> Self {
        self.capabilities.push(capability.into());
        self
    }

    /// Build the options.
    pub fn build(self) -> StartOptions {
        StartOptions {
            name: self.name,
            ports: self.ports,
            environment: self.environment,
            platform: self.platform,
            capabilities: self.capabilities,
        }
    }
}

/// Optional parameters for starting a container.
#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    name: Option<String>,
    ports: BTreeMap<u16, String>,
    environment: BTreeMap<String, String>,
    platform: Option<String>,
    capabilities: Vec<String>,
}

impl StartOptions {
    /// Create a new options builder.
    pub fn builder() -> StartOptionsBuilder {
        StartOptionsBuilder::new()
    }

    /// The configured container name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Translate the port bindings into the engine's exposed-port set and
    /// binding map.
    ///
    /// # Errors
    ///
    /// Returns a validation error if a binding has a malformed container
    /// port or an unsupported protocol.
    pub fn ports(&self) -> Result<(PortSet, PortMap)> {
        let mut port_set = PortSet::new();
        let mut port_map = PortMap::new();

        for (host, container) in &self.ports {
            let key = parse_container_port(*host, container)?;
            port_set.insert(key.clone(), HashMap::new());
            port_map
                .entry(key)
                .or_default()
                .get_or_insert_with(Vec::new)
                .push(PortBinding {
                    host_ip: None,
                    host_port: Some(host.to_string()),
                });
        }

        Ok((port_set, port_map))
    }

    /// Environment variables in `name=value` form.
    pub fn environment_variables(&self) -> Vec<String> {
        self.environment
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect()
    }

    /// The parsed platform constraint, if one was configured.
    ///
    /// # Errors
    ///
    /// Returns a validation error unless the platform is exactly `os/arch`.
    pub fn platform(&self) -> Result<Option<Platform>> {
        self.platform.as_deref().map(str::parse).transpose()
    }

    /// Extra kernel capabilities.
    pub fn capabilities(&self) -> &[String] {
        &self.capabilities
    }
}

/// Validate a `<port>/<protocol>` value and return its normalised key.
fn parse_container_port(host: u16, value: &str) -> Result<String> {
    let invalid = |reason: String| {
        ContainerError::ValidationError(format!(
            "invalid port binding {}:{}: {}",
            host, value, reason
        ))
    };

    let (port, protocol) = value
        .split_once('/')
        .ok_or_else(|| invalid("expected <port>/<protocol>".to_string()))?;

    let port: u16 = port
        .parse()
        .map_err(|_| invalid(format!("'{}' is not a valid port number", port)))?;

    let protocol = protocol.to_ascii_lowercase();
    if !PROTOCOLS.contains(&protocol.as_str()) {
        return Err(invalid(format!(
            "unsupported protocol '{}' (expected one of {})",
            protocol,
            PROTOCOLS.join(", ")
        )));
    }

    Ok(format!("{}/{}", port, protocol))
}

/// Builder for [`BuildOptions`].
#[derive(Debug, Clone, Default)]
pub struct BuildOptionsBuilder {
    dockerfile: Option<String>,
    platform: Option<String>,
}

impl BuildOptionsBuilder {
    /// Create a builder using the default Dockerfile and host platform.
    pub fn new() -> Self {
        Self::default()
    }

    /// Dockerfile path relative to the build context.
    pub fn dockerfile<S: Into<String>>(mut self, path: S) -> Self {
        self.dockerfile = Some(path.into());
        self
    }

    /// Target platform for the build.
    pub fn platform<S: Into<String>>(mut self, platform: S) -> Self {
        self.platform = Some(platform.into());
        self
    }

    /// Build for `linux/amd64`.
    pub fn linux_amd64(self) -> Self {
        self.platform(LINUX_AMD64)
    }

    /// Build the options.
    pub fn build(self) -> BuildOptions {
        BuildOptions {
            dockerfile: self.dockerfile,
            platform: self.platform,
        }
    }
}

/// Optional parameters for building an image.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    dockerfile: Option<String>,
    platform: Option<String>,
}

impl BuildOptions {
    /// Create a new options builder.
    pub fn builder() -> BuildOptionsBuilder {
        BuildOptionsBuilder::new()
    }

    /// Dockerfile path, `"Dockerfile"` unless configured.
    pub fn dockerfile(&self) -> &str {
        match self.dockerfile.as_deref() {
            Some(path) if !path.is_empty() => path,
            _ => DEFAULT_DOCKERFILE,
        }
    }

    /// The configured build platform, if any.
    pub fn platform(&self) -> Option<&str> {
        self.platform.as_deref()
    }
}
