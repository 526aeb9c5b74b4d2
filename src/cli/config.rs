//! Configuration discovery and loading
//!
//! This module handles the configuration discovery hierarchy:
//! 1. Explicit path given with `--config`
//! 2. Current directory: ./dockhand.toml or ./.dockhand/config.toml
//! 3. User config: ~/.dockhand/config.toml
//! 4. Built-in defaults

use crate::container::{ContainerClientConfig, OrchestratorConfig};
use crate::env;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env as std_env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DockhandConfig {
    /// Daemon connection settings
    pub engine: ContainerClientConfig,
    /// Container lifecycle settings
    pub lifecycle: OrchestratorConfig,
    /// Print container output when stopping, even without `--logs`
    pub capture_logs: bool,
}

impl DockhandConfig {
    /// Load from TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Save to TOML file
    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file {}", path.as_ref().display()))?;
        Ok(())
    }
}

/// Configuration discovery system
pub struct ConfigDiscovery;

impl ConfigDiscovery {
    /// Load the explicit config file if given, otherwise discover one using
    /// the hierarchy.
    pub fn discover_config(explicit: Option<&Path>) -> Result<DockhandConfig> {
        if let Some(path) = explicit {
            info!("Loading configuration override from: {:?}", path);
            return DockhandConfig::from_toml_file(path);
        }

        if let Some(config_path) = Self::find_config_file() {
            info!("Loading configuration from: {:?}", config_path);
            return DockhandConfig::from_toml_file(config_path);
        }

        debug!("No configuration file found, using defaults");
        Ok(DockhandConfig::default())
    }

    /// Find configuration file using discovery hierarchy
    pub fn find_config_file() -> Option<PathBuf> {
        Self::first_existing(Self::get_config_candidates())
    }

    fn first_existing(candidates: Vec<PathBuf>) -> Option<PathBuf> {
        for candidate in candidates {
            debug!("Checking for config file: {:?}", candidate);
            if candidate.is_file() {
                debug!("Found config file: {:?}", candidate);
                return Some(candidate);
            }
        }

        debug!("No config file found in discovery hierarchy");
        None
    }

    /// Get list of configuration file candidates in priority order
    fn get_config_candidates() -> Vec<PathBuf> {
        let current_dir = std_env::current_dir().ok();
        let home_dir = Self::get_home_dir();
        Self::candidates_in(current_dir.as_deref(), home_dir.as_deref())
    }

    fn candidates_in(current_dir: Option<&Path>, home_dir: Option<&Path>) -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        if let Some(current_dir) = current_dir {
            candidates.push(env::project_config_file_path(current_dir));
            candidates.push(env::local_config_file_path(current_dir));
        }

        if let Some(home_dir) = home_dir {
            candidates.push(env::user_config_file_path(home_dir));
        }

        candidates
    }

    /// Get home directory path
    fn get_home_dir() -> Option<PathBuf> {
        std_env::var("HOME")
            .ok()
            .or_else(|| std_env::var("USERPROFILE").ok())
            .map(PathBuf::from)
    }

    /// Write a default config file at `./dockhand.toml`, or at
    /// `~/.dockhand/config.toml` when `user` is set.
    ///
    /// An existing file is left untouched. Returns the path either way.
    pub fn create_default_config(user: bool) -> Result<PathBuf> {
        let path = if user {
            let home_dir = Self::get_home_dir().context("Could not determine home directory")?;
            env::user_config_file_path(&home_dir)
        } else {
            env::project_config_file_path(&std_env::current_dir()?)
        };
        Self::create_default_config_at(&path)?;
        Ok(path)
    }

    /// Returns whether a new file was written.
    fn create_default_config_at(path: &Path) -> Result<bool> {
        if path.exists() {
            warn!("Configuration file already exists: {:?}", path);
            return Ok(false);
        }

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
            info!("Created configuration directory: {:?}", parent);
        }

        DockhandConfig::default().to_toml_file(path)?;
        info!("Created default configuration file: {:?}", path);
        Ok(true)
    }

    /// Show configuration discovery information for debugging
    pub fn show_discovery_info(explicit: Option<&Path>) {
        println!("Configuration Discovery Hierarchy:");
        println!();

        if let Some(path) = explicit {
            println!("  --config {:?} - {}", path, Self::status(path));
        }
        for (i, candidate) in Self::get_config_candidates().iter().enumerate() {
            println!("  {}. {:?} - {}", i + 1, candidate, Self::status(candidate));
        }

        println!();
        match explicit.map(Path::to_path_buf).or_else(Self::find_config_file) {
            Some(found) => println!("Active configuration: {:?}", found),
            None => println!("Active configuration: Built-in defaults"),
        }

        if let Ok(config) = Self::discover_config(explicit)
            && let Ok(rendered) = toml::to_string_pretty(&config)
        {
            println!();
            println!("{}", rendered);
        }
    }

    fn status(path: &Path) -> &'static str {
        if path.is_file() {
            "✓ EXISTS"
        } else if path.exists() {
            "✗ NOT A FILE"
        } else {
            "✗ NOT FOUND"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_serialization() {
        let config = DockhandConfig {
            engine: ContainerClientConfig {
                host: Some("unix:///var/run/docker.sock".to_string()),
                timeout: 30,
            },
            lifecycle: OrchestratorConfig {
                stop_timeout: Some(5),
            },
            capture_logs: true,
        };
        let toml_string = toml::to_string(&config).unwrap();
        let deserialized: DockhandConfig = toml::from_str(&toml_string).unwrap();
        assert_eq!(deserialized, config);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: DockhandConfig = toml::from_str("capture_logs = true\n").unwrap();
        assert!(config.capture_logs);
        assert_eq!(config.engine, ContainerClientConfig::default());
        assert_eq!(config.lifecycle.stop_timeout, None);

        let config: DockhandConfig = toml::from_str("[lifecycle]\nstop_timeout = 2\n").unwrap();
        assert_eq!(config.lifecycle.stop_timeout, Some(2));
        assert_eq!(config.engine.timeout, 120);
    }

    #[test]
    fn test_config_file_operations() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("dockhand.toml");

        let original = DockhandConfig {
            capture_logs: true,
            ..Default::default()
        };
        original.to_toml_file(&config_path).unwrap();

        let loaded = ConfigDiscovery::discover_config(Some(&config_path)).unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn test_create_default_config_keeps_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(".dockhand").join("config.toml");

        assert!(ConfigDiscovery::create_default_config_at(&config_path).unwrap());
        let loaded = ConfigDiscovery::discover_config(Some(&config_path)).unwrap();
        assert_eq!(loaded, DockhandConfig::default());

        fs::write(&config_path, "capture_logs = true\n").unwrap();
        assert!(!ConfigDiscovery::create_default_config_at(&config_path).unwrap());
        let kept = ConfigDiscovery::discover_config(Some(&config_path)).unwrap();
        assert!(kept.capture_logs);
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.toml");
        assert!(ConfigDiscovery::discover_config(Some(&missing)).is_err());
    }

    #[test]
    fn test_config_candidates_order() {
        let candidates =
            ConfigDiscovery::candidates_in(Some(Path::new("/project")), Some(Path::new("/home/u")));
        assert_eq!(
            candidates,
            vec![
                PathBuf::from("/project/dockhand.toml"),
                PathBuf::from("/project/.dockhand/config.toml"),
                PathBuf::from("/home/u/.dockhand/config.toml"),
            ]
        );
    }

    #[test]
    fn test_first_existing_prefers_earlier_candidates() {
        let project = TempDir::new().unwrap();
        let home = TempDir::new().unwrap();
        fs::create_dir_all(home.path().join(".dockhand")).unwrap();
        fs::write(home.path().join(".dockhand").join("config.toml"), "").unwrap();

        let candidates = ConfigDiscovery::candidates_in(Some(project.path()), Some(home.path()));
        assert_eq!(
            ConfigDiscovery::first_existing(candidates.clone()),
            Some(home.path().join(".dockhand").join("config.toml"))
        );

        fs::write(project.path().join("dockhand.toml"), "").unwrap();
        assert_eq!(
            ConfigDiscovery::first_existing(candidates),
            Some(project.path().join("dockhand.toml"))
        );
    }
}
