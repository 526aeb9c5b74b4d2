//! Environment constants and path utilities.
//!
//! This module centralizes the file and directory names dockhand looks for,
//! making them easier to maintain and modify.

use std::path::{Path, PathBuf};

/// Application directory name (hidden directory like .git, .vscode)
pub const DOCKHAND_DIR_NAME: &str = ".dockhand";

/// Configuration file name inside the application directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Stand-alone configuration file name in a project root
pub const PROJECT_CONFIG_FILE_NAME: &str = "dockhand.toml";

/// Dockerfile used when a build does not name one
pub const DEFAULT_DOCKERFILE: &str = "Dockerfile";

/// Set to any value to skip tests that need a live container daemon
pub const SKIP_CONTAINER_TESTS_VAR: &str = "SKIP_CONTAINER_TESTS";

/// Build the .dockhand directory path from a root directory
pub fn dockhand_dir_path(root: &Path) -> PathBuf {
    root.join(DOCKHAND_DIR_NAME)
}

/// Build config file path in user's home directory
pub fn user_config_file_path(home_dir: &Path) -> PathBuf {
    dockhand_dir_path(home_dir).join(CONFIG_FILE_NAME)
}

/// Build local config file path in current directory
pub fn local_config_file_path(current_dir: &Path) -> PathBuf {
    dockhand_dir_path(current_dir).join(CONFIG_FILE_NAME)
}

/// Build project config file path in current directory
pub fn project_config_file_path(current_dir: &Path) -> PathBuf {
    current_dir.join(PROJECT_CONFIG_FILE_NAME)
}
