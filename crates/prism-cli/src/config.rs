//! Configuration file loading for the CLI
//!
//! This module handles finding and loading TOML configuration files
//! from various locations (explicit path, working directory, user directory).

use std::{
    fs,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::{debug, info};

use prism::config::AppConfig;

use crate::error::CliError;

/// Name of the configuration file looked up in the working directory.
const LOCAL_CONFIG: &str = "prism.toml";

/// Find and load configuration from various locations
///
/// Search order:
/// 1. Explicit path if provided
/// 2. `prism.toml` in the working directory
/// 3. Platform-specific config directory
/// 4. Default config if none found
///
/// # Arguments
///
/// * `explicit_path` - Optional explicit path to config file
///
/// # Errors
///
/// Returns error if:
/// - Explicit path is provided but file doesn't exist
/// - Config file exists but cannot be parsed
pub fn load_config(explicit_path: Option<impl AsRef<Path>>) -> Result<AppConfig, CliError> {
    if let Some(path) = explicit_path {
        let path = path.as_ref();
        info!(path = path.display().to_string(); "Loading configuration from explicit path");
        return load_config_file(path);
    }

    let local_config = Path::new(LOCAL_CONFIG);
    if local_config.exists() {
        info!(path = local_config.display().to_string(); "Loading configuration from local path");
        return load_config_file(local_config);
    }

    if let Some(system_config) = system_config_path() {
        if system_config.exists() {
            info!(path = system_config.display().to_string(); "Loading configuration from system path");
            return load_config_file(system_config);
        }
        debug!(path = system_config.display().to_string(); "System configuration file not found");
    } else {
        debug!("Could not determine platform-specific config directory");
    }

    debug!("No configuration file found, using default configuration");
    Ok(AppConfig::default())
}

fn system_config_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "prism", "prism").map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Load configuration from a TOML file
///
/// # Errors
///
/// Returns error if the file is missing, unreadable or not valid TOML for
/// [`AppConfig`].
fn load_config_file(path: impl AsRef<Path>) -> Result<AppConfig, CliError> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(CliError::MissingConfig(path.to_path_buf()));
    }

    let content = fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&content).map_err(|e| CliError::ConfigParse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_explicit_file_is_loaded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(
            &path,
            "[analysis]\ncomplexity_threshold = 4\n\n[limits]\nmax_concurrent = 2\n",
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();

        assert_eq!(config.analysis().complexity_threshold(), 4);
        assert_eq!(config.limits().max_concurrent(), 2);
        assert_eq!(config.limits().timeout_ms(), 30_000);
    }

    #[test]
    fn test_missing_explicit_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        assert!(matches!(load_config(Some(&path)), Err(CliError::MissingConfig(_))));
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[analysis\ncomplexity_threshold = ").unwrap();

        assert!(matches!(load_config(Some(&path)), Err(CliError::ConfigParse(_))));
    }

    #[test]
    fn test_unknown_pass_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("passes.toml");
        fs::write(&path, "[analysis]\nenabled = [\"syntax\", \"lint\"]\n").unwrap();

        assert!(matches!(load_config(Some(&path)), Err(CliError::ConfigParse(_))));
    }
}
