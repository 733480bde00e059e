//! Application configuration

use super::default_data_dir;
use crate::{infra::daemon::rpc::DEFAULT_MAX_CONNECTIONS, ops::reset::Settings};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// File name of the configuration inside the data directory
pub const CONFIG_FILE_NAME: &str = "resetd.json";

/// Address the daemon listens on unless configured otherwise
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:9339";

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
	/// Config schema version
	pub version: u32,

	/// Data directory path
	pub data_dir: PathBuf,

	/// Logging level
	pub log_level: String,

	/// Address the RPC server binds to
	#[serde(default = "default_listen_addr")]
	pub listen_addr: String,

	/// Maximum number of concurrent client connections
	#[serde(default = "default_max_connections")]
	pub max_connections: usize,

	/// Reset capabilities and execution
	#[serde(default)]
	pub reset: ResetConfig,
}

/// Reset capabilities of this device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetConfig {
	/// Refuse requests asking for a zero-fill
	#[serde(default)]
	pub zero_fill_unsupported: bool,

	/// Refuse requests asking for a factory OS reinstall
	#[serde(default)]
	pub factory_os_unsupported: bool,

	/// Program (and arguments) spawned for every accepted reset
	#[serde(default)]
	pub command: Option<Vec<String>>,
}

impl ResetConfig {
	pub fn settings(&self) -> Settings {
		Settings::new(self.zero_fill_unsupported, self.factory_os_unsupported)
	}
}

fn default_listen_addr() -> String {
	DEFAULT_LISTEN_ADDR.to_string()
}

fn default_max_connections() -> usize {
	DEFAULT_MAX_CONNECTIONS
}

impl AppConfig {
	/// Load configuration from the default location
	pub fn load() -> Result<Self> {
		let data_dir = default_data_dir()?;
		Self::load_from(&data_dir)
	}

	/// Load configuration from a specific data directory, creating a default one if missing
	pub fn load_from(data_dir: &Path) -> Result<Self> {
		let config_path = data_dir.join(CONFIG_FILE_NAME);

		if config_path.exists() {
			let mut config = Self::load_file(&config_path)?;

			if config.version < Self::target_version() {
				info!(
					"Migrating config from v{} to v{}",
					config.version,
					Self::target_version()
				);
				config.version = Self::target_version();
				config.save()?;
			}

			Ok(config)
		} else {
			warn!("No config found, creating default at {:?}", config_path);
			let config = Self::default_with_dir(data_dir.to_path_buf());
			config.save()?;
			Ok(config)
		}
	}

	/// Load configuration from an explicit file, leaving it untouched
	pub fn load_file(path: &Path) -> Result<Self> {
		info!("Loading config from {:?}", path);
		let json = fs::read_to_string(path)
			.with_context(|| format!("Failed to read config file {}", path.display()))?;
		serde_json::from_str(&json)
			.with_context(|| format!("Failed to parse config file {}", path.display()))
	}

	/// Create default configuration with specific data directory
	pub fn default_with_dir(data_dir: PathBuf) -> Self {
		Self {
			version: Self::target_version(),
			data_dir,
			log_level: "info".to_string(),
			listen_addr: default_listen_addr(),
			max_connections: default_max_connections(),
			reset: ResetConfig::default(),
		}
	}

	/// Save configuration to disk
	pub fn save(&self) -> Result<()> {
		// Ensure directory exists
		fs::create_dir_all(&self.data_dir)?;

		let config_path = self.config_path();
		let json = serde_json::to_string_pretty(self)?;
		fs::write(&config_path, json)
			.with_context(|| format!("Failed to write config file {}", config_path.display()))?;

		info!("Saved config to {:?}", config_path);
		Ok(())
	}

	pub fn config_path(&self) -> PathBuf {
		self.data_dir.join(CONFIG_FILE_NAME)
	}

	fn target_version() -> u32 {
		1
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::tempdir;

	#[test]
	fn creates_default_config_when_missing() {
		let dir = tempdir().unwrap();

		let config = AppConfig::load_from(dir.path()).unwrap();

		assert_eq!(config, AppConfig::default_with_dir(dir.path().to_path_buf()));
		assert!(dir.path().join(CONFIG_FILE_NAME).exists());
	}

	#[test]
	fn saved_config_is_loaded_back() {
		let dir = tempdir().unwrap();
		let mut config = AppConfig::default_with_dir(dir.path().to_path_buf());
		config.reset.zero_fill_unsupported = true;
		config.reset.command = Some(vec!["/usr/bin/true".to_string()]);
		config.save().unwrap();

		let loaded = AppConfig::load_from(dir.path()).unwrap();

		assert_eq!(loaded, config);
		assert_eq!(loaded.reset.settings(), Settings::new(true, false));
	}

	#[test]
	fn missing_sections_take_defaults() {
		let dir = tempdir().unwrap();
		let path = dir.path().join(CONFIG_FILE_NAME);
		fs::write(
			&path,
			format!(
				r#"{{"version": 1, "data_dir": {:?}, "log_level": "debug"}}"#,
				dir.path()
			),
		)
		.unwrap();

		let config = AppConfig::load_file(&path).unwrap();

		assert_eq!(config.listen_addr, DEFAULT_LISTEN_ADDR);
		assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
		assert_eq!(config.reset, ResetConfig::default());
	}

	#[test]
	fn old_versions_are_upgraded() {
		let dir = tempdir().unwrap();
		let mut config = AppConfig::default_with_dir(dir.path().to_path_buf());
		config.version = 0;
		config.save().unwrap();

		assert_eq!(AppConfig::load_from(dir.path()).unwrap().version, 1);
		assert_eq!(
			AppConfig::load_file(&config.config_path()).unwrap().version,
			1
		);
	}

	#[test]
	fn malformed_config_is_an_error() {
		let dir = tempdir().unwrap();
		let path = dir.path().join(CONFIG_FILE_NAME);
		fs::write(&path, "not json").unwrap();

		assert!(AppConfig::load_file(&path).is_err());
	}
}
