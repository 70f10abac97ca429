use std::{env, fs, net::SocketAddr, path::{Path, PathBuf}};
use serde::{Serialize, Deserialize};
use toml;
use anyhow::{self, Context};
use log::info;

use crate::core::FixedCredentials;

/// Path read when `STASH_CONFIG` is not set.
pub const DEFAULT_CONFIG: &str = "resources/server.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListenConfig {
    pub listen: SocketAddr
}

impl Default for ListenConfig {
    fn default() -> Self {
        ListenConfig { listen: SocketAddr::from(([0, 0, 0, 0], 3001)) }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    pub ledger_path: PathBuf
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig { ledger_path: PathBuf::from("data/ledger.json") }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ListenConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub auth: FixedCredentials
}

impl AppConfig {
    pub fn read(filepath: impl AsRef<Path>) -> anyhow::Result<Self> {
        let file_content = fs::read_to_string(filepath)
            .with_context(|| "failed to read config file")?;
        let config = toml::from_str(&file_content)
            .with_context(|| "failed to parse config file")?;
        return Ok(config);
    }

    /// Reads the file named by `STASH_CONFIG`, or the default path if it
    /// exists, then applies a `PORT` override.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = match env::var_os("STASH_CONFIG") {
            Some(path) => AppConfig::read(&path)
                .with_context(|| format!("config file {}", Path::new(&path).display()))?,
            None if Path::new(DEFAULT_CONFIG).exists() => AppConfig::read(DEFAULT_CONFIG)?,
            None => {
                info!("no config file found, using defaults");
                AppConfig::default()
            }
        };

        if let Ok(port) = env::var("PORT") {
            config.apply_port(&port)?;
        }
        return Ok(config);
    }

    pub fn apply_port(&mut self, port: &str) -> anyhow::Result<()> {
        let port: u16 = port.trim().parse()
            .with_context(|| format!("invalid PORT value {:?}", port))?;
        self.server.listen.set_port(port);
        return Ok(());
    }
}
