// src/config.rs

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::catalog::{DEFAULT_API_BASE, DEFAULT_MARKET};
use crate::executor::DEFAULT_OUTPUT_TEMPLATE;

/// Placeholder written into a fresh config; the server refuses to start until it is edited.
pub const UNSET_DIRECTORY: &str = "CHANGE_ME";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("could not serialize default config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("could not locate config directory: {0}")]
    Xdg(#[from] xdg::BaseDirectoriesError),
    #[error("download_directory is not set, edit {} and point it at your music folder", .0.display())]
    DirectoryUnset(PathBuf),
    #[error("max_concurrent_downloads must be at least 1")]
    ZeroConcurrency,
}

/// Server configuration loaded from `~/.config/spotq/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Root folder for downloads. Collections get a sub-folder each.
    pub download_directory: PathBuf,
    /// Port the HTTP service listens on.
    pub server_port: u16,
    pub bind_address: String,
    /// Maximum number of downloader processes running at once.
    pub max_concurrent_downloads: usize,
    /// Downloader executable, looked up on PATH unless absolute.
    pub downloader_program: PathBuf,
    pub output_template: String,
    pub catalog_api_base: String,
    /// Market used for artist top-track listings.
    pub artist_market: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            download_directory: PathBuf::from(UNSET_DIRECTORY),
            server_port: 3001,
            bind_address: "127.0.0.1".to_string(),
            max_concurrent_downloads: 3,
            downloader_program: PathBuf::from("spotdl"),
            output_template: DEFAULT_OUTPUT_TEMPLATE.to_string(),
            catalog_api_base: DEFAULT_API_BASE.to_string(),
            artist_market: DEFAULT_MARKET.to_string(),
        }
    }
}

impl ServerConfig {
    pub fn from_toml(data: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(data)?)
    }

    /// Reject settings the server cannot run with. `source` names the file for error messages.
    pub fn validate(&self, source: &Path) -> Result<(), ConfigError> {
        if self.download_directory.as_os_str() == UNSET_DIRECTORY
            || self.download_directory.as_os_str().is_empty()
        {
            return Err(ConfigError::DirectoryUnset(source.to_path_buf()));
        }
        if self.max_concurrent_downloads == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        Ok(())
    }

    /// Create the download directory if it does not exist yet.
    pub fn ensure_download_directory(&self) -> Result<(), ConfigError> {
        if !self.download_directory.exists() {
            fs::create_dir_all(&self.download_directory).map_err(|source| ConfigError::Io {
                path: self.download_directory.clone(),
                source,
            })?;
            tracing::info!(
                "created download directory {}",
                self.download_directory.display()
            );
        }
        Ok(())
    }
}

pub fn config_path() -> Result<PathBuf, ConfigError> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("spotq")?;
    xdg_dirs
        .place_config_file("config.toml")
        .map_err(|source| ConfigError::Io {
            path: xdg_dirs.get_config_home(),
            source,
        })
}

/// Load configuration from `path`, writing a default file there if none exists.
pub fn load_or_init(path: &Path) -> Result<ServerConfig, ConfigError> {
    let io_err = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };

    if !path.exists() {
        let default_cfg = ServerConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(path, toml).map_err(io_err)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path).map_err(io_err)?;
    ServerConfig::from_toml(&data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.server_port, 3001);
        assert_eq!(cfg.max_concurrent_downloads, 3);
        assert_eq!(cfg.download_directory, PathBuf::from("CHANGE_ME"));
        assert_eq!(cfg.output_template, "{title} - {artist}.{output-ext}");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = ServerConfig::from_toml(
            r#"
            download_directory = "/srv/music"
            max_concurrent_downloads = 5
        "#,
        )
        .unwrap();
        assert_eq!(cfg.download_directory, PathBuf::from("/srv/music"));
        assert_eq!(cfg.max_concurrent_downloads, 5);
        assert_eq!(cfg.server_port, 3001);
        assert_eq!(cfg.catalog_api_base, "https://api.spotify.com/v1");
    }

    #[test]
    fn placeholder_directory_is_rejected() {
        let cfg = ServerConfig::default();
        let err = cfg.validate(Path::new("config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::DirectoryUnset(_)));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let cfg = ServerConfig {
            download_directory: PathBuf::from("/srv/music"),
            max_concurrent_downloads: 0,
            ..ServerConfig::default()
        };
        assert!(matches!(
            cfg.validate(Path::new("config.toml")),
            Err(ConfigError::ZeroConcurrency)
        ));
    }

    #[test]
    fn load_or_init_writes_default_then_reads_it_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let created = load_or_init(&path).unwrap();
        assert!(path.exists());
        assert_eq!(created.server_port, 3001);

        fs::write(&path, "server_port = 4000\ndownload_directory = \"/x\"\n").unwrap();
        let loaded = load_or_init(&path).unwrap();
        assert_eq!(loaded.server_port, 4000);
        assert!(loaded.validate(&path).is_ok());
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            ServerConfig::from_toml("server_port = \"nope\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
