use std::fs;
use std::io;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Connection settings for a notebook server.
/// 筆記本伺服器的連線設定。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    pub base_url: String,
    pub ws_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl ServerSettings {
    /// Parses a user-entered server address such as
    /// `http://localhost:8888/?token=abc`.
    ///
    /// Only scheme, host and port are kept for the base URL; the websocket URL
    /// mirrors it with `ws`/`wss`, and `token` comes from the query string.
    pub fn from_address(address: &str) -> Result<Self, ConfigError> {
        let invalid = |message: &str| ConfigError::InvalidAddress {
            address: address.to_string(),
            message: message.to_string(),
        };
        let url = Url::parse(address.trim()).map_err(|err| invalid(&err.to_string()))?;
        let ws_scheme = match url.scheme() {
            "http" => "ws",
            "https" => "wss",
            _ => return Err(invalid("expected an http or https address")),
        };
        let host = url.host_str().ok_or_else(|| invalid("missing host"))?;
        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let token = url
            .query_pairs()
            .find(|(key, _)| key == "token")
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty());

        Ok(Self {
            base_url: format!("{}://{authority}", url.scheme()),
            ws_url: format!("{ws_scheme}://{authority}"),
            token,
        })
    }
}

/// Persisted tool configuration.
/// 儲存在磁碟上的工具設定。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudioConfig {
    /// Notebook server address, as typed by the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    /// Local content root used when no server is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
}

impl StudioConfig {
    pub fn server_settings(&self) -> Result<Option<ServerSettings>, ConfigError> {
        self.server
            .as_deref()
            .map(ServerSettings::from_address)
            .transpose()
    }
}

/// Loads and saves [`StudioConfig`] as JSON.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `Ok(None)` when the file does not exist.
    /// 設定檔不存在時回傳 `Ok(None)`。
    pub fn load(&self) -> Result<Option<StudioConfig>, ConfigError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => serde_json::from_str(&contents)
                .map(Some)
                .map_err(|err| ConfigError::Invalid(err.to_string())),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    /// Writes through a temporary sibling and renames it into place.
    pub fn save(&self, config: &StudioConfig) -> Result<(), ConfigError> {
        let payload = serde_json::to_vec_pretty(config)
            .map_err(|err| ConfigError::Invalid(err.to_string()))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, payload)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config IO error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid config payload: {0}")]
    Invalid(String),
    #[error("invalid server address `{address}`: {message}")]
    InvalidAddress { address: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn server_address_is_split_into_settings() {
        let settings = ServerSettings::from_address("http://localhost:8888/tree?token=s3cret").unwrap();
        assert_eq!(settings.base_url, "http://localhost:8888");
        assert_eq!(settings.ws_url, "ws://localhost:8888");
        assert_eq!(settings.token.as_deref(), Some("s3cret"));

        let secure = ServerSettings::from_address("https://hub.example.org").unwrap();
        assert_eq!(secure.ws_url, "wss://hub.example.org");
        assert_eq!(secure.token, None);
    }

    #[test]
    fn non_http_address_is_rejected() {
        let err = ServerSettings::from_address("ftp://localhost").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidAddress { .. }));
        assert!(ServerSettings::from_address("not a url").is_err());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("nested/wastudio.json"));
        let config = StudioConfig {
            server: Some("http://localhost:8888".into()),
            root: None,
        };
        store.save(&config).unwrap();
        assert_eq!(store.load().unwrap(), Some(config));
    }

    #[test]
    fn load_missing_returns_none() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("absent.json"));
        assert!(store.load().unwrap().is_none());
    }
}
