use std::path::{Path, PathBuf};
use serde::Deserialize;
use crate::core::{Result, RestorePolicy, UploadError, DEFAULT_STORAGE_KEY};

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Base URL of the storage service API
    pub endpoint: String,
    /// Bearer token, if the service wants one
    pub token: Option<String>,
    /// Directory holding the persisted task list
    pub state_dir: PathBuf,
    pub storage_key: String,
    /// 最大并发数, 1 为顺序上传
    pub max_concurrent: usize,
    pub restore_policy: RestorePolicy,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/api".to_string(),
            token: None,
            state_dir: PathBuf::from(".courier"),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            max_concurrent: 1,
            restore_policy: RestorePolicy::Keep,
            request_timeout_secs: 300,
        }
    }
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Config> {
        let config: Config = toml::from_str(text)
            .map_err(|err| UploadError::Config(err.to_string()))?;

        if config.max_concurrent == 0 {
            return Err(UploadError::Config("max_concurrent must be at least 1".to_string()));
        }

        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Config> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&text)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Config> {
        match std::fs::read_to_string(path.as_ref()) {
            Ok(text) => Self::from_toml(&text),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
            Err(err) => Err(err.into()),
        }
    }
}
