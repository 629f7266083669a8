use once_cell::sync::OnceCell;
use serde::{Deserialize, Deserializer};
use std::{path::Path, time::Duration};
use thiserror::Error;
use tokio::fs;

use crate::backend::client::{DEFAULT_COMMAND_TIMEOUT, DEFAULT_CONNECT_TIMEOUT};
use crate::dashboard::{DEFAULT_PREFIX, DEFAULT_SCAN_COUNT};

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

pub const DEFAULT_COOKIE_NAME: &str = "cppq_session";
pub const DEFAULT_SESSION_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

// -----------------------------------------------------------------------------
// ----- Singleton -------------------------------------------------------------

static FILE_CONFIG: OnceCell<FileConfig> = OnceCell::new();

// -----------------------------------------------------------------------------
// ----- FileConfig ------------------------------------------------------------

/// Settings from the optional TOML file. Every key has a default, so running
/// without a file is the same as running with an empty one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub session: SessionSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSettings {
    pub key_prefix: String,

    #[serde(deserialize_with = "de_duration")]
    pub connect_timeout: Duration,

    #[serde(deserialize_with = "de_duration")]
    pub command_timeout: Duration,

    pub scan_count: u32,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_PREFIX.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            scan_count: DEFAULT_SCAN_COUNT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionSettings {
    pub cookie_name: String,

    #[serde(deserialize_with = "de_duration")]
    pub max_age: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            max_age: DEFAULT_SESSION_MAX_AGE,
        }
    }
}

// -----------------------------------------------------------------------------
// ----- FileConfig: Static ----------------------------------------------------

impl FileConfig {
    /// Init: panic on any error. Do not continue with a bad state.
    pub async fn init(path: Option<&Path>) {
        let cfg = match path {
            Some(path) => Self::from_file_async(path)
                .await
                .unwrap_or_else(|e| panic!("failed to load config from {:?}: {e}", path)),
            None => FileConfig::default(),
        };

        FILE_CONFIG
            .set(cfg)
            .unwrap_or_else(|_| panic!("FileConfig::init called twice"));
    }

    pub fn handle() -> &'static FileConfig {
        FILE_CONFIG.get().expect("FileConfig not initialized")
    }

    pub async fn from_file_async(path: &Path) -> Result<FileConfig, ConfigError> {
        let raw = fs::read_to_string(path).await.map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<FileConfig, ConfigError> {
        let doc: FileConfig = toml::from_str(raw).map_err(|e| ConfigError::Toml { source: e })?;
        validate(&doc)?;
        Ok(doc)
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: Helpers -----------------------------------------------------

fn validate(doc: &FileConfig) -> Result<(), ConfigError> {
    if doc.store.key_prefix.is_empty() {
        return Err(ConfigError::InvalidField("store.key_prefix".into()));
    }
    if doc.store.scan_count == 0 {
        return Err(ConfigError::InvalidField("store.scan_count".into()));
    }
    if doc.store.connect_timeout.is_zero() {
        return Err(ConfigError::InvalidField("store.connect_timeout".into()));
    }
    if doc.store.command_timeout.is_zero() {
        return Err(ConfigError::InvalidField("store.command_timeout".into()));
    }

    let name = &doc.session.cookie_name;
    if name.is_empty() || !name.bytes().all(is_cookie_name_byte) {
        return Err(ConfigError::InvalidField("session.cookie_name".into()));
    }
    Ok(())
}

fn is_cookie_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

fn de_duration<'de, D>(d: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(d)?;
    humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
}

// -----------------------------------------------------------------------------
// ----- Errors ----------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for '{0}'")]
    InvalidField(String),

    #[error("read error for {path:?}: {source}")]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("toml parse error: {source}")]
    Toml { source: toml::de::Error },
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
