use std::fs;
use std::path::Path;
use std::time::Duration;
use reqwest::Method;
use serde::{Deserialize, Deserializer};
use crate::core::{Result, TransferError};

fn deserialize_duration<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = u64::deserialize(deserializer)?;
    Ok(Duration::from_secs(secs))
}

/// Client and HTTP transport settings, usually read from a TOML file.
///
/// ```toml
/// upload_method = "PUT"
/// timeout = 600
/// connect_timeout = 10
/// user_agent = "xfer/0.1"
/// read_buffer_size = 131072
/// ```
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ClientConfig {
    /// Method used by `upload_file`.
    pub upload_method: String,

    /// Whole-request timeout, in seconds.
    #[serde(deserialize_with = "deserialize_duration")]
    pub timeout: Duration,

    /// Connect timeout, in seconds.
    #[serde(deserialize_with = "deserialize_duration")]
    pub connect_timeout: Duration,

    pub user_agent: Option<String>,

    /// Read buffer for the upload file stream.
    pub read_buffer_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            upload_method: "POST".to_string(),
            timeout: Duration::from_secs(300),
            connect_timeout: Duration::from_secs(30),
            user_agent: None,
            read_buffer_size: 64 * 1024,
        }
    }
}

impl ClientConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn upload_method(&self) -> Result<Method> {
        Method::from_bytes(self.upload_method.as_bytes())
            .map_err(|_| TransferError::InvalidMethod(self.upload_method.clone()))
    }
}
