use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::error::{CoreResult, DocAssistError};
use crate::model::CompletionParams;

/// Endpoint used when no base URL override is configured.
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
/// Versioned path appended to a base URL override.
pub const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct HttpCfg {
    /// TCP connect timeout in milliseconds (default 5000ms)
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Longest wait for the next read on the connection, in milliseconds
    /// (default 60000ms). Applies between body chunks, so a stream that keeps
    /// producing frames is never cut off.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Optional deadline for the whole request including the streamed body
    /// (None = unbounded).
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
    /// Optional per-host idle connection pool cap (None = reqwest default)
    #[serde(default)]
    pub pool_max_idle_per_host: Option<usize>,
}

impl Default for HttpCfg {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            request_timeout_ms: None,
            pool_max_idle_per_host: None,
        }
    }
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}
fn default_read_timeout_ms() -> u64 {
    60_000
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Name of the environment variable that contains the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Base URL override, e.g. `http://localhost:8080`. The versioned chat path is appended.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub http: HttpCfg,
    /// Sampling parameters merged into every request.
    #[serde(default)]
    pub params: CompletionParams,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url: None,
            model: None,
            http: HttpCfg::default(),
            params: CompletionParams::default(),
        }
    }
}

impl Config {
    /// Load a Config from a file path (JSON or TOML by extension). If the
    /// extension is missing or unrecognized, try JSON first, then TOML.
    pub fn from_path<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(DocAssistError::from)?;
        let s = std::str::from_utf8(&bytes).map_err(|e| DocAssistError::Other(e.into()))?;
        let cfg: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => {
                serde_json::from_str::<Self>(s).map_err(|e| DocAssistError::Other(e.into()))?
            }
            Some("toml") => {
                toml::from_str::<Self>(s).map_err(|e| DocAssistError::Other(e.into()))?
            }
            _ => serde_json::from_str::<Self>(s)
                .map_err(|e| DocAssistError::Other(e.into()))
                .or_else(|_| {
                    toml::from_str::<Self>(s).map_err(|e| DocAssistError::Other(e.into()))
                })?,
        };
        Ok(cfg)
    }
}

/// Immutable connection settings threaded into a client at construction.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub api_key: SecretString,
    pub endpoint: String,
    pub model: String,
}

impl ClientSettings {
    pub fn new(api_key: impl Into<String>, base_url: Option<&str>, model: Option<&str>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            endpoint: endpoint_for(base_url),
            model: model
                .filter(|m| !m.is_empty())
                .unwrap_or(DEFAULT_MODEL)
                .to_string(),
        }
    }

    /// Resolve settings from config, reading the API key from the process environment.
    pub fn resolve(cfg: &Config) -> CoreResult<Self> {
        Self::resolve_with(cfg, |name| std::env::var(name).ok())
    }

    /// Like [`ClientSettings::resolve`] but with an explicit variable lookup.
    pub fn resolve_with<F>(cfg: &Config, lookup: F) -> CoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let key = lookup(&cfg.api_key_env)
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                DocAssistError::Validation(format!(
                    "API key not found in environment variable '{}'",
                    cfg.api_key_env
                ))
            })?;
        Ok(Self::new(key, cfg.base_url.as_deref(), cfg.model.as_deref()))
    }
}

fn endpoint_for(base_url: Option<&str>) -> String {
    match base_url.map(str::trim).filter(|b| !b.is_empty()) {
        Some(base) => format!("{}{}", base.trim_end_matches('/'), CHAT_COMPLETIONS_PATH),
        None => DEFAULT_ENDPOINT.to_string(),
    }
}
