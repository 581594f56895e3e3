//! Runtime configuration loaded from the environment (and an optional `.env`).
//!
//! Values are read once at process start. Tests build snapshots through
//! [`AppCfg::from_lookup`] so the process environment is never mutated.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::common::error::{PropvalError, PropvalResult};

pub const DEFAULT_MODEL_NAME: &str = "house_price_model.pkl";
pub const DEFAULT_MODEL_DIR: &str = "models";
pub const DEFAULT_DATASET_PATH: &str = "data/california_housing.csv";
/// 1990 California census block groups, raw per-district totals.
pub const DEFAULT_DATASET_URL: &str =
    "https://raw.githubusercontent.com/ageron/handson-ml2/master/datasets/housing/housing.csv";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;

/// Output format of log events.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Snapshot of configuration values consumed by both binaries.
#[derive(Clone, Debug)]
pub struct AppCfg {
    pub model_name: String,
    pub model_dir: PathBuf,
    pub dataset_path: PathBuf,
    /// Where to download the dataset from when `dataset_path` is absent. Empty disables downloads.
    pub dataset_url: String,
    pub host: String,
    pub port: u16,
    pub log_format: LogFormat,
}

impl AppCfg {
    /// Create a configuration snapshot from the process environment.
    ///
    /// A `.env` file in the working directory is merged first if present.
    pub fn load() -> PropvalResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(env_lookup)
    }

    /// Build a snapshot from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> PropvalResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let model_name = lookup("MODEL_NAME").unwrap_or_else(|| DEFAULT_MODEL_NAME.to_string());
        if model_name.trim().is_empty() || model_name.contains(['/', '\\']) {
            return Err(PropvalError::config(format!(
                "MODEL_NAME must be a bare file name, got {model_name:?}"
            )));
        }

        let log_format = match lookup("LOG_FORMAT").as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(PropvalError::config(format!(
                    "LOG_FORMAT must be `text` or `json`, got {other:?}"
                )))
            }
        };

        Ok(Self {
            model_name,
            model_dir: lookup("MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_DIR)),
            dataset_path: lookup("DATASET_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATASET_PATH)),
            dataset_url: lookup("DATASET_URL")
                .map(|url| url.trim().to_string())
                .unwrap_or_else(|| DEFAULT_DATASET_URL.to_string()),
            host: lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_var(&lookup, "PORT", DEFAULT_PORT)?,
            log_format,
        })
    }

    /// Location of the model artifact: `<model_dir>/<model_name>`.
    pub fn model_path(&self) -> PathBuf {
        self.model_dir.join(&self.model_name)
    }

    /// `host:port` string the server binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Lookup backed by the process environment.
pub fn env_lookup(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// Parse `key` with `FromStr`, falling back to `default` when unset.
pub fn parse_var<T, F>(lookup: &F, key: &str, default: T) -> PropvalResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|err| PropvalError::config(format!("{key}={raw:?}: {err}"))),
    }
}
