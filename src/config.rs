use crate::services::history::DEFAULT_HISTORY_LIMIT;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

const DEFAULT_MODEL_URL: &str =
    "https://github.com/onnx/models/raw/main/validated/vision/classification/mobilenet/model/mobilenetv2-12.onnx";
const DEFAULT_LABELS_URL: &str =
    "https://raw.githubusercontent.com/pytorch/hub/master/imagenet_classes.txt";

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
    pub model_url: String,
    pub labels_path: PathBuf,
    pub labels_url: String,
    pub history_path: PathBuf,
    pub history_limit: usize,
    pub top_k: usize,
    pub static_dir: PathBuf,
    pub body_limit_bytes: usize,
    pub intra_threads: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "0.0.0.0".to_string(),
            port: 8000,
            model_path: PathBuf::from("models/mobilenetv2-12.onnx"),
            model_url: DEFAULT_MODEL_URL.to_string(),
            labels_path: PathBuf::from("imagenet_classes.txt"),
            labels_url: DEFAULT_LABELS_URL.to_string(),
            history_path: PathBuf::from("history.json"),
            history_limit: DEFAULT_HISTORY_LIMIT,
            top_k: 3,
            static_dir: PathBuf::from("static"),
            body_limit_bytes: 10 * 1024 * 1024,
            intra_threads: 4,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup, falling back to defaults
    /// for keys that are absent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let config = Config {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "PORT", defaults.port)?,
            model_path: lookup("MODEL_PATH").map(PathBuf::from).unwrap_or(defaults.model_path),
            model_url: lookup("MODEL_URL").unwrap_or(defaults.model_url),
            labels_path: lookup("LABELS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.labels_path),
            labels_url: lookup("LABELS_URL").unwrap_or(defaults.labels_url),
            history_path: lookup("HISTORY_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.history_path),
            history_limit: parse_or(&lookup, "HISTORY_LIMIT", defaults.history_limit)?,
            top_k: parse_or(&lookup, "TOP_K", defaults.top_k)?,
            static_dir: lookup("STATIC_DIR").map(PathBuf::from).unwrap_or(defaults.static_dir),
            body_limit_bytes: parse_or(&lookup, "BODY_LIMIT_BYTES", defaults.body_limit_bytes)?,
            intra_threads: parse_or(&lookup, "INTRA_THREADS", defaults.intra_threads)?,
        };

        if config.history_limit == 0 {
            return Err(ConfigError::InvalidValue("HISTORY_LIMIT".to_string()));
        }
        if config.top_k == 0 {
            return Err(ConfigError::InvalidValue("TOP_K".to_string()));
        }

        Ok(config)
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(var) => write!(f, "Invalid value for: {}", var),
        }
    }
}

impl std::error::Error for ConfigError {}
