use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use crate::error::ConfigError;

/// Everything `serve` needs.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub worker: WorkerConfig,
    pub mail: MailConfig,
    pub youtube: YoutubeConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            server: ServerConfig::from_lookup(&lookup)?,
            store: StoreConfig::from_lookup(&lookup),
            worker: WorkerConfig::from_lookup(&lookup)?,
            mail: MailConfig::from_lookup(&lookup)?,
            youtube: YoutubeConfig::from_lookup(&lookup)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            bind_address: lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 5000)?,
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.bind_address, self.port);
        raw.parse().map_err(|_| ConfigError::Invalid {
            name: "BIND_ADDRESS",
            value: self.bind_address.clone(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub queue_file: PathBuf,
}

impl StoreConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            queue_file: lookup("QUEUE_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("request_queue.json")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Sleep between polls of an empty queue.
    pub poll_interval: Duration,
    /// Sleep after a fault in the queue machinery itself.
    pub error_backoff: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            error_backoff: Duration::from_secs(5),
        }
    }
}

impl WorkerConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            poll_interval: Duration::from_secs(parse_or(&lookup, "WORKER_POLL_INTERVAL_SECS", 1)?),
            error_backoff: Duration::from_secs(parse_or(&lookup, "WORKER_ERROR_BACKOFF_SECS", 5)?),
        })
    }
}

#[derive(Clone)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl MailConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            smtp_host: lookup("SMTP_HOST").unwrap_or_else(|| "smtp.gmail.com".to_string()),
            smtp_port: parse_or(&lookup, "SMTP_PORT", 465)?,
            username: lookup("GMAIL_USER").ok_or(ConfigError::Missing("GMAIL_USER"))?,
            password: lookup("GMAIL_APP_PASSWORD")
                .ok_or(ConfigError::Missing("GMAIL_APP_PASSWORD"))?,
        })
    }
}

#[derive(Clone)]
pub struct YoutubeConfig {
    pub api_key: String,
    pub api_base: String,
}

impl std::fmt::Debug for YoutubeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoutubeConfig")
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl YoutubeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: lookup("YOUTUBE_API_KEY").ok_or(ConfigError::Missing("YOUTUBE_API_KEY"))?,
            api_base: lookup("YOUTUBE_API_BASE")
                .unwrap_or_else(|| "https://www.googleapis.com/youtube/v3".to_string()),
        })
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub filter: String,
    pub file: PathBuf,
}

impl LogConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            filter: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            file: lookup("LOG_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("app.log")),
        }
    }
}

/// Reads a variable, treating blank values as unset.
fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_or<T: FromStr>(
    lookup: impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}
