use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::{env, fmt, fs, path::PathBuf, str::FromStr, time::Duration};
use thiserror::Error;
use url::Url;

const ENV_BASE_URL: &str = "PORTAL_BASE_URL";
const ENV_LOG_LEVEL: &str = "PORTAL_LOG_LEVEL";
const ENV_LOG_FORMAT: &str = "PORTAL_LOG_FORMAT";
const ENV_SESSION_FILE: &str = "PORTAL_SESSION_FILE";

const DEFAULT_BASE_URL: &str = "http://localhost:8000/";

/// Errors raised while resolving the client configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file extension is not one we can parse.
    #[error("Unsupported configuration format. Use 'yaml', 'json' or 'toml'.")]
    UnsupportedFormat,

    /// The configuration file could not be parsed.
    #[error("failed to parse configuration file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// The backend base URL is malformed or not http(s).
    #[error("Invalid base URL '{value}': {reason}")]
    InvalidBaseUrl { value: String, reason: String },

    /// An environment override has an unusable value.
    #[error("Invalid {name} value: {message}")]
    InvalidEnv { name: &'static str, message: String },
}

/// Output format for diagnostic logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Json => f.write_str("json"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}', expected 'text' or 'json'")),
        }
    }
}

/// How long transient messages stay on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageTimings {
    /// Login and logout confirmations, in milliseconds.
    pub auth_confirmation_ms: u64,

    /// Signup and unregister results, in milliseconds.
    pub action_result_ms: u64,
}

impl Default for MessageTimings {
    fn default() -> Self {
        Self {
            auth_confirmation_ms: 3_000,
            action_result_ms: 5_000,
        }
    }
}

impl MessageTimings {
    /// Display duration for login/logout confirmations.
    #[must_use]
    pub const fn auth_confirmation(&self) -> Duration {
        Duration::from_millis(self.auth_confirmation_ms)
    }

    /// Display duration for signup/unregister results.
    #[must_use]
    pub const fn action_result(&self) -> Duration {
        Duration::from_millis(self.action_result_ms)
    }
}

/// The main configuration structure for the portal client.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    /// Root URL of the portal backend.
    pub base_url: Url,

    /// Default log level when `RUST_LOG` is unset.
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Cookie jar location; `None` selects the per-user default.
    pub session_file: Option<PathBuf>,

    /// `User-Agent` sent with every request.
    pub user_agent: String,

    /// Whole-request timeout; `None` leaves the transport default.
    pub request_timeout_secs: Option<u64>,

    /// Transient message display durations.
    pub messages: MessageTimings,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ClientConfig {
    /// Generates a default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            base_url: default_base_url(),
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            session_file: None,
            user_agent: concat!("signup-portal/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout_secs: None,
            messages: MessageTimings::default(),
        }
    }

    /// Loads the configuration from a file, environment variables, or defaults.
    ///
    /// Precedence, lowest first: defaults, the file at `config_path`
    /// (YAML, JSON or TOML by extension), `PORTAL_*` environment variables
    /// for values the file left at their default, then `base_url_override`.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] if the file cannot be read or parsed, or a
    /// resolved value is invalid.
    pub fn load_config(
        config_path: Option<PathBuf>,
        base_url_override: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let defaults = Self::with_defaults();
        let mut config = match config_path {
            Some(path) => Self::from_file(path)?,
            None => defaults.clone(),
        };

        if config.base_url == defaults.base_url {
            if let Ok(value) = env::var(ENV_BASE_URL) {
                config.base_url = parse_base_url(&value)?;
            }
        }
        if config.log_level == defaults.log_level {
            if let Ok(level) = env::var(ENV_LOG_LEVEL) {
                config.log_level = level;
            }
        }
        if config.log_format == defaults.log_format {
            if let Ok(format) = env::var(ENV_LOG_FORMAT) {
                config.log_format = format.parse().map_err(|message| ConfigError::InvalidEnv {
                    name: ENV_LOG_FORMAT,
                    message,
                })?;
            }
        }
        if config.session_file.is_none() {
            if let Ok(path) = env::var(ENV_SESSION_FILE) {
                config.session_file = Some(PathBuf::from(path));
            }
        }

        if let Some(url) = base_url_override {
            config.base_url = parse_base_url(url)?;
        }

        config.base_url = normalize_base_url(config.base_url)?;
        tracing::debug!(
            base_url = %config.base_url,
            log_level = %config.log_level,
            log_format = %config.log_format,
            "resolved client configuration"
        );
        Ok(config)
    }

    fn from_file(path: PathBuf) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let parse_error = |message: String| ConfigError::Parse {
            path: path.clone(),
            message,
        };

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => {
                serde_yml::from_str(&content).map_err(|err| parse_error(err.to_string()))
            }
            Some("json") => {
                serde_json::from_str(&content).map_err(|err| parse_error(err.to_string()))
            }
            Some("toml") => toml::from_str(&content).map_err(|err| parse_error(err.to_string())),
            _ => Err(ConfigError::UnsupportedFormat),
        }
    }

    /// The cookie jar path, falling back to the per-user config directory.
    #[must_use]
    pub fn resolved_session_file(&self) -> PathBuf {
        self.session_file.clone().unwrap_or_else(default_session_path)
    }

    /// The request timeout as a [`Duration`], if configured.
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

/// Default cookie jar location under the user's configuration directory.
#[must_use]
pub fn default_session_path() -> PathBuf {
    BaseDirs::new()
        .map(|dirs| {
            dirs.config_dir()
                .join("signup-portal")
                .join("session.cookies")
        })
        .unwrap_or_else(|| PathBuf::from("./session.cookies"))
}

fn default_base_url() -> Url {
    Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid")
}

fn parse_base_url(value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value.trim()).map_err(|err| ConfigError::InvalidBaseUrl {
        value: value.to_string(),
        reason: err.to_string(),
    })?;
    normalize_base_url(url)
}

/// Ensures the URL is http(s) and ends in `/` so endpoint joins stay under it.
fn normalize_base_url(mut url: Url) -> Result<Url, ConfigError> {
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidBaseUrl {
            value: url.to_string(),
            reason: "scheme must be http or https".to_string(),
        });
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}
