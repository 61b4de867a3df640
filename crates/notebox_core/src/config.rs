//! Deployment configuration.
//!
//! # Responsibility
//! - Describe every listening component and the store location.
//! - Load an optional TOML file where every field has a default.
//!
//! # Invariants
//! - A validated config always has parseable listen addresses and a
//!   non-empty store path.
//! - A validated upstream is a bare `http://host[:port]` origin: no path,
//!   query, fragment or credentials.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

#[cfg(feature = "relational-db")]
use crate::external_db::{AdminConsoleConfig, RelationalDbConfig};

pub const DEFAULT_STORE_PATH: &str = "data/notes.db";
pub const DEFAULT_SERVICE_LISTEN: &str = "0.0.0.0:5000";
pub const DEFAULT_PROXY_LISTEN: &str = "0.0.0.0:8080";
pub const DEFAULT_PROXY_UPSTREAM: &str = "http://127.0.0.1:5000";

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(String),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(message) => write!(f, "failed to parse config: {message}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(_) | Self::Invalid(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite file holding the `notes` table.
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_STORE_PATH),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub listen: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_SERVICE_LISTEN.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub listen: String,
    /// Base URL of the single upstream note service.
    pub upstream: String,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_PROXY_LISTEN.to_string(),
            upstream: DEFAULT_PROXY_UPSTREAM.to_string(),
            timeout_secs: 30,
            connect_timeout_secs: 5,
        }
    }
}

impl ProxyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Parses `upstream` into the origin every request is forwarded to.
    pub fn upstream_url(&self) -> Result<Url, ConfigError> {
        parse_upstream(&self.upstream)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `trace|debug|info|warn|error`; build-mode default when unset.
    pub level: Option<String>,
    /// Absolute directory for rolling log files; stderr when unset.
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub service: ServiceConfig,
    pub proxy: ProxyConfig,
    pub logging: LoggingConfig,
    #[cfg(feature = "relational-db")]
    pub database: RelationalDbConfig,
    #[cfg(feature = "relational-db")]
    pub admin_console: AdminConsoleConfig,
}

impl AppConfig {
    /// Parses a TOML document. Missing sections fall back to defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(source).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Loads `path` when given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("store.path cannot be empty".to_string()));
        }
        self.service_addr()?;
        self.proxy_addr()?;
        self.proxy.upstream_url()?;
        if self.proxy.timeout_secs == 0 || self.proxy.connect_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "proxy timeouts must be at least one second".to_string(),
            ));
        }
        if let Some(dir) = &self.logging.dir {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "logging.dir must be absolute, got `{}`",
                    dir.display()
                )));
            }
        }
        Ok(())
    }

    pub fn service_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_listen("service.listen", &self.service.listen)
    }

    pub fn proxy_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_listen("proxy.listen", &self.proxy.listen)
    }
}

fn parse_listen(field: &str, value: &str) -> Result<SocketAddr, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|err| ConfigError::Invalid(format!("{field} `{value}`: {err}")))
}

fn parse_upstream(upstream: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: &str| {
        ConfigError::Invalid(format!("proxy.upstream `{upstream}`: {reason}"))
    };

    let url = Url::parse(upstream.trim()).map_err(|err| invalid(&err.to_string()))?;
    if url.scheme() != "http" {
        return Err(invalid("scheme must be http"));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host"));
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(invalid("credentials are not supported"));
    }
    if url.path() != "/" {
        return Err(invalid("path prefixes are not supported"));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("query and fragment are not allowed"));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigError, DEFAULT_PROXY_UPSTREAM};
    use std::path::PathBuf;

    #[test]
    fn empty_document_yields_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.service_addr().unwrap().port(), 5000);
        assert_eq!(config.proxy_addr().unwrap().port(), 8080);
        assert_eq!(config.proxy.upstream, DEFAULT_PROXY_UPSTREAM);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [store]
            path = "/var/lib/notebox/notes.db"

            [proxy]
            upstream = "http://web:5000"
            "#,
        )
        .unwrap();
        assert_eq!(config.store.path, PathBuf::from("/var/lib/notebox/notes.db"));
        assert_eq!(config.proxy.upstream, "http://web:5000");
        assert_eq!(config.proxy.timeout_secs, 30);
    }

    #[test]
    fn rejects_bad_listen_address() {
        let err = AppConfig::from_toml_str("[service]\nlisten = \"localhost\"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_non_http_upstream() {
        let err = AppConfig::from_toml_str("[proxy]\nupstream = \"https://web\"").unwrap_err();
        assert!(err.to_string().contains("scheme must be http"));
    }

    #[test]
    fn rejects_malformed_upstreams() {
        for upstream in [
            "http://web:notaport",
            "http://we b:5000",
            "http://:5000",
            "http://web:5000#frag",
            "http://web:5000/?x=1",
            "http://web:5000/app",
            "http://user:pw@web:5000",
            "web:5000",
        ] {
            let source = format!("[proxy]\nupstream = \"{upstream}\"");
            let err = AppConfig::from_toml_str(&source).unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid(_)),
                "{upstream} should be rejected, got {err}"
            );
        }
    }

    #[test]
    fn upstream_url_keeps_host_and_port() {
        let config = AppConfig::from_toml_str("[proxy]\nupstream = \"http://web:5000/\"").unwrap();
        let url = config.proxy.upstream_url().unwrap();
        assert_eq!(url.host_str(), Some("web"));
        assert_eq!(url.port(), Some(5000));
        assert_eq!(url.path(), "/");
    }

    #[test]
    fn rejects_relative_log_dir() {
        let err = AppConfig::from_toml_str("[logging]\ndir = \"logs\"").unwrap_err();
        assert!(err.to_string().contains("absolute"));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = AppConfig::from_toml_str("[store").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
