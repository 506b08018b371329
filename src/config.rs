use std::{fmt, path::PathBuf, str::FromStr, time::Duration};

use anyhow::{bail, Context, Result};

use crate::store::StoreOptions;

/// Severity threshold for the default log filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => bail!("log level '{other}' is invalid (valid: debug, info, warn, error)"),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        })
    }
}

/// Where log lines are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Stderr,
    File,
    Both,
}

impl LogOutput {
    pub fn to_stderr(self) -> bool {
        matches!(self, Self::Stderr | Self::Both)
    }

    pub fn to_file(self) -> bool {
        matches!(self, Self::File | Self::Both)
    }
}

impl FromStr for LogOutput {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "stderr" => Ok(Self::Stderr),
            "file" => Ok(Self::File),
            "both" => Ok(Self::Both),
            other => bail!("log output '{other}' is invalid (valid: stderr, file, both)"),
        }
    }
}

/// Scheme used when building the short URL handed back to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http,
    Https,
}

impl FromStr for Protocol {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "http" => Ok(Self::Http),
            "https" => Ok(Self::Https),
            other => bail!("protocol '{other}' is invalid (valid: http, https)"),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Http => "http",
            Self::Https => "https",
        })
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite connection string, e.g. "sqlite:./tinyurl.db"
    pub database_url: String,

    /// Upper bound on pooled SQLite connections
    pub max_connections: u32,

    /// Host to bind the HTTP server to, e.g. "0.0.0.0"
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Scheme of the short URLs returned by the API
    pub protocol: Protocol,

    pub log_level: LogLevel,
    pub log_output: LogOutput,
    pub log_file: PathBuf,

    /// Length of generated short codes
    pub code_length: usize,

    /// Insert attempts per allocation before giving up
    pub max_allocation_attempts: u32,

    /// Deadline for a single store operation made on behalf of a request
    pub request_timeout: Duration,

    /// Timeout of the reachability check run against submitted origins
    pub probe_timeout: Duration,

    /// Whether submitted origins must answer with 2xx before being stored
    pub probe_origins: bool,
}

impl AppConfig {
    /// Load configuration from environment variables (populated by dotenvy before this is called).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup. Empty values
    /// count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = parse_or(var("PORT"), 3000u16, "PORT must be a valid port number (1–65535)")?;

        let max_connections = parse_or(
            var("DATABASE_MAX_CONNECTIONS"),
            10u32,
            "DATABASE_MAX_CONNECTIONS must be a positive integer",
        )?;
        if max_connections == 0 {
            bail!("DATABASE_MAX_CONNECTIONS must be at least 1");
        }

        let code_length = parse_or(
            var("CODE_LENGTH"),
            StoreOptions::default().code_length,
            "CODE_LENGTH must be a positive integer",
        )?;
        if code_length == 0 {
            bail!("CODE_LENGTH must be at least 1");
        }

        let max_allocation_attempts = parse_or(
            var("MAX_ALLOCATION_ATTEMPTS"),
            StoreOptions::default().max_attempts,
            "MAX_ALLOCATION_ATTEMPTS must be a positive integer",
        )?;
        if max_allocation_attempts == 0 {
            bail!("MAX_ALLOCATION_ATTEMPTS must be at least 1");
        }

        let request_timeout = parse_secs(var("REQUEST_TIMEOUT_SECS"), 5, "REQUEST_TIMEOUT_SECS")?;
        let probe_timeout = parse_secs(var("PROBE_TIMEOUT_SECS"), 10, "PROBE_TIMEOUT_SECS")?;

        let probe_origins = parse_or(
            var("PROBE_ORIGINS"),
            true,
            "PROBE_ORIGINS must be 'true' or 'false'",
        )?;

        Ok(Self {
            database_url: var("DATABASE_URL").unwrap_or_else(|| "sqlite:./tinyurl.db".into()),
            max_connections,
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            protocol: var("PROTOCOL").as_deref().unwrap_or("http").parse()?,
            log_level: var("LOG_LEVEL").as_deref().unwrap_or("info").parse()?,
            log_output: var("LOG_OUTPUT").as_deref().unwrap_or("stderr").parse()?,
            log_file: var("LOG_FILE")
                .unwrap_or_else(|| "./tinyurl.log".into())
                .into(),
            code_length,
            max_allocation_attempts,
            request_timeout,
            probe_timeout,
            probe_origins,
        })
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            code_length: self.code_length,
            max_attempts: self.max_allocation_attempts,
        }
    }

    /// `host:port` the server binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T>(value: Option<String>, default: T, message: &'static str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(raw) => raw.trim().parse::<T>().context(message),
        None => Ok(default),
    }
}

fn parse_secs(value: Option<String>, default: u64, key: &str) -> Result<Duration> {
    let secs = match value {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("{key} must be a number of seconds"))?,
        None => default,
    };
    if secs == 0 {
        bail!("{key} must be at least 1 second");
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = load(&[]).unwrap();

        assert_eq!(config.database_url, "sqlite:./tinyurl.db");
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.protocol, Protocol::Http);
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.log_output, LogOutput::Stderr);
        assert_eq!(config.log_file, PathBuf::from("./tinyurl.log"));
        assert_eq!(config.code_length, 10);
        assert_eq!(config.max_allocation_attempts, 5);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.probe_timeout, Duration::from_secs(10));
        assert!(config.probe_origins);
    }

    #[test]
    fn partial_settings_keep_other_defaults() {
        let config = load(&[
            ("DATABASE_URL", "sqlite:/var/lib/tinyurl/urls.db"),
            ("PORT", "8080"),
            ("LOG_LEVEL", "debug"),
        ])
        .unwrap();

        assert_eq!(config.database_url, "sqlite:/var/lib/tinyurl/urls.db");
        assert_eq!(config.port, 8080);
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.protocol, Protocol::Http);
        assert_eq!(config.log_output, LogOutput::Stderr);
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn empty_values_count_as_unset() {
        let config = load(&[("PROTOCOL", ""), ("PORT", "  ")]).unwrap();
        assert_eq!(config.protocol, Protocol::Http);
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn store_options_follow_config() {
        let config = load(&[("CODE_LENGTH", "12"), ("MAX_ALLOCATION_ATTEMPTS", "3")]).unwrap();
        assert_eq!(
            config.store_options(),
            StoreOptions {
                code_length: 12,
                max_attempts: 3
            }
        );
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(load(&[("PROTOCOL", "ftp")]).is_err());
        assert!(load(&[("LOG_LEVEL", "verbose")]).is_err());
        assert!(load(&[("LOG_OUTPUT", "syslog")]).is_err());
        assert!(load(&[("PORT", "70000")]).is_err());
        assert!(load(&[("CODE_LENGTH", "0")]).is_err());
        assert!(load(&[("MAX_ALLOCATION_ATTEMPTS", "0")]).is_err());
        assert!(load(&[("REQUEST_TIMEOUT_SECS", "0")]).is_err());
        assert!(load(&[("PROBE_ORIGINS", "maybe")]).is_err());
    }

    #[test]
    fn log_output_targets() {
        assert!(LogOutput::Stderr.to_stderr() && !LogOutput::Stderr.to_file());
        assert!(!LogOutput::File.to_stderr() && LogOutput::File.to_file());
        assert!(LogOutput::Both.to_stderr() && LogOutput::Both.to_file());
    }

    #[test]
    fn https_protocol_round_trips_through_display() {
        let config = load(&[("PROTOCOL", "https")]).unwrap();
        assert_eq!(config.protocol.to_string(), "https");
    }
}
