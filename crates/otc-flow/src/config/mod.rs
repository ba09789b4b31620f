use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use crate::workflows::packs::{DirectorySource, HttpSource, RuleSource};

const DEFAULT_RULES_BASE: &str = "rules";
const DEFAULT_RULES_TIMEOUT_SECS: &str = "10";

/// Deployment stage. Production refuses to fetch rule bundles over plain HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Everything the decision-support service reads from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub rules: RulesConfig,
}

fn setting(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl AppConfig {
    /// Reads `APP_*` and `OTC_RULES_*`, after loading a `.env` file when present.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::parse(&setting("APP_ENV", "development"));
        let port = setting("APP_PORT", "3000")
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;
        let timeout_secs = setting("OTC_RULES_TIMEOUT_SECS", DEFAULT_RULES_TIMEOUT_SECS)
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidTimeout)?;

        let rules = RulesConfig {
            base: setting("OTC_RULES_BASE", DEFAULT_RULES_BASE),
            timeout: Duration::from_secs(timeout_secs),
        };
        if environment == AppEnvironment::Production && rules.is_plain_http() {
            return Err(ConfigError::InsecureRulesBase(rules.base));
        }

        Ok(Self {
            environment,
            server: ServerConfig {
                host: setting("APP_HOST", "127.0.0.1"),
                port,
            },
            telemetry: TelemetryConfig {
                log_level: setting("APP_LOG_LEVEL", "info"),
            },
            rules,
        })
    }
}

/// HTTP listener address.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = if self.host.eq_ignore_ascii_case("localhost") {
            IpAddr::from([127, 0, 0, 1])
        } else {
            self.host
                .parse()
                .map_err(|source| ConfigError::InvalidHost { source })?
        };
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Location of the signed rule bundle: a directory or an HTTP(S) base URL.
#[derive(Debug, Clone)]
pub struct RulesConfig {
    pub base: String,
    pub timeout: Duration,
}

impl RulesConfig {
    pub fn is_remote(&self) -> bool {
        let lower = self.base.to_ascii_lowercase();
        lower.starts_with("http://") || lower.starts_with("https://")
    }

    fn is_plain_http(&self) -> bool {
        self.base.to_ascii_lowercase().starts_with("http://")
    }

    /// Builds the fetcher matching the configured base.
    pub fn source(&self) -> Arc<dyn RuleSource> {
        if self.is_remote() {
            Arc::new(HttpSource::new(&self.base, self.timeout))
        } else {
            Arc::new(DirectorySource::new(&self.base))
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidTimeout,
    InsecureRulesBase(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTimeout => {
                write!(f, "OTC_RULES_TIMEOUT_SECS must be a whole number of seconds")
            }
            ConfigError::InsecureRulesBase(base) => {
                write!(f, "OTC_RULES_BASE '{base}' must use https in production")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};

    const KEYS: [&str; 6] = [
        "APP_ENV",
        "APP_HOST",
        "APP_PORT",
        "APP_LOG_LEVEL",
        "OTC_RULES_BASE",
        "OTC_RULES_TIMEOUT_SECS",
    ];

    fn with_env<T>(vars: &[(&str, &str)], check: impl FnOnce() -> T) -> T {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        let _lock = GUARD
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        KEYS.iter().for_each(|key| env::remove_var(key));
        for (key, value) in vars {
            env::set_var(key, value);
        }
        let outcome = check();
        KEYS.iter().for_each(|key| env::remove_var(key));
        outcome
    }

    #[test]
    fn defaults_point_at_the_local_bundle() {
        let config = with_env(&[], AppConfig::load).expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.rules.base, "rules");
        assert_eq!(config.rules.timeout, Duration::from_secs(10));
        assert!(!config.rules.is_remote());
    }

    #[test]
    fn localhost_binds_loopback() {
        let config = with_env(&[("APP_HOST", "localhost"), ("APP_PORT", "8088")], AppConfig::load)
            .expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 8088));
    }

    #[test]
    fn production_accepts_https_bundles_only() {
        let config = with_env(
            &[
                ("APP_ENV", "production"),
                ("OTC_RULES_BASE", "HTTPS://rules.example.org/otc"),
            ],
            AppConfig::load,
        )
        .expect("https base loads");
        assert!(config.rules.is_remote());
        assert_eq!(config.environment, AppEnvironment::Production);

        let error = with_env(
            &[
                ("APP_ENV", "prod"),
                ("OTC_RULES_BASE", "http://rules.example.org/otc"),
            ],
            AppConfig::load,
        )
        .expect_err("plain http refused");
        assert!(matches!(error, ConfigError::InsecureRulesBase(_)));

        let dev = with_env(
            &[("OTC_RULES_BASE", "http://localhost:8000/rules")],
            AppConfig::load,
        )
        .expect("development allows plain http");
        assert!(dev.rules.is_remote());
    }

    #[test]
    fn rejects_non_numeric_timeout() {
        let error = with_env(&[("OTC_RULES_TIMEOUT_SECS", "soon")], AppConfig::load)
            .expect_err("timeout must be numeric");
        assert!(matches!(error, ConfigError::InvalidTimeout));
    }
}
