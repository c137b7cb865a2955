//! Layered runtime configuration.
//!
//! Precedence, lowest first: built-in defaults, the TOML file, `VENDORHUB_*`
//! environment variables, then programmatic [`ConfigOverrides`].

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILES: [&str; 2] = ["vendorhub.toml", "config/vendorhub.toml"];

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://vendorhub.db?mode=rwc".to_string(),
            max_connections: 5,
            timeout_secs: 30,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_address: "127.0.0.1".to_string(), port: 8000, graceful_shutdown_secs: 15 }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Compact }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

/// One configuration field settable from the environment.
///
/// `keys` are checked in order; the first non-blank value wins.
pub struct EnvBinding {
    pub field: &'static str,
    pub keys: &'static [&'static str],
    apply: fn(&mut AppConfig, &str, &str) -> Result<(), ConfigError>,
}

pub static ENV_BINDINGS: &[EnvBinding] = &[
    EnvBinding {
        field: "database.url",
        keys: &["VENDORHUB_DATABASE_URL"],
        apply: |config, _, value| {
            config.database.url = value.to_string();
            Ok(())
        },
    },
    EnvBinding {
        field: "database.max_connections",
        keys: &["VENDORHUB_DATABASE_MAX_CONNECTIONS"],
        apply: |config, key, value| {
            config.database.max_connections = parse_env(key, value)?;
            Ok(())
        },
    },
    EnvBinding {
        field: "database.timeout_secs",
        keys: &["VENDORHUB_DATABASE_TIMEOUT_SECS"],
        apply: |config, key, value| {
            config.database.timeout_secs = parse_env(key, value)?;
            Ok(())
        },
    },
    EnvBinding {
        field: "server.bind_address",
        keys: &["VENDORHUB_SERVER_BIND_ADDRESS"],
        apply: |config, _, value| {
            config.server.bind_address = value.to_string();
            Ok(())
        },
    },
    EnvBinding {
        field: "server.port",
        keys: &["VENDORHUB_SERVER_PORT"],
        apply: |config, key, value| {
            config.server.port = parse_env(key, value)?;
            Ok(())
        },
    },
    EnvBinding {
        field: "server.graceful_shutdown_secs",
        keys: &["VENDORHUB_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        apply: |config, key, value| {
            config.server.graceful_shutdown_secs = parse_env(key, value)?;
            Ok(())
        },
    },
    EnvBinding {
        field: "logging.level",
        keys: &["VENDORHUB_LOGGING_LEVEL", "VENDORHUB_LOG_LEVEL"],
        apply: |config, _, value| {
            config.logging.level = value.to_string();
            Ok(())
        },
    },
    EnvBinding {
        field: "logging.format",
        keys: &["VENDORHUB_LOGGING_FORMAT", "VENDORHUB_LOG_FORMAT"],
        apply: |config, _, value| {
            config.logging.format = value.parse()?;
            Ok(())
        },
    },
];

impl EnvBinding {
    /// The first bound variable currently set to a non-blank value.
    pub fn active(&self) -> Option<(&'static str, String)> {
        self.keys.iter().find_map(|key| read_env(key).map(|value| (*key, value)))
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = match resolve_config_path(options.config_path.as_deref()) {
            Some(path) => read_file(&path)?,
            None if options.require_file => {
                return Err(ConfigError::MissingConfigFile(
                    options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILES[0])),
                ));
            }
            None => Self::default(),
        };

        for binding in ENV_BINDINGS {
            if let Some((key, value)) = binding.active() {
                (binding.apply)(&mut config, key, &value)?;
            }
        }
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(bind_address) = overrides.bind_address {
            self.server.bind_address = bind_address;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
    }

    /// Reports every invalid field at once, separated by `; `.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let problems: Vec<&str> = [
            (!is_sqlite_url(&self.database.url)).then_some(
                "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)",
            ),
            (self.database.max_connections == 0)
                .then_some("database.max_connections must be greater than zero"),
            (!(1..=300).contains(&self.database.timeout_secs))
                .then_some("database.timeout_secs must be in range 1..=300"),
            self.server.bind_address.trim().is_empty()
                .then_some("server.bind_address must not be blank"),
            (self.server.port == 0).then_some("server.port must be greater than zero"),
            (self.server.graceful_shutdown_secs == 0)
                .then_some("server.graceful_shutdown_secs must be greater than zero"),
            (!matches!(
                self.logging.level.trim().to_ascii_lowercase().as_str(),
                "trace" | "debug" | "info" | "warn" | "error"
            ))
            .then_some("logging.level must be one of trace|debug|info|warn|error"),
        ]
        .into_iter()
        .flatten()
        .collect();

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(problems.join("; ")))
        }
    }
}

fn is_sqlite_url(url: &str) -> bool {
    let url = url.trim();
    url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:"
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    match explicit_path {
        Some(path) => path.exists().then(|| path.to_path_buf()),
        None => DEFAULT_CONFIG_FILES.into_iter().map(PathBuf::from).find(|path| path.exists()),
    }
}

fn read_file(path: &Path) -> Result<AppConfig, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    toml::from_str(&interpolate(&raw)?)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

/// Expands `${VAR}` and `${VAR:-fallback}` from the process environment.
fn interpolate(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let end = after_open.find('}').ok_or(ConfigError::UnterminatedInterpolation)?;
        let expression = &after_open[..end];

        let (name, fallback) = match expression.split_once(":-") {
            Some((name, fallback)) => (name, Some(fallback)),
            None => (expression, None),
        };
        match (env::var(name), fallback) {
            (Ok(value), _) => output.push_str(&value),
            (Err(_), Some(fallback)) => output.push_str(fallback),
            (Err(_), None) => {
                return Err(ConfigError::MissingEnvInterpolation { var: name.to_string() })
            }
        }

        rest = &after_open[end + 1..];
    }

    output.push_str(rest);
    Ok(output)
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}
