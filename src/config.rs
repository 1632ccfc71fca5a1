//! Configuration for the funnel bot
//!
//! Loads configuration from config.yml; `${VAR}` placeholders and well-known
//! environment variables (`BOT_TOKEN`, `PORT`, `MYSQL_*`) fill in the rest.

use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::bot::KeyboardMode;
use crate::error::{Error, Result};
use crate::funnel::{FunnelMode, Links};
use crate::leads::{LeadSinkKind, MySqlSettings, PersistencePolicy};

pub const CONFIG_FILE: &str = "config.yml";
pub const DEFAULT_CSV_PATH: &str = "leads.csv";
pub const DEFAULT_KEEPALIVE_INTERVAL_SECS: u64 = 600;
pub const MAX_SESSION_TTL_SECS: u64 = 365 * 24 * 60 * 60;
pub const BOT_NAME: &str = "fitness_funnel_bot";

/// YAML config structures
#[derive(Debug, Default, Deserialize)]
struct YamlConfig {
    telegram: Option<TelegramConfig>,
    funnel: Option<FunnelConfig>,
    leads: Option<LeadsConfig>,
    mysql: Option<YamlMySqlConfig>,
    server: Option<ServerConfig>,
    sessions: Option<SessionsConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct TelegramConfig {
    token: Option<String>,
    keyboard: Option<KeyboardMode>,
}

#[derive(Debug, Default, Deserialize)]
struct FunnelConfig {
    mode: Option<FunnelMode>,
    links: Option<Links>,
}

#[derive(Debug, Default, Deserialize)]
struct LeadsConfig {
    sink: Option<LeadSinkKind>,
    csv_path: Option<PathBuf>,
    policy: Option<PersistencePolicy>,
}

#[derive(Debug, Default, Deserialize)]
struct YamlMySqlConfig {
    host: Option<String>,
    #[serde(default, deserialize_with = "deserialize_string_or_number")]
    port: Option<String>,
    database: Option<String>,
    user: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerConfig {
    health_addr: Option<String>,
    keepalive_url: Option<String>,
    #[serde(default, deserialize_with = "deserialize_string_or_number")]
    keepalive_interval_secs: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SessionsConfig {
    #[serde(default, deserialize_with = "deserialize_string_or_number")]
    ttl_secs: Option<String>,
}

/// Deserialize a value that can be either a string or a number
fn deserialize_string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value: Option<serde_yaml::Value> = Option::deserialize(deserializer)?;
    match value {
        None => Ok(None),
        Some(serde_yaml::Value::String(s)) => Ok(Some(s)),
        Some(serde_yaml::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected string or number, got {:?}",
            other
        ))),
    }
}

/// Main configuration struct
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub keyboard: KeyboardMode,
    pub funnel_mode: FunnelMode,
    pub links: Links,
    pub lead_sink: LeadSinkKind,
    pub csv_path: PathBuf,
    pub persistence_policy: PersistencePolicy,
    pub mysql: MySqlSettings,
    pub health_addr: Option<SocketAddr>,
    pub keepalive_url: Option<String>,
    pub keepalive_interval: Duration,
    pub session_ttl: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Config {
    /// Load `config.yml` (or `../config.yml`); fall back to environment-only settings.
    pub fn load() -> Result<Self> {
        if Path::new(CONFIG_FILE).exists() {
            return Self::load_from_file(CONFIG_FILE);
        }
        let parent = Path::new("..").join(CONFIG_FILE);
        if parent.exists() {
            return Self::load_from_file(parent);
        }
        Self::load_dotenv();
        Self::from_yaml(YamlConfig::default())
    }

    /// Resolve a value: prefer env var if config value looks like ${VAR}
    fn resolve_env_string(value: Option<String>, env_key: &str) -> Option<String> {
        if let Some(ref v) = value {
            if let Some(var_name) = v.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
                return std::env::var(var_name)
                    .ok()
                    .or_else(|| std::env::var(env_key).ok())
                    .filter(|s| !s.is_empty());
            }
            return Some(v.clone());
        }
        std::env::var(env_key).ok().filter(|s| !s.is_empty())
    }

    /// Resolve a numeric value from string config or env var
    fn resolve_env_u64(value: Option<String>, env_key: &str) -> Result<Option<u64>> {
        match Self::resolve_env_string(value, env_key) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Some)
                .map_err(|_| Error::ConfigError(format!("{} must be a number, got '{}'", env_key, raw))),
        }
    }

    /// Load .env file into environment variables using dotenvy
    fn load_dotenv() {
        if dotenvy::dotenv().is_err() {
            let _ = dotenvy::from_filename("../.env");
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_dotenv();

        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::ConfigError(format!("Failed to read config file {}: {}", path.as_ref().display(), e))
        })?;

        let yaml: YamlConfig = serde_yaml::from_str(&content)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config file: {}", e)))?;

        Self::from_yaml(yaml)
    }

    fn from_yaml(yaml: YamlConfig) -> Result<Self> {
        let telegram = yaml.telegram.unwrap_or_default();
        let funnel = yaml.funnel.unwrap_or_default();
        let leads = yaml.leads.unwrap_or_default();
        let mysql = yaml.mysql.unwrap_or_default();
        let server = yaml.server.unwrap_or_default();
        let sessions = yaml.sessions.unwrap_or_default();

        let env_mysql = MySqlSettings::from_env();
        let mysql = MySqlSettings {
            host: Self::resolve_env_string(mysql.host, "MYSQL_HOST").unwrap_or(env_mysql.host),
            port: Self::resolve_env_u64(mysql.port, "MYSQL_PORT")?
                .map(|p| {
                    u16::try_from(p)
                        .map_err(|_| Error::ConfigError(format!("MYSQL_PORT out of range: {}", p)))
                })
                .transpose()?
                .unwrap_or(env_mysql.port),
            database: Self::resolve_env_string(mysql.database, "MYSQL_DATABASE")
                .unwrap_or(env_mysql.database),
            user: Self::resolve_env_string(mysql.user, "MYSQL_USER").unwrap_or(env_mysql.user),
            password: Self::resolve_env_string(mysql.password, "MYSQL_PASSWORD")
                .unwrap_or(env_mysql.password),
        };

        let health_addr = match Self::resolve_env_string(server.health_addr, "HEALTH_ADDR") {
            Some(raw) => Some(raw.parse::<SocketAddr>().map_err(|e| {
                Error::ConfigError(format!("Invalid health address '{}': {}", raw, e))
            })?),
            None => Self::resolve_env_u64(None, "PORT")?
                .and_then(|p| u16::try_from(p).ok())
                .map(|port| SocketAddr::from(([0, 0, 0, 0], port))),
        };

        let keepalive_interval = Self::resolve_env_u64(
            server.keepalive_interval_secs,
            "KEEPALIVE_INTERVAL_SECS",
        )?
        .unwrap_or(DEFAULT_KEEPALIVE_INTERVAL_SECS);

        let session_ttl = match Self::resolve_env_u64(sessions.ttl_secs, "SESSION_TTL_SECS")? {
            Some(secs) if secs > MAX_SESSION_TTL_SECS => {
                return Err(Error::ConfigError(format!(
                    "sessions.ttl_secs must be at most {} (one year), got {}",
                    MAX_SESSION_TTL_SECS, secs
                )));
            }
            Some(0) | None => None,
            Some(secs) => Some(Duration::from_secs(secs)),
        };

        Ok(Self {
            bot_token: Self::resolve_env_string(telegram.token, "BOT_TOKEN").unwrap_or_default(),
            keyboard: telegram.keyboard.unwrap_or_default(),
            funnel_mode: funnel.mode.unwrap_or_default(),
            links: funnel.links.unwrap_or_default(),
            lead_sink: leads.sink.unwrap_or_default(),
            csv_path: leads
                .csv_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CSV_PATH)),
            persistence_policy: leads.policy.unwrap_or_default(),
            mysql,
            health_addr,
            keepalive_url: Self::resolve_env_string(server.keepalive_url, "KEEPALIVE_URL"),
            keepalive_interval: Duration::from_secs(keepalive_interval.max(1)),
            session_ttl,
        })
    }

    /// Create config with empty defaults (fallback)
    fn defaults() -> Self {
        Self {
            bot_token: String::new(),
            keyboard: KeyboardMode::default(),
            funnel_mode: FunnelMode::default(),
            links: Links::default(),
            lead_sink: LeadSinkKind::default(),
            csv_path: PathBuf::from(DEFAULT_CSV_PATH),
            persistence_policy: PersistencePolicy::default(),
            mysql: MySqlSettings::default(),
            health_addr: None,
            keepalive_url: None,
            keepalive_interval: Duration::from_secs(DEFAULT_KEEPALIVE_INTERVAL_SECS),
            session_ttl: None,
        }
    }

    /// Checks required to start the bot; a missing token is fatal.
    pub fn validate(&self) -> Result<()> {
        if self.bot_token.trim().is_empty() {
            return Err(Error::ConfigError(
                "BOT_TOKEN is not set (telegram.token in config.yml or BOT_TOKEN env)".to_string(),
            ));
        }
        Ok(())
    }

    /// Human-readable summary without secrets.
    pub fn summary(&self) -> String {
        let sink = match self.lead_sink {
            LeadSinkKind::Csv => format!("csv ({})", self.csv_path.display()),
            LeadSinkKind::Mysql => format!(
                "mysql ({}@{}:{}/{})",
                self.mysql.user, self.mysql.host, self.mysql.port, self.mysql.database
            ),
            LeadSinkKind::None => "none".to_string(),
        };
        let health = self
            .health_addr
            .map(|a| a.to_string())
            .unwrap_or_else(|| "disabled".to_string());
        let keepalive = match &self.keepalive_url {
            Some(url) => format!("{} every {}s", url, self.keepalive_interval.as_secs()),
            None => "disabled".to_string(),
        };
        let ttl = self
            .session_ttl
            .map(|t| format!("{}s", t.as_secs()))
            .unwrap_or_else(|| "unbounded".to_string());

        format!(
            "token: {}\nkeyboard: {:?}\nfunnel mode: {:?}\nlead sink: {}\npersistence policy: {:?}\nhealth endpoint: {}\nkeep-alive: {}\nsession ttl: {}",
            if self.bot_token.is_empty() { "missing" } else { "set" },
            self.keyboard,
            self.funnel_mode,
            sink,
            self.persistence_policy,
            health,
            keepalive,
            ttl,
        )
    }
}
