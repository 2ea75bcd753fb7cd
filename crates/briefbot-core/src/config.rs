//! BriefBot configuration system.
//!
//! Built once at startup and shared read-only. Every field has a default so
//! an empty (or missing) config file yields a working Istanbul setup; only the
//! Telegram credentials have to be supplied before anything is delivered.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{BriefError, Result};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BriefConfig {
    /// IANA zone used for "today", the header clock and kickoff times.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_city")]
    pub city: String,
    /// Append the per-source status block to the digest.
    #[serde(default)]
    pub include_debug_sources: bool,
    /// Send at most once per calendar day from the timer.
    #[serde(default = "bool_true")]
    pub daily_dedupe: bool,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default)]
    pub location: LocationConfig,
    #[serde(default)]
    pub football: FootballConfig,
    #[serde(default)]
    pub metals: MetalsConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

fn bool_true() -> bool { true }
fn default_timezone() -> String { "Europe/Istanbul".into() }
fn default_city() -> String { "Istanbul".into() }
fn default_user_agent() -> String { "briefbot/1.0".into() }
fn default_http_timeout_secs() -> u64 { 15 }

impl Default for BriefConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            city: default_city(),
            include_debug_sources: false,
            daily_dedupe: true,
            user_agent: default_user_agent(),
            http_timeout_secs: default_http_timeout_secs(),
            location: LocationConfig::default(),
            football: FootballConfig::default(),
            metals: MetalsConfig::default(),
            telegram: TelegramConfig::default(),
            schedule: ScheduleConfig::default(),
            gateway: GatewayConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl BriefConfig {
    /// Load config from the default path, or defaults if it does not exist.
    pub fn load() -> Result<Self> {
        let path = std::env::var("BRIEFBOT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::default_path());
        if path.exists() {
            Self::load_from(&path)
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default().with_env_overrides())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| BriefError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml(&content).map(Self::with_env_overrides)
    }

    /// Parse a TOML document without touching the environment.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| BriefError::Config(format!("Failed to parse config: {e}")))?;
        config.tz()?;
        Ok(config)
    }

    /// `TELEGRAM_BOT_TOKEN` / `TELEGRAM_CHAT_ID` win over the file.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN")
            && !token.is_empty()
        {
            self.telegram.bot_token = token;
        }
        if let Ok(chat_id) = std::env::var("TELEGRAM_CHAT_ID")
            && !chat_id.is_empty()
        {
            self.telegram.chat_id = chat_id;
        }
        self
    }

    /// Get the default config path (~/.briefbot/config.toml).
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the BriefBot home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".briefbot")
    }

    /// Parsed timezone.
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| BriefError::Config(format!("Invalid timezone '{}': {e}", self.timezone)))
    }

    /// Credentials needed by anything that actually sends.
    pub fn validate_delivery(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.telegram.bot_token.trim().is_empty() {
            missing.push("TELEGRAM_BOT_TOKEN");
        }
        if self.telegram.chat_id.trim().is_empty() {
            missing.push("TELEGRAM_CHAT_ID");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(BriefError::Config(format!("Missing {}", missing.join(" / "))))
        }
    }
}

/// Forecast coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    #[serde(default = "default_lat")]
    pub lat: f64,
    #[serde(default = "default_lon")]
    pub lon: f64,
}

fn default_lat() -> f64 { 41.0082 }
fn default_lon() -> f64 { 28.9784 }

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            lat: default_lat(),
            lon: default_lon(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FootballConfig {
    #[serde(default = "default_favorite_teams")]
    pub favorite_teams: Vec<String>,
    /// ESPN league codes.
    #[serde(default = "default_leagues")]
    pub leagues: Vec<String>,
    #[serde(default = "default_max_matches")]
    pub max_matches: usize,
}

fn default_favorite_teams() -> Vec<String> {
    [
        "Galatasaray",
        "Fenerbahce",
        "Besiktas",
        "Trabzonspor",
        "Real Madrid",
        "Barcelona",
        "Manchester City",
        "Liverpool",
        "Bayern Munich",
        "PSG",
        "Juventus",
        "Inter",
        "Milan",
        "Arsenal",
        "Chelsea",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_leagues() -> Vec<String> {
    [
        "tur.1",
        "eng.1",
        "esp.1",
        "ita.1",
        "ger.1",
        "fra.1",
        "uefa.champions",
        "uefa.europa",
        "uefa.europa.conf",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_max_matches() -> usize { 6 }

impl Default for FootballConfig {
    fn default() -> Self {
        Self {
            favorite_teams: default_favorite_teams(),
            leagues: default_leagues(),
            max_matches: default_max_matches(),
        }
    }
}

/// Stooq symbols for the gold and silver line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetalsConfig {
    #[serde(default = "default_gold")]
    pub gold_symbol: String,
    #[serde(default = "default_silver")]
    pub silver_symbol: String,
}

fn default_gold() -> String { "xauusd".into() }
fn default_silver() -> String { "xagusd".into() }

impl Default for MetalsConfig {
    fn default() -> Self {
        Self {
            gold_symbol: default_gold(),
            silver_symbol: default_silver(),
        }
    }
}

/// Telegram Bot API destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub chat_id: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_parse_mode")]
    pub parse_mode: String,
}

fn default_api_base() -> String { "https://api.telegram.org".into() }
fn default_parse_mode() -> String { "HTML".into() }

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: String::new(),
            api_base: default_api_base(),
            parse_mode: default_parse_mode(),
        }
    }
}

/// Fire times of the one digest job. Later slots act as retry slots: they
/// deliver a pending message or no-op once the day is marked sent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_cron")]
    pub cron: Vec<String>,
    /// How often the timer loop sweeps expired store entries.
    #[serde(default = "default_sweep_secs")]
    pub sweep_interval_secs: u64,
}

fn default_cron() -> Vec<String> {
    vec!["0 8 * * *".into(), "15 8 * * *".into(), "30 8 * * *".into()]
}
fn default_sweep_secs() -> u64 { 600 }

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cron: default_cron(),
            sweep_interval_secs: default_sweep_secs(),
        }
    }
}

/// Gateway server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String { "127.0.0.1".into() }
fn default_port() -> u16 { 8787 }

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Which [`crate::KvStore`] backend to open.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// SQLite file, `~` expanded.
    #[serde(default = "default_store_path")]
    pub path: String,
}

fn default_store_path() -> String { "~/.briefbot/state.db".into() }

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_store_path(),
        }
    }
}

impl StoreConfig {
    pub fn expanded_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.path).to_string())
    }
}
