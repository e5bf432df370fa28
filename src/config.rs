//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` if present and deserializes into strongly-typed
//! structs; every field has a default so the file is optional. Brokerage
//! secrets are referenced by env-var name in the config and resolved at
//! startup by [`BrokerCredentials::from_env`], which fails fast when any
//! of them is missing.

use anyhow::{bail, Context, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::strategy::MIN_CONFIRMATIONS;

/// Default watchlist.
const DEFAULT_WATCHLIST: &[&str] = &["TSLA", "NVDA", "SOXL", "SPY", "SHOP", "PLTR", "TQQQ"];

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub agent: AgentConfig,
    pub broker: BrokerConfig,
    pub trading: TradingConfig,
    pub recap: RecapConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AgentConfig {
    pub name: String,
    pub scan_interval_secs: u64,
    pub watchlist: Vec<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "bracketbot".to_string(),
            scan_interval_secs: 300,
            watchlist: DEFAULT_WATCHLIST.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BrokerConfig {
    pub api_key_env: String,
    pub api_secret_env: String,
    pub base_url_env: String,
    /// Market-data host. `DATA_URL` in the environment takes precedence.
    pub data_url: String,
    /// Data feed passed to the bars endpoint ("iex" or "sip").
    pub feed: String,
    pub request_timeout_secs: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            api_key_env: "API_KEY".to_string(),
            api_secret_env: "API_SECRET".to_string(),
            base_url_env: "BASE_URL".to_string(),
            data_url: "https://data.alpaca.markets".to_string(),
            feed: "iex".to_string(),
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TradingConfig {
    /// Notional budget per trade; quantity is `floor(budget / entry)`, min 1.
    pub risk_budget: f64,
    pub min_confirmations: usize,
    /// Hard cap on the stop as a fraction of the last close.
    pub stop_cap_ratio: f64,
    pub take_profit_ratio: f64,
    pub reason: String,
    /// Log orders instead of submitting them.
    pub dry_run: bool,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            risk_budget: 50.0,
            min_confirmations: MIN_CONFIRMATIONS,
            stop_cap_ratio: 0.78,
            take_profit_ratio: 1.05,
            reason: "4 confirmations met".to_string(),
            dry_run: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RecapConfig {
    pub path: String,
}

impl Default for RecapConfig {
    fn default() -> Self {
        Self {
            path: "trade_log.csv".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 10000,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file, falling back to defaults when
    /// the file does not exist, then apply environment overrides.
    pub fn load(path: &str) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            AppConfig::default()
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file without touching the environment.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        toml::from_str(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// `PORT` overrides the server port, `DATA_URL` the market-data host.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(port) = std::env::var("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid PORT value: {port}"))?;
        }
        if let Ok(url) = std::env::var("DATA_URL") {
            if !url.trim().is_empty() {
                self.broker.data_url = url.trim().to_string();
            }
        }
        Ok(())
    }

    /// Reject configurations that would make the scanner misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.agent.watchlist.is_empty() {
            bail!("Watchlist is empty");
        }
        let mut seen = HashSet::new();
        for symbol in &self.agent.watchlist {
            if symbol.trim().is_empty() {
                bail!("Watchlist contains an empty symbol");
            }
            if !seen.insert(symbol.as_str()) {
                bail!("Duplicate symbol in watchlist: {symbol}");
            }
        }
        if self.agent.scan_interval_secs == 0 {
            bail!("scan_interval_secs must be positive");
        }
        let t = &self.trading;
        if !(t.risk_budget > 0.0) {
            bail!("risk_budget must be positive, got {}", t.risk_budget);
        }
        if t.min_confirmations == 0 {
            bail!("min_confirmations must be at least 1");
        }
        if !(t.stop_cap_ratio > 0.0 && t.stop_cap_ratio < 1.0) {
            bail!("stop_cap_ratio must be in (0, 1), got {}", t.stop_cap_ratio);
        }
        if !(t.take_profit_ratio > 1.0) {
            bail!("take_profit_ratio must exceed 1, got {}", t.take_profit_ratio);
        }
        if t.reason.contains(',') || t.reason.contains('\n') {
            bail!("Trade reason must not contain commas or newlines");
        }
        Ok(())
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.agent.scan_interval_secs)
    }

    /// Resolve an environment variable name to its value.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        let value = std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))?;
        if value.trim().is_empty() {
            bail!("Environment variable is empty: {env_name}");
        }
        Ok(value)
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Brokerage credentials resolved from the environment.
#[derive(Clone)]
pub struct BrokerCredentials {
    pub api_key: SecretString,
    pub api_secret: SecretString,
    /// Trading API root without a trailing `/v2`.
    pub base_url: String,
}

impl BrokerCredentials {
    pub fn new(api_key: &str, api_secret: &str, base_url: &str) -> Self {
        Self {
            api_key: SecretString::new(api_key.to_string()),
            api_secret: SecretString::new(api_secret.to_string()),
            base_url: normalize_base_url(base_url),
        }
    }

    pub fn from_env(broker: &BrokerConfig) -> Result<Self> {
        let api_key = AppConfig::resolve_env(&broker.api_key_env)?;
        let api_secret = AppConfig::resolve_env(&broker.api_secret_env)?;
        let base_url = AppConfig::resolve_env(&broker.base_url_env)?;
        Ok(Self::new(&api_key, &api_secret, &base_url))
    }
}

impl std::fmt::Debug for BrokerCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerCredentials")
            .field("api_key", &mask(self.api_key.expose_secret()))
            .field("api_secret", &"***")
            .field("base_url", &self.base_url)
            .finish()
    }
}

fn mask(key: &str) -> String {
    let prefix: String = key.chars().take(4).collect();
    format!("{prefix}***")
}

/// Strip trailing slashes and an optional `/v2` suffix.
fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    trimmed.strip_suffix("/v2").unwrap_or(trimmed).to_string()
}
