use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::duration::deserialize_duration;
use crate::format::validate_date_format;
use crate::market_data::providers::cryptocompare::{
    CryptoComparePriceSource, CRYPTOCOMPARE_API_BASE,
};
use crate::market_data::{JsonlPriceStore, PriceService};

/// Environment variable that overrides `[source] api_key`.
pub const API_KEY_ENV: &str = "COINRATE_API_KEY";

const CONFIG_FILE_NAME: &str = "coinrate.toml";

fn serialize_duration<S>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&crate::duration::format_duration(*d))
}

/// Upstream price feed settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub base_url: String,

    /// Currency every price is quoted in.
    pub quote_currency: String,

    /// Optional API key; `COINRATE_API_KEY` takes precedence.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Per-request timeout.
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub timeout: Duration,

    /// Local symbol -> upstream symbol overrides.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub symbol_map: HashMap<String, String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: CRYPTOCOMPARE_API_BASE.to_string(),
            quote_currency: "RUB".to_string(),
            api_key: None,
            timeout: Duration::from_secs(10),
            symbol_map: HashMap::new(),
        }
    }
}

/// Periodic refresh settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Time between scheduled refreshes.
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub interval: Duration,

    /// Random offset in `[-jitter, +jitter]` added to each interval.
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub jitter: Duration,

    /// Symbols fetched by the startup refresh. Empty means "everything already
    /// stored".
    pub symbols: Vec<String>,

    /// Run a refresh immediately at startup.
    pub on_start: bool,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            jitter: Duration::ZERO,
            symbols: Vec::new(),
            on_start: true,
        }
    }
}

/// HTTP query interface settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,

    /// Upper bound on a single request, including any live fallback fetch.
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Presentation settings for prices and timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub price_decimals: u32,

    /// chrono `strftime` pattern for `observed_at`.
    pub date_format: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            price_decimals: 2,
            date_format: "%Y-%m-%d".to_string(),
        }
    }
}

/// Contents of `coinrate.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the observation log lives. Relative paths resolve against the
    /// config file's directory; unset means the config directory itself.
    pub data_dir: Option<PathBuf>,
    pub source: SourceConfig,
    pub refresh: RefreshConfig,
    pub server: ServerConfig,
    pub display: DisplayConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Reject settings that would only fail later, at refresh or render time.
    pub fn validate(&self) -> Result<()> {
        if self.refresh.interval.is_zero() {
            bail!("refresh.interval must be greater than zero");
        }
        validate_date_format(&self.display.date_format).context("Invalid display.date_format")?;
        Ok(())
    }

    pub fn resolve_data_dir(&self, config_dir: &Path) -> PathBuf {
        match &self.data_dir {
            Some(data_dir) if data_dir.is_absolute() => data_dir.clone(),
            Some(data_dir) => config_dir.join(data_dir),
            None => config_dir.to_path_buf(),
        }
    }
}

/// Config with the data directory resolved and env overrides applied.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    pub data_dir: PathBuf,
    pub source: SourceConfig,
    pub refresh: RefreshConfig,
    pub server: ServerConfig,
    pub display: DisplayConfig,
}

/// `./coinrate.toml` if present, else `<data dir>/coinrate/coinrate.toml`.
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from(CONFIG_FILE_NAME);
    if local_config.exists() {
        return local_config;
    }

    if let Some(data_dir) = dirs::data_dir() {
        return data_dir.join("coinrate").join(CONFIG_FILE_NAME);
    }

    local_config
}

impl ResolvedConfig {
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_path = config_path
            .canonicalize()
            .with_context(|| format!("Config file not found: {}", config_path.display()))?;
        let config_dir = config_path
            .parent()
            .context("Config file has no parent directory")?;

        let config = Config::load(&config_path)?;
        Self::from_config(config, config_dir)
    }

    /// Like [`ResolvedConfig::load`], but a missing file yields defaults with
    /// the file's intended directory as the data directory.
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            return Self::load(config_path);
        }

        let config_path = if config_path.is_relative() {
            std::env::current_dir()
                .context("Failed to get current directory")?
                .join(config_path)
        } else {
            config_path.to_path_buf()
        };
        let config_dir = config_path
            .parent()
            .context("Config path has no parent directory")?;

        Self::from_config(Config::default(), config_dir)
    }

    fn from_config(config: Config, config_dir: &Path) -> Result<Self> {
        config.validate()?;
        let data_dir = config.resolve_data_dir(config_dir);
        let mut source = config.source;
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                source.api_key = Some(key);
            }
        }

        Ok(Self {
            data_dir,
            source,
            refresh: config.refresh,
            server: config.server,
            display: config.display,
        })
    }

    /// Wire the JSONL store and CryptoCompare source into a service.
    pub fn build_service(&self) -> Result<PriceService> {
        let mut source = CryptoComparePriceSource::new()
            .with_base_url(&self.source.base_url)
            .with_quote_currency(&self.source.quote_currency)
            .with_symbol_map(self.source.symbol_map.clone())
            .with_timeout(self.source.timeout)?;
        if let Some(key) = &self.source.api_key {
            source = source.with_api_key(key.clone());
        }

        let store = JsonlPriceStore::new(&self.data_dir);
        Ok(PriceService::new(Arc::new(store), Arc::new(source)))
    }
}
