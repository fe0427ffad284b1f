//! Serializable backtest configuration, loaded from TOML.
//!
//! ```toml
//! [backtest]
//! symbols = ["AAPL", "MSFT"]
//! data_dir = "data"
//! start_date = "2020-01-01"
//! end_date = "2023-01-01"
//! initial_capital = 100000.0
//!
//! [sizing]
//! type = "fixed_notional"
//! amount = 10000.0
//!
//! [commission]
//! type = "per_share"
//!
//! [strategy]
//! type = "ma_cross"
//! short_window = 10
//! long_window = 50
//! ```
//!
//! Dates are quoted `YYYY-MM-DD` strings. `end_date` is exclusive.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use simquant_core::data::DateRange;
use simquant_core::engine::EngineConfig;
use simquant_core::execution::CommissionSpec;
use simquant_core::portfolio::{SizingPolicy, StrengthContract};
use simquant_core::strategy::StrategySpec;

/// Unique identifier for a backtest configuration (content hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Full configuration for one backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub backtest: BacktestSection,
    #[serde(default)]
    pub sizing: SizingPolicy,
    #[serde(default)]
    pub commission: CommissionSpec,
    #[serde(default)]
    pub strategy: StrategySpec,
}

/// The `[backtest]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSection {
    pub symbols: Vec<String>,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default = "default_initial_capital")]
    pub initial_capital: f64,
    /// Pause between date-steps, for watching a run live.
    #[serde(default)]
    pub heartbeat_ms: Option<u64>,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_initial_capital() -> f64 {
    100_000.0
}

impl BacktestConfig {
    /// Config over `symbols` with every other setting at its default.
    pub fn for_symbols(symbols: Vec<String>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            backtest: BacktestSection {
                symbols,
                data_dir: data_dir.into(),
                start_date: None,
                end_date: None,
                initial_capital: default_initial_capital(),
                heartbeat_ms: None,
            },
            sizing: SizingPolicy::default(),
            commission: CommissionSpec::default(),
            strategy: StrategySpec::default(),
        }
    }

    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let b = &self.backtest;
        if b.symbols.is_empty() {
            return Err(ConfigError::Invalid("backtest.symbols must not be empty".into()));
        }
        if let Some(dup) = first_duplicate(&b.symbols) {
            return Err(ConfigError::Invalid(format!(
                "backtest.symbols lists '{dup}' more than once"
            )));
        }
        if !(b.initial_capital.is_finite() && b.initial_capital > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "backtest.initial_capital must be > 0, got {}",
                b.initial_capital
            )));
        }
        self.date_range()?;
        self.sizing
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("sizing: {e}")))?;
        self.commission
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("commission: {e}")))?;
        self.strategy
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("strategy: {e}")))?;
        Ok(())
    }

    pub fn date_range(&self) -> Result<DateRange, ConfigError> {
        DateRange::new(self.backtest.start_date, self.backtest.end_date)
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            heartbeat: self.backtest.heartbeat_ms.map(Duration::from_millis),
        }
    }

    /// True when the strategy's signals and the sizing policy read
    /// `strength` the same way.
    pub fn strength_contract_matches(&self) -> bool {
        let weights = self.sizing.strength_contract() == StrengthContract::TargetWeight;
        self.strategy.emits_target_weights() == weights
    }

    /// BLAKE3 hash of the canonical JSON form. Identical configs share an id.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }

    /// Same config narrowed to one symbol.
    pub fn for_single_symbol(&self, symbol: &str) -> Self {
        let mut config = self.clone();
        config.backtest.symbols = vec![symbol.to_string()];
        config
    }
}

fn first_duplicate(symbols: &[String]) -> Option<&str> {
    let mut seen = std::collections::HashSet::new();
    symbols
        .iter()
        .find(|s| !seen.insert(s.as_str()))
        .map(String::as_str)
}
