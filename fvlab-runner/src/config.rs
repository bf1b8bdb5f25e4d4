//! Serializable backtest configuration (TOML).
//!
//! Every knob the pipeline recognizes lives here, with serde defaults so a
//! minimal config file is valid. `run_id()` is a content hash of the whole
//! config — two runs with identical configs share an id.

use chrono::NaiveTime;
use fvlab_core::domain::{FvWidthMode, ScaleMode};
use fvlab_core::engine::{EngineConfig, TieBreak};
use fvlab_core::levels::LevelConfig;
use fvlab_core::session::SessionConfig;
use fvlab_core::volatility::{AtrMethod, VolatilityConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] Box<toml::de::Error>),
    #[error("invalid time '{value}' for {field}: expected HH:MM")]
    Time { field: &'static str, value: String },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Complete configuration for a batch run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub backtest: BacktestSection,
    pub session: SessionSection,
    pub volatility: VolatilitySection,
    pub levels: LevelsSection,
    pub engine: EngineSection,
    pub filter: FilterSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSection {
    /// Symbols to process; one CSV file per symbol is expected in the data
    /// directory.
    pub symbols: Vec<String>,
}

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            symbols: vec!["EURUSD".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// NY-local market open, HH:MM.
    pub market_open: String,
    /// NY-local market close, HH:MM.
    pub market_close: String,
    pub warmup_minutes: i64,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            market_open: "09:30".to_string(),
            market_close: "16:00".to_string(),
            warmup_minutes: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolatilitySection {
    pub lookback: usize,
    pub method: AtrMethod,
    pub cap_lo: f64,
    pub cap_hi: f64,
    pub k_atr: f64,
}

impl Default for VolatilitySection {
    fn default() -> Self {
        let v = VolatilityConfig::default();
        Self {
            lookback: v.lookback,
            method: v.method,
            cap_lo: v.cap_lo,
            cap_hi: v.cap_hi,
            k_atr: v.k_atr,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelsSection {
    pub fv_width: FvWidthMode,
    pub vwap_alpha: f64,
    pub ib_k: f64,
    pub scale_mode: ScaleMode,
    pub cap_gap_lo: Option<f64>,
    pub cap_gap_hi: Option<f64>,
}

impl Default for LevelsSection {
    fn default() -> Self {
        let l = LevelConfig::default();
        Self {
            fv_width: l.fv_width,
            vwap_alpha: l.vwap_alpha,
            ib_k: l.ib_k,
            scale_mode: l.scale_mode,
            cap_gap_lo: l.cap_gap_lo,
            cap_gap_hi: l.cap_gap_hi,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    /// NY time-of-day cutover for today's levels, HH:MM.
    pub cutover: String,
    pub tp_pips: f64,
    pub sl_pips: f64,
    pub pip_size: f64,
    pub tie_break: TieBreak,
    pub enter_on_l1: bool,
    pub enter_on_fv: bool,
    pub allow_insufficient_history: bool,
}

impl Default for EngineSection {
    fn default() -> Self {
        let e = EngineConfig::default();
        Self {
            cutover: "10:00".to_string(),
            tp_pips: e.tp_pips,
            sl_pips: e.sl_pips,
            pip_size: e.pip_size,
            tie_break: e.tie_break,
            enter_on_l1: e.enter_on_l1,
            enter_on_fv: e.enter_on_fv,
            allow_insufficient_history: e.allow_insufficient_history,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSection {
    /// Probability threshold chosen on held-out data.
    pub threshold: f64,
    /// Path to a logistic model JSON ({names, weights, intercept}).
    /// No path means the probability gate is skipped.
    pub model_path: Option<PathBuf>,
    /// Seed for tie-break ranking.
    pub seed: u64,
}

impl Default for FilterSection {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            model_path: None,
            seed: 42,
        }
    }
}

impl BacktestConfig {
    /// Load and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text).map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backtest.symbols.is_empty() {
            return Err(ConfigError::Invalid("symbols must not be empty".into()));
        }
        if !(0.0..=1.0).contains(&self.levels.vwap_alpha) {
            return Err(ConfigError::Invalid("vwap_alpha must be in [0,1]".into()));
        }
        if self.levels.ib_k < 0.0 {
            return Err(ConfigError::Invalid("ib_k must be >= 0".into()));
        }
        if self.volatility.lookback == 0 {
            return Err(ConfigError::Invalid("volatility lookback must be >= 1".into()));
        }
        if self.volatility.cap_lo <= 0.0 || self.volatility.cap_hi < self.volatility.cap_lo {
            return Err(ConfigError::Invalid(
                "volatility caps must satisfy 0 < cap_lo <= cap_hi".into(),
            ));
        }
        if self.engine.tp_pips <= 0.0 || self.engine.sl_pips <= 0.0 {
            return Err(ConfigError::Invalid("tp_pips and sl_pips must be > 0".into()));
        }
        if self.engine.pip_size <= 0.0 {
            return Err(ConfigError::Invalid("pip_size must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.filter.threshold) {
            return Err(ConfigError::Invalid("threshold must be in [0,1]".into()));
        }
        if self.session.warmup_minutes <= 0 {
            return Err(ConfigError::Invalid("warmup_minutes must be > 0".into()));
        }
        // Times must parse even though conversion happens later.
        parse_hhmm("session.market_open", &self.session.market_open)?;
        parse_hhmm("session.market_close", &self.session.market_close)?;
        parse_hhmm("engine.cutover", &self.engine.cutover)?;
        Ok(())
    }

    /// Deterministic hash id for this configuration.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_string(self).expect("BacktestConfig serialization failed");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    pub fn session_config(&self) -> Result<SessionConfig, ConfigError> {
        Ok(SessionConfig {
            open_local: parse_hhmm("session.market_open", &self.session.market_open)?,
            close_local: parse_hhmm("session.market_close", &self.session.market_close)?,
            warmup_minutes: self.session.warmup_minutes,
        })
    }

    pub fn volatility_config(&self) -> VolatilityConfig {
        VolatilityConfig {
            lookback: self.volatility.lookback,
            method: self.volatility.method,
            cap_lo: self.volatility.cap_lo,
            cap_hi: self.volatility.cap_hi,
            k_atr: self.volatility.k_atr,
        }
    }

    pub fn level_config(&self) -> LevelConfig {
        LevelConfig {
            fv_width: self.levels.fv_width,
            vwap_alpha: self.levels.vwap_alpha,
            ib_k: self.levels.ib_k,
            scale_mode: self.levels.scale_mode,
            cap_gap_lo: self.levels.cap_gap_lo,
            cap_gap_hi: self.levels.cap_gap_hi,
        }
    }

    pub fn engine_config(&self) -> Result<EngineConfig, ConfigError> {
        Ok(EngineConfig {
            cutover: parse_hhmm("engine.cutover", &self.engine.cutover)?,
            tp_pips: self.engine.tp_pips,
            sl_pips: self.engine.sl_pips,
            pip_size: self.engine.pip_size,
            tie_break: self.engine.tie_break,
            enter_on_l1: self.engine.enter_on_l1,
            enter_on_fv: self.engine.enter_on_fv,
            allow_insufficient_history: self.engine.allow_insufficient_history,
        })
    }
}

fn parse_hhmm(field: &'static str, value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| ConfigError::Time {
            field,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_uses_defaults() {
        let config: BacktestConfig = toml::from_str("").unwrap();
        assert_eq!(config, BacktestConfig::default());
        assert!(config.validate().is_ok());
        assert_eq!(config.backtest.symbols, vec!["EURUSD".to_string()]);
    }

    #[test]
    fn partial_toml_overrides_one_section() {
        let config: BacktestConfig = toml::from_str(
            r#"
            [levels]
            scale_mode = "both"
            vwap_alpha = 0.25

            [engine]
            tie_break = "open_distance"
            tp_pips = 15.0
            "#,
        )
        .unwrap();
        assert_eq!(config.levels.scale_mode, ScaleMode::Both);
        assert_eq!(config.levels.vwap_alpha, 0.25);
        assert_eq!(config.engine.tie_break, TieBreak::OpenDistance);
        assert_eq!(config.engine.tp_pips, 15.0);
        // Untouched sections keep defaults.
        assert_eq!(config.volatility.lookback, 14);
    }

    #[test]
    fn run_id_is_deterministic_and_param_sensitive() {
        let config = BacktestConfig::default();
        assert_eq!(config.run_id(), config.run_id());

        let mut other = config.clone();
        other.engine.tp_pips = 25.0;
        assert_ne!(config.run_id(), other.run_id());
    }

    #[test]
    fn invalid_alpha_rejected() {
        let mut config = BacktestConfig::default();
        config.levels.vwap_alpha = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn bad_time_string_rejected() {
        let mut config = BacktestConfig::default();
        config.engine.cutover = "25:99".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Time { .. })));
    }

    #[test]
    fn hhmm_and_hhmmss_both_parse() {
        assert!(parse_hhmm("t", "09:30").is_ok());
        assert!(parse_hhmm("t", "09:30:00").is_ok());
        assert!(parse_hhmm("t", "930").is_err());
    }

    #[test]
    fn conversion_round_trip_matches_core_defaults() {
        let config = BacktestConfig::default();
        assert_eq!(config.session_config().unwrap(), SessionConfig::default());
        assert_eq!(config.volatility_config(), VolatilityConfig::default());
        assert_eq!(config.level_config(), LevelConfig::default());
        assert_eq!(config.engine_config().unwrap(), EngineConfig::default());
    }

    #[test]
    fn volatile_flag_threshold_independent_of_caps() {
        // The clip ceiling and the flag threshold are separate knobs.
        let config: BacktestConfig = toml::from_str(
            r#"
            [volatility]
            cap_hi = 1.3
            k_atr = 1.05
            "#,
        )
        .unwrap();
        assert_eq!(config.volatility.cap_hi, 1.3);
        assert_eq!(config.volatility.k_atr, 1.05);
        assert!(config.validate().is_ok());
    }
}
