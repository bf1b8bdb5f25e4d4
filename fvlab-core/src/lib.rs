//! FVLab Core — session-aware feature engineering and level-based trade
//! simulation for intraday FX bars.
//!
//! This crate contains the heart of the pipeline:
//! - Domain types (bars, session days, volatility records, level sets,
//!   trades, the feature-vector contract)
//! - Sessionizer: UTC → U.S. trading day with weekend roll and DST handling
//! - VolatilityScorer: pre-US range vs rolling ATR regime score
//! - LevelEngine: FV zone and L1 bands from the warmup window
//! - ActiveLevelTracker: the anti-look-ahead carry-forward query
//! - BacktestEngine: FLAT → ENTERED → CLOSED walk with pessimistic fills
//! - TradeFilter: probability gate over the simulated trades
//!
//! Data flows strictly forward — each stage consumes only finalized output
//! of the previous one, never a day's own unfinished data.

pub mod domain;
pub mod engine;
pub mod filter;
pub mod levels;
pub mod session;
pub mod volatility;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: types crossing the rayon worker boundary are
    /// Send + Sync. If any type fails this check, the build breaks
    /// immediately instead of at the first parallel run.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::SessionDay>();
        require_sync::<domain::SessionDay>();
        require_send::<domain::VolatilityRecord>();
        require_sync::<domain::VolatilityRecord>();
        require_send::<domain::LevelSet>();
        require_sync::<domain::LevelSet>();
        require_send::<domain::Trade>();
        require_sync::<domain::Trade>();
        require_send::<domain::FilteredTrade>();
        require_sync::<domain::FilteredTrade>();
        require_send::<domain::FeatureVector>();
        require_sync::<domain::FeatureVector>();

        // Pipeline types
        require_send::<session::SessionizedBar>();
        require_sync::<session::SessionizedBar>();
        require_send::<session::Sessionized>();
        require_sync::<session::Sessionized>();
        require_send::<engine::EngineConfig>();
        require_sync::<engine::EngineConfig>();
        require_send::<engine::RunResult>();
        require_sync::<engine::RunResult>();
        require_send::<engine::AnnotatedBar>();
        require_sync::<engine::AnnotatedBar>();
        require_send::<filter::TradeFilter>();
        require_sync::<filter::TradeFilter>();
        require_send::<filter::LogisticModel>();
        require_sync::<filter::LogisticModel>();
    }
}
