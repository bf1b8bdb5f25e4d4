//! Domain types: bars, session days, volatility records, level sets, trades,
//! and the feature-vector contract.

pub mod bar;
pub mod features;
pub mod levels;
pub mod session;
pub mod trade;
pub mod volatility;

pub use bar::Bar;
pub use features::{cyclical, FeatureVector, FEATURE_SCHEMA};
pub use levels::{FvWidthMode, LevelSet, ScaleMode};
pub use session::SessionDay;
pub use trade::{ExitReason, FilteredTrade, Side, Trade};
pub use volatility::VolatilityRecord;
