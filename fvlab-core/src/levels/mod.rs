//! Level derivation and the active-level query.
//!
//! `engine` turns a day's warmup window into a finalized LevelSet;
//! `tracker` answers which day's LevelSet is legally visible at a given
//! timestamp. Between them they carry both anti-look-ahead boundaries.

pub mod engine;
pub mod tracker;

pub use engine::{build_level_map, LevelConfig, LevelEngine};
pub use tracker::active_level_for;
