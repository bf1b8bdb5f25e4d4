//! ActiveLevelTracker — which day's LevelSet is legally visible right now.
//!
//! A pure function of (timestamp, finalized level map); nothing is cached,
//! so there is no stale pointer to go wrong. This is the second and primary
//! anti-look-ahead boundary: today's levels become visible only once the
//! NY time-of-day has reached the cutover AND the timestamp has passed the
//! day's warmup end. Before that, the most recent prior day's levels apply;
//! before any prior day exists, there is no active level and entries are
//! suppressed.
//!
//! The warmup-end check is enforced here even when the configured cutover
//! would allow earlier access, so the guarantee "the active LevelSet's
//! inputs all predate the query timestamp" holds for every configuration.

use crate::domain::{LevelSet, SessionDay};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use std::collections::BTreeMap;

/// The LevelSet visible at `ts`, or None while no level exists yet.
pub fn active_level_for<'a>(
    levels: &'a BTreeMap<NaiveDate, LevelSet>,
    day: &SessionDay,
    ts: DateTime<Utc>,
    ny_time: NaiveTime,
    cutover: NaiveTime,
) -> Option<&'a LevelSet> {
    if ny_time >= cutover && ts >= day.ny_warmup_end {
        if let Some(today) = levels.get(&day.date) {
            return Some(today);
        }
    }
    levels.range(..day.date).next_back().map(|(_, ls)| ls)
}
