//! Sessionizer — maps UTC-timestamped bars onto U.S. trading days.
//!
//! Each bar is converted to NY wall-clock time via the tz database (DST is
//! handled by `chrono-tz`, never a fixed offset). Bars landing on a NY
//! Saturday or Sunday belong to the following Monday's trading day, so the
//! FX week's Sunday-evening bars count as Monday's pre-US window.
//!
//! The session log is append-only: a `SessionDay` is created the first time
//! its date is seen and never modified afterwards.

use crate::domain::{Bar, SessionDay};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use chrono_tz::America::New_York;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors from session mapping.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("timestamps out of order at index {index}: {prev} followed by {current}")]
    TimestampOrder {
        index: usize,
        prev: DateTime<Utc>,
        current: DateTime<Utc>,
    },
}

/// NY-local session parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub open_local: NaiveTime,
    pub close_local: NaiveTime,
    pub warmup_minutes: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            open_local: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            close_local: NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
            warmup_minutes: 30,
        }
    }
}

/// A bar annotated with its trading day and NY wall-clock time-of-day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionizedBar {
    pub bar: Bar,
    pub trading_date: NaiveDate,
    pub ny_time: NaiveTime,
}

/// Append-only ordered log of finalized SessionDay records, keyed by date.
#[derive(Debug, Clone, Default)]
pub struct SessionMap {
    days: BTreeMap<NaiveDate, SessionDay>,
}

impl SessionMap {
    pub fn get(&self, date: NaiveDate) -> Option<&SessionDay> {
        self.days.get(&date)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NaiveDate, &SessionDay)> {
        self.days.iter()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    fn insert_once(&mut self, day: SessionDay) {
        self.days.entry(day.date).or_insert(day);
    }
}

/// Output of a sessionizing pass.
#[derive(Debug, Clone)]
pub struct Sessionized {
    pub bars: Vec<SessionizedBar>,
    pub sessions: SessionMap,
}

/// Maps an ordered bar stream to trading days and session markers.
#[derive(Debug, Clone, Default)]
pub struct Sessionizer {
    config: SessionConfig,
}

impl Sessionizer {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Annotate every bar with its trading day, building the session log
    /// along the way. Fails on the first out-of-order timestamp — the
    /// stream's integrity is violated and cannot be repaired locally.
    pub fn annotate(&self, bars: &[Bar]) -> Result<Sessionized, SessionError> {
        let mut out = Vec::with_capacity(bars.len());
        let mut sessions = SessionMap::default();
        let mut prev_ts: Option<DateTime<Utc>> = None;

        for (index, bar) in bars.iter().enumerate() {
            if let Some(prev) = prev_ts {
                if bar.ts < prev {
                    return Err(SessionError::TimestampOrder {
                        index,
                        prev,
                        current: bar.ts,
                    });
                }
            }
            prev_ts = Some(bar.ts);

            let (ny_date, ny_time) = ny_local(bar.ts);
            let trading_date = trading_date_for(ny_date);
            if sessions.get(trading_date).is_none() {
                sessions.insert_once(SessionDay::build(
                    trading_date,
                    self.config.open_local,
                    self.config.close_local,
                    self.config.warmup_minutes,
                ));
            }

            out.push(SessionizedBar {
                bar: bar.clone(),
                trading_date,
                ny_time,
            });
        }

        Ok(Sessionized {
            bars: out,
            sessions,
        })
    }
}

/// NY-local calendar date and wall-clock time for a UTC instant.
pub fn ny_local(ts: DateTime<Utc>) -> (NaiveDate, NaiveTime) {
    let ny = ts.with_timezone(&New_York);
    (ny.date_naive(), ny.time())
}

/// Weekend roll: Saturday and Sunday map to the following Monday.
pub fn trading_date_for(ny_date: NaiveDate) -> NaiveDate {
    match ny_date.weekday() {
        Weekday::Sat => ny_date + Duration::days(2),
        Weekday::Sun => ny_date + Duration::days(1),
        _ => ny_date,
    }
}
