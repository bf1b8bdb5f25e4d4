//! SessionDay — canonical markers for one U.S. trading day.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::America::New_York;
use serde::{Deserialize, Serialize};

/// One U.S. trading day: a NY-local calendar date plus the session markers,
/// stored as UTC instants so every comparison against bar timestamps is
/// unambiguous.
///
/// Built once per distinct trading day and immutable afterwards. The markers
/// honor the historical daylight-saving schedule — the UTC hour of `ny_open`
/// shifts across DST transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDay {
    /// The U.S. trading-day identifier: a calendar date in NY time.
    pub date: NaiveDate,
    pub ny_open: DateTime<Utc>,
    pub ny_warmup_end: DateTime<Utc>,
    pub ny_close: DateTime<Utc>,
}

impl SessionDay {
    /// Build the session markers for `date` from NY-local open/close times
    /// and a warmup length in minutes.
    pub fn build(
        date: NaiveDate,
        open_local: NaiveTime,
        close_local: NaiveTime,
        warmup_minutes: i64,
    ) -> Self {
        let ny_open = ny_instant(date, open_local);
        Self {
            date,
            ny_open,
            ny_warmup_end: ny_open + Duration::minutes(warmup_minutes),
            ny_close: ny_instant(date, close_local),
        }
    }

    /// True while `ts` is inside the warmup window `[ny_open, ny_warmup_end)`.
    pub fn in_warmup(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.ny_open && ts < self.ny_warmup_end
    }

    /// True strictly before the NY open (the pre-US window).
    pub fn is_pre_us(&self, ts: DateTime<Utc>) -> bool {
        ts < self.ny_open
    }
}

/// Resolve a NY-local wall-clock time on `date` to a UTC instant.
///
/// Ambiguous times (fall-back hour) take the earlier offset; nonexistent
/// times (spring-forward gap) shift forward one hour. Session markers at
/// 09:30/16:00 never land in either window, but the data may be configured
/// with unusual markers.
pub fn ny_instant(date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    let naive = date.and_time(time);
    match New_York.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => {
            let shifted = naive + Duration::hours(1);
            match New_York.from_local_datetime(&shifted) {
                LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => {
                    dt.with_timezone(&Utc)
                }
                LocalResult::None => Utc.from_utc_datetime(&naive),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn markers_in_winter_are_est() {
        // 2024-01-15 is EST (UTC-5): 09:30 NY == 14:30 UTC.
        let day = SessionDay::build(
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            t(9, 30),
            t(16, 0),
            30,
        );
        assert_eq!(day.ny_open, Utc.with_ymd_and_hms(2024, 1, 15, 14, 30, 0).unwrap());
        assert_eq!(day.ny_close, Utc.with_ymd_and_hms(2024, 1, 15, 21, 0, 0).unwrap());
    }

    #[test]
    fn markers_in_summer_are_edt() {
        // 2024-07-15 is EDT (UTC-4): 09:30 NY == 13:30 UTC.
        let day = SessionDay::build(
            NaiveDate::from_ymd_opt(2024, 7, 15).unwrap(),
            t(9, 30),
            t(16, 0),
            30,
        );
        assert_eq!(day.ny_open, Utc.with_ymd_and_hms(2024, 7, 15, 13, 30, 0).unwrap());
    }

    #[test]
    fn warmup_end_is_open_plus_minutes() {
        let day = SessionDay::build(
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            t(9, 30),
            t(16, 0),
            30,
        );
        assert_eq!(day.ny_warmup_end - day.ny_open, Duration::minutes(30));
    }

    #[test]
    fn warmup_window_membership() {
        let day = SessionDay::build(
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            t(9, 30),
            t(16, 0),
            30,
        );
        assert!(day.is_pre_us(day.ny_open - Duration::minutes(1)));
        assert!(day.in_warmup(day.ny_open));
        assert!(day.in_warmup(day.ny_warmup_end - Duration::minutes(1)));
        assert!(!day.in_warmup(day.ny_warmup_end));
    }

    #[test]
    fn spring_forward_gap_shifts_forward() {
        // 2024-03-10: 02:30 NY does not exist; resolves one hour later.
        let gap = ny_instant(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(), t(2, 30));
        let after = ny_instant(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(), t(3, 30));
        assert_eq!(gap, after);
    }

    #[test]
    fn session_day_serialization_roundtrip() {
        let day = SessionDay::build(
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            t(9, 30),
            t(16, 0),
            30,
        );
        let json = serde_json::to_string(&day).unwrap();
        let deser: SessionDay = serde_json::from_str(&json).unwrap();
        assert_eq!(day, deser);
    }
}
