//! Minute-bar CSV loading.
//!
//! Ingestion and cleaning happen upstream; this loader only parses. Two
//! timestamp shapes are accepted: RFC 3339 / `YYYY-MM-DD HH:MM:SS`, and the
//! Dukascopy-style `DD.MM.YYYY HH:MM:SS.mmm` "Gmt time" column. Naive
//! timestamps are taken as UTC.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use fvlab_core::domain::Bar;
use std::path::Path;
use thiserror::Error;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("csv error in '{path}': {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("missing column '{0}' in header")]
    MissingColumn(&'static str),
    #[error("unparsable timestamp '{value}' at record {record}")]
    Timestamp { record: usize, value: String },
    #[error("unparsable number '{value}' at record {record}")]
    Number { record: usize, value: String },
    #[error("insane bar at record {record} (OHLC geometry or volume)")]
    InsaneBar { record: usize },
}

/// Column indices resolved from the header row.
struct Columns {
    ts: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
}

impl Columns {
    fn resolve(headers: &csv::StringRecord) -> Result<Self, LoadError> {
        let find = |names: &[&str], label: &'static str| -> Result<usize, LoadError> {
            headers
                .iter()
                .position(|h| {
                    let h = h.trim().to_ascii_lowercase();
                    names.iter().any(|n| h == *n)
                })
                .ok_or(LoadError::MissingColumn(label))
        };
        Ok(Self {
            ts: find(&["timestamp", "gmt time", "time", "datetime"], "timestamp")?,
            open: find(&["open"], "open")?,
            high: find(&["high"], "high")?,
            low: find(&["low"], "low")?,
            close: find(&["close"], "close")?,
            volume: find(&["volume"], "volume")?,
        })
    }
}

/// Load one symbol's minute bars from a CSV file.
pub fn load_bars_csv(path: &Path, symbol: &str) -> Result<Vec<Bar>, LoadError> {
    let display = path.display().to_string();
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: display.clone(),
        source,
    })?;
    let mut reader = csv::Reader::from_reader(file);

    let columns = Columns::resolve(reader.headers().map_err(|source| LoadError::Csv {
        path: display.clone(),
        source,
    })?)?;

    let mut bars = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|source| LoadError::Csv {
            path: display.clone(),
            source,
        })?;
        let field = |idx: usize| record.get(idx).unwrap_or("").trim();

        let ts = parse_timestamp(field(columns.ts)).ok_or_else(|| LoadError::Timestamp {
            record: i + 1,
            value: field(columns.ts).to_string(),
        })?;
        let number = |idx: usize| -> Result<f64, LoadError> {
            field(idx).parse::<f64>().map_err(|_| LoadError::Number {
                record: i + 1,
                value: field(idx).to_string(),
            })
        };

        let bar = Bar {
            symbol: symbol.to_string(),
            ts,
            open: number(columns.open)?,
            high: number(columns.high)?,
            low: number(columns.low)?,
            close: number(columns.close)?,
            volume: number(columns.volume)?,
        };
        if !bar.is_sane() {
            return Err(LoadError::InsaneBar { record: i + 1 });
        }
        bars.push(bar);
    }

    Ok(bars)
}

/// BLAKE3 hash over the loaded bars, for result fingerprinting.
pub fn dataset_hash(bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(&bar.ts.timestamp().to_le_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
        hasher.update(&bar.volume.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%d.%m.%Y %H:%M:%S%.3f", "%d.%m.%Y %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn loads_rfc3339_format() {
        let file = write_csv(
            "timestamp,open,high,low,close,volume\n\
             2024-01-16T14:30:00Z,1.1010,1.1020,1.1000,1.1015,350\n\
             2024-01-16T14:31:00Z,1.1015,1.1018,1.1012,1.1016,280\n",
        );
        let bars = load_bars_csv(file.path(), "EURUSD").unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].symbol, "EURUSD");
        assert_eq!(
            bars[0].ts,
            Utc.with_ymd_and_hms(2024, 1, 16, 14, 30, 0).unwrap()
        );
        assert_eq!(bars[1].volume, 280.0);
    }

    #[test]
    fn loads_dukascopy_gmt_time_format() {
        let file = write_csv(
            "Gmt time,Open,High,Low,Close,Volume\n\
             16.08.2023 00:00:00.000,1.0910,1.0912,1.0908,1.0911,120\n",
        );
        let bars = load_bars_csv(file.path(), "EURUSD").unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(
            bars[0].ts,
            Utc.with_ymd_and_hms(2023, 8, 16, 0, 0, 0).unwrap()
        );
        assert_eq!(bars[0].open, 1.0910);
    }

    #[test]
    fn space_separated_naive_timestamp_is_utc() {
        let file = write_csv(
            "timestamp,open,high,low,close,volume\n\
             2024-01-16 14:30:00,1.1010,1.1020,1.1000,1.1015,350\n",
        );
        let bars = load_bars_csv(file.path(), "EURUSD").unwrap();
        assert_eq!(
            bars[0].ts,
            Utc.with_ymd_and_hms(2024, 1, 16, 14, 30, 0).unwrap()
        );
    }

    #[test]
    fn missing_column_reported_by_name() {
        let file = write_csv("timestamp,open,high,low,close\n2024-01-16T14:30:00Z,1,1,1,1\n");
        let err = load_bars_csv(file.path(), "EURUSD").unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn("volume")));
    }

    #[test]
    fn bad_timestamp_reports_record() {
        let file = write_csv(
            "timestamp,open,high,low,close,volume\n\
             2024-01-16T14:30:00Z,1.1,1.2,1.0,1.1,100\n\
             not-a-time,1.1,1.2,1.0,1.1,100\n",
        );
        let err = load_bars_csv(file.path(), "EURUSD").unwrap_err();
        assert!(matches!(err, LoadError::Timestamp { record: 2, .. }));
    }

    #[test]
    fn insane_bar_rejected() {
        // high below low
        let file = write_csv(
            "timestamp,open,high,low,close,volume\n\
             2024-01-16T14:30:00Z,1.1,1.0,1.2,1.1,100\n",
        );
        let err = load_bars_csv(file.path(), "EURUSD").unwrap_err();
        assert!(matches!(err, LoadError::InsaneBar { record: 1 }));
    }

    #[test]
    fn dataset_hash_is_content_sensitive() {
        let file = write_csv(
            "timestamp,open,high,low,close,volume\n\
             2024-01-16T14:30:00Z,1.1010,1.1020,1.1000,1.1015,350\n",
        );
        let bars = load_bars_csv(file.path(), "EURUSD").unwrap();
        let h1 = dataset_hash(&bars);

        let mut altered = bars.clone();
        altered[0].close += 0.0001;
        assert_ne!(h1, dataset_hash(&altered));
        assert_eq!(h1, dataset_hash(&bars));
    }
}
