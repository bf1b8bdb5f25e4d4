//! FeatureVector — the engineered-feature contract with the external classifier.
//!
//! The schema is a fixed, ordered list of names. The probability model
//! declares the names it expects; the trade filter refuses to score a
//! vector whose names differ (FeatureMismatchError) rather than silently
//! reordering columns.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Canonical feature names, in column order.
pub const FEATURE_SCHEMA: [&str; 19] = [
    "hour",
    "day_of_week",
    "month",
    "hour_sin",
    "hour_cos",
    "dow_sin",
    "dow_cos",
    "month_sin",
    "month_cos",
    "minutes_since_open",
    "vol_score",
    "is_volatile",
    "pre_us_range",
    "fv_mid",
    "fv_half_width",
    "l1_upper_offset",
    "l1_lower_offset",
    "dist_to_fv_mid",
    "entry_side",
];

/// An ordered bag of named feature values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    names: Vec<String>,
    values: Vec<f64>,
}

impl FeatureVector {
    /// Build a vector with the canonical schema. Panics if the value count
    /// does not match the schema length — a compile-site bug, not data.
    pub fn from_schema(values: Vec<f64>) -> Self {
        assert_eq!(
            values.len(),
            FEATURE_SCHEMA.len(),
            "feature value count must match schema"
        );
        Self {
            names: FEATURE_SCHEMA.iter().map(|s| s.to_string()).collect(),
            values,
        }
    }

    /// Build a vector with explicit names (for models trained on a subset).
    pub fn new(names: Vec<String>, values: Vec<f64>) -> Self {
        assert_eq!(names.len(), values.len(), "names/values length mismatch");
        Self { names, values }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Look up a value by name. Linear scan — vectors are short.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i])
    }

    /// True if this vector's names equal `expected`, in order.
    pub fn matches(&self, expected: &[String]) -> bool {
        self.names.len() == expected.len()
            && self.names.iter().zip(expected).all(|(a, b)| a == b)
    }
}

/// Sin/cos encoding for a periodic integer feature (hour 0..23, dow 0..6).
pub fn cyclical(value: f64, period: f64) -> (f64, f64) {
    let radians = 2.0 * PI * (value % period) / period;
    (radians.sin(), radians.cos())
}
