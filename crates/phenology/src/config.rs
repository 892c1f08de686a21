//! Run configuration for the phenology pipeline.
//!
//! Everything the detectors need — threshold scales, date windows, the
//! mask location — lives in one validated record that is constructed
//! once and passed explicitly into the entry points. There are no
//! environment lookups in the core.

use chrono::{Datelike, NaiveDate};
use phenora_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A date interval whose year part bounds the years considered and whose
/// month/day part defines a window repeating within each year.
///
/// `1900-07-04 .. 2525-08-03` means: all years from 1900 through 2525,
/// and within each of them the period July 4th to August 3rd.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Parse from a pair of `YYYY-MM-DD` strings.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        let parse_one = |s: &str| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map_err(|e| Error::Config(format!("bad date '{}': {}", s, e)))
        };
        Ok(Self {
            start: parse_one(start)?,
            end: parse_one(end)?,
        })
    }

    /// Inclusive year bounds.
    pub fn years(&self) -> (i32, i32) {
        (self.start.year(), self.end.year())
    }

    /// Whether `year` falls inside the year bounds.
    pub fn contains_year(&self, year: i32) -> bool {
        year >= self.start.year() && year <= self.end.year()
    }

    /// Whether a `(year, day-of-year)` acquisition falls in the repeating
    /// month/day window of its own year.
    pub fn contains_day(&self, year: i32, day_of_year: u32) -> bool {
        let Some(date) = NaiveDate::from_yo_opt(year, day_of_year) else {
            return false;
        };
        let Some(lo) = NaiveDate::from_ymd_opt(year, self.start.month(), self.start.day()) else {
            return false;
        };
        let Some(hi) = NaiveDate::from_ymd_opt(year, self.end.month(), self.end.day()) else {
            return false;
        };
        date >= lo && date <= hi
    }

    /// Day-of-year bounds of the window endpoints, taken in the years
    /// they were written in. This mirrors the original behavior for the
    /// decline baseline window, which compared frame day numbers against
    /// the ordinals of the configured dates directly.
    pub fn day_bounds(&self) -> (u32, u32) {
        (self.start.ordinal(), self.end.ordinal())
    }
}

/// Configuration for a full tile run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhenologyConfig {
    /// Scale applied to the seasonal average to form the onset threshold.
    pub onset_threshold_scale: f64,
    /// Scale applied to the per-year baseline to form the decline threshold.
    pub end_threshold_scale: f64,
    /// Averaging window and year filter for the onset baseline.
    pub onset_window: DateWindow,
    /// Baseline window and year filter for decline detection.
    pub end_window: DateWindow,
    /// Location of the external land/water mask.
    pub mask_path: PathBuf,
    /// File name of the seasonal-average product inside the output dir.
    pub avg_filename: String,
}

impl Default for PhenologyConfig {
    fn default() -> Self {
        Self {
            onset_threshold_scale: 0.7,
            end_threshold_scale: 0.9,
            // All years; July 4th - August 3rd within each.
            onset_window: DateWindow::new(
                NaiveDate::from_ymd_opt(1900, 7, 4).unwrap(),
                NaiveDate::from_ymd_opt(2525, 8, 3).unwrap(),
            ),
            // All years; July 20th - August 9th within each.
            end_window: DateWindow::new(
                NaiveDate::from_ymd_opt(1900, 7, 20).unwrap(),
                NaiveDate::from_ymd_opt(2525, 8, 9).unwrap(),
            ),
            mask_path: PathBuf::from("permanent/maske_sval.tiff"),
            avg_filename: "GS_avg.tiff".to_string(),
        }
    }
}
