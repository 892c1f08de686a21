//! # Phenora Phenology
//!
//! Growing-season phenology extraction from per-pixel vegetation-index
//! time series.
//!
//! A tile is a directory of dated single-band frames on one grid. The
//! pipeline aligns a land/water mask onto that grid, computes a
//! multi-year seasonal average, then sweeps each year's frames in day
//! order to detect three per-pixel transition days:
//!
//! - **onset**: first (interpolated) day above `scale × average`
//! - **peak**: day of the running maximum
//! - **end**: first day below `scale ×` a per-year baseline
//!
//! Results are quantized into byte products, one per year and metric.

pub mod average;
pub mod catalog;
pub mod config;
pub mod dayvalue;
pub mod decline;
pub mod encode;
pub mod mask;
pub mod onset;
pub mod peak;
pub mod pipeline;

pub(crate) mod maybe_rayon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::average::SeasonalAverage;
    pub use crate::catalog::{FrameCatalog, FrameEntry, FrameId};
    pub use crate::config::{DateWindow, PhenologyConfig};
    pub use crate::dayvalue::{DayValue, PhenologyMap};
    pub use crate::decline::DeclineSweep;
    pub use crate::encode::{encode_map, encode_raw, encode_value};
    pub use crate::mask::{align_mask, load_aligned_mask, LandMask};
    pub use crate::onset::{threshold_raster, OnsetSweep};
    pub use crate::peak::PeakSweep;
    pub use crate::pipeline::{
        process_tile, run_average, run_decline, run_onset, run_peak, ProductKind,
    };
    pub use phenora_core::prelude::*;
}
