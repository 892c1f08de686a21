//! Multi-year seasonal average of vegetation-index frames.
//!
//! Accumulates every frame whose year falls in the window's year range
//! and whose calendar date falls in the repeating month/day window, then
//! divides per pixel. Zero and negative values count as "no
//! observation", so a pixel's average is the mean of its positive
//! observations only.

use crate::catalog::FrameId;
use crate::config::DateWindow;
use crate::mask::LandMask;
use ndarray::Array2;
use phenora_core::{Raster, Result};
use tracing::debug;

/// Accumulating sweep over qualifying frames.
///
/// Feed frames in any order via [`push`](Self::push); call
/// [`finish`](Self::finish) once all frames are consumed.
pub struct SeasonalAverage<'m> {
    mask: &'m LandMask,
    window: DateWindow,
    sum: Array2<f64>,
    count: Array2<u32>,
    frames_used: usize,
}

impl<'m> SeasonalAverage<'m> {
    pub fn new(mask: &'m LandMask, window: DateWindow) -> Self {
        let shape = mask.shape();
        Self {
            mask,
            window,
            sum: Array2::zeros(shape),
            count: Array2::zeros(shape),
            frames_used: 0,
        }
    }

    /// Whether a frame qualifies for the average. Lets the caller skip
    /// loading files outside the window.
    pub fn wants(&self, id: FrameId) -> bool {
        self.window.contains_year(id.year) && self.window.contains_day(id.year, id.day)
    }

    /// Accumulate one qualifying frame.
    pub fn push(&mut self, id: FrameId, frame: &Raster<f64>) -> Result<()> {
        self.mask
            .check_geometry(frame, &format!("frame {}-{:03}", id.year, id.day))?;

        ndarray::Zip::from(&mut self.sum)
            .and(&mut self.count)
            .and(frame.data())
            .for_each(|sum, count, &value| {
                if value > 0.0 {
                    *sum += value;
                    *count += 1;
                }
            });

        self.frames_used += 1;
        debug!(year = id.year, day = id.day, "accumulated frame");
        Ok(())
    }

    /// Number of frames accumulated so far.
    pub fn frames_used(&self) -> usize {
        self.frames_used
    }

    /// Per-pixel mean of positive observations.
    ///
    /// Land pixels with at least one observation get `sum / count`;
    /// everything else (water, or no observations) is NaN.
    pub fn finish(self) -> Raster<f64> {
        let mut data = Array2::from_elem(self.sum.dim(), f64::NAN);

        ndarray::Zip::from(&mut data)
            .and(&self.sum)
            .and(&self.count)
            .and(self.mask.land())
            .for_each(|out, &sum, &count, &is_land| {
                if is_land && count > 0 {
                    *out = sum / count as f64;
                }
            });

        let mut raster = Raster::from_array(data);
        raster.set_transform(*self.mask.transform());
        raster.set_crs(self.mask.crs().cloned());
        raster.set_nodata(Some(f64::NAN));
        raster
    }
}
