//! Growing-season onset detection.
//!
//! Per year, finds the first day each land pixel's value exceeds a
//! per-pixel threshold derived from the seasonal average. On the first
//! frame of the year the day is assigned directly; afterwards the
//! crossing day is linearly interpolated between the previous and the
//! current frame. A pixel is assigned at most once per year (first
//! crossing wins); pixels that never cross stay unresolved.

use crate::dayvalue::{DayValue, PhenologyMap};
use crate::mask::LandMask;
use ndarray::Array2;
use phenora_core::{Raster, Result};

/// Per-pixel onset threshold: `scale × average`.
///
/// NaN average pixels (water, or no observations) produce NaN
/// thresholds, which no value exceeds.
pub fn threshold_raster(average: &Raster<f64>, scale: f64) -> Raster<f64> {
    let mut thr = average.clone();
    thr.data_mut().mapv_inplace(|v| scale * v);
    thr
}

/// One year's onset sweep. Frames must arrive in ascending day order.
pub struct OnsetSweep<'m> {
    mask: &'m LandMask,
    threshold: Array2<f64>,
    map: PhenologyMap,
    prev: Option<(u32, Array2<f64>)>,
}

impl<'m> OnsetSweep<'m> {
    pub fn new(mask: &'m LandMask, threshold: &Raster<f64>) -> Result<Self> {
        mask.check_geometry(threshold, "threshold raster")?;
        Ok(Self {
            mask,
            threshold: threshold.data().clone(),
            map: mask.new_map(),
            prev: None,
        })
    }

    /// Consume the next frame of the year.
    pub fn push(&mut self, day: u32, frame: &Raster<f64>) -> Result<()> {
        self.mask
            .check_geometry(frame, &format!("onset frame day {day}"))?;

        match &self.prev {
            None => {
                // First frame of the year: direct assignment, no
                // interpolation possible.
                ndarray::Zip::from(self.map.values_mut())
                    .and(frame.data())
                    .and(&self.threshold)
                    .for_each(|state, &value, &thr| {
                        if state.is_unresolved() && value > thr {
                            *state = DayValue::Day(day as f64);
                        }
                    });
            }
            Some((day0, values0)) => {
                let d0 = *day0 as f64;
                let dx = day as f64 - d0;
                ndarray::Zip::from(self.map.values_mut())
                    .and(frame.data())
                    .and(values0)
                    .and(&self.threshold)
                    .for_each(|state, &v1, &v0, &thr| {
                        if state.is_unresolved() && v1 > thr {
                            // v0 <= thr < v1 here, so the slope is positive
                            let crossing = d0 + dx * (thr - v0) / (v1 - v0);
                            *state = DayValue::Day(crossing);
                        }
                    });
            }
        }

        self.prev = Some((day, frame.data().clone()));
        Ok(())
    }

    /// Emit the year's onset map.
    pub fn finish(self) -> PhenologyMap {
        self.map
    }
}
