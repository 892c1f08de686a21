//! Growing-season end (decline) detection.
//!
//! Two phases per year. First a per-pixel baseline is accumulated from
//! every frame inside the day-of-year window `[day_start, day_end]`
//! (frames before the window are skipped outright). The first frame past
//! the window closes the baseline: pixels whose baseline is zero carry
//! no data for the year, and from that frame onward the first day a
//! pixel's value drops below `scale × baseline` is recorded, exactly
//! analogous to onset but in the decreasing direction.

use crate::dayvalue::{DayValue, PhenologyMap};
use crate::mask::LandMask;
use ndarray::Array2;
use phenora_core::{Error, Raster, Result};
use tracing::debug;

/// One year's decline sweep. Frames must arrive in ascending day order.
pub struct DeclineSweep<'m> {
    mask: &'m LandMask,
    year: i32,
    day_start: u32,
    day_end: u32,
    scale: f64,
    peak_sum: Array2<f64>,
    nsets: u32,
    /// Baseline average, set once the averaging phase closes.
    baseline: Option<Array2<f64>>,
    map: PhenologyMap,
}

impl<'m> DeclineSweep<'m> {
    pub fn new(mask: &'m LandMask, year: i32, day_bounds: (u32, u32), scale: f64) -> Self {
        Self {
            mask,
            year,
            day_start: day_bounds.0,
            day_end: day_bounds.1,
            scale,
            peak_sum: Array2::zeros(mask.shape()),
            nsets: 0,
            baseline: None,
            map: mask.new_map(),
        }
    }

    /// Frames before the baseline window are not even worth loading.
    pub fn wants(&self, day: u32) -> bool {
        day >= self.day_start
    }

    /// Consume the next frame of the year.
    pub fn push(&mut self, day: u32, frame: &Raster<f64>) -> Result<()> {
        if day < self.day_start {
            return Ok(());
        }

        self.mask
            .check_geometry(frame, &format!("decline frame day {day}"))?;

        if self.baseline.is_none() {
            if day <= self.day_end {
                // Baseline phase: unconditional accumulation.
                self.peak_sum += frame.data();
                self.nsets += 1;
                return Ok(());
            }
            self.close_baseline()?;
        }

        let baseline = self.baseline.as_ref().expect("baseline just closed");
        let scale = self.scale;
        ndarray::Zip::from(self.map.values_mut())
            .and(frame.data())
            .and(baseline)
            .for_each(|state, &value, &base| {
                if state.is_unresolved() && value < scale * base {
                    *state = DayValue::Day(day as f64);
                }
            });

        Ok(())
    }

    /// Switch from averaging to detection: divide the baseline sum and
    /// mark zero-baseline pixels as having no data for the year.
    fn close_baseline(&mut self) -> Result<()> {
        if self.nsets == 0 {
            return Err(Error::NoYearData { year: self.year });
        }

        let n = self.nsets as f64;
        let baseline = self
            .peak_sum
            .mapv(|sum| if sum > 0.0 { sum / n } else { 0.0 });

        ndarray::Zip::from(self.map.values_mut())
            .and(&baseline)
            .for_each(|state, &base| {
                if state.is_unresolved() && base == 0.0 {
                    *state = DayValue::NoData;
                }
            });

        debug!(year = self.year, nsets = self.nsets, "closed decline baseline");
        self.baseline = Some(baseline);
        Ok(())
    }

    /// Emit the year's end-of-season map.
    ///
    /// A year whose frames never left the baseline window emits a map of
    /// unresolved land pixels, matching the original behavior.
    pub fn finish(self) -> PhenologyMap {
        self.map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    fn all_land(rows: usize, cols: usize) -> LandMask {
        LandMask::from_array(Array2::from_elem((rows, cols), true))
    }

    fn frame(values: Array2<f64>) -> Raster<f64> {
        Raster::from_array(values)
    }

    #[test]
    fn detects_first_drop_below_scaled_baseline() {
        let mask = all_land(1, 1);
        // Window days 200..=210, threshold 0.9 x baseline
        let mut sweep = DeclineSweep::new(&mask, 2015, (200, 210), 0.9);

        sweep.push(200, &frame(array![[0.8]])).unwrap();
        sweep.push(210, &frame(array![[1.0]])).unwrap();
        // baseline = 0.9, threshold = 0.81
        sweep.push(220, &frame(array![[0.85]])).unwrap(); // above
        sweep.push(230, &frame(array![[0.5]])).unwrap(); // first below
        sweep.push(240, &frame(array![[0.1]])).unwrap(); // stays frozen

        assert_eq!(sweep.finish().get(0, 0), DayValue::Day(230.0));
    }

    #[test]
    fn zero_baseline_means_no_data_regardless_of_later_frames() {
        let mask = all_land(1, 1);
        let mut sweep = DeclineSweep::new(&mask, 2015, (200, 210), 0.9);

        sweep.push(205, &frame(array![[0.0]])).unwrap();
        sweep.push(220, &frame(array![[0.0]])).unwrap();
        sweep.push(230, &frame(array![[0.5]])).unwrap();

        assert_eq!(sweep.finish().get(0, 0), DayValue::NoData);
    }

    #[test]
    fn frames_before_window_are_skipped() {
        let mask = all_land(1, 1);
        let mut sweep = DeclineSweep::new(&mask, 2015, (200, 210), 0.9);
        assert!(!sweep.wants(150));

        // Would drag the baseline down if it were counted
        sweep.push(150, &frame(array![[-10.0]])).unwrap();
        sweep.push(205, &frame(array![[1.0]])).unwrap();
        sweep.push(220, &frame(array![[0.5]])).unwrap();

        // baseline is exactly 1.0, threshold 0.9
        assert_eq!(sweep.finish().get(0, 0), DayValue::Day(220.0));
    }

    #[test]
    fn empty_baseline_window_is_fatal() {
        let mask = all_land(1, 1);
        let mut sweep = DeclineSweep::new(&mask, 2015, (200, 210), 0.9);

        // First frame is already past the window: nothing was accumulated
        let err = sweep.push(220, &frame(array![[0.5]])).unwrap_err();
        assert!(matches!(err, Error::NoYearData { year: 2015 }));
    }

    #[test]
    fn water_pixels_stay_water() {
        let mask = LandMask::from_array(array![[false, true]]);
        let mut sweep = DeclineSweep::new(&mask, 2015, (200, 210), 0.9);

        sweep.push(205, &frame(array![[1.0, 1.0]])).unwrap();
        sweep.push(220, &frame(array![[0.0, 0.0]])).unwrap();

        let map = sweep.finish();
        assert_eq!(map.get(0, 0), DayValue::Water);
        assert_eq!(map.get(0, 1), DayValue::Day(220.0));
    }
}
