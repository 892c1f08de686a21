//! Growing-season peak detection.
//!
//! Per year, tracks the running maximum of each land pixel and the day
//! it occurred. Strict greater-than comparisons keep the earliest day on
//! ties. Days are whole acquisition days; no sub-day refinement (such as
//! a parabola fit through the neighbors) is applied, and downstream
//! consumers rely on that integer-day behavior.

use crate::dayvalue::{DayValue, PhenologyMap};
use crate::mask::LandMask;
use ndarray::Array2;
use phenora_core::{Raster, Result};

/// One year's peak sweep. Frames must arrive in ascending day order.
pub struct PeakSweep<'m> {
    mask: &'m LandMask,
    map: PhenologyMap,
    best: Array2<f64>,
    started: bool,
}

impl<'m> PeakSweep<'m> {
    pub fn new(mask: &'m LandMask) -> Self {
        Self {
            mask,
            map: mask.new_map(),
            best: Array2::zeros(mask.shape()),
            started: false,
        }
    }

    /// Consume the next frame of the year.
    pub fn push(&mut self, day: u32, frame: &Raster<f64>) -> Result<()> {
        self.mask
            .check_geometry(frame, &format!("peak frame day {day}"))?;

        if !self.started {
            // Every land pixel starts at the first frame's day and value.
            ndarray::Zip::from(self.map.values_mut())
                .and(&mut self.best)
                .and(frame.data())
                .and(self.mask.land())
                .for_each(|state, best, &value, &is_land| {
                    if is_land {
                        *state = DayValue::Day(day as f64);
                        *best = value;
                    }
                });
            self.started = true;
        } else {
            ndarray::Zip::from(self.map.values_mut())
                .and(&mut self.best)
                .and(frame.data())
                .and(self.mask.land())
                .for_each(|state, best, &value, &is_land| {
                    if is_land && value > *best {
                        *best = value;
                        *state = DayValue::Day(day as f64);
                    }
                });
        }

        Ok(())
    }

    /// Emit the year's peak-day map.
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
    fn ties_keep_the_earliest_day() {
        let mask = all_land(1, 1);
        let mut sweep = PeakSweep::new(&mask);

        for (day, v) in [(1, 5.0), (2, 7.0), (3, 7.0), (4, 3.0)] {
            sweep.push(day, &frame(array![[v]])).unwrap();
        }

        assert_eq!(sweep.finish().get(0, 0), DayValue::Day(2.0));
    }

    #[test]
    fn single_frame_year_peaks_on_that_day() {
        let mask = all_land(1, 2);
        let mut sweep = PeakSweep::new(&mask);
        sweep.push(180, &frame(array![[0.3, -1.0]])).unwrap();

        let map = sweep.finish();
        assert_eq!(map.get(0, 0), DayValue::Day(180.0));
        // Even a negative first value claims the first day
        assert_eq!(map.get(0, 1), DayValue::Day(180.0));
    }

    #[test]
    fn water_pixels_stay_water() {
        let mask = LandMask::from_array(array![[false, true]]);
        let mut sweep = PeakSweep::new(&mask);

        sweep.push(10, &frame(array![[0.5, 0.5]])).unwrap();
        sweep.push(20, &frame(array![[0.9, 0.2]])).unwrap();

        let map = sweep.finish();
        assert_eq!(map.get(0, 0), DayValue::Water);
        assert_eq!(map.get(0, 1), DayValue::Day(10.0));
    }

    #[test]
    fn geometry_mismatch_is_fatal() {
        let mask = all_land(2, 2);
        let mut sweep = PeakSweep::new(&mask);
        assert!(sweep.push(10, &frame(Array2::zeros((1, 2)))).is_err());
    }
}
