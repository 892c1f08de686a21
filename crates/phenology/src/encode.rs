//! Quantized byte encoding of day-of-year maps.
//!
//! Products store days in a single byte. Normal days are shifted down by
//! 100 and clamped into `[0, 199]`; sentinel codes at 370 and above are
//! shifted down by 170 so they land above the normal-day range with
//! their identities intact (370 → 200, 390 → 220). Decoding a product
//! therefore needs exactly these constants.

use crate::dayvalue::{DayValue, PhenologyMap};
use crate::maybe_rayon::*;
use ndarray::Array2;
use phenora_core::Raster;

/// Subtracted from normal day values before clamping.
pub const DAY_OFFSET: f64 = 100.0;
/// Largest byte representing a normal day (day 299).
pub const DAY_MAX_ENCODED: u8 = 199;
/// Raw values at or above this are sentinel codes, not days.
pub const SENTINEL_FLOOR: f64 = 370.0;
/// Subtracted from sentinel codes; puts water (370) at byte 200.
pub const SENTINEL_OFFSET: f64 = 170.0;

/// Encode one raw day/sentinel value into its byte code.
///
/// NaN (no crossing recorded) encodes to 0, indistinguishable from a
/// clamped early day; this matches the historical product format.
pub fn encode_raw(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    if value >= SENTINEL_FLOOR {
        return (value - SENTINEL_OFFSET) as u8;
    }
    (value - DAY_OFFSET).clamp(0.0, DAY_MAX_ENCODED as f64) as u8
}

/// Encode one tagged day value.
pub fn encode_value(value: DayValue) -> u8 {
    encode_raw(value.raw())
}

/// Encode a whole phenology map into a byte raster carrying the map's
/// geotransform and projection.
pub fn encode_map(map: &PhenologyMap) -> Raster<u8> {
    let (rows, cols) = map.shape();
    let values = map.values();

    let data: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            (0..cols)
                .map(|col| encode_value(values[(row, col)]))
                .collect::<Vec<u8>>()
        })
        .collect();

    let array = Array2::from_shape_vec((rows, cols), data)
        .expect("row-major collection matches map shape");
    let mut raster = Raster::from_array(array);
    raster.set_transform(*map.transform());
    raster.set_crs(map.crs().cloned());
    raster
}
