//! Tagged per-pixel day values and the phenology map they live in.
//!
//! The original products overload one numeric domain with real days of
//! year and reserved sentinel codes (370 = water, 390 = no data in year).
//! Internally we keep the conditions apart as an enum and only collapse
//! to the raw numeric codes at the encoder/raster boundary, so a day
//! value can never be silently mistaken for a sentinel.

use ndarray::Array2;
use phenora_core::{GeoTransform, Raster, CRS};

/// Raw sentinel code for water pixels.
pub const WATER_RAW: f64 = 370.0;
/// Raw sentinel code for "no valid data in year" pixels.
pub const NODATA_RAW: f64 = 390.0;

/// Per-pixel state of a phenology metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DayValue {
    /// A resolved day of year, possibly fractional from interpolation.
    Day(f64),
    /// Land pixel with no crossing recorded (yet).
    Unresolved,
    /// Water pixel from the land/water mask.
    Water,
    /// Land pixel whose year carried no usable observations.
    NoData,
}

impl DayValue {
    /// Collapse to the raw numeric encoding used by the products.
    pub fn raw(self) -> f64 {
        match self {
            DayValue::Day(d) => d,
            DayValue::Unresolved => f64::NAN,
            DayValue::Water => WATER_RAW,
            DayValue::NoData => NODATA_RAW,
        }
    }

    /// Whether this pixel still awaits a first crossing.
    pub fn is_unresolved(self) -> bool {
        matches!(self, DayValue::Unresolved)
    }
}

/// A per-pixel day map for one (year, metric) pair, on a tile's grid.
#[derive(Debug, Clone)]
pub struct PhenologyMap {
    values: Array2<DayValue>,
    transform: GeoTransform,
    crs: Option<CRS>,
}

impl PhenologyMap {
    /// Create a map with every pixel in the given state.
    pub fn filled(rows: usize, cols: usize, value: DayValue) -> Self {
        Self {
            values: Array2::from_elem((rows, cols), value),
            transform: GeoTransform::default(),
            crs: None,
        }
    }

    /// Create a map from an existing value array.
    pub fn from_values(values: Array2<DayValue>) -> Self {
        Self {
            values,
            transform: GeoTransform::default(),
            crs: None,
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    pub fn get(&self, row: usize, col: usize) -> DayValue {
        self.values[(row, col)]
    }

    pub fn set(&mut self, row: usize, col: usize, value: DayValue) {
        self.values[(row, col)] = value;
    }

    pub fn values(&self) -> &Array2<DayValue> {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut Array2<DayValue> {
        &mut self.values
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    pub fn set_crs(&mut self, crs: Option<CRS>) {
        self.crs = crs;
    }

    /// Collapse to a raw float raster (NaN / day / sentinel codes).
    pub fn to_raw_raster(&self) -> Raster<f64> {
        let raw = self.values.mapv(DayValue::raw);
        let mut raster = Raster::from_array(raw);
        raster.set_transform(self.transform);
        raster.set_crs(self.crs.clone());
        raster.set_nodata(Some(f64::NAN));
        raster
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_codes() {
        assert_eq!(DayValue::Day(150.0).raw(), 150.0);
        assert_eq!(DayValue::Water.raw(), 370.0);
        assert_eq!(DayValue::NoData.raw(), 390.0);
        assert!(DayValue::Unresolved.raw().is_nan());
    }

    #[test]
    fn raw_raster_keeps_grid() {
        let mut map = PhenologyMap::filled(2, 2, DayValue::Unresolved);
        map.set(0, 0, DayValue::Day(181.5));
        map.set_transform(GeoTransform::new(10.0, 20.0, 1.0, -1.0));

        let raster = map.to_raw_raster();
        assert_eq!(raster.get(0, 0).unwrap(), 181.5);
        assert!(raster.get(1, 1).unwrap().is_nan());
        assert_eq!(raster.transform().origin_x, 10.0);
    }
}
