//! Land/water mask alignment.
//!
//! The external mask lives on its own grid; every detector needs it on
//! the tile's grid. Alignment fills the target with water and resamples
//! the mask's land pixels (value 1) onto it with nearest-neighbor
//! lookups through the two geotransforms, so unresolved target pixels
//! keep the water fill. Same-CRS grids are assumed; a full reprojector
//! could replace [`align_mask`] without touching the detectors.

use crate::dayvalue::{DayValue, PhenologyMap};
use crate::maybe_rayon::*;
use ndarray::Array2;
use phenora_core::{Error, GeoTransform, Raster, RasterElement, Result, CRS};
use std::path::Path;
use tracing::{debug, info};

/// Land/water mask on a tile's grid.
///
/// Water pixels carry the raw sentinel 370 in the products; here they
/// are simply `false`.
#[derive(Debug, Clone)]
pub struct LandMask {
    land: Array2<bool>,
    transform: GeoTransform,
    crs: Option<CRS>,
}

impl LandMask {
    /// Build a mask directly from a boolean array (mainly for tests).
    pub fn from_array(land: Array2<bool>) -> Self {
        Self {
            land,
            transform: GeoTransform::default(),
            crs: None,
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.land.dim()
    }

    pub fn is_land(&self, row: usize, col: usize) -> bool {
        self.land[(row, col)]
    }

    pub fn land(&self) -> &Array2<bool> {
        &self.land
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

    /// Number of land pixels.
    pub fn land_count(&self) -> usize {
        self.land.iter().filter(|&&v| v).count()
    }

    /// Verify a frame shares this mask's grid.
    ///
    /// Called before any pixel computation touches the frame; a mismatch
    /// is fatal to the year.
    pub fn check_geometry<T: RasterElement>(&self, frame: &Raster<T>, what: &str) -> Result<()> {
        if frame.shape() != self.shape() {
            return Err(Error::shape_mismatch(what, self.shape(), frame.shape()));
        }
        if !frame.transform().approx_eq(&self.transform, 1e-6) {
            return Err(Error::GeometryMismatch {
                context: format!("{what}: geotransform disagrees with mask"),
            });
        }
        if let (Some(mine), Some(theirs)) = (self.crs.as_ref(), frame.crs()) {
            if !mine.is_equivalent(theirs) {
                return Err(Error::GeometryMismatch {
                    context: format!("{what}: projection {theirs} disagrees with mask {mine}"),
                });
            }
        }
        Ok(())
    }

    /// Start a fresh phenology map on this grid: land pixels unresolved,
    /// water pixels tagged as water.
    pub fn new_map(&self) -> PhenologyMap {
        let values = self.land.mapv(|is_land| {
            if is_land {
                DayValue::Unresolved
            } else {
                DayValue::Water
            }
        });
        let mut map = PhenologyMap::from_values(values);
        map.set_transform(self.transform);
        map.set_crs(self.crs.clone());
        map
    }
}

/// Resample an external mask onto a reference frame's grid.
///
/// Nearest-neighbor through the geotransforms; target pixels with no
/// source pixel under them stay water.
pub fn align_mask<T: RasterElement>(external: &Raster<f64>, reference: &Raster<T>) -> LandMask {
    let (rows, cols) = reference.shape();
    let dst_gt = *reference.transform();
    let src_gt = *external.transform();
    let (src_rows, src_cols) = external.shape();

    let data: Vec<bool> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![false; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let (x, y) = dst_gt.pixel_to_geo(col, row);
                let (src_col, src_row) = src_gt.geo_to_pixel(x, y);
                let (sc, sr) = (src_col.floor(), src_row.floor());
                if sc < 0.0 || sr < 0.0 {
                    continue;
                }
                let (sc, sr) = (sc as usize, sr as usize);
                if sr >= src_rows || sc >= src_cols {
                    continue;
                }
                let v = external.data()[(sr, sc)];
                *out = (v - 1.0).abs() < 0.5;
            }
            row_data
        })
        .collect();

    let land = Array2::from_shape_vec((rows, cols), data)
        .expect("row-major collection matches target shape");

    LandMask {
        land,
        transform: dst_gt,
        crs: reference.crs().cloned(),
    }
}

/// Load the external mask and align it to a reference frame.
///
/// If `mask_path` does not exist, its bare file name is retried in the
/// current directory before giving up with [`Error::MissingResource`].
pub fn load_aligned_mask<T: RasterElement>(
    mask_path: &Path,
    reference: &Raster<T>,
) -> Result<LandMask> {
    let resolved = if mask_path.exists() {
        mask_path.to_path_buf()
    } else {
        let fallback = mask_path
            .file_name()
            .map(std::path::PathBuf::from)
            .filter(|p| p.exists());
        match fallback {
            Some(p) => {
                debug!(path = %p.display(), "using mask from current directory");
                p
            }
            None => {
                return Err(Error::MissingResource {
                    path: mask_path.to_path_buf(),
                })
            }
        }
    };

    let external: Raster<f64> = phenora_core::io::read_geotiff(&resolved)?;
    let mask = align_mask(&external, reference);
    info!(
        land = mask.land_count(),
        total = mask.shape().0 * mask.shape().1,
        "aligned land/water mask"
    );
    Ok(mask)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reference grid at origin (0, 4), 1x1 pixels, 4x4; external mask
    /// on the same grid with land in the upper-left 2x2 corner.
    fn aligned_pair() -> (Raster<f64>, Raster<f64>) {
        let mut external: Raster<f64> = Raster::new(4, 4);
        external.set_transform(GeoTransform::new(0.0, 4.0, 1.0, -1.0));
        for r in 0..2 {
            for c in 0..2 {
                external.set(r, c, 1.0).unwrap();
            }
        }

        let mut reference: Raster<f64> = Raster::new(4, 4);
        reference.set_transform(GeoTransform::new(0.0, 4.0, 1.0, -1.0));
        (external, reference)
    }

    #[test]
    fn identity_alignment_keeps_land_pixels() {
        let (external, reference) = aligned_pair();
        let mask = align_mask(&external, &reference);

        assert!(mask.is_land(0, 0));
        assert!(mask.is_land(1, 1));
        assert!(!mask.is_land(2, 2));
        assert_eq!(mask.land_count(), 4);
    }

    #[test]
    fn out_of_extent_target_stays_water() {
        let (external, mut reference) = aligned_pair();
        // Shift the reference grid far away from the mask extent
        reference.set_transform(GeoTransform::new(1000.0, 2000.0, 1.0, -1.0));

        let mask = align_mask(&external, &reference);
        assert_eq!(mask.land_count(), 0);
    }

    #[test]
    fn subsampled_alignment() {
        let (external, _) = aligned_pair();
        // Reference at double resolution over the same extent
        let mut reference: Raster<f64> = Raster::new(8, 8);
        reference.set_transform(GeoTransform::new(0.0, 4.0, 0.5, -0.5));

        let mask = align_mask(&external, &reference);
        // The 2x2 land corner becomes 4x4 at half-size pixels
        assert_eq!(mask.land_count(), 16);
        assert!(mask.is_land(3, 3));
        assert!(!mask.is_land(4, 4));
    }

    #[test]
    fn missing_mask_is_missing_resource() {
        let reference: Raster<f64> = Raster::new(2, 2);
        let err = load_aligned_mask(Path::new("/nonexistent/mask.tiff"), &reference).unwrap_err();
        assert!(matches!(err, Error::MissingResource { .. }));
    }

    #[test]
    fn geometry_check_rejects_wrong_shape() {
        let (external, reference) = aligned_pair();
        let mask = align_mask(&external, &reference);

        let bad: Raster<f64> = Raster::new(3, 4);
        assert!(matches!(
            mask.check_geometry(&bad, "frame"),
            Err(Error::GeometryMismatch { .. })
        ));
    }

    #[test]
    fn geometry_check_rejects_wrong_projection() {
        let (external, mut reference) = aligned_pair();
        reference.set_crs(Some(CRS::from_epsg(32633)));
        let mask = align_mask(&external, &reference);

        let mut frame: Raster<f64> = Raster::new(4, 4);
        frame.set_transform(GeoTransform::new(0.0, 4.0, 1.0, -1.0));
        frame.set_crs(Some(CRS::from_epsg(32634)));
        assert!(matches!(
            mask.check_geometry(&frame, "frame"),
            Err(Error::GeometryMismatch { .. })
        ));

        frame.set_crs(Some(CRS::from_epsg(32633)));
        assert!(mask.check_geometry(&frame, "frame").is_ok());
    }

    #[test]
    fn new_map_tags_land_and_water() {
        let (external, reference) = aligned_pair();
        let mask = align_mask(&external, &reference);
        let map = mask.new_map();

        assert_eq!(map.get(0, 0), DayValue::Unresolved);
        assert_eq!(map.get(3, 3), DayValue::Water);
    }
}
