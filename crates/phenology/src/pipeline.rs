//! Tile-level drivers tying catalog, mask, sweeps and products together.
//!
//! Each driver covers one operation of the processing chain; a tile is
//! fully processed by [`process_tile`], which chains them in order
//! (average → onset → peak → end). Drivers stream frames from disk one
//! at a time in catalog order. All fatal errors abort the tile run with
//! no partial retry; tiles are independent, so callers may process
//! different tiles in parallel without coordination.

use crate::average::SeasonalAverage;
use crate::catalog::FrameCatalog;
use crate::config::PhenologyConfig;
use crate::dayvalue::PhenologyMap;
use crate::decline::DeclineSweep;
use crate::encode::encode_map;
use crate::mask::{load_aligned_mask, LandMask};
use crate::onset::{threshold_raster, OnsetSweep};
use crate::peak::PeakSweep;
use phenora_core::io::{read_geotiff, write_byte_geotiff, write_geotiff};
use phenora_core::{Raster, Result};
use std::path::Path;
use tracing::info;

/// The three per-year products.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductKind {
    Onset,
    Peak,
    End,
}

impl ProductKind {
    /// Output file name for a year, e.g. `GS_onset_2015.tiff`.
    pub fn file_name(self, year: i32) -> String {
        let stem = match self {
            ProductKind::Onset => "onset",
            ProductKind::Peak => "peak",
            ProductKind::End => "end",
        };
        format!("GS_{stem}_{year}.tiff")
    }

    /// Band description written into the product.
    pub fn description(self) -> &'static str {
        match self {
            ProductKind::Onset => "Growth season onset",
            ProductKind::Peak => "Growth season peak",
            ProductKind::End => "Growth season end",
        }
    }
}

/// Encode a year's map and write it as a byte GeoTIFF product.
pub fn write_product(
    outputdir: &Path,
    kind: ProductKind,
    year: i32,
    map: &PhenologyMap,
) -> Result<()> {
    let encoded = encode_map(map);
    let path = outputdir.join(kind.file_name(year));
    write_byte_geotiff(&encoded, &path, Some(kind.description()))?;
    info!(path = %path.display(), "wrote product");
    Ok(())
}

/// Scan the tile directory and align the land/water mask onto the grid
/// of its first frame.
fn catalog_and_mask(datadir: &Path, config: &PhenologyConfig) -> Result<(FrameCatalog, LandMask)> {
    let catalog = FrameCatalog::scan(datadir)?;
    let reference = catalog.reference().load()?;
    let mask = load_aligned_mask(&config.mask_path, &reference)?;
    Ok((catalog, mask))
}

/// Compute the multi-year seasonal average and write it as a Float32
/// GeoTIFF under the configured average file name.
pub fn run_average(datadir: &Path, outputdir: &Path, config: &PhenologyConfig) -> Result<()> {
    let (catalog, mask) = catalog_and_mask(datadir, config)?;
    let mut sweep = SeasonalAverage::new(&mask, config.onset_window);

    for entry in catalog.entries() {
        if !sweep.wants(entry.id) {
            continue;
        }
        let frame = entry.load()?;
        sweep.push(entry.id, &frame)?;
    }

    info!(frames = sweep.frames_used(), "averaged seasonal window");
    let avg = sweep.finish();

    let path = outputdir.join(&config.avg_filename);
    write_geotiff(&avg, &path)?;
    info!(path = %path.display(), "wrote seasonal average");
    Ok(())
}

/// Detect onset per year against `scale × average` and write the yearly
/// products. The average must have been computed first.
pub fn run_onset(datadir: &Path, outputdir: &Path, config: &PhenologyConfig) -> Result<()> {
    let (catalog, mask) = catalog_and_mask(datadir, config)?;

    let avg: Raster<f64> = read_geotiff(outputdir.join(&config.avg_filename))?;
    mask.check_geometry(&avg, "seasonal average")?;
    let threshold = threshold_raster(&avg, config.onset_threshold_scale);

    for (year, frames) in catalog.by_year() {
        let mut sweep = OnsetSweep::new(&mask, &threshold)?;
        for entry in frames {
            let frame = entry.load()?;
            sweep.push(entry.id.day, &frame)?;
        }
        write_product(outputdir, ProductKind::Onset, year, &sweep.finish())?;
    }

    Ok(())
}

/// Detect the peak day per year and write the yearly products.
pub fn run_peak(datadir: &Path, outputdir: &Path, config: &PhenologyConfig) -> Result<()> {
    let (catalog, mask) = catalog_and_mask(datadir, config)?;

    for (year, frames) in catalog.by_year() {
        let mut sweep = PeakSweep::new(&mask);
        for entry in frames {
            let frame = entry.load()?;
            sweep.push(entry.id.day, &frame)?;
        }
        write_product(outputdir, ProductKind::Peak, year, &sweep.finish())?;
    }

    Ok(())
}

/// Detect the end of season per year and write the yearly products.
pub fn run_decline(datadir: &Path, outputdir: &Path, config: &PhenologyConfig) -> Result<()> {
    let (catalog, mask) = catalog_and_mask(datadir, config)?;
    let day_bounds = config.end_window.day_bounds();

    for (year, frames) in catalog.by_year() {
        if !config.end_window.contains_year(year) {
            continue;
        }
        let mut sweep = DeclineSweep::new(&mask, year, day_bounds, config.end_threshold_scale);
        for entry in frames {
            if !sweep.wants(entry.id.day) {
                continue;
            }
            let frame = entry.load()?;
            sweep.push(entry.id.day, &frame)?;
        }
        write_product(outputdir, ProductKind::End, year, &sweep.finish())?;
    }

    Ok(())
}

/// Run the full chain for one tile: average, onset, peak, end.
pub fn process_tile(datadir: &Path, outputdir: &Path, config: &PhenologyConfig) -> Result<()> {
    info!(tile = %datadir.display(), "computing seasonal average and onset");
    run_average(datadir, outputdir, config)?;
    run_onset(datadir, outputdir, config)?;

    info!(tile = %datadir.display(), "computing peak");
    run_peak(datadir, outputdir, config)?;

    info!(tile = %datadir.display(), "computing end of season");
    run_decline(datadir, outputdir, config)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_names_follow_convention() {
        assert_eq!(ProductKind::Onset.file_name(2015), "GS_onset_2015.tiff");
        assert_eq!(ProductKind::Peak.file_name(2016), "GS_peak_2016.tiff");
        assert_eq!(ProductKind::End.file_name(2017), "GS_end_2017.tiff");
    }

    #[test]
    fn product_descriptions() {
        assert_eq!(ProductKind::Onset.description(), "Growth season onset");
        assert_eq!(ProductKind::End.description(), "Growth season end");
    }
}
