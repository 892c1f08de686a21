//! End-to-end pipeline test on a synthetic tile.
//!
//! Builds a small tile directory of uniform frames with a known temporal
//! profile, runs the full chain and checks the encoded products pixel by
//! pixel, including the water sentinel and idempotence of a re-run.

use phenora_core::io::{read_geotiff, write_geotiff};
use phenora_core::{GeoTransform, Raster, CRS};
use phenora_phenology::config::PhenologyConfig;
use phenora_phenology::pipeline::{process_tile, run_average};
use std::path::Path;

const ROWS: usize = 6;
const COLS: usize = 6;
/// Column of permanent water in the synthetic mask.
const WATER_COL: usize = 5;

fn tile_grid() -> GeoTransform {
    GeoTransform::new(0.0, ROWS as f64, 1.0, -1.0)
}

fn tile_crs() -> CRS {
    CRS::from_epsg(32633)
}

/// Uniform-valued frame on the tile grid.
fn make_frame(value: f64) -> Raster<f64> {
    let mut raster = Raster::filled(ROWS, COLS, value);
    raster.set_transform(tile_grid());
    raster.set_crs(Some(tile_crs()));
    raster
}

/// Mask raster: land (1) everywhere except one water column (0).
fn make_mask() -> Raster<f64> {
    let mut raster = Raster::filled(ROWS, COLS, 1.0);
    raster.set_transform(tile_grid());
    raster.set_crs(Some(tile_crs()));
    for row in 0..ROWS {
        raster.set(row, WATER_COL, 0.0).unwrap();
    }
    raster
}

/// Write the synthetic 2015 tile: a rise, a plateau and a decline.
///
/// With the default configuration this gives, per land pixel:
/// - seasonal average (Jul 4 - Aug 3, days 185..=215): mean of
///   0.2, 0.6, 0.8, 1.0 = 0.65, onset threshold 0.455
/// - onset crossing between day 190 (0.2) and 200 (0.6) at 196.375
/// - peak 1.0 on day 210
/// - decline baseline (days 201..=221): mean of 0.8, 1.0 = 0.9,
///   threshold 0.81, first below on day 225
fn write_tile(datadir: &Path) {
    let series = [
        (180, 0.1),
        (190, 0.2),
        (200, 0.6),
        (205, 0.8),
        (210, 1.0),
        (225, 0.5),
        (240, 0.2),
    ];
    for (day, value) in series {
        let path = datadir.join(format!("ndvi15_{day}.tiff"));
        write_geotiff(&make_frame(value), &path).unwrap();
    }
}

fn setup() -> (tempfile::TempDir, PhenologyConfig) {
    let dir = tempfile::tempdir().unwrap();
    let datadir = dir.path().join("input");
    let outputdir = dir.path().join("output");
    std::fs::create_dir(&datadir).unwrap();
    std::fs::create_dir(&outputdir).unwrap();

    write_tile(&datadir);

    let mask_path = dir.path().join("mask.tiff");
    write_geotiff(&make_mask(), &mask_path).unwrap();

    let config = PhenologyConfig {
        mask_path,
        ..PhenologyConfig::default()
    };
    (dir, config)
}

#[test]
fn full_chain_products_match_expected_days() {
    let (dir, config) = setup();
    let datadir = dir.path().join("input");
    let outputdir = dir.path().join("output");

    process_tile(&datadir, &outputdir, &config).unwrap();

    // Seasonal average: 0.65 on land, NaN on water
    let avg: Raster<f64> = read_geotiff(outputdir.join("GS_avg.tiff")).unwrap();
    assert!((avg.get(2, 2).unwrap() - 0.65).abs() < 1e-6);
    assert!(avg.get(2, WATER_COL).unwrap().is_nan());

    // Onset: 196.375 encodes to byte 96
    let onset: Raster<u8> = read_geotiff(outputdir.join("GS_onset_2015.tiff")).unwrap();
    assert_eq!(onset.get(0, 0).unwrap(), 96);
    assert_eq!(onset.get(0, WATER_COL).unwrap(), 200);

    // Peak: day 210 encodes to byte 110
    let peak: Raster<u8> = read_geotiff(outputdir.join("GS_peak_2015.tiff")).unwrap();
    assert_eq!(peak.get(3, 1).unwrap(), 110);
    assert_eq!(peak.get(3, WATER_COL).unwrap(), 200);

    // End: day 225 encodes to byte 125
    let end: Raster<u8> = read_geotiff(outputdir.join("GS_end_2015.tiff")).unwrap();
    assert_eq!(end.get(4, 2).unwrap(), 125);
    assert_eq!(end.get(4, WATER_COL).unwrap(), 200);

    // Products carry the tile's grid and projection
    let gt = onset.transform();
    assert!((gt.origin_y - ROWS as f64).abs() < 1e-9);
    assert!((gt.pixel_width - 1.0).abs() < 1e-9);
    let crs = onset.crs().expect("product carries the tile projection");
    assert_eq!(crs.epsg(), Some(32633));
    assert_eq!(avg.crs().and_then(|c| c.epsg()), Some(32633));
}

#[test]
fn rerun_is_byte_identical() {
    let (dir, config) = setup();
    let datadir = dir.path().join("input");
    let outputdir = dir.path().join("output");

    process_tile(&datadir, &outputdir, &config).unwrap();

    let product_names = [
        "GS_avg.tiff",
        "GS_onset_2015.tiff",
        "GS_peak_2015.tiff",
        "GS_end_2015.tiff",
    ];
    let first: Vec<Vec<u8>> = product_names
        .iter()
        .map(|n| std::fs::read(outputdir.join(n)).unwrap())
        .collect();

    process_tile(&datadir, &outputdir, &config).unwrap();

    for (name, before) in product_names.iter().zip(&first) {
        let after = std::fs::read(outputdir.join(name)).unwrap();
        assert_eq!(&after, before, "{name} changed between identical runs");
    }
}

#[test]
fn empty_tile_directory_is_missing_input() {
    let dir = tempfile::tempdir().unwrap();
    let datadir = dir.path().join("input");
    let outputdir = dir.path().join("output");
    std::fs::create_dir(&datadir).unwrap();
    std::fs::create_dir(&outputdir).unwrap();

    let config = PhenologyConfig::default();
    let err = run_average(&datadir, &outputdir, &config).unwrap_err();
    assert!(matches!(err, phenora_core::Error::MissingInput { .. }));
}

#[test]
fn malformed_frame_names_are_skipped() {
    let (dir, config) = setup();
    let datadir = dir.path().join("input");
    let outputdir = dir.path().join("output");

    // A file that looks frame-ish but doesn't parse must not break the run
    std::fs::write(datadir.join("ndvi_junk.tiff"), b"not a tiff").unwrap();

    process_tile(&datadir, &outputdir, &config).unwrap();
    assert!(outputdir.join("GS_onset_2015.tiff").exists());
}
