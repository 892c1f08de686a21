//! Frame discovery and chronological ordering.
//!
//! Input tiles are directories of single-band vegetation-index GeoTIFFs
//! named `ndvi<YY>_<DDD>.tiff`, where `YY` is the year minus 2000 and
//! `DDD` the day of year of the acquisition. The catalog scans a
//! directory once, orders frames by `(year, day)` and hands them to the
//! sweeps in that order; the first-crossing and running-maximum logic
//! depends on it.

use phenora_core::{Error, Raster, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Acquisition identity of one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FrameId {
    /// Full calendar year (file names carry year - 2000).
    pub year: i32,
    /// Day of year, 1-based.
    pub day: u32,
}

/// One discovered frame: identity plus on-disk location.
#[derive(Debug, Clone)]
pub struct FrameEntry {
    pub id: FrameId,
    pub path: PathBuf,
}

impl FrameEntry {
    /// Read the frame's pixel data.
    pub fn load(&self) -> Result<Raster<f64>> {
        phenora_core::io::read_geotiff(&self.path)
    }
}

/// Ordered set of frames for one tile directory.
#[derive(Debug)]
pub struct FrameCatalog {
    entries: Vec<FrameEntry>,
}

impl FrameCatalog {
    /// Scan a directory for vegetation-index frames.
    ///
    /// Files that do not match the naming convention are skipped; ones
    /// that look like frames but fail to parse get a warning. An empty
    /// result is a fatal [`Error::MissingInput`].
    pub fn scan(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let mut entries = Vec::new();

        for dirent in std::fs::read_dir(&dir)? {
            let path = dirent?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            match parse_frame_name(name) {
                Some(id) => entries.push(FrameEntry { id, path }),
                None => {
                    if name.starts_with("ndvi") {
                        warn!(file = name, "skipping frame with malformed name");
                    } else {
                        debug!(file = name, "ignoring non-frame file");
                    }
                }
            }
        }

        if entries.is_empty() {
            return Err(Error::MissingInput { dir });
        }

        entries.sort_by_key(|e| e.id);
        debug!(count = entries.len(), dir = %dir.display(), "catalogued frames");

        Ok(Self { entries })
    }

    /// All frames in `(year, day)` order.
    pub fn entries(&self) -> &[FrameEntry] {
        &self.entries
    }

    /// First frame in chronological order; used as the reference grid
    /// for mask alignment.
    pub fn reference(&self) -> &FrameEntry {
        // scan() guarantees at least one entry
        &self.entries[0]
    }

    /// Frames grouped by year, each group in ascending day order.
    pub fn by_year(&self) -> Vec<(i32, &[FrameEntry])> {
        let mut groups: Vec<(i32, &[FrameEntry])> = Vec::new();
        let mut start = 0;
        for i in 1..=self.entries.len() {
            if i == self.entries.len() || self.entries[i].id.year != self.entries[start].id.year {
                groups.push((self.entries[start].id.year, &self.entries[start..i]));
                start = i;
            }
        }
        groups
    }
}

/// Parse `ndvi<YY>_<DDD>.tiff` into a [`FrameId`].
fn parse_frame_name(name: &str) -> Option<FrameId> {
    let rest = name.strip_prefix("ndvi")?;
    let rest = rest.strip_suffix(".tiff")?;
    let (year_part, day_part) = rest.split_once('_')?;

    let year_offset: i32 = year_part.parse().ok()?;
    let day: u32 = day_part.parse().ok()?;
    if day == 0 || day > 366 {
        return None;
    }

    Some(FrameId {
        year: 2000 + year_offset,
        day,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_frame_names() {
        let id = parse_frame_name("ndvi15_196.tiff").unwrap();
        assert_eq!(id.year, 2015);
        assert_eq!(id.day, 196);

        assert!(parse_frame_name("ndvi7_012.tiff").is_some());
        assert!(parse_frame_name("ndvi15_196.tif").is_none());
        assert!(parse_frame_name("ndvi15-196.tiff").is_none());
        assert!(parse_frame_name("ndvi15_999.tiff").is_none());
        assert!(parse_frame_name("GS_avg.tiff").is_none());
        assert!(parse_frame_name("ndvi_x.tiff").is_none());
    }

    #[test]
    fn scan_orders_by_year_then_day() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["ndvi16_100.tiff", "ndvi15_250.tiff", "ndvi15_180.tiff"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let catalog = FrameCatalog::scan(dir.path()).unwrap();
        let ids: Vec<(i32, u32)> = catalog
            .entries()
            .iter()
            .map(|e| (e.id.year, e.id.day))
            .collect();
        assert_eq!(ids, vec![(2015, 180), (2015, 250), (2016, 100)]);

        let groups = catalog.by_year();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, 2015);
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[1].0, 2016);
    }

    #[test]
    fn scan_of_empty_dir_is_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("readme.txt"), b"").unwrap();

        match FrameCatalog::scan(dir.path()) {
            Err(Error::MissingInput { .. }) => {}
            other => panic!("expected MissingInput, got {:?}", other.map(|_| ())),
        }
    }
}
