//! Coordinate Reference System handling

use serde::{Deserialize, Serialize};
use std::fmt;

/// GeoKey id naming a projected CRS code.
const PROJECTED_CS_TYPE: u16 = 3072;
/// GeoKey id naming a geographic CRS code.
const GEOGRAPHIC_TYPE: u16 = 2048;

/// Coordinate Reference System of a raster.
///
/// Carries the raw GeoTIFF key payloads (the GeoKeyDirectory plus its
/// double and ASCII parameter blocks) so a product is written with
/// exactly the projection its source tile had, whether or not the keys
/// resolve to an EPSG code. Only identity checks are performed, no
/// reprojection math.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    /// GeoKeyDirectory tag payload: a 4-short header followed by
    /// 4-short key entries.
    directory: Vec<u16>,
    /// GeoDoubleParams tag payload.
    doubles: Vec<f64>,
    /// GeoAsciiParams tag payload.
    ascii: Option<String>,
}

impl CRS {
    /// Create a CRS from a projected EPSG code (codes fit GeoTIFF's
    /// short key values).
    pub fn from_epsg(code: u32) -> Self {
        Self {
            directory: vec![
                1, 1, 0, 2, // version 1.1.0, 2 keys
                1024, 0, 1, 1, // GTModelTypeGeoKey = projected
                PROJECTED_CS_TYPE, 0, 1, code as u16,
            ],
            doubles: Vec::new(),
            ascii: None,
        }
    }

    /// Build from raw GeoTIFF tag payloads.
    ///
    /// Returns `None` when the key directory cannot even hold its
    /// four-short header.
    pub fn from_geo_tags(
        directory: Vec<u16>,
        doubles: Vec<f64>,
        ascii: Option<String>,
    ) -> Option<Self> {
        if directory.len() < 4 {
            return None;
        }
        Some(Self {
            directory,
            doubles,
            ascii,
        })
    }

    /// Raw GeoKeyDirectory payload.
    pub fn directory(&self) -> &[u16] {
        &self.directory
    }

    /// Raw GeoDoubleParams payload.
    pub fn doubles(&self) -> &[f64] {
        &self.doubles
    }

    /// Raw GeoAsciiParams payload.
    pub fn ascii(&self) -> Option<&str> {
        self.ascii.as_deref()
    }

    /// EPSG code, when the key directory names one.
    pub fn epsg(&self) -> Option<u32> {
        self.find_key(PROJECTED_CS_TYPE)
            .or_else(|| self.find_key(GEOGRAPHIC_TYPE))
            .map(u32::from)
    }

    /// Value of a key stored inline in the directory.
    fn find_key(&self, key: u16) -> Option<u16> {
        self.directory[4..]
            .chunks_exact(4)
            .find(|entry| entry[0] == key && entry[1] == 0)
            .map(|entry| entry[3])
    }

    /// Check if two CRS are equivalent
    pub fn is_equivalent(&self, other: &CRS) -> bool {
        if let (Some(a), Some(b)) = (self.epsg(), other.epsg()) {
            return a == b;
        }
        self == other
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg() {
            return format!("EPSG:{}", code);
        }
        format!("GeoKeys[{}]", self.directory[3])
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epsg_equivalence() {
        let a = CRS::from_epsg(32633);
        let b = CRS::from_epsg(32633);
        let c = CRS::from_epsg(4326);
        assert!(a.is_equivalent(&b));
        assert!(!a.is_equivalent(&c));
    }

    #[test]
    fn test_identifier() {
        assert_eq!(CRS::from_epsg(32633).identifier(), "EPSG:32633");
    }

    #[test]
    fn test_geographic_key_resolves_epsg() {
        let crs = CRS::from_geo_tags(
            vec![1, 1, 0, 2, 1024, 0, 1, 2, GEOGRAPHIC_TYPE, 0, 1, 4326],
            Vec::new(),
            None,
        )
        .unwrap();
        assert_eq!(crs.epsg(), Some(4326));
        assert_eq!(crs.identifier(), "EPSG:4326");
    }

    #[test]
    fn test_unknown_keys_compare_raw() {
        // A citation-only directory has no EPSG code
        let a = CRS::from_geo_tags(
            vec![1, 1, 0, 1, 1026, 34737, 7, 0],
            Vec::new(),
            Some("custom".to_string()),
        )
        .unwrap();
        assert_eq!(a.epsg(), None);
        assert!(a.is_equivalent(&a.clone()));
        assert!(!a.is_equivalent(&CRS::from_epsg(32633)));
        assert_eq!(a.identifier(), "GeoKeys[1]");
    }

    #[test]
    fn test_truncated_directory_is_rejected() {
        assert!(CRS::from_geo_tags(vec![1, 1], Vec::new(), None).is_none());
    }
}
