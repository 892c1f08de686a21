//! I/O operations for reading and writing geospatial data

mod geotiff;

pub use geotiff::{read_geotiff, write_byte_geotiff, write_geotiff};
