//! Error types for phenora

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for phenora operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    /// No file in the input directory matches the expected frame naming pattern.
    #[error("no input frames found in {dir}")]
    MissingInput { dir: PathBuf },

    /// The external land/water mask could not be located.
    #[error("mask resource not found: {path}")]
    MissingResource { path: PathBuf },

    /// A frame's grid or geotransform disagrees with the reference grid.
    #[error("geometry mismatch: {context}")]
    GeometryMismatch { context: String },

    /// The decline baseline window contained no frames for a year.
    #[error("no data in year {year}")]
    NoYearData { year: i32 },

    /// Unsupported mode or malformed arguments.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for phenora operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build a [`Error::GeometryMismatch`] comparing two shapes.
    pub fn shape_mismatch(what: &str, expected: (usize, usize), actual: (usize, usize)) -> Self {
        Error::GeometryMismatch {
            context: format!(
                "{what}: expected {}x{}, got {}x{}",
                expected.0, expected.1, actual.0, actual.1
            ),
        }
    }
}
