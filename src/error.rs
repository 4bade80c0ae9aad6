use thiserror::Error;

use crate::window::PixelWindow;

#[derive(Error, Debug)]
pub enum SampleError {
    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Array shape error: {0}")]
    ShapeError(#[from] ndarray::ShapeError),

    #[error("Invalid window size: {0} (must be at least 1)")]
    InvalidWindowSize(usize),

    #[error("Requested {requested} bands but raster has only {available}")]
    BandCountMismatch { requested: usize, available: usize },

    #[error("dB band index {index} out of range for {bands} bands")]
    DbIndexOutOfRange { index: usize, bands: usize },

    #[error("Feature {feature}: attribute keys {found:?} differ from schema {expected:?}")]
    SchemaMismatch {
        feature: usize,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Feature {feature} at ({x}, {y}): window {window} falls outside raster extent")]
    OutOfBounds {
        feature: usize,
        x: f64,
        y: f64,
        window: PixelWindow,
    },

    #[error("Feature {feature}: {reason}")]
    InvalidGeometry { feature: usize, reason: String },

    #[error("Raster geotransform is not invertible")]
    NonInvertibleTransform,

    #[error("Pairs manifest is missing the '{0}' column")]
    ManifestColumn(&'static str),
}

pub type Result<T> = std::result::Result<T, SampleError>;
