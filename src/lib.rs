// Library exports for testing and reuse

pub mod batch;
pub mod cli;
pub mod convert;
pub mod error;
pub mod points;
pub mod raster;
pub mod sample;
pub mod table;
pub mod window;

// Re-export commonly used types
pub use error::{Result, SampleError};
pub use points::{
    AttributeValue, GdalPointSource, MemoryPointSource, PointFeature, PointGeometry, PointSource,
};
pub use raster::{geo_to_pixel, ArrayRaster, GdalRaster, RasterSource};
pub use sample::{sample_table, OutOfBoundsAction, SampleOptions};
pub use table::SampleTable;
pub use window::{BoundsPolicy, PixelWindow};
