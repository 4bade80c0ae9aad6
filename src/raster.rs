use gdal::Dataset;
use log::{debug, info};
use ndarray::{Array2, Array3};

use crate::error::{Result, SampleError};
use crate::window::PixelWindow;

/// Read access to a multi-band raster. Band indices are 0-based.
pub trait RasterSource {
    fn band_count(&self) -> usize;
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    /// CRS descriptor (projection WKT; empty if the raster carries none).
    fn projection(&self) -> String;
    /// Six-element affine geotransform in GDAL order.
    fn geo_transform(&self) -> [f64; 6];
    /// Declared no-data sentinel, if any.
    fn no_data_value(&self) -> Option<f64>;
    /// Read one band within a window that must lie inside the raster.
    fn read_window(&self, band: usize, window: &PixelWindow) -> Result<Array2<f64>>;
}

/// Invert the affine geotransform to map a geographic coordinate onto
/// fractional pixel (row, col). Handles rotated transforms; callers floor
/// the result to get whole pixels.
pub fn geo_to_pixel(transform: &[f64; 6], x: f64, y: f64) -> Result<(f64, f64)> {
    let [x0, a, b, y0, c, d] = *transform;
    let det = a * d - b * c;
    if det == 0.0 {
        return Err(SampleError::NonInvertibleTransform);
    }
    let dx = x - x0;
    let dy = y - y0;
    let col = (dx * d - dy * b) / det;
    let row = (dy * a - dx * c) / det;
    Ok((row, col))
}

/// A raster opened through GDAL. Owns the dataset for the duration of one
/// sampling run; the handle closes when this drops.
pub struct GdalRaster {
    dataset: Dataset,
    width: usize,
    height: usize,
    bands: usize,
    geo_transform: [f64; 6],
    projection: String,
    nodata: Option<f64>,
}

impl GdalRaster {
    pub fn open(path: &str) -> Result<Self> {
        info!("Opening raster: {}", path);
        let dataset = Dataset::open(path)?;

        let (width, height) = dataset.raster_size();
        let bands = dataset.raster_count();
        let geo_transform = dataset.geo_transform()?;
        let projection = dataset.projection();
        let nodata = dataset.rasterband(1)?.no_data_value();

        info!("Raster crs: {}", projection);
        debug!("Raster size: {}x{}, {} bands", width, height, bands);

        Ok(Self {
            dataset,
            width,
            height,
            bands,
            geo_transform,
            projection,
            nodata,
        })
    }
}

impl RasterSource for GdalRaster {
    fn band_count(&self) -> usize {
        self.bands
    }

    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn projection(&self) -> String {
        self.projection.clone()
    }

    fn geo_transform(&self) -> [f64; 6] {
        self.geo_transform
    }

    fn no_data_value(&self) -> Option<f64> {
        self.nodata
    }

    fn read_window(&self, band: usize, window: &PixelWindow) -> Result<Array2<f64>> {
        let rasterband = self.dataset.rasterband(band + 1)?;

        let buffer = rasterband.read_as::<f64>(
            (window.col_off as isize, window.row_off as isize),
            (window.width, window.height),
            (window.width, window.height),
            None,
        )?;
        let data_vec: Vec<f64> = buffer.into_iter().collect();
        let data = Array2::from_shape_vec((window.height, window.width), data_vec)?;

        Ok(data)
    }
}

/// In-memory raster over an (band, row, col) array, with an explicit
/// geotransform. Useful for embedding and for engine tests.
pub struct ArrayRaster {
    data: Array3<f64>,
    geo_transform: [f64; 6],
    nodata: Option<f64>,
}

impl ArrayRaster {
    /// Identity transform: geographic (x, y) coincides with (col, row).
    pub fn new(data: Array3<f64>) -> Self {
        Self::with_transform(data, [0.0, 1.0, 0.0, 0.0, 0.0, 1.0])
    }

    pub fn with_transform(data: Array3<f64>, geo_transform: [f64; 6]) -> Self {
        Self {
            data,
            geo_transform,
            nodata: None,
        }
    }

    pub fn with_nodata(mut self, nodata: f64) -> Self {
        self.nodata = Some(nodata);
        self
    }
}

impl RasterSource for ArrayRaster {
    fn band_count(&self) -> usize {
        self.data.dim().0
    }

    fn width(&self) -> usize {
        self.data.dim().2
    }

    fn height(&self) -> usize {
        self.data.dim().1
    }

    fn projection(&self) -> String {
        String::new()
    }

    fn geo_transform(&self) -> [f64; 6] {
        self.geo_transform
    }

    fn no_data_value(&self) -> Option<f64> {
        self.nodata
    }

    fn read_window(&self, band: usize, window: &PixelWindow) -> Result<Array2<f64>> {
        let (bands, height, width) = self.data.dim();
        if band >= bands || !window.fits(width, height) {
            return Err(SampleError::ShapeError(ndarray::ShapeError::from_kind(
                ndarray::ErrorKind::OutOfBounds,
            )));
        }

        let row0 = window.row_off as usize;
        let col0 = window.col_off as usize;
        let view = self.data.slice(ndarray::s![
            band,
            row0..row0 + window.height,
            col0..col0 + window.width
        ]);
        Ok(view.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_geo_to_pixel_identity() {
        let gt = [0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
        let (row, col) = geo_to_pixel(&gt, 3.0, 7.0).unwrap();
        assert_eq!((row, col), (7.0, 3.0));
    }

    #[test]
    fn test_geo_to_pixel_north_up() {
        // 30 m pixels, origin at (500000, 5200000), north-up (negative dy)
        let gt = [500_000.0, 30.0, 0.0, 5_200_000.0, 0.0, -30.0];
        let (row, col) = geo_to_pixel(&gt, 500_300.0, 5_199_700.0).unwrap();
        assert!((col - 10.0).abs() < 1e-9);
        assert!((row - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_geo_to_pixel_fractional() {
        let gt = [0.0, 10.0, 0.0, 0.0, 0.0, -10.0];
        let (row, col) = geo_to_pixel(&gt, 25.0, -5.0).unwrap();
        assert!((col - 2.5).abs() < 1e-9);
        assert!((row - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_geo_to_pixel_degenerate_transform() {
        let gt = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        assert!(matches!(
            geo_to_pixel(&gt, 1.0, 1.0),
            Err(SampleError::NonInvertibleTransform)
        ));
    }

    #[test]
    fn test_array_raster_window_read() {
        let mut data = Array3::zeros((1, 3, 3));
        data[[0, 1, 2]] = 9.0;
        let raster = ArrayRaster::new(data);

        let window = PixelWindow { col_off: 1, row_off: 0, width: 2, height: 2 };
        let block = raster.read_window(0, &window).unwrap();
        assert_eq!(block[[1, 1]], 9.0);
        assert_eq!(block[[0, 0]], 0.0);
    }

    #[test]
    fn test_array_raster_rejects_bad_band() {
        let raster = ArrayRaster::new(Array3::zeros((1, 2, 2)));
        let window = PixelWindow { col_off: 0, row_off: 0, width: 1, height: 1 };
        assert!(raster.read_window(3, &window).is_err());
    }
}
