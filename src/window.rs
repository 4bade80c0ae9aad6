use std::fmt;

use ndarray::Array2;

/// How to treat sample windows that are not fully inside the raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsPolicy {
    /// Fail with an out-of-bounds error. Default: a partial window would
    /// bias the mean toward the pixels that happen to be inside.
    Strict,
    /// Average over the part of the window that intersects the raster.
    Clip,
}

/// A rectangular block of pixels, addressed by its top-left corner.
///
/// Offsets are signed: a window centered near the raster edge may start
/// at negative offsets, which is what the bounds check is for. Column is
/// the x axis, row the y axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWindow {
    pub col_off: i64,
    pub row_off: i64,
    pub width: usize,
    pub height: usize,
}

impl PixelWindow {
    /// Square window of `size` pixels centered on the pixel containing
    /// the fractional coordinate (row, col).
    ///
    /// Half-extent is (size - 1) / 2 in integer arithmetic, so an even
    /// size extends one pixel further right/down than left/up.
    pub fn centered(row: f64, col: f64, size: usize) -> Self {
        debug_assert!(size >= 1);
        let half = ((size - 1) / 2) as i64;
        Self {
            col_off: col.floor() as i64 - half,
            row_off: row.floor() as i64 - half,
            width: size,
            height: size,
        }
    }

    /// Degenerate 1x1 window at the pixel containing (row, col).
    pub fn single(row: f64, col: f64) -> Self {
        Self::centered(row, col, 1)
    }

    /// True if the window lies entirely within a raster of the given size.
    pub fn fits(&self, raster_width: usize, raster_height: usize) -> bool {
        self.col_off >= 0
            && self.row_off >= 0
            && self.col_off as u64 + self.width as u64 <= raster_width as u64
            && self.row_off as u64 + self.height as u64 <= raster_height as u64
    }

    /// Intersection with the raster extent, or None if disjoint.
    pub fn intersect(&self, raster_width: usize, raster_height: usize) -> Option<PixelWindow> {
        let col_min = self.col_off.max(0);
        let row_min = self.row_off.max(0);
        let col_max = (self.col_off + self.width as i64).min(raster_width as i64);
        let row_max = (self.row_off + self.height as i64).min(raster_height as i64);

        if col_min >= col_max || row_min >= row_max {
            return None;
        }

        Some(PixelWindow {
            col_off: col_min,
            row_off: row_min,
            width: (col_max - col_min) as usize,
            height: (row_max - row_min) as usize,
        })
    }
}

impl fmt::Display for PixelWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[col {}, row {}, {}x{}]",
            self.col_off, self.row_off, self.width, self.height
        )
    }
}

/// Arithmetic mean over all window pixels. No-data values are included:
/// a sentinel inside the window pollutes the mean unless masking was
/// requested.
pub fn window_mean(pixels: &Array2<f64>) -> f64 {
    let n = pixels.len();
    if n == 0 {
        return f64::NAN;
    }
    pixels.sum() / n as f64
}

/// Mean excluding pixels equal to the no-data sentinel. A window that is
/// entirely no-data yields NaN.
pub fn masked_mean(pixels: &Array2<f64>, nodata: f64) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for &value in pixels.iter() {
        if value == nodata || (value.is_nan() && nodata.is_nan()) {
            continue;
        }
        sum += value;
        count += 1;
    }
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}
