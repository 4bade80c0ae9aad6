use log::{info, warn};

use crate::convert::to_decibel;
use crate::error::{Result, SampleError};
use crate::points::PointSource;
use crate::raster::{geo_to_pixel, RasterSource};
use crate::table::{assemble, header, SampleTable};
use crate::window::{masked_mean, window_mean, BoundsPolicy, PixelWindow};

/// What to do when a feature's sample window leaves the raster extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutOfBoundsAction {
    /// Fail the whole run.
    Abort,
    /// Drop the offending feature, log it, and continue.
    Skip,
}

#[derive(Debug, Clone)]
pub struct SampleOptions {
    /// Side length of the square sample window in pixels. None or 1 reads
    /// the single pixel under the point.
    pub window_size: Option<usize>,
    /// 0-based positions in the band list to convert from linear to dB.
    pub db_band_indices: Vec<usize>,
    pub bounds: BoundsPolicy,
    pub out_of_bounds: OutOfBoundsAction,
    /// Exclude the raster's declared no-data value from window means.
    /// Off by default, so a sentinel inside the window shows up in the
    /// mean and downstream cleanup can catch it.
    pub mask_nodata: bool,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self {
            window_size: None,
            db_band_indices: Vec::new(),
            bounds: BoundsPolicy::Strict,
            out_of_bounds: OutOfBoundsAction::Abort,
            mask_nodata: false,
        }
    }
}

/// Sample every point against the raster and assemble one row per point.
///
/// The column schema is frozen from the first feature's attribute keys:
/// `["long", "lat", <attribute keys...>, <band names...>]`. Rows keep the
/// point source's iteration order. An empty point source yields an empty
/// table with no schema.
pub fn sample_table(
    raster: &dyn RasterSource,
    points: &mut dyn PointSource,
    band_names: &[String],
    options: &SampleOptions,
) -> Result<SampleTable> {
    let size = options.window_size.unwrap_or(1);
    if size == 0 {
        return Err(SampleError::InvalidWindowSize(size));
    }
    if band_names.len() > raster.band_count() {
        return Err(SampleError::BandCountMismatch {
            requested: band_names.len(),
            available: raster.band_count(),
        });
    }
    for &index in &options.db_band_indices {
        if index >= band_names.len() {
            return Err(SampleError::DbIndexOutOfRange {
                index,
                bands: band_names.len(),
            });
        }
    }

    info!("Point crs: {}", points.crs().unwrap_or_default());
    info!("There are {} data points", points.len());
    if !options.db_band_indices.is_empty() {
        let names: Vec<&str> = options
            .db_band_indices
            .iter()
            .map(|&i| band_names[i].as_str())
            .collect();
        info!("Converting bands {} from linear to dB", names.join(" "));
    }

    let features = points.features()?;
    let Some(first) = features.first() else {
        info!("Point source is empty, returning empty table");
        return Ok(SampleTable::empty());
    };

    let schema = first.attribute_keys();
    let mut table = SampleTable::new(header(&schema, band_names));

    let transform = raster.geo_transform();
    let (raster_width, raster_height) = (raster.width(), raster.height());
    let nodata = raster.no_data_value();

    for (index, feature) in features.iter().enumerate() {
        let keys = feature.attribute_keys();
        if keys != schema {
            return Err(SampleError::SchemaMismatch {
                feature: index,
                expected: schema.clone(),
                found: keys,
            });
        }

        let (x, y) = feature.geometry.xy();
        let (row, col) = geo_to_pixel(&transform, x, y)?;
        let window = PixelWindow::centered(row, col, size);

        let read_window = match effective_window(&window, raster_width, raster_height, options.bounds)
        {
            Some(w) => w,
            None => match options.out_of_bounds {
                OutOfBoundsAction::Abort => {
                    return Err(SampleError::OutOfBounds { feature: index, x, y, window })
                }
                OutOfBoundsAction::Skip => {
                    warn!(
                        "Skipping feature {} at ({}, {}): window {} outside raster",
                        index, x, y, window
                    );
                    continue;
                }
            },
        };

        let mut values = Vec::with_capacity(band_names.len());
        for band in 0..band_names.len() {
            let pixels = raster.read_window(band, &read_window)?;
            let value = match (options.mask_nodata, nodata) {
                (true, Some(nd)) => masked_mean(&pixels, nd),
                _ => window_mean(&pixels),
            };
            values.push(value);
        }

        to_decibel(&mut values, &options.db_band_indices);

        table.push_row(assemble(x, y, feature.attribute_values(), &values));
    }

    Ok(table)
}

/// Resolve a window against the raster extent under the bounds policy.
/// None means the feature is out of bounds (even Clip cannot salvage a
/// window with no intersection).
fn effective_window(
    window: &PixelWindow,
    raster_width: usize,
    raster_height: usize,
    bounds: BoundsPolicy,
) -> Option<PixelWindow> {
    if window.fits(raster_width, raster_height) {
        return Some(*window);
    }
    match bounds {
        BoundsPolicy::Strict => None,
        BoundsPolicy::Clip => window.intersect(raster_width, raster_height),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::points::{AttributeValue, MemoryPointSource, PointFeature, PointGeometry};
    use crate::raster::ArrayRaster;
    use ndarray::Array3;

    fn feature(id: i64, x: f64, y: f64) -> PointFeature {
        PointFeature::new(
            PointGeometry::TwoD { x, y },
            vec![
                ("id".to_string(), AttributeValue::Integer(id)),
                ("ice".to_string(), AttributeValue::Real(0.5)),
            ],
        )
    }

    fn bands(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    /// 1 band, 5x5, identity transform, every pixel = 7.0
    fn uniform_raster() -> ArrayRaster {
        ArrayRaster::new(Array3::from_elem((1, 5, 5), 7.0))
    }

    #[test]
    fn test_header_frozen_from_first_feature() {
        let raster = uniform_raster();
        let mut points = MemoryPointSource::new(vec![feature(1, 2.0, 2.0)]);
        let table =
            sample_table(&raster, &mut points, &bands(&["HH"]), &SampleOptions::default()).unwrap();
        assert_eq!(table.columns(), &["long", "lat", "id", "ice", "HH"]);
    }

    #[test]
    fn test_single_pixel_equals_window_one() {
        let mut data = Array3::zeros((1, 5, 5));
        data[[0, 2, 3]] = 42.0;
        let raster = ArrayRaster::new(data);

        let run = |window_size| {
            let mut points = MemoryPointSource::new(vec![feature(1, 3.0, 2.0)]);
            let options = SampleOptions { window_size, ..Default::default() };
            sample_table(&raster, &mut points, &bands(&["HH"]), &options).unwrap()
        };

        let unset = run(None);
        let one = run(Some(1));
        assert_eq!(unset, one);
        assert_eq!(unset.rows()[0][4], AttributeValue::Real(42.0));
    }

    #[test]
    fn test_window_mean_uniform_is_exact() {
        let raster = uniform_raster();
        let mut points = MemoryPointSource::new(vec![feature(1, 2.0, 2.0)]);
        let options = SampleOptions { window_size: Some(3), ..Default::default() };
        let table = sample_table(&raster, &mut points, &bands(&["HH"]), &options).unwrap();
        assert_eq!(table.rows()[0][4], AttributeValue::Real(7.0));
    }

    #[test]
    fn test_row_order_matches_source_order() {
        let raster = uniform_raster();
        for ids in [[3, 1, 2], [2, 3, 1], [1, 2, 3]] {
            let features = ids.iter().map(|&i| feature(i, 2.0, 2.0)).collect();
            let mut points = MemoryPointSource::new(features);
            let table =
                sample_table(&raster, &mut points, &bands(&["HH"]), &SampleOptions::default())
                    .unwrap();
            let out: Vec<AttributeValue> =
                table.rows().iter().map(|r| r[2].clone()).collect();
            let expected: Vec<AttributeValue> =
                ids.iter().map(|&i| AttributeValue::Integer(i)).collect();
            assert_eq!(out, expected);
        }
    }

    #[test]
    fn test_corner_window_strict_fails() {
        // 2x2 raster of ones, point at pixel (0, 0): a 3x3 window starts
        // at (-1, -1)
        let raster = ArrayRaster::new(Array3::from_elem((1, 2, 2), 1.0));
        let mut points = MemoryPointSource::new(vec![feature(1, 0.0, 0.0)]);
        let options = SampleOptions { window_size: Some(3), ..Default::default() };
        let err = sample_table(&raster, &mut points, &bands(&["HH"]), &options).unwrap_err();
        assert!(matches!(err, SampleError::OutOfBounds { feature: 0, .. }));
    }

    #[test]
    fn test_corner_window_clip_means_valid_region() {
        let raster = ArrayRaster::new(Array3::from_elem((1, 2, 2), 1.0));
        let mut points = MemoryPointSource::new(vec![feature(1, 0.0, 0.0)]);
        let options = SampleOptions {
            window_size: Some(3),
            bounds: BoundsPolicy::Clip,
            ..Default::default()
        };
        let table = sample_table(&raster, &mut points, &bands(&["HH"]), &options).unwrap();
        assert_eq!(table.rows()[0][4], AttributeValue::Real(1.0));
    }

    #[test]
    fn test_skip_drops_only_offending_feature() {
        let raster = uniform_raster();
        // middle point far outside the raster
        let features = vec![feature(1, 2.0, 2.0), feature(2, 50.0, 50.0), feature(3, 2.0, 2.0)];
        let mut points = MemoryPointSource::new(features);
        let options = SampleOptions {
            out_of_bounds: OutOfBoundsAction::Skip,
            ..Default::default()
        };
        let table = sample_table(&raster, &mut points, &bands(&["HH"]), &options).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0][2], AttributeValue::Integer(1));
        assert_eq!(table.rows()[1][2], AttributeValue::Integer(3));
    }

    #[test]
    fn test_db_conversion_applied_to_selected_band() {
        let mut data = Array3::zeros((2, 5, 5));
        data.slice_mut(ndarray::s![0, .., ..]).fill(100.0);
        data.slice_mut(ndarray::s![1, .., ..]).fill(100.0);
        let raster = ArrayRaster::new(data);

        let mut points = MemoryPointSource::new(vec![feature(1, 2.0, 2.0)]);
        let options = SampleOptions { db_band_indices: vec![0], ..Default::default() };
        let table =
            sample_table(&raster, &mut points, &bands(&["HH", "HV"]), &options).unwrap();
        match table.rows()[0][4] {
            AttributeValue::Real(v) => assert!((v - 20.0).abs() < 1e-9),
            ref other => panic!("expected a Real cell, got {:?}", other),
        }
        assert_eq!(table.rows()[0][5], AttributeValue::Real(100.0));
    }

    #[test]
    fn test_schema_mismatch_is_fatal() {
        let raster = uniform_raster();
        let odd_one = PointFeature::new(
            PointGeometry::TwoD { x: 2.0, y: 2.0 },
            vec![("station".to_string(), AttributeValue::Integer(9))],
        );
        let mut points = MemoryPointSource::new(vec![feature(1, 2.0, 2.0), odd_one]);
        let err = sample_table(&raster, &mut points, &bands(&["HH"]), &SampleOptions::default())
            .unwrap_err();
        assert!(matches!(err, SampleError::SchemaMismatch { feature: 1, .. }));
    }

    #[test]
    fn test_empty_source_gives_empty_table() {
        let raster = uniform_raster();
        let mut points = MemoryPointSource::new(Vec::new());
        let table =
            sample_table(&raster, &mut points, &bands(&["HH"]), &SampleOptions::default()).unwrap();
        assert!(table.is_empty());
        assert!(table.columns().is_empty());
    }

    #[test]
    fn test_too_many_band_names() {
        let raster = uniform_raster();
        let mut points = MemoryPointSource::new(vec![feature(1, 2.0, 2.0)]);
        let err = sample_table(
            &raster,
            &mut points,
            &bands(&["HH", "HV"]),
            &SampleOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SampleError::BandCountMismatch { requested: 2, available: 1 }
        ));
    }

    #[test]
    fn test_db_index_out_of_range() {
        let raster = uniform_raster();
        let mut points = MemoryPointSource::new(vec![feature(1, 2.0, 2.0)]);
        let options = SampleOptions { db_band_indices: vec![4], ..Default::default() };
        let err = sample_table(&raster, &mut points, &bands(&["HH"]), &options).unwrap_err();
        assert!(matches!(err, SampleError::DbIndexOutOfRange { index: 4, bands: 1 }));
    }

    #[test]
    fn test_window_size_zero_rejected() {
        let raster = uniform_raster();
        let mut points = MemoryPointSource::new(vec![feature(1, 2.0, 2.0)]);
        let options = SampleOptions { window_size: Some(0), ..Default::default() };
        let err = sample_table(&raster, &mut points, &bands(&["HH"]), &options).unwrap_err();
        assert!(matches!(err, SampleError::InvalidWindowSize(0)));
    }

    #[test]
    fn test_three_d_point_collapses() {
        let raster = uniform_raster();
        let f = PointFeature::new(
            PointGeometry::ThreeD { x: 2.0, y: 2.0, z: 130.0 },
            vec![("id".to_string(), AttributeValue::Integer(1))],
        );
        let mut points = MemoryPointSource::new(vec![f]);
        let table =
            sample_table(&raster, &mut points, &bands(&["HH"]), &SampleOptions::default()).unwrap();
        assert_eq!(table.rows()[0][0], AttributeValue::Real(2.0));
        assert_eq!(table.rows()[0][1], AttributeValue::Real(2.0));
        assert_eq!(table.rows()[0][3], AttributeValue::Real(7.0));
    }

    #[test]
    fn test_mask_nodata_excludes_sentinel_from_mean() {
        let mut data = Array3::from_elem((1, 3, 3), 2.0);
        data[[0, 0, 0]] = -9999.0;
        let raster = ArrayRaster::new(data).with_nodata(-9999.0);
        let mut points = MemoryPointSource::new(vec![feature(1, 1.0, 1.0)]);

        let unmasked = SampleOptions { window_size: Some(3), ..Default::default() };
        let masked = SampleOptions {
            window_size: Some(3),
            mask_nodata: true,
            ..Default::default()
        };

        let mut points2 = MemoryPointSource::new(vec![feature(1, 1.0, 1.0)]);
        let polluted =
            sample_table(&raster, &mut points, &bands(&["HH"]), &unmasked).unwrap();
        let clean = sample_table(&raster, &mut points2, &bands(&["HH"]), &masked).unwrap();

        assert_eq!(clean.rows()[0][4], AttributeValue::Real(2.0));
        match polluted.rows()[0][4] {
            AttributeValue::Real(v) => assert!(v < 0.0), // sentinel dragged the mean down
            ref other => panic!("expected a Real cell, got {:?}", other),
        }
    }
}
