use std::fs;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::info;
use serde::Deserialize;

use crate::cli::Args;
use crate::error::{Result, SampleError};
use crate::points::GdalPointSource;
use crate::raster::GdalRaster;
use crate::sample::{sample_table, OutOfBoundsAction, SampleOptions};
use crate::window::BoundsPolicy;

/// One row of the pairs manifest: an image and the point dataset to
/// sample it with.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PairEntry {
    pub image_path: String,
    pub points_path: String,
}

/// Parse the pairs manifest: a CSV with image_path and points_path
/// columns, one pair per row, in processing order.
pub fn parse_pairs<R: Read>(reader: R) -> Result<Vec<PairEntry>> {
    let mut rdr = csv::Reader::from_reader(reader);

    let headers = rdr.headers()?.clone();
    for column in ["image_path", "points_path"] {
        if !headers.iter().any(|h| h == column) {
            return Err(SampleError::ManifestColumn(column));
        }
    }

    let mut pairs = Vec::new();
    for record in rdr.deserialize() {
        pairs.push(record?);
    }
    Ok(pairs)
}

pub fn read_pairs(path: &str) -> Result<Vec<PairEntry>> {
    parse_pairs(File::open(path)?)
}

/// Result file name for one pair: `<points_stem>_<image_stem>.csv`.
pub fn output_name(image_path: &str, points_path: &str) -> String {
    let stem = |p: &str| {
        Path::new(p)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unnamed")
            .to_string()
    };
    format!("{}_{}.csv", stem(points_path), stem(image_path))
}

fn options_from_args(args: &Args) -> SampleOptions {
    SampleOptions {
        window_size: args.window,
        db_band_indices: args.db_bands.clone(),
        bounds: if args.clip {
            BoundsPolicy::Clip
        } else {
            BoundsPolicy::Strict
        },
        out_of_bounds: if args.skip_out_of_bounds {
            OutOfBoundsAction::Skip
        } else {
            OutOfBoundsAction::Abort
        },
        mask_nodata: args.mask_nodata,
    }
}

/// Process every pair in the manifest. Existing result files are kept
/// unless --overwrite is set.
pub fn run_pairs(args: &Args) -> Result<()> {
    let pairs = read_pairs(&args.pairs)?;
    info!("{} image/point pairs to process", pairs.len());

    fs::create_dir_all(&args.output_dir)?;
    let options = options_from_args(args);

    for pair in &pairs {
        let out_path =
            Path::new(&args.output_dir).join(output_name(&pair.image_path, &pair.points_path));
        if !args.overwrite && out_path.exists() {
            info!("Pixel values already written to {}", out_path.display());
            continue;
        }

        let raster = GdalRaster::open(&pair.image_path)?;
        let mut points = GdalPointSource::open(&pair.points_path)?;
        let table = sample_table(&raster, &mut points, &args.bands, &options)?;

        let file = File::create(&out_path)?;
        table.write_csv(file)?;
        info!("Wrote {} rows to {}", table.len(), out_path.display());
    }

    Ok(())
}
