use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "point-sample")]
#[command(about = "Sample raster band values at point features from a vector dataset")]
#[command(version)]
pub struct Args {
    /// Pairs manifest CSV with image_path and points_path columns
    #[arg(short, long, value_name = "FILE")]
    pub pairs: String,

    /// Band names in raster band order, comma-separated (e.g. HH,HV,VH,VV)
    #[arg(short, long, value_name = "NAMES", value_delimiter = ',', required = true)]
    pub bands: Vec<String>,

    /// 0-based indices of bands to convert from linear to dB
    #[arg(long, value_name = "INDICES", value_delimiter = ',')]
    pub db_bands: Vec<usize>,

    /// Sample window side length in pixels (default: single pixel)
    #[arg(short, long, value_name = "PIXELS")]
    pub window: Option<usize>,

    /// Average over the in-raster part of boundary windows instead of failing
    #[arg(long)]
    pub clip: bool,

    /// Skip features whose window falls outside the raster instead of aborting
    #[arg(long)]
    pub skip_out_of_bounds: bool,

    /// Exclude the raster's nodata value from window means
    #[arg(long)]
    pub mask_nodata: bool,

    /// Directory for result CSV files
    #[arg(short, long, value_name = "DIR", default_value = "results")]
    pub output_dir: String,

    /// Overwrite existing result files
    #[arg(long)]
    pub overwrite: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}
