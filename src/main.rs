use clap::Parser;
use env_logger::Env;
use log::{info, warn};

use geotiff_point_sample::batch;
use geotiff_point_sample::cli::Args;
use geotiff_point_sample::error::{Result, SampleError};

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logger
    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    info!("=== GeoTIFF Point Sampler ===");

    match args.window {
        Some(0) => return Err(SampleError::InvalidWindowSize(0)),
        Some(size) => {
            if size % 2 == 0 {
                warn!(
                    "Window size {} is even; the window extends one extra pixel right and down",
                    size
                );
            }
            info!("Sampling {}x{} window means", size, size);
        }
        None => info!("Sampling single pixel values"),
    }

    batch::run_pairs(&args)?;

    info!("=== Done! ===");
    Ok(())
}
