use std::io;
use std::path::PathBuf;

use clap::Parser;
use log::info;
use structured_logger::json::new_writer;
use structured_logger::Builder;

use osm_waterbodies::config::{ConfigOverrides, UserConfig};
use osm_waterbodies::errors::Result;
use osm_waterbodies::etl::{create_output_dir, run_pipeline};

#[derive(Parser, Debug)]
#[command(name = "osm-waterbodies")]
#[command(about = "Extract streams, rivers, canals, lakes, ponds and reservoirs from OSM data")]
#[command(version)]
struct Cli {
    /// JSON config file; command-line values take precedence
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Input document (.json or .osm, optionally .xz compressed)
    #[arg(short, long)]
    input: Option<String>,

    /// Directory that receives one sub-directory per input document
    #[arg(short, long)]
    output_dir: Option<String>,

    /// File name of the linear features output
    #[arg(long)]
    lines: Option<String>,

    /// File name of the areal features output
    #[arg(long)]
    areas: Option<String>,

    #[arg(long)]
    log_level: Option<String>,

    /// Re-run every stage even if cached outputs exist
    #[arg(long)]
    force: bool,

    #[arg(long)]
    no_progress: bool,
}

fn setup_logging(level: &str) {
    Builder::with_level(level)
        .with_target_writer("*", new_writer(io::stdout()))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let user_config = match &cli.config {
        Some(path) => UserConfig::load(path)?,
        None => UserConfig::default(),
    }
    .with_overrides(ConfigOverrides {
        data_path: cli.input,
        dest_path: cli.output_dir,
        lines_output: cli.lines,
        areas_output: cli.areas,
        log_level: cli.log_level,
        no_progress: cli.no_progress,
    });
    user_config.validate()?;

    setup_logging(&user_config.log_level);

    let output_dir = create_output_dir(&user_config)?;
    run_pipeline(&user_config, &output_dir, cli.force)?;
    let output_dir_name = output_dir.display().to_string();
    info!(output_dir = output_dir_name.as_str(); "Waterbody outputs written");

    Ok(())
}
