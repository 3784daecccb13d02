//! Table Extract CLI - crop every table out of a document image
//!
//! Runs the two-pass layout detection, merges overlapping detections and
//! writes one image per table.

use anyhow::{Context as _, Result};
use clap::{Parser, ValueEnum};
use rayon::ThreadPoolBuilder;
use std::path::PathBuf;
use table_extract_common::{ensure_dir, load_image};
use table_extract_detection::{OnnxLayoutDetector, TableDetectionConfig, TablePipeline};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

mod export;

#[derive(Parser)]
#[command(
    name = "table-extract",
    version,
    about = "Extract table regions from document images",
    long_about = "Detects tables with a layout model, re-runs the model on every candidate\n\
                  table block, merges overlapping results and saves one crop per table.",
    after_help = "EXAMPLES:\n  \
                  table-extract page.png --output-dir tables --model models/tablebank.onnx\n  \
                  table-extract page.png --output-dir tables --config tables.yaml --margin 10\n  \
                  table-extract page.png --output-dir tables --config tables.yaml --json\n  \
                  table-extract page.png --output-dir tables --model models/tablebank.onnx --preset recall"
)]
struct Cli {
    /// Document image to process
    image: PathBuf,

    /// Directory for the cropped tables (created if missing)
    #[arg(short, long)]
    output_dir: PathBuf,

    /// YAML detection config
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Built-in settings to start from when no config file is given
    #[arg(long, value_enum, default_value_t = Preset::Default, conflicts_with = "config")]
    preset: Preset,

    /// ONNX layout model (overrides the config file)
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Second-pass detections must score above this [default: 0.5]
    #[arg(long)]
    score_threshold: Option<f32>,

    /// Pixels added around each candidate block [default: 0]
    #[arg(long)]
    margin: Option<u32>,

    /// Layout label treated as a table [default: Table]
    #[arg(long)]
    block_type: Option<String>,

    /// Run the second pass on all cores (one model instance per worker)
    #[arg(long)]
    parallel: bool,

    /// Print the final boxes as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Preset {
    /// Second-pass threshold 0.5, no margin
    Default,
    /// Keep only second-pass detections above 0.8
    Strict,
    /// Threshold 0.3 with a 16px margin around candidate blocks
    Recall,
}

impl Preset {
    fn config(self) -> TableDetectionConfig {
        match self {
            Preset::Default => TableDetectionConfig::default(),
            Preset::Strict => TableDetectionConfig::strict(),
            Preset::Recall => TableDetectionConfig::recall(),
        }
    }
}

impl Cli {
    /// File config (or preset) first, then command-line overrides
    fn detection_config(&self) -> Result<TableDetectionConfig> {
        let mut config = match &self.config {
            Some(path) => TableDetectionConfig::from_yaml(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => self.preset.config(),
        };

        if let Some(model) = &self.model {
            config.model_path = Some(model.clone());
        }
        if let Some(score_threshold) = self.score_threshold {
            config.score_threshold = score_threshold;
        }
        if let Some(margin) = self.margin {
            config.margin_px = margin;
        }
        if let Some(block_type) = &self.block_type {
            config.block_type = block_type.clone();
        }

        config.validate().context("Invalid detection config")?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    // Limit the rayon pool, mainly for constrained CI machines
    if let Ok(threads_str) = std::env::var("TABLE_EXTRACT_THREADS") {
        if let Ok(num_threads) = threads_str.parse::<usize>() {
            ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .build_global()
                .ok();
        }
    }

    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    run(&cli)
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.detection_config()?;

    // Nothing is written unless the input decodes
    let image = load_image(&cli.image)
        .with_context(|| format!("Unable to load image from {}", cli.image.display()))?;

    let model_path = config
        .model_path
        .clone()
        .context("No layout model configured: pass --model or set model_path in --config")?;

    let pipeline = TablePipeline::new(config.clone());
    let tables = if cli.parallel {
        pipeline.extract_parallel(|| OnnxLayoutDetector::new(&model_path, config.clone()), &image)?
    } else {
        let mut detector = OnnxLayoutDetector::new(&model_path, config.clone())?;
        pipeline.extract(&mut detector, &image)?
    };

    ensure_dir(&cli.output_dir).with_context(|| {
        format!("Failed to create output directory {}", cli.output_dir.display())
    })?;
    let saved = export::save_tables(&tables, &image, &cli.output_dir)?;
    info!(
        "Saved {} of {} tables to {}",
        saved.len(),
        tables.len(),
        cli.output_dir.display()
    );

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&tables)?);
    }

    Ok(())
}
