use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::*;
use std::fs;
use std::path::PathBuf;
use tabled::{settings::Style, Table, Tabled};
use tracing::warn;

use watchmap::logging::init_logging;
use watchmap::{ActivityBundle, ActivityPipeline, AppConfig, BundleWriter, ExportOutcome};

/// watchmap - activity map and heart-rate zone builder
///
/// Reads a FIT activity file and writes a rendering-ready JSON bundle with
/// colored map layers, start/end markers, a time-series chart and heart-rate
/// zone occupancy.
#[derive(Parser)]
#[command(name = "watchmap")]
#[command(author = "watchmap contributors")]
#[command(version)]
#[command(about = "Map and heart-rate zone builder for FIT activities", long_about = None)]
struct Cli {
    /// FIT activity file
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    /// Directory for the output bundle (created if missing)
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Overwrite an existing output
    #[arg(short, long)]
    force: bool,

    /// Embed the source FIT file in the bundle
    #[arg(long)]
    embed_fit: bool,

    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Athlete age in years
    #[arg(long)]
    age: Option<u8>,

    /// Resting heart rate in bpm
    #[arg(long = "resting-hr")]
    resting_hr: Option<u16>,

    /// Seconds between mean heart-rate labels
    #[arg(long)]
    interval: Option<f64>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Tabled)]
struct ZoneRow {
    #[tabled(rename = "Zone")]
    zone: String,
    #[tabled(rename = "Heart rate")]
    bounds: String,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "%")]
    percent: String,
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path)?,
        None => AppConfig::load_or_default()?,
    };

    if let Some(age) = cli.age {
        config.analysis.age = age;
    }
    if let Some(resting) = cli.resting_hr {
        config.analysis.resting_heart_rate = resting;
    }
    if let Some(interval) = cli.interval {
        config.analysis.zone_aggregation_interval = interval;
    }
    config.validate()?;

    config.logging = config.logging.with_verbosity(cli.verbose);
    Ok(config)
}

fn print_report(bundle: &ActivityBundle) {
    if let Some(session) = &bundle.session {
        let sport = session.sport.as_deref().unwrap_or("activity");
        println!("{} {}", "Session:".bold(), sport);
        if let Some(distance) = session.total_distance {
            println!("  Distance: {:.2} km", distance / 1000.0);
        }
    }
    println!("  Duration: {}", bundle.duration);

    let rows: Vec<ZoneRow> = bundle
        .occupancy
        .zones
        .iter()
        .map(|z| ZoneRow {
            zone: z.name.clone(),
            bounds: format!("{:.0}-{:.0}", z.low, z.high),
            time: z.duration_hms(),
            percent: format!("{:.1}", z.percentage),
        })
        .collect();

    println!("{}", "Heart-rate zones".cyan().bold());
    println!("{}", Table::new(rows).with(Style::rounded()));
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(&config.logging)?;

    if !cli.input.exists() {
        bail!("Input file not found: {}", cli.input.display());
    }

    let writer = BundleWriter::new(&cli.output_dir).force(cli.force);
    if writer.would_skip(&cli.input)? {
        let path = writer.output_path(&cli.input)?;
        warn!(path = %path.display(), "Output exists, skipping (use --force to overwrite)");
        println!("{} {}", "Skipped".yellow(), path.display());
        return Ok(());
    }

    println!("{} {}", "Processing".green().bold(), cli.input.display());
    let pipeline = ActivityPipeline::new(config)?;
    let mut bundle = pipeline
        .run_file(&cli.input)
        .with_context(|| format!("Failed to process {}", cli.input.display()))?;

    // The output bundle requires exactly one session summary
    bundle
        .require_session()
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    if cli.embed_fit {
        let bytes = fs::read(&cli.input)
            .with_context(|| format!("Failed to read {}", cli.input.display()))?;
        bundle.embed_source(&bytes);
    }

    match writer.write(&cli.input, &bundle)? {
        ExportOutcome::Written(path) => {
            println!("{} {}", "✓ Wrote".green(), path.display());
        }
        ExportOutcome::Skipped(path) => {
            println!("{} {}", "Skipped".yellow(), path.display());
        }
    }

    print_report(&bundle);
    Ok(())
}
