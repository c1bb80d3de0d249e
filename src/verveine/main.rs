// One-shot CLI: load the precomputed artifacts, answer a single
// (date, origin, destination) query, print the result.

use anyhow::Context;
use clap::Parser;
use maxplace::fetch::{self, ArtifactSource};
use maxplace::models::SnapshotStatus;
use maxplace::resolve::{PolicyConfig, Query, StatusBand, resolve};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "verveine", about = "TGVmax open-seat probability lookup")]
struct Args {
    /// Travel date, YYYY-MM-DD
    #[arg(long)]
    date: String,

    /// Origin station name
    #[arg(long)]
    origin: String,

    /// Destination station name
    #[arg(long)]
    destination: String,

    /// URL prefix of the precomputed artifacts
    #[arg(long, conflicts_with = "data_dir")]
    data_url: Option<String>,

    /// Local directory holding the precomputed artifacts
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Positive-band cutoff (the OD-only deployment used 0.5)
    #[arg(long, default_value_t = 0.7)]
    positive_threshold: f64,

    /// Print the full resolution as JSON instead of the summary
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    env_logger::init();

    let args = Args::parse();

    let source = match (&args.data_dir, &args.data_url) {
        (Some(path), _) => ArtifactSource::Dir { path: path.clone() },
        (None, Some(base_url)) => ArtifactSource::Http {
            base_url: base_url.clone(),
        },
        (None, None) => ArtifactSource::from_env()
            .context("set --data-url, --data-dir, MAXPLACE_DATA_URL or MAXPLACE_DATA_DIR")?,
    };

    let dataset = fetch::load_all(&source).await?;

    if let Some(meta) = &dataset.metadata {
        println!("{}", meta.summary_line());
    }

    let policy = PolicyConfig {
        positive_threshold: args.positive_threshold,
    };
    let query = Query {
        date: args.date,
        origin: args.origin,
        destination: args.destination,
    };

    let resolution = resolve(&query, &dataset, &policy)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&resolution)?);
        return Ok(());
    }

    println!(
        "{} -> {} on {} (delta {} days)",
        resolution.trace.origin,
        resolution.trace.destination,
        resolution.trace.departure_date,
        resolution.delta_days
    );

    match resolution.proba {
        Some(p) => println!("Probability: {:.0} %", p * 100.0),
        None => println!("Probability: -"),
    }
    if let Some(p) = resolution.global_proba {
        println!("Global probability: {:.0} %", p * 100.0);
    }

    let band = match resolution.band {
        StatusBand::Positive => "positive",
        StatusBand::Negative => "negative",
        StatusBand::Neutral => "neutral",
        StatusBand::Warning => "warning",
    };
    println!("[{}] {}", band, resolution.message);

    let snapshot_line = match resolution.snapshot {
        SnapshotStatus::Open => "TGVmax AVAILABLE on this route today",
        SnapshotStatus::Closed => "TGVmax NOT available on this route today",
        SnapshotStatus::RouteNotCovered => "unknown — route not covered by the snapshot",
        SnapshotStatus::NoSnapshotForDate => "unknown — no snapshot for this date",
    };
    println!("Today's snapshot: {}", snapshot_line);

    if let Some(advisory) = &resolution.advisory {
        println!("Note: {}", advisory);
    }

    if resolution.chart_series.is_empty() {
        println!("No route series to plot.");
    } else {
        println!("Route series (delta_days: proba_open):");
        for point in &resolution.chart_series {
            println!("  {:>5}: {:.2}", point.delta_days, point.proba_open);
        }
    }

    Ok(())
}
