//! Open a window showing a chart of a JSON dataset.
//!
//! ```text
//! cargo run --example viewer -- data.json --x cat --y val --kind pie
//! ```

use std::path::PathBuf;

use chartscape::prelude::*;
use clap::Parser;
use error_stack::Report;

#[derive(Parser, Clone, Debug)]
#[command(name = "chartscape-viewer")]
#[command(about = "Render a JSON array of records as an interactive 3D chart")]
struct Args {
    /// JSON file holding an array of flat records
    dataset: PathBuf,

    /// Field for the x axis (categories for bar, pie and radar)
    #[arg(long)]
    x: String,

    /// Field for the y axis (values)
    #[arg(long)]
    y: String,

    /// Optional depth field, used by scatter charts
    #[arg(long)]
    z: Option<String>,

    /// bar, line, scatter, pie, radar or area
    #[arg(long, default_value = "bar")]
    kind: String,

    /// Scene config overrides (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Hide value labels
    #[arg(long)]
    no_labels: bool,
}

fn main() -> Result<(), Report<ChartError>> {
    let args = Args::parse();

    let json = std::fs::read_to_string(&args.dataset).map_err(|e| {
        Report::new(ChartError::InvalidDataset(e.to_string()))
            .attach(format!("reading {}", args.dataset.display()))
    })?;
    let dataset = TabularDataset::from_json_str(&json)?;
    let config = match &args.config {
        Some(path) => SceneConfig::from_json_file(path)?,
        None => SceneConfig::default(),
    };

    let mut builder = chart(dataset)
        .x(args.x)
        .y(args.y)
        .tag(args.kind)
        .config(config);
    if let Some(z) = args.z {
        builder = builder.z(z);
    }
    if args.no_labels {
        builder = builder.labels(false);
    }

    // Surface request errors before opening a window.
    let view = builder.build();
    view.request()?;
    run_chart(view);
    Ok(())
}
