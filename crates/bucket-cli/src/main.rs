use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use bucket_core::{build_plan, LayerPlanConfig, Runner};
use bucket_runtime::TracingEventEmitter;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "bucket", version, about = "Bucket executor CLI")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Execute a layer-plan YAML against a bucket of the given size.
    Run {
        /// Path to layer-plan YAML.
        plan: PathBuf,
        /// Number of rows in the bucket.
        #[arg(long, default_value_t = 1)]
        size: usize,
    },
    /// Print a layer-plan after parsing (debug).
    Show { plan: PathBuf },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Show { plan } => {
            let text = std::fs::read_to_string(&plan).with_context(|| format!("read {}", plan.display()))?;
            let cfg: LayerPlanConfig = serde_yaml::from_str(&text).context("parse layer plan yaml")?;
            println!("{}", serde_json::to_string_pretty(&cfg)?);
            Ok(())
        }
        Cmd::Run { plan, size } => {
            let text = std::fs::read_to_string(&plan).with_context(|| format!("read {}", plan.display()))?;
            let cfg: LayerPlanConfig = serde_yaml::from_str(&text).context("parse layer plan yaml")?;
            let built = build_plan(&cfg)?;

            let report = Runner::run(&built, size, Arc::new(TracingEventEmitter))?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}
