mod error;
mod merge;
mod nest;
mod pipeline;
mod table;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::pipeline::{build, SourceTables};

#[derive(Parser)]
#[command(about = "Joins the job-market CSV tables into nested JSON documents")]
struct Args {
    /// Directory holding companies.csv, education_and_skills.csv,
    /// employment_details.csv, industry_info.csv and jobs.csv
    #[arg(long, env = "CAREERHUB_INPUT_DIR", default_value = "./mp2-data")]
    input_dir: PathBuf,

    /// Directory receiving companies.json, industry_info.json and jobs_nested.json
    #[arg(long, env = "CAREERHUB_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let tables = SourceTables::load(&args.input_dir)
        .with_context(|| format!("Failed to load tables from {}", args.input_dir.display()))?;
    let artifacts = build(&tables).context("Failed to join tables")?;
    info!(
        "Built {} companies, {} industries, {} nested jobs",
        artifacts.companies.len(),
        artifacts.industry_info.len(),
        artifacts.jobs_nested.len()
    );

    artifacts
        .write_to(&args.output_dir)
        .with_context(|| format!("Failed to write artifacts to {}", args.output_dir.display()))?;

    info!("Conversion completed successfully");
    Ok(())
}
