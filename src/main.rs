use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::io::{self, Write};

mod config;
mod error;
mod hub;
mod model;
mod report;
mod summarize;

use model::{SummarizationModel, T5Summarizer};
use summarize::summarize;

/// Generates a title and a short summary for a built-in passage using a
/// local T5 model. The first run downloads the weights.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {}

/// Title pass, summary pass, then the report. Nothing is written unless both
/// passes succeed.
fn run<W: Write>(model: &dyn SummarizationModel, text: &str, out: &mut W) -> Result<()> {
    let title = summarize(model, text, config::TITLE.max_len, config::TITLE.min_len)
        .context("Failed to generate title")?;
    let short = summarize(model, text, config::SUMMARY.max_len, config::SUMMARY.min_len)
        .context("Failed to generate summary")?;

    report::write_report(out, &title, &short).context("Failed to write report")?;
    out.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let _args = Args::parse();

    info!("Loading model {}", config::MODEL_ID);
    let summarizer = T5Summarizer::load(config::MODEL_ID)
        .with_context(|| format!("Failed to load model {}", config::MODEL_ID))?;

    let stdout = io::stdout();
    run(&summarizer, config::SAMPLE_TEXT, &mut stdout.lock())
}
