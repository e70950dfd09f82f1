//! CLI argument parsing and command routing.
//!
//! The CLI is intentionally thin: it loads the records, runs the engine, and
//! writes the report, so the same core logic can be embedded elsewhere.

use crate::annotate::PrecomputedAnnotator;
use crate::engine::{Engine, EngineConfig};
use crate::input::load_program_records;
use crate::output::write_report;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

/// Root CLI entrypoint for the relationship-inference workflow.
#[derive(Parser, Debug)]
#[command(
    name = "optrel",
    version,
    about = "Infer conflict and dependency relationships between CLI options from manual text",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run inference over one program's annotated records
    Infer(InferArgs),
}

#[derive(Parser, Debug)]
#[command(about = "Infer option relationships from an annotated records file")]
pub struct InferArgs {
    /// Program records JSON (sentences, options, annotations)
    #[arg(long, value_name = "FILE")]
    pub input: PathBuf,

    /// Directory the relation report is written to
    #[arg(long, value_name = "DIR", default_value = "output")]
    pub output: PathBuf,

    /// Minimum classifier score for unflagged sentences
    #[arg(long, default_value_t = 0.5)]
    pub threshold: f64,
}

pub fn cmd_infer(args: &InferArgs) -> Result<()> {
    let records = load_program_records(&args.input)?;
    let annotator = PrecomputedAnnotator::from_records(&records.annotations)?;
    let config = EngineConfig {
        threshold: args.threshold,
        ..EngineConfig::default()
    };
    let engine = Engine::new(&annotator, &records.lexicon, config);
    let report = engine.infer(&records);
    let path = write_report(&args.output, &records.program, &report)?;
    info!(report = %path.display(), "relation report written");
    Ok(())
}
