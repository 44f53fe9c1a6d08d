//! CLI module for Flow Eval
//!
//! Subcommands:
//! - `evaluate`: score one prompt/response pair
//! - `compare`: compare two score sequences from a JSON file
//! - `simulate`: run an in-memory experiment over synthetic traffic

pub mod compare;
pub mod evaluate;
pub mod simulate;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// Flow Eval - A/B evaluation of LLM pipeline configurations
#[derive(Parser)]
#[command(name = "flow-eval")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Score a single prompt/response pair and print its metrics
    Evaluate(evaluate::EvaluateArgs),

    /// Compare two score sequences read from a JSON file
    Compare(compare::CompareArgs),

    /// Run an end-to-end experiment over synthetic traffic
    Simulate(simulate::SimulateArgs),
}

/// Load `.env`, read and validate configuration, and install logging
pub(crate) fn prepare() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    config.validate()?;
    logging::init_logging(&config.logging);

    Ok(config)
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
