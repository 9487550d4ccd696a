//! Command-line interface for planning charging-site rollouts.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};

mod error;
mod fs;
mod plan;

pub use error::CliError;

const ARG_PLAN_INVENTORY: &str = "inventory";
const ENV_PLAN_INVENTORY: &str = "SITEPLAN_CMDS_PLAN_INVENTORY";
const ARG_PLAN_VARIANT: &str = "variant";
const ARG_PLAN_EDGE_RADIUS: &str = "edge-radius-km";
const ARG_PLAN_SERVICE_RADIUS: &str = "service-radius-km";
const ARG_PLAN_DENSITY_RADIUS: &str = "density-radius-km";
const ARG_PLAN_UNDERSERVED_DISTANCE: &str = "underserved-distance-km";
const ARG_PLAN_MIN_UNCOVERED: &str = "min-uncovered-ratio";
const ARG_PLAN_BUDGET: &str = "budget";
const ARG_PLAN_SCENARIOS: &str = "scenario-budgets";
const ARG_PLAN_RIDGE_LAMBDA: &str = "ridge-lambda";
const ARG_PLAN_SMOOTHING_ALPHA: &str = "smoothing-alpha";
const ARG_PLAN_SMOOTHING_ITERATIONS: &str = "smoothing-iterations";
const ARG_PLAN_HIDDEN_DIM: &str = "hidden-dim";
const ARG_PLAN_EPOCHS: &str = "epochs";
const ARG_PLAN_LEARNING_RATE: &str = "learning-rate";
const ARG_PLAN_WEIGHT_DECAY: &str = "weight-decay";
const ARG_PLAN_DROPOUT: &str = "dropout";
const ARG_PLAN_SEED: &str = "seed";

/// Run the siteplan CLI with the current process arguments and environment.
///
/// # Errors
/// Returns [`CliError`] when arguments, configuration, the inventory or the
/// planning run are rejected, or when the report cannot be written.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Plan(args) => plan::run_plan(args),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "siteplan",
    about = "Score candidate charging sites and plan coverage-driven rollouts",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Score a site inventory and print the ranked plan as JSON.
    Plan(plan::PlanArgs),
}

#[cfg(test)]
mod tests;
