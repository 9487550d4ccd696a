//! Plan command implementation for the siteplan CLI.

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use siteplan_engine::{Pipeline, PipelineConfig, PlanReport, ScoringVariant, SiteInventory};
use std::io::{BufReader, Write};

use crate::fs::{file_is_file, open_utf8_file};
use crate::{
    ARG_PLAN_BUDGET, ARG_PLAN_DENSITY_RADIUS, ARG_PLAN_DROPOUT, ARG_PLAN_EDGE_RADIUS,
    ARG_PLAN_EPOCHS, ARG_PLAN_HIDDEN_DIM, ARG_PLAN_INVENTORY, ARG_PLAN_LEARNING_RATE,
    ARG_PLAN_MIN_UNCOVERED, ARG_PLAN_RIDGE_LAMBDA, ARG_PLAN_SCENARIOS, ARG_PLAN_SEED,
    ARG_PLAN_SERVICE_RADIUS, ARG_PLAN_SMOOTHING_ALPHA, ARG_PLAN_SMOOTHING_ITERATIONS,
    ARG_PLAN_UNDERSERVED_DISTANCE, ARG_PLAN_VARIANT, ARG_PLAN_WEIGHT_DECAY, CliError,
    ENV_PLAN_INVENTORY,
};

/// CLI arguments for the `plan` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Score every candidate in a JSON site inventory, choose a \
                 coverage-maximising rollout and report communities. \
                 Tuning values can come from CLI flags, configuration files, \
                 or SITEPLAN_* environment variables; anything unset keeps \
                 its built-in default.",
    about = "Plan charging-site recommendations"
)]
#[ortho_config(prefix = "SITEPLAN")]
pub(crate) struct PlanArgs {
    /// Path to a JSON file holding `existing` and `candidates` arrays.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) inventory: Option<Utf8PathBuf>,
    /// Scoring strategy: `weighted_sum`, `ridge_diffusion`, `gcn`, `graphsage` or `gat`.
    #[arg(long = ARG_PLAN_VARIANT, value_name = "name")]
    #[serde(default)]
    pub(crate) variant: Option<String>,
    /// Distance in kilometres under which two sites share a graph edge.
    #[arg(long = ARG_PLAN_EDGE_RADIUS, value_name = "km")]
    #[serde(default)]
    pub(crate) edge_radius_km: Option<f64>,
    /// Coverage radius in kilometres before tuning.
    #[arg(long = ARG_PLAN_SERVICE_RADIUS, value_name = "km")]
    #[serde(default)]
    pub(crate) service_radius_km: Option<f64>,
    /// Radius in kilometres for counting nearby existing sites.
    #[arg(long = ARG_PLAN_DENSITY_RADIUS, value_name = "km")]
    #[serde(default)]
    pub(crate) density_radius_km: Option<f64>,
    /// Mean nearest-existing distance at which a community looks remote.
    #[arg(long = ARG_PLAN_UNDERSERVED_DISTANCE, value_name = "km")]
    #[serde(default)]
    pub(crate) underserved_distance_km: Option<f64>,
    /// Share of candidates that must stay uncovered at baseline.
    #[arg(long = ARG_PLAN_MIN_UNCOVERED, value_name = "ratio")]
    #[serde(default)]
    pub(crate) min_uncovered_ratio: Option<f64>,
    /// Number of ranked recommendations to report.
    #[arg(long = ARG_PLAN_BUDGET, value_name = "count")]
    #[serde(default)]
    pub(crate) recommendation_budget: Option<usize>,
    /// Comma-separated scenario budgets.
    #[arg(long = ARG_PLAN_SCENARIOS, value_name = "count,...", value_delimiter = ',')]
    #[serde(default)]
    pub(crate) scenario_budgets: Option<Vec<usize>>,
    /// Ridge penalty.
    #[arg(long = ARG_PLAN_RIDGE_LAMBDA, value_name = "lambda")]
    #[serde(default)]
    pub(crate) ridge_lambda: Option<f64>,
    /// Diffusion mixing factor in `[0, 1]`.
    #[arg(long = ARG_PLAN_SMOOTHING_ALPHA, value_name = "alpha")]
    #[serde(default)]
    pub(crate) smoothing_alpha: Option<f64>,
    /// Diffusion rounds.
    #[arg(long = ARG_PLAN_SMOOTHING_ITERATIONS, value_name = "count")]
    #[serde(default)]
    pub(crate) smoothing_iterations: Option<usize>,
    /// Hidden width of the message-passing networks.
    #[arg(long = ARG_PLAN_HIDDEN_DIM, value_name = "width")]
    #[serde(default)]
    pub(crate) hidden_dim: Option<usize>,
    /// Training epochs for the message-passing networks.
    #[arg(long = ARG_PLAN_EPOCHS, value_name = "count")]
    #[serde(default)]
    pub(crate) epochs: Option<usize>,
    /// Adam learning rate.
    #[arg(long = ARG_PLAN_LEARNING_RATE, value_name = "rate")]
    #[serde(default)]
    pub(crate) learning_rate: Option<f64>,
    /// L2 weight decay.
    #[arg(long = ARG_PLAN_WEIGHT_DECAY, value_name = "decay")]
    #[serde(default)]
    pub(crate) weight_decay: Option<f64>,
    /// Dropout probability in `[0, 1)`.
    #[arg(long = ARG_PLAN_DROPOUT, value_name = "probability")]
    #[serde(default)]
    pub(crate) dropout: Option<f64>,
    /// Seed for every stochastic step.
    #[arg(long = ARG_PLAN_SEED, value_name = "seed")]
    #[ortho_config(cli_short = 'n')]
    #[serde(default)]
    pub(crate) seed: Option<u64>,
}

impl PlanArgs {
    pub(crate) fn into_config(self) -> Result<PlanConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        PlanConfig::try_from(merged)
    }
}

/// Resolved `plan` command configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PlanConfig {
    /// Path to the JSON site inventory.
    pub(crate) inventory: Utf8PathBuf,
    /// Validated pipeline settings.
    pub(crate) pipeline: PipelineConfig,
}

impl PlanConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        let path = &self.inventory;
        match file_is_file(path) {
            Ok(true) => Ok(()),
            Ok(false) => Err(CliError::SourcePathNotFile {
                field: ARG_PLAN_INVENTORY,
                path: path.clone(),
            }),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                Err(CliError::MissingSourceFile {
                    field: ARG_PLAN_INVENTORY,
                    path: path.clone(),
                })
            }
            Err(source) => Err(CliError::InspectSourcePath {
                field: ARG_PLAN_INVENTORY,
                path: path.clone(),
                source,
            }),
        }
    }
}

impl TryFrom<PlanArgs> for PlanConfig {
    type Error = CliError;

    fn try_from(args: PlanArgs) -> Result<Self, Self::Error> {
        let inventory = args.inventory.ok_or(CliError::MissingArgument {
            field: ARG_PLAN_INVENTORY,
            env: ENV_PLAN_INVENTORY,
        })?;

        let defaults = PipelineConfig::default();
        let variant = match args.variant.as_deref() {
            Some(name) => name.parse::<ScoringVariant>()?,
            None => defaults.variant,
        };
        let mut ridge = defaults.ridge;
        ridge.lambda = args.ridge_lambda.unwrap_or(ridge.lambda);
        ridge.smoothing_alpha = args.smoothing_alpha.unwrap_or(ridge.smoothing_alpha);
        ridge.smoothing_iterations = args
            .smoothing_iterations
            .unwrap_or(ridge.smoothing_iterations);
        let mut gnn = defaults.gnn;
        gnn.hidden_dim = args.hidden_dim.unwrap_or(gnn.hidden_dim);
        gnn.epochs = args.epochs.unwrap_or(gnn.epochs);
        gnn.learning_rate = args.learning_rate.unwrap_or(gnn.learning_rate);
        gnn.weight_decay = args.weight_decay.unwrap_or(gnn.weight_decay);
        gnn.dropout = args.dropout.unwrap_or(gnn.dropout);

        let pipeline = PipelineConfig {
            edge_radius_km: args.edge_radius_km.unwrap_or(defaults.edge_radius_km),
            service_radius_km: args.service_radius_km.unwrap_or(defaults.service_radius_km),
            density_radius_km: args.density_radius_km.unwrap_or(defaults.density_radius_km),
            underserved_distance_km: args
                .underserved_distance_km
                .unwrap_or(defaults.underserved_distance_km),
            min_uncovered_ratio: args
                .min_uncovered_ratio
                .unwrap_or(defaults.min_uncovered_ratio),
            recommendation_budget: args
                .recommendation_budget
                .unwrap_or(defaults.recommendation_budget),
            scenario_budgets: args.scenario_budgets.unwrap_or(defaults.scenario_budgets),
            variant,
            ridge,
            gnn,
            seed: args.seed.unwrap_or(defaults.seed),
        };
        pipeline.validate()?;

        Ok(Self {
            inventory,
            pipeline,
        })
    }
}

pub(crate) fn run_plan(args: PlanArgs) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    run_plan_with(args, &mut stdout)
}

pub(crate) fn run_plan_with(args: PlanArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = resolve_plan_config(args)?;
    let report = execute_plan(&config)?;
    write_plan_report(writer, &report)
}

fn resolve_plan_config(args: PlanArgs) -> Result<PlanConfig, CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    Ok(config)
}

pub(crate) fn execute_plan(config: &PlanConfig) -> Result<PlanReport, CliError> {
    let inventory = load_inventory(&config.inventory)?;
    info!(
        "loaded {} existing and {} candidate sites from {}",
        inventory.existing.len(),
        inventory.candidates.len(),
        config.inventory
    );
    let pipeline = Pipeline::new(config.pipeline.clone()).map_err(CliError::Plan)?;
    pipeline
        .run(&inventory.existing, &inventory.candidates)
        .map_err(CliError::Plan)
}

/// Loads a JSON-encoded [`SiteInventory`] from disk.
pub(crate) fn load_inventory(path: &Utf8Path) -> Result<SiteInventory, CliError> {
    let file = open_utf8_file(path).map_err(|source| CliError::OpenInventory {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader).map_err(|source| CliError::ParseInventory {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn write_plan_report(
    writer: &mut dyn Write,
    report: &PlanReport,
) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(report).map_err(CliError::SerialisePlanReport)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WritePlanOutput)?;
    writer.write_all(b"\n").map_err(CliError::WritePlanOutput)?;
    Ok(())
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<PlanConfig, CliError> {
    let merged = PlanArgs::merge_from_layers(layers).map_err(CliError::from)?;
    PlanConfig::try_from(merged)
}
