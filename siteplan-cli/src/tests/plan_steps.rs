//! Behaviour-driven step definitions driving the plan CLI scenarios.

use super::helpers::{sample_inventory, utf8_root, write_inventory, write_utf8};
use super::*;
use crate::plan::run_plan_with;
use camino::Utf8PathBuf;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use siteplan_engine::{ConfigError, PlanReport};
use std::cell::RefCell;
use tempfile::TempDir;

#[derive(Debug)]
struct PlanWorld {
    _tmp: TempDir,
    inventory_path: Utf8PathBuf,
    include_inventory: RefCell<bool>,
    cli_args: RefCell<Vec<String>>,
    stdout: RefCell<Vec<u8>>,
    result: RefCell<Option<Result<(), CliError>>>,
}

impl PlanWorld {
    fn new() -> Self {
        let tmp = TempDir::new().expect("tempdir");
        let inventory_path = utf8_root(&tmp).join("sites.json");
        Self {
            _tmp: tmp,
            inventory_path,
            include_inventory: RefCell::new(true),
            cli_args: RefCell::new(Vec::new()),
            stdout: RefCell::new(Vec::new()),
            result: RefCell::new(None),
        }
    }

    fn build_command_line(&self) -> Vec<String> {
        let mut argv = vec!["siteplan".to_owned(), "plan".to_owned()];
        if *self.include_inventory.borrow() {
            argv.push(self.inventory_path.as_str().to_owned());
        }
        argv.extend([format!("--{ARG_PLAN_EPOCHS}"), "5".to_owned()]);
        argv.extend(self.cli_args.borrow().iter().cloned());
        argv
    }

    fn expect_error(&self) -> std::cell::Ref<'_, CliError> {
        std::cell::Ref::map(self.result.borrow(), |slot| {
            slot.as_ref()
                .expect("result recorded")
                .as_ref()
                .expect_err("expected error")
        })
    }
}

#[fixture]
fn world() -> PlanWorld {
    PlanWorld::new()
}

#[given("a site inventory with {count} candidates exists on disk")]
fn inventory_exists(#[from(world)] world: &PlanWorld, count: u32) {
    write_inventory(&world.inventory_path, &sample_inventory(count));
}

#[given("I choose the {variant:word} variant")]
fn choose_variant(#[from(world)] world: &PlanWorld, variant: String) {
    world.cli_args.borrow_mut().extend([
        format!("--{ARG_PLAN_VARIANT}"),
        variant.trim_matches('"').to_owned(),
    ]);
}

#[given("the site inventory contains invalid JSON")]
fn inventory_contains_invalid_json(#[from(world)] world: &PlanWorld) {
    write_utf8(&world.inventory_path, b"{ not valid json");
}

#[given("I omit the inventory path")]
fn omit_inventory_path(#[from(world)] world: &PlanWorld) {
    *world.include_inventory.borrow_mut() = false;
}

#[when("I run the plan command")]
fn run_plan_command(#[from(world)] world: &PlanWorld) {
    let invocation = world.build_command_line();
    let parsed = Cli::try_parse_from(invocation).map_err(CliError::from);
    let outcome = parsed.and_then(|cli| match cli.command {
        Command::Plan(args) => {
            let mut buffer = world.stdout.borrow_mut();
            run_plan_with(args, &mut *buffer)
        }
    });
    world.result.replace(Some(outcome));
}

#[then("the command succeeds and scores {count} candidates")]
fn command_succeeds(#[from(world)] world: &PlanWorld, count: usize) {
    let borrowed = world.result.borrow();
    let result = borrowed.as_ref().expect("result recorded");
    result.as_ref().expect("expected success");

    let stdout = String::from_utf8(world.stdout.borrow().clone()).expect("stdout utf-8");
    let report: PlanReport = serde_json::from_str(&stdout).expect("output should be a plan report");
    assert_eq!(report.node_scores.len(), count);
    assert!(!report.recommendations.is_empty());
}

#[then("the command fails because the variant is unknown")]
fn command_fails_unknown_variant(#[from(world)] world: &PlanWorld) {
    match &*world.expect_error() {
        CliError::InvalidConfig(ConfigError::UnknownVariant(name)) => {
            assert_eq!(name, "xgboost");
        }
        other => panic!("expected UnknownVariant, found {other:?}"),
    }
}

#[then("the command fails because the inventory JSON is invalid")]
fn command_fails_invalid_json(#[from(world)] world: &PlanWorld) {
    match &*world.expect_error() {
        CliError::ParseInventory { .. } => {}
        other => panic!("expected ParseInventory, found {other:?}"),
    }
}

#[then("the command fails because the inventory path is missing")]
fn command_fails_missing_inventory(#[from(world)] world: &PlanWorld) {
    match &*world.expect_error() {
        CliError::MissingArgument { field, .. } => assert_eq!(*field, ARG_PLAN_INVENTORY),
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

macro_rules! register_plan_scenario {
    ($fn_name:ident, $index:literal) => {
        #[scenario(path = "tests/features/plan_command.feature", index = $index)]
        fn $fn_name(world: PlanWorld) {
            let _ = world;
        }
    };
}

register_plan_scenario!(plan_happy_path, 0);
register_plan_scenario!(plan_unknown_variant, 1);
register_plan_scenario!(plan_invalid_json, 2);
register_plan_scenario!(plan_missing_inventory, 3);
