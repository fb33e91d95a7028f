//! CLI subcommands: init, validate, plan, run, status, completions.

use crate::core::config::{self, Config, DEFAULT_CONFIG_FILE};
use crate::core::error::{ConfigError, EnvironmentError, Error, Result};
use crate::core::executor::Executor;
use crate::core::parser;
use crate::core::types::{Plan, RunOutcome};
use crate::journal::state::{self, RunRecord};
use crate::journal::{eventlog, Journal};
use crate::transport::local::{LocalRunner, OutputMode};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Default recipe file name.
pub const DEFAULT_RECIPE: &str = "Rigfile";

#[derive(Parser, Debug)]
#[command(
    name = "rigfile",
    version,
    about = "Sequential provisioning steps from a line-oriented recipe"
)]
pub struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a starter Rigfile and rigfile.yaml
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Parse a recipe without running anything
    Validate {
        /// Path to the recipe
        #[arg(short, long, default_value = DEFAULT_RECIPE)]
        file: PathBuf,
    },

    /// Show the steps a recipe would run, in order
    Plan {
        /// Path to the recipe
        #[arg(short, long, default_value = DEFAULT_RECIPE)]
        file: PathBuf,
    },

    /// Execute a recipe, stopping at the first failing step
    Run(RunArgs),

    /// Show the last recorded run
    Status {
        /// State directory (default: `state_dir` from the settings file)
        #[arg(long)]
        state_dir: Option<PathBuf>,

        /// Settings file (default: rigfile.yaml, if present)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Path to the recipe
    #[arg(short, long, default_value = DEFAULT_RECIPE)]
    pub file: PathBuf,

    /// Settings file (default: rigfile.yaml next to the recipe, if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override a build argument (repeatable)
    #[arg(long = "build-arg", value_name = "KEY=VALUE", value_parser = config::parse_key_value)]
    pub build_args: Vec<(String, String)>,

    /// Starting working directory
    #[arg(short = 'C', long = "directory")]
    pub directory: Option<PathBuf>,

    /// State directory (overrides the settings file)
    #[arg(long)]
    pub state_dir: Option<PathBuf>,

    /// Do not write the event log or last-run record
    #[arg(long)]
    pub no_journal: bool,

    /// Capture command output instead of streaming it (logged at debug)
    #[arg(long)]
    pub capture: bool,

    /// Print the plan without running it
    #[arg(long)]
    pub dry_run: bool,
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Init { path } => cmd_init(&path),
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Plan { file } => cmd_plan(&file),
        Commands::Run(args) => cmd_run(&args),
        Commands::Status { state_dir, config } => {
            cmd_status(state_dir.as_deref(), config.as_deref())
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "rigfile", &mut std::io::stdout());
            Ok(())
        }
    }
}

const RECIPE_TEMPLATE: &str = r#"# Rigfile: one instruction per line, run top to bottom.
ARG TOOLCHAIN=stable
SET DEBIAN_FRONTEND=noninteractive
INSTALL curl git build-essential
RUN curl -sSf https://sh.rustup.rs | sh -s -- -y --default-toolchain "$TOOLCHAIN"
CLONE --depth 1 https://github.com/example/project.git
CD project
RUN "$HOME/.cargo/bin/cargo" build --release
"#;

const CONFIG_TEMPLATE: &str = r#"shell: bash
inherit_env: true
journal: true
state_dir: .rigfile
build_args: {}
env: {}
"#;

fn cmd_init(path: &Path) -> Result<()> {
    let recipe_path = path.join(DEFAULT_RECIPE);
    if recipe_path.exists() {
        return Err(Error::Other(format!(
            "{} already exists",
            recipe_path.display()
        )));
    }
    std::fs::create_dir_all(path)
        .map_err(|e| Error::Other(format!("cannot create {}: {}", path.display(), e)))?;

    let config_path = path.join(DEFAULT_CONFIG_FILE);
    write_file(&recipe_path, RECIPE_TEMPLATE)?;
    println!("Initialized rigfile project at {}", path.display());
    println!("  Created: {}", recipe_path.display());
    if !config_path.exists() {
        write_file(&config_path, CONFIG_TEMPLATE)?;
        println!("  Created: {}", config_path.display());
    }
    Ok(())
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content)
        .map_err(|e| Error::Other(format!("cannot write {}: {}", path.display(), e)))
}

/// Settings file path used when none is named: next to the recipe.
fn default_config_path(recipe: &Path) -> PathBuf {
    recipe
        .parent()
        .map(|p| p.join(DEFAULT_CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// Load settings and reject invalid ones.
fn load_valid_config(explicit: Option<&Path>, recipe: &Path) -> Result<Config> {
    let default_path = default_config_path(recipe);
    let config = config::load_config(explicit, &default_path)?;
    let errors = config::validate_config(&config);
    if errors.is_empty() {
        return Ok(config);
    }
    for e in &errors {
        eprintln!("  ERROR: {}", e);
    }
    let path = explicit.map_or(default_path, Path::to_path_buf);
    Err(ConfigError::Invalid {
        path,
        message: format!("{} validation error(s)", errors.len()),
    }
    .into())
}

fn cmd_validate(file: &Path) -> Result<()> {
    let plan = parser::parse_recipe_file(file)?;
    load_valid_config(None, file)?;
    println!("OK: {} ({} steps)", file.display(), plan.len());
    Ok(())
}

fn cmd_plan(file: &Path) -> Result<()> {
    let plan = parser::parse_recipe_file(file)?;
    print_plan(&plan);
    Ok(())
}

fn print_plan(plan: &Plan) {
    if plan.is_empty() {
        println!("No steps.");
    }
    for (idx, instruction) in plan.instructions.iter().enumerate() {
        println!(
            "  {:>3}. [line {}] {}",
            idx + 1,
            instruction.line,
            instruction.step
        );
    }
    println!();
    println!("Plan: {} step(s), digest {}", plan.len(), plan.digest());
}

/// Apply command-line flags on top of the loaded settings.
fn apply_overrides(config: &mut Config, args: &RunArgs) {
    for (k, v) in &args.build_args {
        config.build_args.insert(k.clone(), v.clone());
    }
    if let Some(dir) = &args.state_dir {
        config.state_dir = dir.clone();
    }
    if args.no_journal {
        config.journal = false;
    }
}

/// Absolute starting directory for a run.
fn starting_dir(directory: Option<&Path>) -> Result<PathBuf> {
    let dir = directory.unwrap_or_else(|| Path::new("."));
    let abs = std::path::absolute(dir)
        .map_err(|e| Error::Other(format!("cannot resolve {}: {}", dir.display(), e)))?;
    if !abs.is_dir() {
        return Err(EnvironmentError::MissingDirectory(abs).into());
    }
    Ok(abs)
}

fn cmd_run(args: &RunArgs) -> Result<()> {
    let plan = parser::parse_recipe_file(&args.file)?;
    let mut config = load_valid_config(args.config.as_deref(), &args.file)?;
    apply_overrides(&mut config, args);

    if args.dry_run {
        print_plan(&plan);
        return Ok(());
    }

    let cwd = starting_dir(args.directory.as_deref())?;
    let ctx = config.initial_context(&cwd);
    let output = if args.capture {
        OutputMode::Capture
    } else {
        OutputMode::Inherit
    };
    let mut runner = LocalRunner::new(config.shell.clone()).with_output(output);
    let journal = config.journal.then(|| Journal::new(&config.state_dir));

    let started_at = eventlog::now_rfc3339();
    let mut executor = Executor::new(&mut runner);
    if let Some(journal) = &journal {
        executor = executor.with_journal(journal);
    }
    let report = executor.run(&plan, ctx);

    if let Some(journal) = &journal {
        let record = RunRecord::from_report(
            &report,
            &args.file.display().to_string(),
            &plan.digest(),
            plan.len(),
            started_at,
        );
        if let Err(e) = state::save_record(journal.state_dir(), &record) {
            log::warn!("cannot save run record: {}", e);
        }
    }

    let elapsed = report.total_duration.as_secs_f64();
    match report.outcome {
        RunOutcome::Succeeded => {
            println!(
                "Succeeded: {} step(s) in {:.2}s (cwd {})",
                report.steps_run,
                elapsed,
                report.context.cwd().display()
            );
            Ok(())
        }
        RunOutcome::Failed(failure) => {
            let exit_code = failure.exit_code();
            eprintln!(
                "Failed at step {}/{} (line {}): {}",
                failure.step_index + 1,
                plan.len(),
                failure.line,
                failure.step
            );
            Err(Error::StepFailed {
                step_index: failure.step_index,
                line: failure.line,
                exit_code,
                source: failure.error,
            })
        }
    }
}

/// State directory for `status`: the flag, else the settings file's.
fn resolve_state_dir(state_dir: Option<&Path>, config_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = state_dir {
        return Ok(dir.to_path_buf());
    }
    let settings = config::load_config(config_path, Path::new(DEFAULT_CONFIG_FILE))?;
    Ok(settings.state_dir)
}

fn cmd_status(state_dir: Option<&Path>, config: Option<&Path>) -> Result<()> {
    let state_dir = resolve_state_dir(state_dir, config)?;
    let Some(record) = state::load_record(&state_dir)? else {
        println!("No runs recorded. Run `rigfile run` first.");
        return Ok(());
    };

    println!("Run: {} ({})", record.run_id, record.state);
    println!("  Recipe: {} [{}]", record.recipe, record.recipe_digest);
    println!("  Started: {}", record.started_at);
    println!("  Finished: {}", record.finished_at);
    println!(
        "  Steps: {}/{} ({:.2}s)",
        record.steps_run, record.steps_total, record.duration_seconds
    );
    println!("  Working dir: {}", record.working_dir);
    if let (Some(line), Some(step)) = (record.failed_line, &record.failed_step) {
        println!("  Failed: line {}: {}", line, step);
    }
    if let Some(error) = &record.error {
        println!("  Error: {}", error);
    }
    if recipe_changed(&record) {
        println!("  Note: recipe has changed since this run");
    }
    Ok(())
}

/// Whether the recorded recipe now parses to a different plan. An
/// unreadable or unparsable recipe counts as unchanged.
fn recipe_changed(record: &RunRecord) -> bool {
    match parser::parse_recipe_file(Path::new(&record.recipe)) {
        Ok(plan) => plan.digest() != record.recipe_digest,
        Err(e) => {
            log::debug!("cannot re-read {}: {}", record.recipe, e);
            false
        }
    }
}
