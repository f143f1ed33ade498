//! The command line interface for the planner.
use crate::input::load_model;
use crate::log;
use crate::optimisation::solver::SolverOptions;
use crate::output::{create_output_directory, get_output_dir};
use crate::planning;
use crate::settings::Settings;
use ::log::{info, warn};
use anyhow::{Context, Result, ensure};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

pub mod example;
pub mod settings;
use example::ExampleSubcommands;
use settings::SettingsSubcommands;

/// The command line interface for the planner.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
    /// Flag to provide the CLI docs as markdown
    #[arg(long, hide = true)]
    markdown_help: bool,
}

/// Options for the run command
#[derive(Args, Default)]
pub struct RunOpts {
    /// Directory for output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Whether to overwrite the output directory if it already exists
    #[arg(long)]
    pub overwrite: bool,
    /// Whether to write hourly dispatch and constraint counts to CSV files
    #[arg(long)]
    pub debug_model: bool,
    /// Solver to try first, overriding the model file
    #[arg(long)]
    pub solver: Option<String>,
    /// Time limit for each solve in seconds, overriding the model file
    #[arg(long)]
    pub time_limit: Option<f64>,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Optimise every scenario of a model.
    Run {
        /// Path to the model directory.
        model_dir: PathBuf,
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Manage demo models.
    Example {
        /// The available subcommands for managing demo models.
        #[command(subcommand)]
        subcommand: ExampleSubcommands,
    },
    /// Validate a model.
    Validate {
        /// The path to the model directory.
        model_dir: PathBuf,
    },
    /// Manage the program settings file.
    Settings {
        /// The available subcommands for managing settings.
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Run { model_dir, opts } => handle_run_command(&model_dir, &opts, None),
            Self::Example { subcommand } => subcommand.execute(),
            Self::Validate { model_dir } => handle_validate_command(&model_dir, None),
            Self::Settings { subcommand } => subcommand.execute(),
        }
    }
}

/// Parse CLI arguments and run the requested command
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Invoked as: `$ powerplan --markdown-help`
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    let Some(command) = cli.command else {
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}

/// Use the supplied settings or else read them from the settings file
fn settings_or_load(settings: Option<Settings>) -> Result<Settings> {
    match settings {
        Some(settings) => Ok(settings),
        None => Settings::load().context("Failed to load settings."),
    }
}

/// Solver options from the model file, with any command-line overrides applied
fn solver_options(model_options: SolverOptions, opts: &RunOpts) -> Result<SolverOptions> {
    let Some(time_limit) = opts.time_limit else {
        return Ok(model_options);
    };
    ensure!(
        time_limit.is_finite() && time_limit > 0.0,
        "Time limit must be a positive number of seconds"
    );

    Ok(SolverOptions {
        time_limit_seconds: time_limit,
        ..model_options
    })
}

/// Handle the `run` command.
pub fn handle_run_command(
    model_path: &Path,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let settings = settings_or_load(settings)?;

    // Command-line flags take precedence over settings
    let debug_model = opts.debug_model || settings.debug_model;
    let allow_overwrite = opts.overwrite || settings.overwrite;

    let pathbuf: PathBuf;
    let output_path = if let Some(p) = opts.output_dir.as_deref() {
        p
    } else {
        pathbuf = get_output_dir(model_path)?;
        &pathbuf
    };

    let overwrite = create_output_directory(output_path, allow_overwrite).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            output_path.display()
        )
    })?;

    log::init(Some(&settings.log_level), Some(output_path))
        .context("Failed to initialise logging.")?;

    let model = load_model(model_path).context("Failed to load model.")?;
    info!("Loaded model from {}", model_path.display());
    info!("Output folder: {}", output_path.display());

    // The logger is only ready now
    if overwrite {
        warn!("Output folder will be overwritten");
    }

    let solver_name = opts
        .solver
        .as_deref()
        .unwrap_or(&model.parameters.solver.name);
    let options = solver_options(SolverOptions::from(&model.parameters.solver), opts)?;

    let ranked = planning::run(&model, solver_name, &options, output_path, debug_model)?;
    if let Some(best) = ranked.first() {
        info!(
            "Best scenario: {} (LCOE {:.2} $/MWh)",
            best.solution.scenario, best.solution.economics.lcoe
        );
    }

    Ok(())
}

/// Handle the `validate` command.
pub fn handle_validate_command(model_path: &Path, settings: Option<Settings>) -> Result<()> {
    let settings = settings_or_load(settings)?;

    // No log files for validation
    log::init(Some(&settings.log_level), None).context("Failed to initialise logging.")?;

    let model = load_model(model_path).context("Failed to validate model.")?;
    info!(
        "Model validation successful! {} years, scenarios: {}",
        model.years().len(),
        model.parameters.scenario_names()
    );

    Ok(())
}
