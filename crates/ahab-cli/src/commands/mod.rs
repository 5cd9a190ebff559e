//! CLI command definitions and dispatch.

pub mod generate;
pub mod list;
pub mod plan;

use std::path::PathBuf;

use ahab_common::config::GeneratorConfig;
use ahab_common::constants::MODULES_DIR_ENV;
use clap::{Parser, Subcommand, ValueEnum};

/// Ahab — module-based deployment manifest generator.
#[derive(Parser, Debug)]
#[command(name = "ahab", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Directory holding `<name>/module.yml` specs.
    #[arg(long, global = true, env = MODULES_DIR_ENV)]
    pub modules_dir: Option<PathBuf>,

    /// Generator configuration file; command-line flags override it.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Log line format written to stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a docker-compose manifest from modules.
    Generate(generate::GenerateArgs),
    /// Show the resolved modules and their start order without writing anything.
    Plan(plan::PlanArgs),
    /// List the available modules.
    List(list::ListArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded or the command
/// fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref(), cli.modules_dir)?;
    match cli.command {
        Command::Generate(args) => generate::execute(args, config),
        Command::Plan(args) => plan::execute(&args, &config),
        Command::List(args) => list::execute(&args, &config),
    }
}

/// Loads the configuration file, if any, and applies the global overrides.
fn load_config(
    path: Option<&std::path::Path>,
    modules_dir: Option<PathBuf>,
) -> anyhow::Result<GeneratorConfig> {
    let mut config = match path {
        Some(path) => GeneratorConfig::from_file(path)?,
        None => GeneratorConfig::default(),
    };
    if let Some(dir) = modules_dir {
        config.modules_dir = dir;
    }
    config.validate()?;
    tracing::debug!(modules_dir = %config.modules_dir.display(), "configuration loaded");
    Ok(config)
}

/// Turns positional module names or `--all` into the requested list.
pub(crate) fn requested_modules(
    modules: Vec<String>,
    all: bool,
    source: &dyn ahab_compose::module::ModuleSource,
) -> anyhow::Result<Vec<String>> {
    if !all {
        return Ok(modules);
    }
    let available = source.available()?;
    if available.is_empty() {
        anyhow::bail!("no modules found");
    }
    Ok(available)
}
