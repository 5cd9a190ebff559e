//! `ahab generate` — Build and write the docker-compose manifest.

use std::path::PathBuf;

use ahab_common::config::GeneratorConfig;
use ahab_compose::emitter::write_manifest;
use ahab_compose::module::FsModuleLoader;
use clap::Args;

use crate::commands::requested_modules;
use crate::output;

/// Arguments for the `generate` command.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Modules to include; their dependencies are added automatically.
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    pub modules: Vec<String>,

    /// Include every available module.
    #[arg(long)]
    pub all: bool,

    /// Output path of the generated manifest.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Name of the shared network.
    #[arg(long)]
    pub network: Option<String>,

    /// Load, resolve, and assemble everything, but write nothing.
    #[arg(long)]
    pub validate: bool,
}

/// Executes the `generate` command.
///
/// Runs the full pipeline and, unless `--validate` is given, writes the
/// manifest atomically. Nothing is written when any stage fails.
///
/// # Errors
///
/// Returns the pipeline's error for unknown, invalid, or cyclic modules,
/// and a write error if the manifest cannot be put in place.
pub fn execute(mut args: GenerateArgs, config: GeneratorConfig) -> anyhow::Result<()> {
    let config = apply_overrides(&mut args, config)?;

    let loader = FsModuleLoader::new(&config.modules_dir);
    let requested = requested_modules(args.modules, args.all, &loader)?;
    tracing::info!(
        modules_dir = %config.modules_dir.display(),
        requested = ?requested,
        "generating manifest"
    );

    let generation = ahab_compose::generate(&requested, &loader, &config)?;

    if args.validate {
        println!(
            "All {} validated successfully.",
            output::plural(generation.resolved.len(), "module")
        );
        print_warnings(&generation.warnings);
        return Ok(());
    }

    write_manifest(&generation.manifest, &config.output)?;

    println!("Generated: {}", config.output.display());
    println!();
    print!("{}", output::summary(&generation.manifest));
    print_warnings(&generation.warnings);
    println!();
    println!("To start services:");
    println!("  docker-compose -f {} up -d", config.output.display());
    Ok(())
}

/// Applies `--output` and `--network` and re-checks the result, so a bad
/// override fails before any module is loaded.
fn apply_overrides(
    args: &mut GenerateArgs,
    mut config: GeneratorConfig,
) -> anyhow::Result<GeneratorConfig> {
    if let Some(output) = args.output.take() {
        config.output = output;
    }
    if let Some(network) = args.network.take() {
        config.network = network;
    }
    config.validate()?;
    Ok(config)
}

fn print_warnings(warnings: &[ahab_compose::Warning]) {
    if warnings.is_empty() {
        return;
    }
    println!();
    println!("Warnings:");
    for warning in warnings {
        println!("  ! {warning}");
    }
}
