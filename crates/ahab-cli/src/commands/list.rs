//! `ahab list` — Enumerate the modules in the modules directory.

use ahab_common::config::GeneratorConfig;
use ahab_compose::module::{FsModuleLoader, ModuleSource};
use clap::Args;

use crate::output;

/// Arguments for the `list` command.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Print only module names, one per line.
    #[arg(short, long)]
    pub quiet: bool,
}

/// Executes the `list` command.
///
/// Modules whose spec fails to load are still listed, marked invalid, so
/// one broken module does not hide the rest.
///
/// # Errors
///
/// Returns an error if the modules directory cannot be read.
pub fn execute(args: &ListArgs, config: &GeneratorConfig) -> anyhow::Result<()> {
    let loader = FsModuleLoader::new(&config.modules_dir);
    let names = loader.available()?;

    if args.quiet {
        for name in &names {
            println!("{name}");
        }
        return Ok(());
    }

    print!("{}", render(&loader, &names));
    Ok(())
}

fn render(source: &dyn ModuleSource, names: &[String]) -> String {
    let rows: Vec<Vec<String>> = names
        .iter()
        .map(|name| match source.load(name) {
            Ok(module) => vec![
                module.name,
                module.version,
                module.role.to_string(),
                module.description,
            ],
            Err(e) => {
                tracing::warn!(module = %name, error = %e, "module spec does not load");
                vec![name.clone(), "-".into(), "invalid".into(), e.to_string()]
            }
        })
        .collect();

    let mut out = output::table(&["MODULE", "VERSION", "ROLE", "DESCRIPTION"], &rows);
    out.push('\n');
    out.push_str(&output::plural(names.len(), "module"));
    out.push_str(" available.\n");
    out
}

#[cfg(test)]
mod tests {
    use ahab_compose::module::InMemorySource;

    use super::*;

    #[test]
    fn lists_valid_and_invalid_modules() {
        let source = InMemorySource::new()
            .with("apache", "name: apache\nversion: \"2.4\"\nrole: webserver\nimage: httpd\ndescription: Web server\n")
            .with("broken", "name: broken\n");
        let names = source.available().expect("available");
        let text = render(&source, &names);

        assert!(text.contains("apache"), "got:\n{text}");
        assert!(text.contains("2.4"), "got:\n{text}");
        assert!(text.contains("Web server"), "got:\n{text}");
        assert!(text.contains("invalid"), "got:\n{text}");
        assert!(text.ends_with("2 modules available.\n"), "got:\n{text}");
    }
}
