//! `ahab plan` — Display the resolved modules and their start order.

use ahab_common::config::GeneratorConfig;
use ahab_common::types::Role;
use ahab_compose::graph::DependencyGraph;
use ahab_compose::module::FsModuleLoader;
use ahab_compose::pipeline::resolve_only;
use ahab_compose::resolver::ResolvedSet;
use clap::Args;
use serde::Serialize;

use crate::commands::requested_modules;
use crate::output;

/// Arguments for the `plan` command.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Modules to plan for.
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    pub modules: Vec<String>,

    /// Plan for every available module.
    #[arg(long)]
    pub all: bool,

    /// Print the plan as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Machine-readable deployment plan.
#[derive(Debug, Serialize)]
struct Plan<'a> {
    requested: &'a [String],
    modules: Vec<PlannedModule<'a>>,
    start_order: Vec<String>,
}

#[derive(Debug, Serialize)]
struct PlannedModule<'a> {
    name: &'a str,
    version: &'a str,
    role: Role,
    image: Option<&'a str>,
    dependencies: &'a [String],
}

impl<'a> Plan<'a> {
    fn build(requested: &'a [String], resolved: &'a ResolvedSet) -> anyhow::Result<Self> {
        let start_order = DependencyGraph::from_resolved(resolved).start_order()?;
        let modules = resolved
            .modules()
            .iter()
            .map(|m| PlannedModule {
                name: &m.name,
                version: &m.version,
                role: m.role,
                image: m.image.as_deref(),
                dependencies: &m.dependencies,
            })
            .collect();
        Ok(Self {
            requested,
            modules,
            start_order,
        })
    }

    fn render(&self) -> String {
        let mut out = output::heading("Deployment plan");
        let rows: Vec<Vec<String>> = self
            .modules
            .iter()
            .map(|m| {
                vec![
                    m.name.to_string(),
                    m.role.to_string(),
                    m.image.unwrap_or("-").to_string(),
                    m.dependencies.join(", "),
                ]
            })
            .collect();
        out.push_str(&output::table(&["MODULE", "ROLE", "IMAGE", "DEPENDS ON"], &rows));
        out.push('\n');
        out.push_str("Start order:\n");
        for (i, name) in self.start_order.iter().enumerate() {
            out.push_str(&format!("  {}. {name}\n", i + 1));
        }
        out.push('\n');
        out.push_str(&format!(
            "  {} will be generated.\n",
            output::plural(self.start_order.len(), "service")
        ));
        out
    }
}

/// Executes the `plan` command.
///
/// Resolves the dependency closure, builds the start-order graph, and
/// prints both. Nothing is written to disk.
///
/// # Errors
///
/// Returns an error for unknown, invalid, or cyclic modules.
pub fn execute(args: &PlanArgs, config: &GeneratorConfig) -> anyhow::Result<()> {
    let loader = FsModuleLoader::new(&config.modules_dir);
    let requested = requested_modules(args.modules.clone(), args.all, &loader)?;
    let resolved = resolve_only(&requested, &loader)?;
    let plan = Plan::build(&requested, &resolved)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print!("{}", plan.render());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use ahab_compose::module::InMemorySource;

    use super::*;

    fn resolved() -> (Vec<String>, ResolvedSet) {
        let source = InMemorySource::new()
            .with("lamp", "name: lamp\nrole: meta\ndependencies: [apache, php]\n")
            .with("apache", "name: apache\nimage: httpd\nrole: webserver\n")
            .with("php", "name: php\nimage: php\nrole: application\ndependencies: [mysql]\n")
            .with("mysql", "name: mysql\nimage: mysql\nrole: database\n");
        let requested = vec!["lamp".to_string()];
        let resolved = resolve_only(&requested, &source).expect("resolve");
        (requested, resolved)
    }

    #[test]
    fn start_order_puts_dependencies_first() {
        let (requested, resolved) = resolved();
        let plan = Plan::build(&requested, &resolved).expect("plan");
        let pos = |name: &str| plan.start_order.iter().position(|n| n == name).expect(name);
        assert!(pos("mysql") < pos("php"));
        assert!(!plan.start_order.iter().any(|n| n == "lamp"));
        assert_eq!(plan.modules.len(), 4);
    }

    #[test]
    fn json_plan_lists_roles() {
        let (requested, resolved) = resolved();
        let plan = Plan::build(&requested, &resolved).expect("plan");
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&plan).expect("serialize")).expect("parse");
        assert_eq!(json["requested"][0], "lamp");
        assert_eq!(json["modules"][0]["role"], "meta");
        assert_eq!(json["modules"][0]["image"], serde_json::Value::Null);
        assert_eq!(json["start_order"].as_array().map(Vec::len), Some(3));
    }

    #[test]
    fn rendered_plan_mentions_every_service() {
        let (requested, resolved) = resolved();
        let text = Plan::build(&requested, &resolved).expect("plan").render();
        assert!(text.contains("Deployment plan"));
        assert!(text.contains("3 services will be generated."), "got:\n{text}");
        for name in ["apache", "php", "mysql"] {
            assert!(text.contains(name), "missing {name} in:\n{text}");
        }
    }
}
