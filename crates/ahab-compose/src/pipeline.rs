//! End-to-end generation: module names in, manifest out.
//!
//! Stages run strictly forward: resolve → compose → inject discovery →
//! harden → allocate. Writing is left to [`crate::emitter`] so callers can
//! validate or plan without touching disk.

use std::fmt;

use ahab_common::config::GeneratorConfig;
use ahab_common::error::Result;

use crate::allocator::allocate;
use crate::composer::compose;
use crate::discovery::inject;
use crate::hardening::harden;
use crate::manifest::Manifest;
use crate::module::ModuleSource;
use crate::registry::Registry;
use crate::resolver::{ResolvedSet, resolve};

/// A non-fatal observation made while generating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    /// Module the warning concerns.
    pub module: String,
    /// Human-readable description.
    pub message: String,
}

impl Warning {
    /// Creates a warning about `module`.
    pub fn new(module: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.module, self.message)
    }
}

/// Result of a successful generation run.
#[derive(Debug, Clone)]
pub struct Generation {
    /// The assembled manifest.
    pub manifest: Manifest,
    /// The dependency closure it was built from.
    pub resolved: ResolvedSet,
    /// Warnings raised along the way.
    pub warnings: Vec<Warning>,
}

/// Resolves `requested` through `source` without building services.
///
/// # Errors
///
/// Returns the resolver's error for missing, invalid, or cyclic modules.
pub fn resolve_only(requested: &[String], source: &dyn ModuleSource) -> Result<ResolvedSet> {
    let mut registry = Registry::new(source);
    resolve(requested, &mut registry)
}

/// Generates the manifest for `requested`.
///
/// # Errors
///
/// Returns the first fatal error of any stage; there is no partial result.
pub fn generate(
    requested: &[String],
    source: &dyn ModuleSource,
    config: &GeneratorConfig,
) -> Result<Generation> {
    let resolved = resolve_only(requested, source)?;
    let mut warnings = Vec::new();

    let mut services = compose(&resolved, config)?;
    inject(&mut services, &resolved, config, &mut warnings);
    for module in resolved.modules() {
        if let Some(service) = services.get_mut(&module.name) {
            harden(service, module, &mut warnings);
        }
    }
    let allocation = allocate(&mut services, &resolved, config)?;

    let manifest = Manifest {
        version: config.compose_version.clone(),
        services,
        networks: allocation.networks,
        volumes: allocation.volumes,
    };
    tracing::info!(
        services = manifest.services.len(),
        volumes = manifest.volumes.len(),
        warnings = warnings.len(),
        "manifest assembled"
    );

    Ok(Generation {
        manifest,
        resolved,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::InMemorySource;

    #[test]
    fn warning_display_names_module() {
        let warning = Warning::new("mysql", "runs as root");
        assert_eq!(warning.to_string(), "mysql: runs as root");
    }

    #[test]
    fn generate_runs_every_stage() {
        let source = InMemorySource::new()
            .with("php", "name: php\nimage: php\nrole: application\ndependencies: [mysql]\n")
            .with(
                "mysql",
                "name: mysql\nimage: mysql\nrole: database\nrun_as_root: true\nvolumes: [\"mysql_data:/var/lib/mysql\"]\n",
            );
        let generation = generate(&["php".to_string()], &source, &GeneratorConfig::default())
            .expect("generate");

        let php = &generation.manifest.services["php"];
        assert_eq!(php.environment["DB_HOST"], "ahab_mysql");
        assert_eq!(php.cap_drop, vec!["ALL"]);
        assert_eq!(php.networks, vec!["ahab_network"]);
        assert!(php.deploy.is_some());
        assert!(generation.manifest.volumes.contains_key("mysql_data"));
        assert_eq!(generation.warnings.len(), 1);
        assert_eq!(generation.warnings[0].module, "mysql");
        assert_eq!(generation.resolved.len(), 2);
    }

    #[test]
    fn empty_request_yields_empty_manifest() {
        let source = InMemorySource::new();
        let generation = generate(&[], &source, &GeneratorConfig::default()).expect("generate");
        assert!(generation.manifest.services.is_empty());
        assert_eq!(generation.manifest.networks.len(), 1);
    }
}
