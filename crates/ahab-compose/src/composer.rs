//! Turns resolved modules into compose services.
//!
//! Ports, volumes, and environment are copied verbatim; discovery,
//! hardening, and networking are layered on by later stages.

use std::collections::{BTreeMap, HashMap, HashSet};

use ahab_common::config::GeneratorConfig;
use ahab_common::constants::LABEL_PREFIX;
use ahab_common::error::{AhabError, Result};

use crate::manifest::ServiceSpec;
use crate::module::Module;
use crate::resolver::ResolvedSet;

/// Builds one [`ServiceSpec`] per service-producing module.
///
/// Meta-modules yield no service. A dependency on a meta-module expands to
/// that module's own service-producing dependencies.
///
/// # Errors
///
/// Returns [`AhabError::ModuleValidation`] if a service-producing module
/// has no image, or if two services end up with the same container name.
pub fn compose(
    resolved: &ResolvedSet,
    config: &GeneratorConfig,
) -> Result<BTreeMap<String, ServiceSpec>> {
    let mut services = BTreeMap::new();
    let mut container_names: HashMap<String, &str> = HashMap::new();
    for module in resolved.modules() {
        if !module.role.produces_service() {
            tracing::debug!(module = %module.name, "meta-module contributes no service");
            continue;
        }
        tracing::info!(module = %module.name, role = %module.role, "adding service");
        let service = compose_service(module, resolved, config)?;
        if let Some(owner) = container_names.insert(service.container_name.clone(), &module.name) {
            return Err(AhabError::ModuleValidation {
                module: module.name.clone(),
                problems: vec![format!(
                    "container name \"{}\" is already used by module {owner}",
                    service.container_name
                )],
            });
        }
        let _ = services.insert(module.name.clone(), service);
    }
    Ok(services)
}

fn compose_service(
    module: &Module,
    resolved: &ResolvedSet,
    config: &GeneratorConfig,
) -> Result<ServiceSpec> {
    let image = module
        .image
        .clone()
        .ok_or_else(|| AhabError::ModuleValidation {
            module: module.name.clone(),
            problems: vec!["missing required field: image".into()],
        })?;

    Ok(ServiceSpec {
        image,
        container_name: module.container_name_or(&config.container_prefix),
        restart: module.restart.clone(),
        user: module.user.clone(),
        ports: module.ports.iter().map(|p| p.raw.clone()).collect(),
        volumes: module.volumes.iter().map(crate::module::VolumeMount::to_short_syntax).collect(),
        environment: module.environment.clone(),
        depends_on: service_dependencies(module, resolved),
        labels: labels(module),
        ..ServiceSpec::default()
    })
}

/// Returns the service keys `module` must start after, in declaration
/// order, with meta-modules expanded in place.
#[must_use]
pub fn service_dependencies(module: &Module, resolved: &ResolvedSet) -> Vec<String> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    let mut expanded = HashSet::new();
    collect_dependencies(module, resolved, &mut out, &mut seen, &mut expanded);
    out
}

fn collect_dependencies<'a>(
    module: &'a Module,
    resolved: &'a ResolvedSet,
    out: &mut Vec<String>,
    seen: &mut HashSet<&'a str>,
    expanded: &mut HashSet<&'a str>,
) {
    for dep in &module.dependencies {
        let Some(target) = resolved.get(dep) else {
            continue;
        };
        if target.role.produces_service() {
            if seen.insert(dep.as_str()) {
                out.push(dep.clone());
            }
        } else if expanded.insert(dep.as_str()) {
            collect_dependencies(target, resolved, out, seen, expanded);
        }
    }
}

fn labels(module: &Module) -> BTreeMap<String, String> {
    [
        ("module", module.name.clone()),
        ("version", module.version.clone()),
        ("description", module.description.clone()),
        ("role", module.role.to_string()),
        ("stig-compliant", "true".to_string()),
    ]
    .into_iter()
    .map(|(key, value)| (format!("{LABEL_PREFIX}.{key}"), value))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::InMemorySource;
    use crate::registry::Registry;
    use crate::resolver::resolve;

    fn resolved(source: &InMemorySource, requested: &[&str]) -> ResolvedSet {
        let requested: Vec<String> = requested.iter().map(|s| (*s).to_string()).collect();
        let mut registry = Registry::new(source);
        resolve(&requested, &mut registry).expect("resolve")
    }

    fn lamp() -> InMemorySource {
        InMemorySource::new()
            .with("lamp", "name: lamp\nrole: meta\ndependencies: [apache, mysql, php]\n")
            .with("apache", "name: apache\nimage: httpd:2.4\nrole: webserver\nports: [\"8080:80\"]\n")
            .with("mysql", "name: mysql\nimage: mysql:8\nrole: database\nvolumes: [\"mysql_data:/var/lib/mysql\"]\n")
            .with("php", "name: php\nimage: php:8-apache\nrole: application\ndependencies: [mysql]\nenvironment:\n  APP_ENV: production\n")
            .with("site", "name: site\nimage: site:1\ndependencies: [lamp]\n")
    }

    #[test]
    fn copies_module_fields_verbatim() {
        let set = resolved(&lamp(), &["php"]);
        let services = compose(&set, &GeneratorConfig::default()).expect("compose");
        let php = &services["php"];
        assert_eq!(php.image, "php:8-apache");
        assert_eq!(php.container_name, "ahab_php");
        assert_eq!(php.depends_on, vec!["mysql"]);
        assert_eq!(php.environment.get("APP_ENV").map(String::as_str), Some("production"));
        assert_eq!(services["mysql"].volumes, vec!["mysql_data:/var/lib/mysql"]);
    }

    #[test]
    fn meta_module_contributes_no_service() {
        let set = resolved(&lamp(), &["lamp"]);
        let services = compose(&set, &GeneratorConfig::default()).expect("compose");
        let keys: Vec<&str> = services.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["apache", "mysql", "php"]);
    }

    #[test]
    fn dependency_on_meta_module_expands() {
        let set = resolved(&lamp(), &["site"]);
        let services = compose(&set, &GeneratorConfig::default()).expect("compose");
        assert_eq!(services["site"].depends_on, vec!["apache", "mysql", "php"]);
        assert!(!services.contains_key("lamp"));
    }

    #[test]
    fn labels_record_provenance() {
        let set = resolved(&lamp(), &["apache"]);
        let services = compose(&set, &GeneratorConfig::default()).expect("compose");
        let labels = &services["apache"].labels;
        assert_eq!(labels.get("com.ahab.module").map(String::as_str), Some("apache"));
        assert_eq!(labels.get("com.ahab.role").map(String::as_str), Some("webserver"));
        assert_eq!(labels.get("com.ahab.stig-compliant").map(String::as_str), Some("true"));
    }

    #[test]
    fn colliding_container_names_are_rejected() {
        let source = InMemorySource::new()
            .with("web", "name: web\nimage: a\ncontainer_name: frontdoor\n")
            .with("edge", "name: edge\nimage: b\ncontainer_name: frontdoor\n")
            .with("db", "name: db\nimage: c\n")
            .with("fake", "name: fake\nimage: d\ncontainer_name: ahab_db\n");

        for (requested, first, second) in [(["web", "edge"], "web", "edge"), (["db", "fake"], "db", "fake")] {
            let set = resolved(&source, &requested);
            match compose(&set, &GeneratorConfig::default()).unwrap_err() {
                AhabError::ModuleValidation { module, problems } => {
                    assert_eq!(module, second);
                    assert!(problems[0].contains(&format!("module {first}")), "got: {problems:?}");
                }
                other => panic!("expected validation error, got {other}"),
            }
        }
    }

    #[test]
    fn container_prefix_comes_from_config() {
        let set = resolved(&lamp(), &["apache"]);
        let config = GeneratorConfig {
            container_prefix: "lab_".into(),
            ..GeneratorConfig::default()
        };
        let services = compose(&set, &config).expect("compose");
        assert_eq!(services["apache"].container_name, "lab_apache");
    }
}
