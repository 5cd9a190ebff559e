//! Service discovery through injected environment variables.
//!
//! Services find each other by container name on the shared network. The
//! injector tells applications where their database and cache live, and
//! tells proxies where their upstreams live. Explicitly declared values
//! always win over injected ones.

use std::collections::BTreeMap;

use ahab_common::config::GeneratorConfig;
use ahab_common::types::Role;

use crate::manifest::ServiceSpec;
use crate::module::Module;
use crate::pipeline::Warning;
use crate::resolver::ResolvedSet;

/// Container port assumed for a database that publishes none.
pub const DEFAULT_DB_PORT: u16 = 3306;
/// Container port assumed for a cache that publishes none.
pub const DEFAULT_CACHE_PORT: u16 = 6379;
/// Container port assumed for an upstream that publishes none.
pub const DEFAULT_UPSTREAM_PORT: u16 = 80;

const DB_NAME: &str = "${MYSQL_DATABASE:-webapp}";
const DB_USER: &str = "${MYSQL_USER:-webapp}";
const DB_PASSWORD: &str = "${MYSQL_PASSWORD:-webapp123}";

/// Merges injected variables under explicit ones.
///
/// Explicit keys are never overwritten. Among injected pairs the first
/// occurrence of a key wins, so callers control precedence by order.
#[must_use]
pub fn merge_environment(
    explicit: &BTreeMap<String, String>,
    injected: &[(String, String)],
) -> BTreeMap<String, String> {
    let mut merged = explicit.clone();
    for (key, value) in injected {
        let _ = merged.entry(key.clone()).or_insert_with(|| value.clone());
    }
    merged
}

/// Injects discovery variables into every service that consumes them.
///
/// Groups are applied in a fixed order: database, cache, then proxy
/// upstreams.
pub fn inject(
    services: &mut BTreeMap<String, ServiceSpec>,
    resolved: &ResolvedSet,
    config: &GeneratorConfig,
    warnings: &mut Vec<Warning>,
) {
    let database = first_of_role(resolved, Role::Database, warnings);
    let cache = first_of_role(resolved, Role::Cache, warnings);

    for module in resolved.modules() {
        let Some(service) = services.get_mut(&module.name) else {
            continue;
        };
        let injected = discovery_env(module, database, cache, resolved, config, warnings);
        if injected.is_empty() {
            continue;
        }
        tracing::debug!(
            module = %module.name,
            keys = ?injected.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>(),
            "injecting discovery variables"
        );
        service.environment = merge_environment(&service.environment, &injected);
    }
}

/// Returns the discovery variables `module` should receive, in precedence
/// order.
///
/// Upstreams whose names map to the same variable (`my-app`, `my_app`)
/// keep the first and record a warning for the rest.
pub fn discovery_env(
    module: &Module,
    database: Option<&Module>,
    cache: Option<&Module>,
    resolved: &ResolvedSet,
    config: &GeneratorConfig,
    warnings: &mut Vec<Warning>,
) -> Vec<(String, String)> {
    let mut injected = Vec::new();

    if module.role == Role::Application {
        if let Some(db) = database {
            let port = db.primary_port().unwrap_or(DEFAULT_DB_PORT);
            injected.extend([
                ("DB_HOST".to_string(), db.container_name_or(&config.container_prefix)),
                ("DB_PORT".to_string(), port.to_string()),
                ("DB_NAME".to_string(), DB_NAME.to_string()),
                ("DB_USER".to_string(), DB_USER.to_string()),
                ("DB_PASSWORD".to_string(), DB_PASSWORD.to_string()),
            ]);
        }
        if let Some(cache) = cache {
            let port = cache.primary_port().unwrap_or(DEFAULT_CACHE_PORT);
            injected.extend([
                ("REDIS_HOST".to_string(), cache.container_name_or(&config.container_prefix)),
                ("REDIS_PORT".to_string(), port.to_string()),
            ]);
        }
    }

    if module.role == Role::Proxy {
        let mut claimed: BTreeMap<String, &str> = BTreeMap::new();
        for upstream in resolved
            .modules()
            .iter()
            .filter(|m| matches!(m.role, Role::Application | Role::Webserver))
        {
            let key = format!("{}_UPSTREAM", env_key(&upstream.name));
            if let Some(first) = claimed.get(&key) {
                tracing::warn!(module = %module.name, key = %key, kept = %first, dropped = %upstream.name, "upstream variable collision");
                warnings.push(Warning::new(
                    &module.name,
                    format!("upstreams {first} and {} both map to {key}; only {first} is injected", upstream.name),
                ));
                continue;
            }
            let port = upstream.primary_port().unwrap_or(DEFAULT_UPSTREAM_PORT);
            let _ = claimed.insert(key.clone(), &upstream.name);
            injected.push((
                key,
                format!("{}:{port}", upstream.container_name_or(&config.container_prefix)),
            ));
        }
    }

    injected
}

fn first_of_role<'a>(
    resolved: &'a ResolvedSet,
    role: Role,
    warnings: &mut Vec<Warning>,
) -> Option<&'a Module> {
    let mut candidates = resolved.with_role(role);
    let first = candidates.next()?;
    let ignored: Vec<&str> = candidates.map(|m| m.name.as_str()).collect();
    if !ignored.is_empty() {
        let warning = Warning::new(
            &first.name,
            format!(
                "several {role} modules resolved; discovery targets {} and ignores {}",
                first.name,
                ignored.join(", ")
            ),
        );
        tracing::warn!(module = %first.name, ignored = ?ignored, "ambiguous {role} discovery target");
        warnings.push(warning);
    }
    Some(first)
}

fn env_key(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}
