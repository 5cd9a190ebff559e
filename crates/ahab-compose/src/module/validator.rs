//! Static validation of a raw module document.
//!
//! Every check runs, so a single error names all problems in the spec at
//! once instead of forcing a fix-and-rerun loop.

use std::collections::{BTreeMap, HashSet};

use ahab_common::constants::DEFAULT_MODULE_VERSION;
use ahab_common::error::{AhabError, Result};
use ahab_common::types::Role;

use super::quantity::{parse_cpus, parse_memory, parse_port};
use super::{Module, QuotaSpec, RawModule, RawQuota, RawVolume, ResourceSpec, VolumeMount, scalar_to_string};

const RESTART_POLICIES: [&str; 4] = ["no", "always", "on-failure", "unless-stopped"];

/// Validates a raw module document and produces a typed [`Module`].
///
/// # Checks performed
///
/// 1. `name` is present and matches the name the module was loaded under.
/// 2. `image` is present unless the module is a meta-module, which must not declare one.
/// 3. Ports, volumes, environment values, and resource quantities are well formed.
/// 4. Dependencies are non-empty names; duplicates collapse to the first occurrence.
/// 5. A root `user` requires `run_as_root: true`.
///
/// # Errors
///
/// Returns [`AhabError::ModuleValidation`] listing every failed check.
pub(crate) fn validate(expected_name: &str, raw: RawModule) -> Result<Module> {
    tracing::debug!(module = expected_name, "validating module spec");
    let mut problems = Vec::new();

    let name = check_name(expected_name, raw.name, &mut problems);
    let image = check_image(raw.role, raw.image, &mut problems);
    let version = raw.version.as_ref().map_or_else(
        || DEFAULT_MODULE_VERSION.to_string(),
        |v| {
            scalar_to_string(v).unwrap_or_else(|| {
                problems.push("version must be a scalar".into());
                String::new()
            })
        },
    );

    let ports = raw
        .ports
        .iter()
        .filter_map(|value| match scalar_to_string(value) {
            Some(text) => parse_port(&text).map_err(|e| problems.push(e)).ok(),
            None => {
                problems.push("port entries must be scalars".into());
                None
            }
        })
        .collect();

    let volumes = raw
        .volumes
        .into_iter()
        .filter_map(|v| check_volume(v).map_err(|e| problems.push(e)).ok())
        .collect();

    let environment = check_environment(raw.environment, &mut problems);
    let resources = raw.resources.map_or_else(ResourceSpec::default, |r| ResourceSpec {
        limits: check_quota("limits", r.limits, &mut problems),
        reservations: check_quota("reservations", r.reservations, &mut problems),
    });
    let dependencies = check_dependencies(raw.dependencies, &mut problems);

    if let Some(restart) = raw.restart.as_deref() {
        check_restart(restart, &mut problems);
    }

    let user = raw.user.as_ref().and_then(|v| {
        scalar_to_string(v).or_else(|| {
            problems.push("user must be a scalar".into());
            None
        })
    });
    if let Some(user) = user.as_deref() {
        if is_root_user(user) && !raw.run_as_root {
            problems.push(format!("user \"{user}\" requires run_as_root: true"));
        }
    }

    if !problems.is_empty() {
        return Err(AhabError::ModuleValidation {
            module: expected_name.to_string(),
            problems,
        });
    }

    Ok(Module {
        name,
        version,
        description: raw.description.unwrap_or_default(),
        platforms: raw.platforms,
        role: raw.role,
        image,
        container_name: raw.container_name.filter(|c| !c.trim().is_empty()),
        ports,
        volumes,
        environment,
        resources,
        dependencies,
        restart: raw.restart,
        cap_add: raw.cap_add,
        user,
        run_as_root: raw.run_as_root,
    })
}

fn check_name(expected: &str, declared: Option<String>, problems: &mut Vec<String>) -> String {
    match declared {
        Some(name) if name.trim().is_empty() => {
            problems.push("name must not be empty".into());
            expected.to_string()
        }
        Some(name) if name != expected => {
            problems.push(format!(
                "name \"{name}\" does not match module directory \"{expected}\""
            ));
            name
        }
        Some(name) => name,
        None => {
            problems.push("missing required field: name".into());
            expected.to_string()
        }
    }
}

fn check_image(role: Role, image: Option<String>, problems: &mut Vec<String>) -> Option<String> {
    let image = image.filter(|i| !i.trim().is_empty());
    match (role, &image) {
        (Role::Meta, Some(_)) => {
            problems.push("meta-modules produce no service and must not declare image".into());
        }
        (Role::Meta, None) | (_, Some(_)) => {}
        (_, None) => problems.push("missing required field: image".into()),
    }
    image
}

fn check_volume(raw: RawVolume) -> std::result::Result<VolumeMount, String> {
    let mount = match raw {
        RawVolume::Short(spec) => {
            let parts: Vec<&str> = spec.split(':').collect();
            let (source, target, read_only) = match parts.as_slice() {
                [source, target] => (*source, *target, false),
                [source, target, "ro"] => (*source, *target, true),
                [source, target, "rw"] => (*source, *target, false),
                _ => return Err(format!("malformed volume spec \"{spec}\"")),
            };
            VolumeMount {
                source: source.to_string(),
                target: target.to_string(),
                read_only,
            }
        }
        RawVolume::Long {
            source,
            target,
            read_only,
        } => VolumeMount {
            source,
            target,
            read_only,
        },
    };

    if mount.source.is_empty() {
        return Err(format!("volume for \"{}\" has an empty source", mount.target));
    }
    if !mount.target.starts_with('/') {
        return Err(format!(
            "volume target \"{}\" must be an absolute container path",
            mount.target
        ));
    }
    if mount.is_named() && !is_volume_name(&mount.source) {
        return Err(format!("invalid volume name \"{}\"", mount.source));
    }
    Ok(mount)
}

fn is_volume_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphanumeric())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

fn check_environment(
    raw: BTreeMap<String, serde_yaml::Value>,
    problems: &mut Vec<String>,
) -> BTreeMap<String, String> {
    let mut environment = BTreeMap::new();
    for (key, value) in raw {
        if key.is_empty() || key.contains('=') {
            problems.push(format!("invalid environment key \"{key}\""));
            continue;
        }
        match scalar_to_string(&value) {
            Some(text) => {
                let _ = environment.insert(key, text);
            }
            None => problems.push(format!("environment value for {key} must be a scalar")),
        }
    }
    environment
}

fn check_quota(section: &str, raw: Option<RawQuota>, problems: &mut Vec<String>) -> QuotaSpec {
    let Some(raw) = raw else {
        return QuotaSpec::default();
    };

    let cpus = raw.cpus.as_ref().and_then(|v| {
        let text = scalar_to_string(v).unwrap_or_default();
        parse_cpus(&text)
            .map(|_| text)
            .map_err(|e| problems.push(format!("resources.{section}: {e}")))
            .ok()
    });
    let memory = raw.memory.as_ref().and_then(|v| {
        let text = scalar_to_string(v).unwrap_or_default();
        parse_memory(&text)
            .map(|_| text)
            .map_err(|e| problems.push(format!("resources.{section}: {e}")))
            .ok()
    });

    QuotaSpec { cpus, memory }
}

fn check_dependencies(raw: Vec<String>, problems: &mut Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut dependencies = Vec::with_capacity(raw.len());
    for dep in raw {
        let dep = dep.trim().to_string();
        if dep.is_empty() {
            problems.push("dependency names must not be empty".into());
        } else if seen.insert(dep.clone()) {
            dependencies.push(dep);
        }
    }
    dependencies
}

fn check_restart(policy: &str, problems: &mut Vec<String>) {
    let valid = RESTART_POLICIES.contains(&policy)
        || policy
            .strip_prefix("on-failure:")
            .is_some_and(|n| n.parse::<u32>().is_ok());
    if !valid {
        problems.push(format!("unknown restart policy \"{policy}\""));
    }
}

fn is_root_user(user: &str) -> bool {
    let uid = user.split(':').next().unwrap_or(user);
    uid == "root" || uid == "0"
}
