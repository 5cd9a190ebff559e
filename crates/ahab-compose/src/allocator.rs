//! Shared network and named volume allocation.

use std::collections::BTreeMap;

use ahab_common::config::GeneratorConfig;
use ahab_common::constants::LABEL_PREFIX;
use ahab_common::error::{AhabError, Result};

use crate::manifest::{NetworkSpec, ServiceSpec, VolumeSpec};
use crate::module::VolumeMount;
use crate::resolver::ResolvedSet;

/// Top-level resources allocated for a manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Allocation {
    /// The single shared network.
    pub networks: BTreeMap<String, NetworkSpec>,
    /// Deduplicated named volumes.
    pub volumes: BTreeMap<String, VolumeSpec>,
}

/// Attaches every service to the shared network and declares one volume
/// per distinct named volume.
///
/// # Errors
///
/// Returns [`AhabError::VolumeNameConflict`] if the same volume name is
/// mounted both read-only and read-write.
pub fn allocate(
    services: &mut BTreeMap<String, ServiceSpec>,
    resolved: &ResolvedSet,
    config: &GeneratorConfig,
) -> Result<Allocation> {
    for service in services.values_mut() {
        service.networks = vec![config.network.clone()];
    }

    let mut networks = BTreeMap::new();
    let _ = networks.insert(
        config.network.clone(),
        NetworkSpec {
            driver: "bridge".to_string(),
            name: config.network.clone(),
            labels: labels("network"),
        },
    );

    let mut declared: BTreeMap<&str, (&str, &VolumeMount)> = BTreeMap::new();
    for module in resolved.modules().iter().filter(|m| m.role.produces_service()) {
        for mount in module.named_volumes() {
            match declared.get(mount.source.as_str()) {
                Some(&(owner, first)) if first.read_only != mount.read_only => {
                    return Err(AhabError::VolumeNameConflict {
                        volume: mount.source.clone(),
                        first: describe_mount(owner, first),
                        second: describe_mount(&module.name, mount),
                    });
                }
                Some(_) => {}
                None => {
                    let _ = declared.insert(mount.source.as_str(), (module.name.as_str(), mount));
                }
            }
        }
    }

    let volumes = declared
        .keys()
        .map(|name| {
            (
                (*name).to_string(),
                VolumeSpec {
                    driver: "local".to_string(),
                    labels: labels("volume"),
                },
            )
        })
        .collect();

    tracing::debug!(network = %config.network, volumes = declared.len(), "allocated networks and volumes");
    Ok(Allocation { networks, volumes })
}

/// `module:/target (ro)`, enough to tell two mounts of one module apart.
fn describe_mount(module: &str, mount: &VolumeMount) -> String {
    let mode = if mount.read_only { "ro" } else { "rw" };
    format!("{module}:{} ({mode})", mount.target)
}

fn labels(kind: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (format!("{LABEL_PREFIX}.{kind}"), "true".to_string()),
        (format!("{LABEL_PREFIX}.created"), "auto-generated".to_string()),
    ])
}
