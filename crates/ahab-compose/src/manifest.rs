//! The generated docker-compose document.
//!
//! Maps are `BTreeMap`s and struct fields serialize in declaration order,
//! so the same manifest always renders to the same bytes.

use std::collections::BTreeMap;

use ahab_common::types::Capability;
use serde::{Deserialize, Serialize};

/// Root of the generated manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Compose file format version.
    pub version: String,
    /// Services keyed by module name.
    pub services: BTreeMap<String, ServiceSpec>,
    /// The shared network.
    pub networks: BTreeMap<String, NetworkSpec>,
    /// Named volumes contributed by modules.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub volumes: BTreeMap<String, VolumeSpec>,
}

/// One compose service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
    /// Container image.
    pub image: String,
    /// Container name, also its DNS hostname on the shared network.
    pub container_name: String,
    /// Restart policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart: Option<String>,
    /// User the container runs as.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Port mappings.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    /// Volume mounts in short syntax.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
    /// Explicit and injected environment.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    /// Services that must start first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    /// Networks the service joins.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<String>,
    /// Security options.
    #[serde(default)]
    pub security_opt: Vec<String>,
    /// Dropped capabilities.
    #[serde(default)]
    pub cap_drop: Vec<String>,
    /// Capabilities granted back.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cap_add: Vec<Capability>,
    /// Resource limits and reservations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy: Option<Deploy>,
    /// Provenance labels.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

/// The `deploy` block of a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deploy {
    /// Resource quotas.
    pub resources: Resources,
}

/// Limits and reservations of a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    /// Upper bounds.
    pub limits: Quota,
    /// Guaranteed share.
    pub reservations: Quota,
}

/// One CPU/memory pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quota {
    /// CPU quantity.
    pub cpus: String,
    /// Memory quantity.
    pub memory: String,
}

/// A top-level network declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSpec {
    /// Network driver.
    pub driver: String,
    /// Fixed network name, independent of the compose project.
    pub name: String,
    /// Provenance labels.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// A top-level named volume declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeSpec {
    /// Volume driver.
    pub driver: String,
    /// Provenance labels.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}
