//! Module specs: the declarative description of one deployable service.
//!
//! A module lives in `modules/<name>/module.yml`. Parsing happens in two
//! phases: `serde_yaml` deserializes a permissive raw document, then the
//! validator checks it and produces a typed [`Module`].

pub mod loader;
pub mod quantity;
pub mod validator;

use std::collections::BTreeMap;

use ahab_common::error::{AhabError, Result};
use ahab_common::types::{Capability, Role};
use serde::Deserialize;

pub use self::loader::{FsModuleLoader, InMemorySource, ModuleSource};
pub use self::quantity::PortSpec;

/// A validated module spec.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    /// Unique module name.
    pub name: String,
    /// Informational version.
    pub version: String,
    /// Informational description.
    pub description: String,
    /// Supported OS families (informational).
    pub platforms: Vec<String>,
    /// Category tag driving defaults.
    pub role: Role,
    /// Container image; absent only for meta-modules.
    pub image: Option<String>,
    /// Explicit container name, if declared.
    pub container_name: Option<String>,
    /// Port mappings in declaration order.
    pub ports: Vec<PortSpec>,
    /// Volume mounts in declaration order.
    pub volumes: Vec<VolumeMount>,
    /// Explicit environment.
    pub environment: BTreeMap<String, String>,
    /// Declared resource quotas; absent leaves fall back to role defaults.
    pub resources: ResourceSpec,
    /// Modules required before this one is usable, deduplicated.
    pub dependencies: Vec<String>,
    /// Restart policy passed through to the service.
    pub restart: Option<String>,
    /// Explicit capability grants replacing the role table.
    pub cap_add: Option<Vec<Capability>>,
    /// User the container runs as.
    pub user: Option<String>,
    /// Whether the module opts out of the non-root default.
    pub run_as_root: bool,
}

impl Module {
    /// Parses and validates a module spec document.
    ///
    /// `expected_name` is the name the module was requested under; the
    /// document's `name` field must match it.
    ///
    /// # Errors
    ///
    /// Returns [`AhabError::ModuleValidation`] listing every problem found.
    pub fn from_yaml(expected_name: &str, content: &str) -> Result<Self> {
        let raw: RawModule =
            serde_yaml::from_str(content).map_err(|e| AhabError::ModuleValidation {
                module: expected_name.to_string(),
                problems: vec![format!("malformed spec: {e}")],
            })?;
        validator::validate(expected_name, raw)
    }

    /// Returns the container name, falling back to `<prefix><name>`.
    #[must_use]
    pub fn container_name_or(&self, prefix: &str) -> String {
        self.container_name
            .clone()
            .unwrap_or_else(|| format!("{prefix}{}", self.name))
    }

    /// Returns the container port of the first declared mapping.
    #[must_use]
    pub fn primary_port(&self) -> Option<u16> {
        self.ports.first().map(|p| p.container)
    }

    /// Returns the named volumes this module mounts.
    pub fn named_volumes(&self) -> impl Iterator<Item = &VolumeMount> {
        self.volumes.iter().filter(|v| v.is_named())
    }
}

/// A volume mount declared by a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMount {
    /// Named volume or host path.
    pub source: String,
    /// Mount point inside the container.
    pub target: String,
    /// Whether the mount is read-only.
    pub read_only: bool,
}

impl VolumeMount {
    /// Returns whether the source names a volume rather than a host path.
    #[must_use]
    pub fn is_named(&self) -> bool {
        !self.source.starts_with(['.', '/', '~'])
    }

    /// Renders the mount in compose short syntax.
    #[must_use]
    pub fn to_short_syntax(&self) -> String {
        if self.read_only {
            format!("{}:{}:ro", self.source, self.target)
        } else {
            format!("{}:{}", self.source, self.target)
        }
    }
}

/// Resource quotas declared by a module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceSpec {
    /// Upper bounds.
    pub limits: QuotaSpec,
    /// Guaranteed reservations.
    pub reservations: QuotaSpec,
}

/// One CPU/memory pair; each leaf is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuotaSpec {
    /// CPU quantity, e.g. `0.5`.
    pub cpus: Option<String>,
    /// Memory quantity, e.g. `512M`.
    pub memory: Option<String>,
}

/// Permissive document shape; every field is checked by the validator.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawModule {
    pub(crate) name: Option<String>,
    pub(crate) version: Option<serde_yaml::Value>,
    pub(crate) description: Option<String>,
    pub(crate) platforms: Vec<String>,
    pub(crate) role: Role,
    pub(crate) image: Option<String>,
    pub(crate) container_name: Option<String>,
    pub(crate) ports: Vec<serde_yaml::Value>,
    pub(crate) volumes: Vec<RawVolume>,
    pub(crate) environment: BTreeMap<String, serde_yaml::Value>,
    pub(crate) resources: Option<RawResources>,
    pub(crate) dependencies: Vec<String>,
    pub(crate) restart: Option<String>,
    pub(crate) cap_add: Option<Vec<Capability>>,
    pub(crate) user: Option<serde_yaml::Value>,
    pub(crate) run_as_root: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawVolume {
    Short(String),
    Long {
        source: String,
        target: String,
        #[serde(default)]
        read_only: bool,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct RawResources {
    pub(crate) limits: Option<RawQuota>,
    pub(crate) reservations: Option<RawQuota>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct RawQuota {
    pub(crate) cpus: Option<serde_yaml::Value>,
    pub(crate) memory: Option<serde_yaml::Value>,
}

/// Renders a YAML scalar as the string compose expects; `None` for
/// sequences and mappings.
pub(crate) fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Null => Some(String::new()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Sequence(_)
        | serde_yaml::Value::Mapping(_)
        | serde_yaml::Value::Tagged(_) => None,
    }
}
