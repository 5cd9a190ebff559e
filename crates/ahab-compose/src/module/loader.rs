//! Module sources: where module specs come from.
//!
//! The generator only sees the [`ModuleSource`] trait, so tests and
//! embedders can feed specs from memory while the CLI reads them from the
//! `modules/` directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ahab_common::constants::MODULE_SPEC_FILE;
use ahab_common::error::{AhabError, Result};

use super::Module;

/// Capability to load module specs by name.
pub trait ModuleSource {
    /// Loads and validates the module called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`AhabError::ModuleNotFound`] if no spec exists and
    /// [`AhabError::ModuleValidation`] if the spec is malformed.
    fn load(&self, name: &str) -> Result<Module>;

    /// Lists every module name this source can load, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be enumerated.
    fn available(&self) -> Result<Vec<String>>;
}

/// Loads specs from `<root>/<name>/module.yml`.
#[derive(Debug, Clone)]
pub struct FsModuleLoader {
    root: PathBuf,
}

impl FsModuleLoader {
    /// Creates a loader rooted at the given modules directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the modules directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the expected spec path of a module.
    #[must_use]
    pub fn spec_path(&self, name: &str) -> PathBuf {
        self.root.join(name).join(MODULE_SPEC_FILE)
    }
}

impl ModuleSource for FsModuleLoader {
    fn load(&self, name: &str) -> Result<Module> {
        check_module_name(name)?;
        let path = self.spec_path(name);
        tracing::debug!(module = name, path = %path.display(), "loading module spec");

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AhabError::ModuleNotFound {
                    name: name.to_string(),
                    path,
                    required_by: None,
                });
            }
            Err(e) => return Err(AhabError::Io { path, source: e }),
        };

        Module::from_yaml(name, &content)
    }

    fn available(&self) -> Result<Vec<String>> {
        let entries = std::fs::read_dir(&self.root).map_err(|e| AhabError::Io {
            path: self.root.clone(),
            source: e,
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| AhabError::Io {
                path: self.root.clone(),
                source: e,
            })?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || !entry.path().join(MODULE_SPEC_FILE).is_file() {
                continue;
            }
            names.push(name);
        }
        names.sort();
        tracing::debug!(root = %self.root.display(), count = names.len(), "enumerated modules");
        Ok(names)
    }
}

/// Module source backed by in-memory YAML documents.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    specs: BTreeMap<String, String>,
}

impl InMemorySource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a module spec document under `name`.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, yaml: impl Into<String>) -> Self {
        let _ = self.specs.insert(name.into(), yaml.into());
        self
    }
}

impl ModuleSource for InMemorySource {
    fn load(&self, name: &str) -> Result<Module> {
        check_module_name(name)?;
        let yaml = self.specs.get(name).ok_or_else(|| AhabError::ModuleNotFound {
            name: name.to_string(),
            path: PathBuf::from(name).join(MODULE_SPEC_FILE),
            required_by: None,
        })?;
        Module::from_yaml(name, yaml)
    }

    fn available(&self) -> Result<Vec<String>> {
        Ok(self.specs.keys().cloned().collect())
    }
}

/// Rejects names that would escape the modules directory.
fn check_module_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\'])
        && name.chars().all(|c| !c.is_control() && !c.is_whitespace());
    if valid {
        Ok(())
    } else {
        Err(AhabError::ModuleValidation {
            module: name.to_string(),
            problems: vec!["module names must be non-empty and contain no path separators".into()],
        })
    }
}
