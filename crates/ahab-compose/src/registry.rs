//! Per-run module registry.
//!
//! Caches every module loaded during one generation run. The registry is
//! an explicit value owned by the caller; nothing is shared between runs.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use ahab_common::error::{AhabError, Result};

use crate::module::{Module, ModuleSource};

/// Lazily populated mapping from module name to loaded [`Module`].
pub struct Registry<'a> {
    source: &'a dyn ModuleSource,
    modules: BTreeMap<String, Module>,
}

impl<'a> Registry<'a> {
    /// Creates an empty registry loading through `source`.
    #[must_use]
    pub fn new(source: &'a dyn ModuleSource) -> Self {
        Self {
            source,
            modules: BTreeMap::new(),
        }
    }

    /// Returns the module called `name`, loading it on first access.
    ///
    /// `required_by` names the module whose dependency list referenced
    /// `name`; it is attached to a not-found error.
    ///
    /// # Errors
    ///
    /// Returns the loader's error if the module is missing or invalid.
    pub fn get_or_load(&mut self, name: &str, required_by: Option<&str>) -> Result<&Module> {
        match self.modules.entry(name.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let module = self.source.load(name).map_err(|e| match e {
                    AhabError::ModuleNotFound { name, path, .. } => AhabError::ModuleNotFound {
                        name,
                        path,
                        required_by: required_by.map(str::to_string),
                    },
                    other => other,
                })?;
                tracing::debug!(module = name, role = %module.role, "registered module");
                Ok(entry.insert(module))
            }
        }
    }

    /// Returns an already loaded module.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }

    /// Returns the number of loaded modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Returns whether no module has been loaded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl std::fmt::Debug for Registry<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("modules", &self.modules.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
