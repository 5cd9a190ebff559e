//! Dependency closure computation with cycle detection.
//!
//! The closure is gathered breadth-first so the resolved order follows
//! request order, then dependency-discovery order. A depth-first pass over
//! the gathered modules then reports the first cycle with its full chain.

use std::collections::{HashMap, HashSet, VecDeque};

use ahab_common::error::{AhabError, Result};
use ahab_common::types::Role;

use crate::module::Module;
use crate::registry::Registry;

/// The ordered, deduplicated, acyclic closure of a request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedSet {
    modules: Vec<Module>,
}

impl ResolvedSet {
    /// Returns the modules in first-discovery order.
    #[must_use]
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// Returns the module names in first-discovery order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(|m| m.name.as_str())
    }

    /// Returns the module called `name`, if it is part of the closure.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.name == name)
    }

    /// Returns whether `name` is part of the closure.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns the modules of one role, in resolved order.
    pub fn with_role(&self, role: Role) -> impl Iterator<Item = &Module> {
        self.modules.iter().filter(move |m| m.role == role)
    }

    /// Returns the number of modules in the closure.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Returns whether the closure is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// Resolves the transitive closure of `requested`.
///
/// # Errors
///
/// Returns [`AhabError::ModuleNotFound`] naming the missing module (and the
/// module that required it), any validation error from the loader, or
/// [`AhabError::CyclicDependency`] with the full cycle chain.
pub fn resolve(requested: &[String], registry: &mut Registry<'_>) -> Result<ResolvedSet> {
    tracing::info!(requested = ?requested, "resolving module dependencies");

    let mut queue: VecDeque<(String, Option<String>)> =
        requested.iter().map(|name| (name.clone(), None)).collect();
    let mut resolved: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    while let Some((name, required_by)) = queue.pop_front() {
        if seen.contains(&name) {
            continue;
        }
        let module = registry.get_or_load(&name, required_by.as_deref())?;
        for dep in &module.dependencies {
            if !seen.contains(dep) {
                queue.push_back((dep.clone(), Some(name.clone())));
            }
        }
        let _ = seen.insert(name.clone());
        resolved.push(name);
    }

    detect_cycle(&resolved, registry)?;

    let modules: Vec<Module> = resolved
        .iter()
        .filter_map(|name| registry.get(name).cloned())
        .collect();
    tracing::info!(
        resolved = ?modules.iter().map(|m| m.name.as_str()).collect::<Vec<_>>(),
        "dependency closure resolved"
    );
    Ok(ResolvedSet { modules })
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Active,
    Done,
}

/// Walks the loaded closure depth-first, in resolved order, following
/// dependencies in declaration order.
fn detect_cycle(order: &[String], registry: &Registry<'_>) -> Result<()> {
    let mut marks: HashMap<&str, Mark> = HashMap::new();
    let mut stack: Vec<&str> = Vec::new();
    for root in order {
        if !marks.contains_key(root.as_str()) {
            visit(root, registry, &mut marks, &mut stack)?;
        }
    }
    Ok(())
}

fn visit<'r>(
    name: &'r str,
    registry: &'r Registry<'_>,
    marks: &mut HashMap<&'r str, Mark>,
    stack: &mut Vec<&'r str>,
) -> Result<()> {
    let _ = marks.insert(name, Mark::Active);
    stack.push(name);

    if let Some(module) = registry.get(name) {
        for dep in &module.dependencies {
            match marks.get(dep.as_str()) {
                Some(Mark::Done) => {}
                Some(Mark::Active) => return Err(cycle_error(stack, dep)),
                None => visit(dep, registry, marks, stack)?,
            }
        }
    }

    let _ = stack.pop();
    let _ = marks.insert(name, Mark::Done);
    Ok(())
}

fn cycle_error(stack: &[&str], repeated: &str) -> AhabError {
    let start = stack.iter().position(|n| *n == repeated).unwrap_or(0);
    let mut chain: Vec<String> = stack[start..].iter().map(|n| (*n).to_string()).collect();
    chain.push(repeated.to_string());
    let path = stack[..start].iter().map(|n| (*n).to_string()).collect();
    tracing::error!(chain = %chain.join(" → "), "dependency cycle");
    AhabError::CyclicDependency { chain, path }
}
