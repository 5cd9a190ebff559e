//! # ahab-compose
//!
//! Module-based docker-compose manifest generator.
//!
//! Handles:
//! - **Module**: loading and validating `modules/<name>/module.yml` specs.
//! - **Registry / Resolver**: per-run module cache and dependency closure with cycle detection.
//! - **Composer**: one compose service per resolved module.
//! - **Discovery**: database, cache, and proxy wiring through environment variables.
//! - **Hardening**: capability dropping, `no-new-privileges`, and role-keyed resource limits.
//! - **Allocator**: the shared network and deduplicated named volumes.
//! - **Emitter**: deterministic YAML output with atomic, self-validated writes.
//! - **Graph**: start order of the generated services.

pub mod allocator;
pub mod composer;
pub mod discovery;
pub mod emitter;
pub mod graph;
pub mod hardening;
pub mod manifest;
pub mod module;
pub mod pipeline;
pub mod registry;
pub mod resolver;

pub use crate::pipeline::{Generation, Warning, generate};
