//! # ahab-common
//!
//! Shared error definitions, configuration model, domain primitive types,
//! and constants used across the Ahab workspace.
//!
//! This crate is the leaf of the dependency graph. It depends on no other
//! internal crate and provides the primitives the generator and the CLI
//! build upon.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
