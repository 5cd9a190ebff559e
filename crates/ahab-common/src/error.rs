//! Unified error types for the Ahab workspace.
//!
//! Every failure of a generation run is fatal to that run. The variants
//! mirror the remediation a user has to take: fix the named module spec,
//! break the named cycle, or fix the output location.

use std::path::PathBuf;

use thiserror::Error;

/// Exit code for unknown modules and other module-spec errors.
pub const EXIT_MODULE: u8 = 1;
/// Exit code for a dependency cycle.
pub const EXIT_CYCLE: u8 = 2;
/// Exit code for a manifest write or post-write validation failure.
pub const EXIT_WRITE: u8 = 3;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum AhabError {
    /// A requested or dependency-referenced module has no spec file.
    #[error("module not found: {name} (expected {path}){}", required_by_suffix(.required_by.as_deref()))]
    ModuleNotFound {
        /// Name of the missing module.
        name: String,
        /// Path where the spec file was expected.
        path: PathBuf,
        /// Module whose `dependencies` referenced the missing one.
        required_by: Option<String>,
    },

    /// A module spec exists but has missing or malformed fields.
    #[error("invalid module {module}: {}", .problems.join("; "))]
    ModuleValidation {
        /// Name of the offending module.
        module: String,
        /// Every problem found in the spec.
        problems: Vec<String>,
    },

    /// The dependency graph contains a cycle.
    #[error("cyclic dependency detected: {}{}", .chain.join(" → "), reached_from_suffix(.path))]
    CyclicDependency {
        /// The cycle itself, starting and ending at the repeated module.
        chain: Vec<String>,
        /// Modules walked from the requested seed to the cycle entry.
        path: Vec<String>,
    },

    /// The same named volume is mounted with different mount semantics.
    #[error("volume {volume} mounted with conflicting read-only flags by {first} and {second}")]
    VolumeNameConflict {
        /// Name of the contested volume.
        volume: String,
        /// First mount, as `module:target (mode)`.
        first: String,
        /// Conflicting mount, as `module:target (mode)`.
        second: String,
    },

    /// Writing or re-validating the emitted manifest failed.
    #[error("failed to write manifest {path}: {reason}")]
    ManifestWrite {
        /// Output path of the manifest.
        path: PathBuf,
        /// Stage that failed.
        reason: String,
        /// Underlying cause.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An I/O operation failed outside of manifest writing.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },
}

impl AhabError {
    /// Returns the process exit code associated with this error.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::CyclicDependency { .. } => EXIT_CYCLE,
            Self::ManifestWrite { .. } => EXIT_WRITE,
            Self::ModuleNotFound { .. }
            | Self::ModuleValidation { .. }
            | Self::VolumeNameConflict { .. }
            | Self::Io { .. }
            | Self::Config { .. } => EXIT_MODULE,
        }
    }

    /// Builds a [`AhabError::ManifestWrite`] from any error cause.
    pub fn manifest_write(
        path: impl Into<PathBuf>,
        reason: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::ManifestWrite {
            path: path.into(),
            reason: reason.into(),
            source: source.into(),
        }
    }
}

fn required_by_suffix(required_by: Option<&str>) -> String {
    required_by.map_or_else(String::new, |parent| format!(", required by {parent}"))
}

fn reached_from_suffix(path: &[String]) -> String {
    if path.is_empty() {
        return String::new();
    }
    format!(" (reached from {})", path.join(" → "))
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, AhabError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_requiring_module() {
        let err = AhabError::ModuleNotFound {
            name: "z".into(),
            path: PathBuf::from("modules/z/module.yml"),
            required_by: Some("a".into()),
        };
        let msg = err.to_string();
        assert!(msg.contains("module not found: z"), "got: {msg}");
        assert!(msg.contains("required by a"), "got: {msg}");
        assert_eq!(err.exit_code(), EXIT_MODULE);
    }

    #[test]
    fn cycle_message_contains_full_chain() {
        let err = AhabError::CyclicDependency {
            chain: vec!["a".into(), "b".into(), "a".into()],
            path: vec!["web".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("a → b → a"), "got: {msg}");
        assert!(msg.contains("reached from web"), "got: {msg}");
        assert_eq!(err.exit_code(), EXIT_CYCLE);
    }

    #[test]
    fn validation_lists_every_problem() {
        let err = AhabError::ModuleValidation {
            module: "php".into(),
            problems: vec!["missing image".into(), "bad port".into()],
        };
        assert_eq!(
            err.to_string(),
            "invalid module php: missing image; bad port"
        );
    }

    #[test]
    fn manifest_write_maps_to_exit_three() {
        let io = std::io::Error::other("disk full");
        let err = AhabError::manifest_write("out.yml", "writing temp file", io);
        assert_eq!(err.exit_code(), EXIT_WRITE);
        assert!(std::error::Error::source(&err).is_some());
    }
}
