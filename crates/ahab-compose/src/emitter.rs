//! Deterministic manifest serialization and atomic writing.
//!
//! The manifest is written to a temporary file next to its destination,
//! read back, re-parsed, and only then renamed into place. A failure at
//! any stage leaves the previous file (if any) untouched.

use std::io::Write as _;
use std::path::Path;

use ahab_common::error::{AhabError, Result};

use crate::manifest::Manifest;

/// Renders the manifest as YAML.
///
/// # Errors
///
/// Returns [`AhabError::ManifestWrite`] if serialization fails.
pub fn render(manifest: &Manifest) -> Result<String> {
    serde_yaml::to_string(manifest)
        .map_err(|e| AhabError::manifest_write("<memory>", "serializing manifest", e))
}

/// Writes the manifest to `path` atomically and verifies it.
///
/// # Errors
///
/// Returns [`AhabError::ManifestWrite`] wrapping the underlying cause if
/// the directory cannot be created, the temporary file cannot be written,
/// the written document does not re-parse to the same manifest, or the
/// final rename fails.
pub fn write_manifest(manifest: &Manifest, path: &Path) -> Result<()> {
    let rendered = serde_yaml::to_string(manifest)
        .map_err(|e| AhabError::manifest_write(path, "serializing manifest", e))?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .map_err(|e| AhabError::manifest_write(path, "creating output directory", e))?;

    let mut builder = tempfile::Builder::new();
    let _ = builder.prefix(".ahab-manifest-").suffix(".tmp");
    #[cfg(unix)]
    let _ = builder.permissions(fresh_file_permissions());
    let mut tmp = builder
        .tempfile_in(dir)
        .map_err(|e| AhabError::manifest_write(path, "creating temporary file", e))?;

    // A regenerated manifest keeps the mode of the one it replaces.
    if let Ok(existing) = std::fs::metadata(path) {
        tmp.as_file()
            .set_permissions(existing.permissions())
            .map_err(|e| AhabError::manifest_write(path, "copying file permissions", e))?;
    }

    tmp.write_all(rendered.as_bytes())
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| AhabError::manifest_write(path, "writing temporary file", e))?;

    let written = std::fs::read_to_string(tmp.path())
        .map_err(|e| AhabError::manifest_write(path, "reading back temporary file", e))?;
    verify(&written, manifest).map_err(|e| AhabError::manifest_write(path, "validating written manifest", e))?;

    let _file = tmp
        .persist(path)
        .map_err(|e| AhabError::manifest_write(path, "renaming into place", e.error))?;

    tracing::info!(
        path = %path.display(),
        services = manifest.services.len(),
        bytes = rendered.len(),
        "manifest written"
    );
    Ok(())
}

/// Mode of a newly created manifest before the umask is applied, matching
/// what a plain `File::create` would produce.
#[cfg(unix)]
fn fresh_file_permissions() -> std::fs::Permissions {
    use std::os::unix::fs::PermissionsExt as _;
    std::fs::Permissions::from_mode(0o666)
}

/// Re-parses an emitted document and checks it matches the manifest.
fn verify(document: &str, expected: &Manifest) -> std::result::Result<(), String> {
    let parsed: Manifest =
        serde_yaml::from_str(document).map_err(|e| format!("emitted YAML does not parse: {e}"))?;
    if &parsed != expected {
        return Err("re-parsed manifest differs from the emitted one".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::manifest::{NetworkSpec, ServiceSpec};

    fn manifest() -> Manifest {
        let mut services = BTreeMap::new();
        let _ = services.insert(
            "redis".to_string(),
            ServiceSpec {
                image: "redis:7".into(),
                container_name: "ahab_redis".into(),
                security_opt: vec!["no-new-privileges:true".into()],
                cap_drop: vec!["ALL".into()],
                ..ServiceSpec::default()
            },
        );
        let mut networks = BTreeMap::new();
        let _ = networks.insert(
            "ahab_network".to_string(),
            NetworkSpec {
                driver: "bridge".into(),
                name: "ahab_network".into(),
                labels: BTreeMap::new(),
            },
        );
        Manifest {
            version: "3.8".into(),
            services,
            networks,
            volumes: BTreeMap::new(),
        }
    }

    #[test]
    fn render_starts_with_version_and_omits_empty_volumes() {
        let yaml = render(&manifest()).expect("render");
        assert!(yaml.starts_with("version:"), "got: {yaml}");
        assert!(!yaml.contains("\nvolumes:"), "got: {yaml}");
    }

    #[test]
    fn write_creates_parent_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("generated").join("docker-compose.yml");
        write_manifest(&manifest(), &path).expect("write");

        let content = std::fs::read_to_string(&path).expect("read");
        assert_eq!(content, render(&manifest()).expect("render"));

        let leftovers: Vec<_> = std::fs::read_dir(path.parent().expect("parent"))
            .expect("list")
            .filter_map(std::result::Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn rewrite_is_byte_identical() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("docker-compose.yml");
        write_manifest(&manifest(), &path).expect("first");
        let first = std::fs::read(&path).expect("read");
        write_manifest(&manifest(), &path).expect("second");
        assert_eq!(first, std::fs::read(&path).expect("read"));
    }

    #[cfg(unix)]
    #[test]
    fn rewrite_keeps_existing_file_mode() {
        use std::os::unix::fs::PermissionsExt as _;

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("docker-compose.yml");
        for mode in [0o644, 0o640] {
            std::fs::write(&path, "old").expect("seed");
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).expect("chmod");
            write_manifest(&manifest(), &path).expect("write");
            let written = std::fs::metadata(&path).expect("stat").permissions().mode() & 0o777;
            assert_eq!(written, mode, "manifest mode {written:o}");
        }
    }

    #[cfg(unix)]
    #[test]
    fn new_manifest_is_not_owner_only() {
        use std::os::unix::fs::PermissionsExt as _;

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("docker-compose.yml");
        let reference = dir.path().join("reference");
        std::fs::write(&reference, "umask").expect("reference");
        write_manifest(&manifest(), &path).expect("write");

        let mode = |p: &Path| std::fs::metadata(p).expect("stat").permissions().mode() & 0o777;
        assert_eq!(mode(&path), mode(&reference));
    }

    #[test]
    fn unwritable_destination_is_manifest_write_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "file").expect("write");
        let err = write_manifest(&manifest(), &blocker.join("docker-compose.yml")).unwrap_err();
        assert!(matches!(err, AhabError::ManifestWrite { .. }), "got: {err}");
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn verify_rejects_foreign_documents() {
        assert!(verify("services: [", &manifest()).is_err());
        assert!(verify("version: '3.8'\nservices: {}\nnetworks: {}\n", &manifest()).is_err());
        assert!(verify(&render(&manifest()).expect("render"), &manifest()).is_ok());
    }
}
