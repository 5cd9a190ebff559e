//! System-wide constants and default paths.

/// Default directory holding one sub-directory per module.
pub const DEFAULT_MODULES_DIR: &str = "modules";

/// File name of a module's declarative spec inside its directory.
pub const MODULE_SPEC_FILE: &str = "module.yml";

/// Default output path of the generated manifest.
pub const DEFAULT_OUTPUT: &str = "generated/docker-compose.yml";

/// Name of the shared network every service joins.
pub const DEFAULT_NETWORK: &str = "ahab_network";

/// Prefix of default container names (`ahab_<module>`).
pub const DEFAULT_CONTAINER_PREFIX: &str = "ahab_";

/// Compose file format version written to the manifest.
pub const DEFAULT_COMPOSE_VERSION: &str = "3.8";

/// Version reported for modules that do not declare one.
pub const DEFAULT_MODULE_VERSION: &str = "1.0.0";

/// Label namespace for generated resources.
pub const LABEL_PREFIX: &str = "com.ahab";

/// Security option applied to every generated service.
pub const NO_NEW_PRIVILEGES: &str = "no-new-privileges:true";

/// Capability set dropped from every generated service.
pub const CAP_DROP_ALL: &str = "ALL";

/// Application name used in CLI output.
pub const APP_NAME: &str = "ahab";

/// Environment variable overriding the modules directory.
pub const MODULES_DIR_ENV: &str = "AHAB_MODULES_DIR";
