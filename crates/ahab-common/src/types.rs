//! Domain primitive types used across the Ahab workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Category tag on a module, driving default capabilities, resources,
/// and service discovery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// HTTP server binding privileged ports.
    Webserver,
    /// Relational database reachable through `DB_*` variables.
    Database,
    /// Key-value cache reachable through `REDIS_*` variables.
    Cache,
    /// Reverse proxy fronting applications and webservers.
    Proxy,
    /// Application consuming databases and caches.
    Application,
    /// Bundle of other modules; produces no service of its own.
    Meta,
    /// No role declared; receives minimal grants.
    #[default]
    Unspecified,
}

impl Role {
    /// Returns whether modules of this role produce a compose service.
    #[must_use]
    pub const fn produces_service(self) -> bool {
        !matches!(self, Self::Meta)
    }

    /// Returns the lowercase tag used in module specs and labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Webserver => "webserver",
            Self::Database => "database",
            Self::Cache => "cache",
            Self::Proxy => "proxy",
            Self::Application => "application",
            Self::Meta => "meta",
            Self::Unspecified => "unspecified",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Linux capability identifiers that may be granted back after `cap_drop: ALL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Capability {
    /// Allow binding to privileged ports (< 1024).
    NetBindService,
    /// Allow setting user IDs.
    Setuid,
    /// Allow setting group IDs.
    Setgid,
    /// Bypass file read, write, and execute permission checks.
    DacOverride,
    /// Allow changing file ownership.
    Chown,
    /// Bypass permission checks requiring the file owner.
    Fowner,
    /// Keep set-user-ID bits when modifying files.
    Fsetid,
    /// Allow sending signals to arbitrary processes.
    Kill,
    /// Allow network administration.
    NetAdmin,
    /// Allow raw and packet sockets.
    NetRaw,
    /// Allow raising process priority.
    SysNice,
    /// Allow overriding resource limits.
    SysResource,
    /// Allow `chroot`.
    SysChroot,
    /// Allow locking memory.
    IpcLock,
    /// Allow writing to the kernel audit log.
    AuditWrite,
    /// Allow creating special files.
    Mknod,
}

impl Capability {
    /// Returns the compose spelling of the capability.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NetBindService => "NET_BIND_SERVICE",
            Self::Setuid => "SETUID",
            Self::Setgid => "SETGID",
            Self::DacOverride => "DAC_OVERRIDE",
            Self::Chown => "CHOWN",
            Self::Fowner => "FOWNER",
            Self::Fsetid => "FSETID",
            Self::Kill => "KILL",
            Self::NetAdmin => "NET_ADMIN",
            Self::NetRaw => "NET_RAW",
            Self::SysNice => "SYS_NICE",
            Self::SysResource => "SYS_RESOURCE",
            Self::SysChroot => "SYS_CHROOT",
            Self::IpcLock => "IPC_LOCK",
            Self::AuditWrite => "AUDIT_WRITE",
            Self::Mknod => "MKNOD",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
