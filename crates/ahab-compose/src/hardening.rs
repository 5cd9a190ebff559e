//! Uniform security hardening of generated services.
//!
//! Every service drops all capabilities, forbids privilege escalation, and
//! carries resource limits. What a role gets back is decided by a fixed
//! table keyed by [`Role`], never by module name.

use ahab_common::constants::{CAP_DROP_ALL, NO_NEW_PRIVILEGES};
use ahab_common::types::{Capability, Role};

use crate::manifest::{Deploy, Quota, Resources, ServiceSpec};
use crate::module::{Module, QuotaSpec};
use crate::pipeline::Warning;

/// Defaults granted to one role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RolePolicy {
    /// Capabilities added back after dropping all.
    pub cap_add: &'static [Capability],
    /// Default `(cpus, memory)` limits.
    pub limits: (&'static str, &'static str),
    /// Default `(cpus, memory)` reservations.
    pub reservations: (&'static str, &'static str),
}

const WEBSERVER_CAPS: &[Capability] = &[
    Capability::NetBindService,
    Capability::Setuid,
    Capability::Setgid,
    Capability::DacOverride,
];

/// Returns the hardening defaults for `role`.
#[must_use]
pub const fn policy_for(role: Role) -> RolePolicy {
    match role {
        Role::Webserver => RolePolicy {
            cap_add: WEBSERVER_CAPS,
            limits: ("0.5", "512M"),
            reservations: ("0.25", "256M"),
        },
        Role::Database => RolePolicy {
            cap_add: &[],
            limits: ("1.0", "1G"),
            reservations: ("0.5", "512M"),
        },
        Role::Cache => RolePolicy {
            cap_add: &[],
            limits: ("0.5", "256M"),
            reservations: ("0.25", "128M"),
        },
        Role::Proxy | Role::Application | Role::Meta | Role::Unspecified => RolePolicy {
            cap_add: &[],
            limits: ("0.25", "256M"),
            reservations: ("0.1", "128M"),
        },
    }
}

/// Applies the security policy of `module`'s role to `service`.
///
/// A module that sets `run_as_root: true` runs as root and a warning is
/// recorded.
pub fn harden(service: &mut ServiceSpec, module: &Module, warnings: &mut Vec<Warning>) {
    let policy = policy_for(module.role);

    service.security_opt = vec![NO_NEW_PRIVILEGES.to_string()];
    service.cap_drop = vec![CAP_DROP_ALL.to_string()];
    service.cap_add = module
        .cap_add
        .clone()
        .unwrap_or_else(|| policy.cap_add.to_vec());

    service.deploy = Some(Deploy {
        resources: Resources {
            limits: quota(&module.resources.limits, policy.limits),
            reservations: quota(&module.resources.reservations, policy.reservations),
        },
    });

    if module.run_as_root {
        service.user = Some("root".to_string());
        tracing::warn!(module = %module.name, "module runs as root, bypassing the non-root default");
        warnings.push(Warning::new(
            &module.name,
            "runs as root (run_as_root: true); the non-root default is bypassed",
        ));
    }
}

fn quota(declared: &QuotaSpec, (cpus, memory): (&str, &str)) -> Quota {
    Quota {
        cpus: declared.cpus.clone().unwrap_or_else(|| cpus.to_string()),
        memory: declared.memory.clone().unwrap_or_else(|| memory.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(yaml: &str) -> Module {
        Module::from_yaml("svc", yaml).expect("module")
    }

    fn hardened(yaml: &str) -> (ServiceSpec, Vec<Warning>) {
        let module = module(yaml);
        let mut service = ServiceSpec {
            image: "x".into(),
            container_name: "ahab_svc".into(),
            user: module.user.clone(),
            ..ServiceSpec::default()
        };
        let mut warnings = Vec::new();
        harden(&mut service, &module, &mut warnings);
        (service, warnings)
    }

    #[test]
    fn every_role_drops_all_and_forbids_escalation() {
        for role in ["webserver", "database", "cache", "proxy", "application", "unspecified"] {
            let (service, _) = hardened(&format!("name: svc\nimage: x\nrole: {role}\n"));
            assert_eq!(service.cap_drop, vec!["ALL"], "role {role}");
            assert!(service.security_opt.contains(&"no-new-privileges:true".to_string()));
        }
    }

    #[test]
    fn webserver_gets_bind_caps() {
        let (service, _) = hardened("name: svc\nimage: x\nrole: webserver\n");
        assert_eq!(
            service.cap_add,
            vec![
                Capability::NetBindService,
                Capability::Setuid,
                Capability::Setgid,
                Capability::DacOverride
            ]
        );
    }

    #[test]
    fn other_roles_get_no_caps() {
        for role in ["database", "cache", "proxy", "application", "unspecified"] {
            let (service, _) = hardened(&format!("name: svc\nimage: x\nrole: {role}\n"));
            assert!(service.cap_add.is_empty(), "role {role}");
        }
    }

    #[test]
    fn explicit_cap_add_overrides_table() {
        let (service, _) = hardened("name: svc\nimage: x\nrole: proxy\ncap_add: [NET_BIND_SERVICE]\n");
        assert_eq!(service.cap_add, vec![Capability::NetBindService]);
    }

    #[test]
    fn role_default_resources() {
        let (service, _) = hardened("name: svc\nimage: x\nrole: database\n");
        let resources = service.deploy.expect("deploy").resources;
        assert_eq!(resources.limits.cpus, "1.0");
        assert_eq!(resources.limits.memory, "1G");

        let (service, _) = hardened("name: svc\nimage: x\n");
        let resources = service.deploy.expect("deploy").resources;
        assert_eq!(resources.limits.cpus, "0.25");
        assert_eq!(resources.limits.memory, "256M");
    }

    #[test]
    fn declared_resources_override_leaf_by_leaf() {
        let (service, _) = hardened(
            "name: svc\nimage: x\nrole: cache\nresources:\n  limits:\n    memory: 1G\n",
        );
        let resources = service.deploy.expect("deploy").resources;
        assert_eq!(resources.limits.memory, "1G");
        assert_eq!(resources.limits.cpus, "0.5");
        assert_eq!(resources.reservations.memory, "128M");
    }

    #[test]
    fn run_as_root_is_recorded() {
        let (service, warnings) = hardened("name: svc\nimage: x\nrun_as_root: true\n");
        assert_eq!(service.user.as_deref(), Some("root"));
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].module, "svc");
    }

    #[test]
    fn declared_user_is_kept() {
        let (service, warnings) = hardened("name: svc\nimage: x\nuser: \"1000:1000\"\n");
        assert_eq!(service.user.as_deref(), Some("1000:1000"));
        assert!(warnings.is_empty());
    }
}
