//! Role -> permission lookups.
//!
//! The effective map is the compiled-in default (`Role::default_permissions`)
//! overlaid with per-role overrides an administrator saved through the
//! profile configuration API. Overrides are persisted under
//! `role_permissions_config` and replace a role's set wholesale.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::db::{ROLE_PERMISSIONS_KEY, Store};
use crate::errors::AppError;
use crate::models::permission::Permission;
use crate::models::role::Role;
use crate::models::service::ServiceRequest;

pub type RolePermissionMap = BTreeMap<Role, BTreeSet<Permission>>;

/// Persisted form: `{"BACKOFFICE": ["view_services", ...]}`.
fn encode_overrides(map: &RolePermissionMap) -> Result<String, AppError> {
    let by_code: BTreeMap<&str, &BTreeSet<Permission>> =
        map.iter().map(|(role, perms)| (role.code(), perms)).collect();
    Ok(serde_json::to_string_pretty(&by_code)?)
}

fn decode_overrides(json: &str) -> Result<RolePermissionMap, AppError> {
    let by_code: BTreeMap<String, BTreeSet<Permission>> = serde_json::from_str(json)?;
    by_code
        .into_iter()
        .map(|(code, perms)| {
            let role: Role = code.parse().map_err(AppError::Configuration)?;
            Ok((role, perms))
        })
        .collect()
}

pub struct PermissionStore {
    store: Store,
    overrides: RwLock<RolePermissionMap>,
}

impl PermissionStore {
    /// Load persisted overrides. An unreadable override document is ignored
    /// (defaults apply) rather than failing startup.
    pub fn load(store: Store) -> Result<Self, AppError> {
        let overrides = match store.get(ROLE_PERMISSIONS_KEY)? {
            Some(json) => match decode_overrides(&json) {
                Ok(map) => {
                    log::info!("Loaded permission overrides for {} role(s)", map.len());
                    map
                }
                Err(e) => {
                    log::warn!("Ignoring unreadable {}: {}", ROLE_PERMISSIONS_KEY, e);
                    RolePermissionMap::new()
                }
            },
            None => RolePermissionMap::new(),
        };
        Ok(PermissionStore { store, overrides: RwLock::new(overrides) })
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, RolePermissionMap>, AppError> {
        self.overrides
            .read()
            .map_err(|_| AppError::Store("permission map lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, RolePermissionMap>, AppError> {
        self.overrides
            .write()
            .map_err(|_| AppError::Store("permission map lock poisoned".to_string()))
    }

    /// Effective permission set for `role`.
    pub fn permissions_for(&self, role: Role) -> BTreeSet<Permission> {
        match self.read() {
            Ok(overrides) => overrides
                .get(&role)
                .cloned()
                .unwrap_or_else(|| role.default_permissions()),
            Err(e) => {
                log::error!("{e}; falling back to default permissions");
                role.default_permissions()
            }
        }
    }

    /// Effective map for every role, for the configuration surface.
    pub fn effective_map(&self) -> RolePermissionMap {
        Role::ALL
            .into_iter()
            .map(|role| (role, self.permissions_for(role)))
            .collect()
    }

    pub fn has_permission(&self, role: Role, permission: Permission) -> bool {
        match self.read() {
            Ok(overrides) => match overrides.get(&role) {
                Some(set) => set.contains(&permission),
                None => role.default_permissions().contains(&permission),
            },
            Err(_) => role.default_permissions().contains(&permission),
        }
    }

    /// False for an empty list.
    pub fn has_any_permission(&self, role: Role, permissions: &[Permission]) -> bool {
        let held = self.permissions_for(role);
        permissions.iter().any(|p| held.contains(p))
    }

    /// True for an empty list.
    pub fn has_all_permissions(&self, role: Role, permissions: &[Permission]) -> bool {
        let held = self.permissions_for(role);
        permissions.iter().all(|p| held.contains(p))
    }

    /// Whether `role` may see a request in its current phase. Requests with no
    /// status map to no phase token and are never visible.
    pub fn can_view(&self, role: Role, service: &ServiceRequest) -> bool {
        match service.status {
            Some(status) => self.has_permission(role, Permission::for_phase(status)),
            None => false,
        }
    }

    /// Keep only the requests `role` may see, preserving order.
    pub fn filter_by_phase_permission(&self, role: Role, services: Vec<ServiceRequest>) -> Vec<ServiceRequest> {
        let held = self.permissions_for(role);
        services
            .into_iter()
            .filter(|s| s.status.is_some_and(|st| held.contains(&Permission::for_phase(st))))
            .collect()
    }

    /// `PermissionDenied` unless `role` holds `permission`.
    pub fn require(&self, role: Role, permission: Permission) -> Result<(), AppError> {
        if self.has_permission(role, permission) {
            Ok(())
        } else {
            Err(AppError::PermissionDenied(format!("{role} lacks {permission}")))
        }
    }

    /// Replace the permission set of one role from raw tokens. Any unknown
    /// role or permission token rejects the whole update.
    pub fn update_role_permissions<S: AsRef<str>>(
        &self,
        role: &str,
        permissions: &[S],
    ) -> Result<BTreeSet<Permission>, AppError> {
        let role: Role = role.parse().map_err(AppError::Configuration)?;
        let parsed = permissions
            .iter()
            .map(|p| p.as_ref().parse::<Permission>())
            .collect::<Result<BTreeSet<_>, _>>()
            .map_err(AppError::Configuration)?;
        self.set_role_permissions(role, parsed.clone())?;
        Ok(parsed)
    }

    /// Replace the permission set of one role and persist all overrides.
    pub fn set_role_permissions(&self, role: Role, permissions: BTreeSet<Permission>) -> Result<(), AppError> {
        let mut overrides = self.write()?;
        let mut next = overrides.clone();
        next.insert(role, permissions);
        // Persist before swapping so a failed write leaves the live map untouched
        let json = encode_overrides(&next)?;
        self.store.set(ROLE_PERMISSIONS_KEY, &json)?;
        *overrides = next;
        log::info!("Updated permissions for role {}", role);
        Ok(())
    }

    /// Drop every override and restore the compiled-in defaults.
    pub fn reset_to_default(&self) -> Result<(), AppError> {
        let mut overrides = self.write()?;
        self.store.remove(ROLE_PERMISSIONS_KEY)?;
        overrides.clear();
        log::info!("Role permissions reset to defaults");
        Ok(())
    }
}
