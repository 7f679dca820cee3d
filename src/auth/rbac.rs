/*!
 * # Role-Based Access Control (RBAC) Module
 *
 * Maps each mill role to the permissions it carries. Permission checks
 * understand `resource:*` wildcards and the `*` super-wildcard held by admins.
 */

use super::user::UserRole;
use lazy_static::lazy_static;
use std::collections::HashMap;
use tracing::warn;

/// Role definition with associated permissions
#[derive(Debug, Clone)]
pub struct Role {
    pub name: String,
    pub description: String,
    pub permissions: Vec<String>,
}

fn role(name: &str, description: &str, permissions: &[&str]) -> Role {
    Role {
        name: name.to_string(),
        description: description.to_string(),
        permissions: permissions.iter().map(|p| p.to_string()).collect(),
    }
}

lazy_static! {
    pub static ref ROLES: HashMap<String, Role> = {
        let mut roles = HashMap::new();

        roles.insert(
            "admin".to_string(),
            role("admin", "Administrator with full access", &["*"]),
        );

        roles.insert(
            "manager".to_string(),
            role(
                "manager",
                "Plant manager; everything except account administration",
                &[
                    "production:*",
                    "machines:*",
                    "inventory:*",
                    "dyeing:*",
                    "workorders:*",
                    "boms:*",
                    "costing:*",
                ],
            ),
        );

        roles.insert(
            "supervisor".to_string(),
            role(
                "supervisor",
                "Shift supervisor running the ASU floor",
                &[
                    "production:*",
                    "machines:*",
                    "workorders:*",
                    "inventory:read",
                    "dyeing:read",
                    "boms:read",
                    "costing:read",
                ],
            ),
        );

        roles.insert(
            "operator".to_string(),
            role(
                "operator",
                "Machine operator recording shift output",
                &[
                    "production:read",
                    "production:write",
                    "machines:read",
                    "workorders:read",
                ],
            ),
        );

        roles.insert(
            "viewer".to_string(),
            role(
                "viewer",
                "Read-only access",
                &[
                    "production:read",
                    "machines:read",
                    "inventory:read",
                    "dyeing:read",
                    "workorders:read",
                    "boms:read",
                    "costing:read",
                ],
            ),
        );

        roles
    };
}

/// Role-based access control service
pub struct RbacService;

impl RbacService {
    /// Permissions granted to a role
    pub fn permissions_for(role: UserRole) -> Vec<String> {
        match ROLES.get(role.as_str()) {
            Some(r) => r.permissions.clone(),
            None => {
                warn!("Role {} has no permission table entry", role.as_str());
                Vec::new()
            }
        }
    }

    /// Check whether a granted permission list satisfies `required`
    pub fn check_permission(granted: &[String], required: &str) -> bool {
        granted
            .iter()
            .any(|p| Self::permission_matches(p, required))
    }

    fn permission_matches(granted: &str, required: &str) -> bool {
        if granted == "*" || granted == required {
            return true;
        }

        if let Some(resource) = granted.strip_suffix(":*") {
            return required
                .split_once(':')
                .map_or(false, |(req_resource, _)| req_resource == resource);
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::consts;

    fn perms(role: UserRole) -> Vec<String> {
        RbacService::permissions_for(role)
    }

    #[test]
    fn admin_wildcard_covers_everything() {
        let admin = perms(UserRole::Admin);
        assert!(RbacService::check_permission(&admin, consts::USERS_MANAGE));
        assert!(RbacService::check_permission(&admin, consts::PRODUCTION_WRITE));
    }

    #[test]
    fn manager_cannot_manage_users() {
        let manager = perms(UserRole::Manager);
        assert!(RbacService::check_permission(&manager, consts::BOMS_MANAGE));
        assert!(RbacService::check_permission(&manager, consts::INVENTORY_ADJUST));
        assert!(!RbacService::check_permission(&manager, consts::USERS_MANAGE));
    }

    #[test]
    fn resource_wildcard_does_not_leak_across_resources() {
        let granted = vec!["production:*".to_string()];
        assert!(RbacService::check_permission(&granted, "production:write"));
        assert!(!RbacService::check_permission(&granted, "productionx:write"));
        assert!(!RbacService::check_permission(&granted, "machines:read"));
    }

    #[test]
    fn operator_and_viewer_are_limited() {
        let operator = perms(UserRole::Operator);
        assert!(RbacService::check_permission(&operator, consts::PRODUCTION_WRITE));
        assert!(!RbacService::check_permission(&operator, consts::MACHINES_WRITE));

        let viewer = perms(UserRole::Viewer);
        assert!(viewer.iter().all(|p| p.ends_with(":read")));
        assert!(!RbacService::check_permission(&viewer, consts::DYEING_WRITE));
    }
}
