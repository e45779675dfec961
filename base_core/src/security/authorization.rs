use crate::error::{BaseError, Result};
use crate::security::models::{Principal, ADMIN_ROLE};

/// Role and permission checks against an authenticated principal. The admin
/// role passes every role check.
#[derive(Debug, Clone)]
pub struct JwtAuthorizationChecker {
    admin_role: String,
}

impl Default for JwtAuthorizationChecker {
    fn default() -> Self {
        Self::new(ADMIN_ROLE)
    }
}

impl JwtAuthorizationChecker {
    pub fn new(admin_role: impl Into<String>) -> Self {
        Self {
            admin_role: admin_role.into(),
        }
    }

    fn is_admin(&self, principal: &Principal) -> bool {
        principal.has_role(&self.admin_role)
    }

    pub fn has_role(&self, principal: &Principal, role: &str) -> bool {
        self.is_admin(principal) || principal.has_role(role)
    }

    pub fn has_any_role(&self, principal: &Principal, roles: &[&str]) -> bool {
        self.is_admin(principal) || principal.has_any_role(roles)
    }

    pub fn has_permission(&self, principal: &Principal, permission: &str) -> bool {
        principal.has_permission(permission)
    }

    pub fn has_all_permissions(&self, principal: &Principal, permissions: &[&str]) -> bool {
        permissions.iter().all(|p| principal.has_permission(p))
    }

    pub fn check_role(&self, principal: &Principal, role: &str) -> Result<()> {
        if self.has_role(principal, role) {
            Ok(())
        } else {
            Err(BaseError::Authorization(format!(
                "Role '{}' required, principal {} has {:?}",
                role, principal.subject, principal.roles
            )))
        }
    }

    pub fn check_any_role(&self, principal: &Principal, roles: &[&str]) -> Result<()> {
        if self.has_any_role(principal, roles) {
            Ok(())
        } else {
            Err(BaseError::Authorization(format!(
                "One of roles {:?} required, principal {} has {:?}",
                roles, principal.subject, principal.roles
            )))
        }
    }

    pub fn check_permission(&self, principal: &Principal, permission: &str) -> Result<()> {
        if self.has_permission(principal, permission) {
            Ok(())
        } else {
            Err(BaseError::Authorization(format!(
                "Permission '{}' required",
                permission
            )))
        }
    }

    pub fn check_all_permissions(&self, principal: &Principal, permissions: &[&str]) -> Result<()> {
        match permissions.iter().find(|p| !principal.has_permission(p)) {
            Some(missing) => Err(BaseError::Authorization(format!(
                "Permission '{}' required",
                missing
            ))),
            None => Ok(()),
        }
    }
}
