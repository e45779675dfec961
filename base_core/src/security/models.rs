use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const ADMIN_ROLE: &str = "ADMIN";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JwtClaims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    pub iat: i64,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

/// Authenticated identity built from verified token claims.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Principal {
    pub subject: String,
    pub username: String,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    pub issued_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub token_id: Option<String>,
    pub attributes: BTreeMap<String, String>,
}

impl Principal {
    pub fn new(subject: impl Into<String>) -> Self {
        let subject = subject.into();
        Self {
            username: subject.clone(),
            subject,
            roles: Vec::new(),
            permissions: Vec::new(),
            issued_at: None,
            expires_at: None,
            token_id: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Builds a principal from claims, falling back to the given defaults when
    /// the token carries no roles or no permissions.
    pub fn from_claims(claims: JwtClaims, default_roles: &[String], default_permissions: &[String]) -> Self {
        let roles = if claims.roles.is_empty() {
            default_roles.to_vec()
        } else {
            claims.roles
        };
        let permissions = if claims.permissions.is_empty() {
            default_permissions.to_vec()
        } else {
            claims.permissions
        };

        Self {
            username: claims.username.unwrap_or_else(|| claims.sub.clone()),
            subject: claims.sub,
            roles,
            permissions,
            issued_at: Utc.timestamp_opt(claims.iat, 0).single(),
            expires_at: Utc.timestamp_opt(claims.exp, 0).single(),
            token_id: claims.jti,
            attributes: claims.attributes,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }

    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|role| self.has_role(role))
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p.eq_ignore_ascii_case(permission))
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ADMIN_ROLE)
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| exp <= Utc::now())
    }

    /// Time left until expiry; `None` when the principal never expires.
    pub fn remaining_lifetime(&self) -> Option<std::time::Duration> {
        self.expires_at
            .map(|exp| (exp - Utc::now()).to_std().unwrap_or_default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    Bearer,
    Basic,
    ApiKey,
}

impl std::fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialKind::Bearer => write!(f, "bearer"),
            CredentialKind::Basic => write!(f, "basic"),
            CredentialKind::ApiKey => write!(f, "api-key"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationRequest {
    pub kind: CredentialKind,
    pub token: Option<String>,
}

impl AuthenticationRequest {
    pub fn new(kind: CredentialKind, token: Option<String>) -> Self {
        Self { kind, token }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self::new(CredentialKind::Bearer, Some(token.into()))
    }

    /// Parses an `Authorization` header value such as `Bearer <token>`.
    /// A value without a recognised scheme is treated as an API key.
    pub fn from_authorization_header(value: &str) -> Self {
        let value = value.trim();
        let (scheme, rest) = value
            .split_once(' ')
            .map(|(scheme, rest)| (scheme, rest.trim()))
            .unwrap_or((value, ""));

        let kind = if scheme.eq_ignore_ascii_case("bearer") {
            CredentialKind::Bearer
        } else if scheme.eq_ignore_ascii_case("basic") {
            CredentialKind::Basic
        } else {
            return Self::new(CredentialKind::ApiKey, non_blank(value));
        };

        Self::new(kind, non_blank(rest))
    }
}

fn non_blank(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(roles: Vec<&str>, permissions: Vec<&str>) -> JwtClaims {
        JwtClaims {
            sub: "42".to_string(),
            username: None,
            roles: roles.into_iter().map(String::from).collect(),
            permissions: permissions.into_iter().map(String::from).collect(),
            iss: None,
            iat: 1_700_000_000,
            exp: 1_700_003_600,
            jti: Some("token-1".to_string()),
            attributes: BTreeMap::new(),
        }
    }

    #[test]
    fn test_principal_defaults_when_claims_absent() {
        let defaults = vec!["USER".to_string()];
        let default_permissions = vec!["READ".to_string()];

        let principal = Principal::from_claims(claims(vec![], vec![]), &defaults, &default_permissions);
        assert_eq!(principal.username, "42");
        assert_eq!(principal.roles, defaults);
        assert_eq!(principal.permissions, default_permissions);
        assert_eq!(principal.token_id.as_deref(), Some("token-1"));
        assert_eq!(principal.issued_at.unwrap().timestamp(), 1_700_000_000);
        assert!(principal.is_expired());

        let principal = Principal::from_claims(
            claims(vec!["ADMIN"], vec!["WRITE"]),
            &defaults,
            &default_permissions,
        );
        assert_eq!(principal.roles, vec!["ADMIN".to_string()]);
        assert_eq!(principal.permissions, vec!["WRITE".to_string()]);
        assert!(principal.is_admin());
    }

    #[test]
    fn test_role_and_permission_predicates() {
        let principal = Principal::new("alice")
            .with_roles(["user", "auditor"])
            .with_permissions(["files:read"]);

        assert!(principal.has_role("USER"));
        assert!(principal.has_any_role(&["manager", "auditor"]));
        assert!(!principal.has_any_role(&["manager"]));
        assert!(principal.has_permission("FILES:READ"));
        assert!(!principal.has_permission("files:write"));
        assert!(!principal.is_admin());
        assert!(!principal.is_expired());
        assert_eq!(principal.remaining_lifetime(), None);
    }

    #[test]
    fn test_remaining_lifetime() {
        let mut principal = Principal::new("alice");
        principal.expires_at = Some(Utc::now() + chrono::Duration::seconds(120));
        let left = principal.remaining_lifetime().unwrap();
        assert!(left.as_secs() > 100 && left.as_secs() <= 120);

        principal.expires_at = Some(Utc::now() - chrono::Duration::seconds(5));
        assert_eq!(principal.remaining_lifetime(), Some(std::time::Duration::ZERO));
    }

    #[test]
    fn test_authorization_header_parsing() {
        assert_eq!(
            AuthenticationRequest::from_authorization_header("Bearer abc.def.ghi"),
            AuthenticationRequest::bearer("abc.def.ghi")
        );
        assert_eq!(
            AuthenticationRequest::from_authorization_header("bearer   xyz "),
            AuthenticationRequest::bearer("xyz")
        );

        let basic = AuthenticationRequest::from_authorization_header("Basic dXNlcjpwYXNz");
        assert_eq!(basic.kind, CredentialKind::Basic);

        let empty = AuthenticationRequest::from_authorization_header("Bearer ");
        assert_eq!(empty.kind, CredentialKind::Bearer);
        assert!(empty.token.is_none());

        let key = AuthenticationRequest::from_authorization_header("raw-api-key");
        assert_eq!(key.kind, CredentialKind::ApiKey);
        assert_eq!(key.token.as_deref(), Some("raw-api-key"));
    }
}
