use std::sync::Arc;
use tracing::debug;

use crate::config::SecurityConfig;
use crate::error::{BaseError, Result};
use crate::security::jwt::JwtTokenService;
use crate::security::models::{AuthenticationRequest, CredentialKind, Principal};

/// Turns a bearer credential into a [`Principal`].
///
/// Holds no session state: every call verifies the token again.
#[derive(Clone)]
pub struct JwtAuthenticationManager {
    token_service: Arc<JwtTokenService>,
    default_roles: Vec<String>,
    default_permissions: Vec<String>,
}

impl JwtAuthenticationManager {
    pub fn new(
        token_service: Arc<JwtTokenService>,
        default_roles: Vec<String>,
        default_permissions: Vec<String>,
    ) -> Self {
        Self {
            token_service,
            default_roles,
            default_permissions,
        }
    }

    pub fn from_config(config: &SecurityConfig) -> Result<Self> {
        let token_service = JwtTokenService::new(config)?;
        Ok(Self::new(
            Arc::new(token_service),
            config.default_roles.clone(),
            config.default_permissions.clone(),
        ))
    }

    pub fn token_service(&self) -> &JwtTokenService {
        &self.token_service
    }

    pub fn supports(&self, kind: CredentialKind) -> bool {
        kind == CredentialKind::Bearer
    }

    pub fn authenticate(&self, request: &AuthenticationRequest) -> Result<Principal> {
        if !self.supports(request.kind) {
            return Err(BaseError::Authentication(format!(
                "Unsupported authentication type: {}",
                request.kind
            )));
        }

        let token = request
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| BaseError::Authentication("Missing authentication token".to_string()))?;

        let claims = self.token_service.validate_token(token)?;
        let principal = Principal::from_claims(claims, &self.default_roles, &self.default_permissions);

        debug!(
            subject = %principal.subject,
            roles = ?principal.roles,
            "Authenticated principal"
        );

        Ok(principal)
    }

    pub fn authenticate_header(&self, header_value: &str) -> Result<Principal> {
        self.authenticate(&AuthenticationRequest::from_authorization_header(header_value))
    }
}
