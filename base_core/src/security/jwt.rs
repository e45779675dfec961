use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::config::SecurityConfig;
use crate::error::BaseError;
use crate::security::models::{JwtClaims, Principal};

const MIN_SECRET_LENGTH: usize = 32;

/// Issues and verifies HS256 tokens. Signature and expiry checks are left to
/// `jsonwebtoken`.
pub struct JwtTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: Option<String>,
    expiration: Duration,
}

impl JwtTokenService {
    pub fn new(config: &SecurityConfig) -> Result<Self, BaseError> {
        if config.jwt_secret.len() < MIN_SECRET_LENGTH {
            return Err(BaseError::Authentication(
                "JWT secret must be at least 32 characters long".to_string(),
            ));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            issuer: config.issuer.clone(),
            expiration: Duration::seconds(config.expiration_seconds),
        })
    }

    pub fn generate_token(&self, principal: &Principal) -> Result<String, BaseError> {
        let now = Utc::now();

        let claims = JwtClaims {
            sub: principal.subject.clone(),
            username: Some(principal.username.clone()),
            roles: principal.roles.clone(),
            permissions: principal.permissions.clone(),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + self.expiration).timestamp(),
            jti: Some(Uuid::new_v4().to_string()),
            attributes: principal.attributes.clone(),
        };

        self.encode_claims(&claims)
    }

    pub fn encode_claims(&self, claims: &JwtClaims) -> Result<String, BaseError> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| BaseError::Authentication(format!("Failed to generate token: {}", e)))
    }

    pub fn validate_token(&self, token: &str) -> Result<JwtClaims, BaseError> {
        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }

        decode::<JwtClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    BaseError::Authentication("Token has expired".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidToken => {
                    BaseError::Authentication("Invalid token".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => {
                    BaseError::Authentication("Invalid token issuer".to_string())
                }
                _ => BaseError::Authentication(format!("Token validation failed: {}", e)),
            })
    }

    pub fn extract_subject(&self, token: &str) -> Result<String, BaseError> {
        self.validate_token(token).map(|claims| claims.sub)
    }

    /// Maps verified claims onto a principal without applying any defaults.
    pub fn parse_principal(&self, claims: JwtClaims) -> Principal {
        Principal::from_claims(claims, &[], &[])
    }
}
