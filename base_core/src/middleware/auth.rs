use crate::cache::{generate_key, CacheExt};
use crate::error::BaseError;
use crate::security::Principal;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

pub const PRINCIPAL_CACHE: &str = "principals";

/// Authenticates the bearer token and stores the resulting [`Principal`] in
/// the request extensions.
///
/// Verified principals are cached per header value until the token expires.
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, BaseError> {
    let header = authorization_header(request.headers())?;
    let principal = authenticate_cached(&state, header)?;

    request.extensions_mut().insert(principal);

    Ok(next.run(request).await)
}

pub async fn require_admin(request: Request, next: Next) -> Result<Response, BaseError> {
    let principal = request
        .extensions()
        .get::<Principal>()
        .ok_or_else(|| BaseError::Authentication("Authentication required".to_string()))?;

    if !principal.is_admin() {
        return Err(BaseError::Authorization("Admin access required".to_string()));
    }

    Ok(next.run(request).await)
}

fn authenticate_cached(state: &AppState, header: &str) -> Result<Principal, BaseError> {
    let cache = state.cache_manager.get_cache(PRINCIPAL_CACHE);
    let key = generate_key("authorization", &[header]);

    if let Some(principal) = cache.get_as::<Principal>(&key) {
        if !principal.is_expired() {
            return Ok(principal);
        }
        cache.evict(&key);
    }

    let principal = state.authentication.authenticate_header(header)?;
    match (serde_json::to_value(&principal), principal.remaining_lifetime()) {
        (Ok(value), Some(ttl)) => cache.put_with_ttl(&key, value, Some(ttl)),
        (Ok(value), None) => cache.put(&key, value),
        (Err(e), _) => tracing::warn!("Failed to cache principal {}: {}", principal.subject, e),
    }

    Ok(principal)
}

fn authorization_header(headers: &HeaderMap) -> Result<&str, BaseError> {
    headers
        .get(AUTHORIZATION)
        .ok_or_else(|| BaseError::Authentication("Missing Authorization header".to_string()))?
        .to_str()
        .map_err(|_| BaseError::Authentication("Invalid Authorization header format".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BaseConfig;
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
        middleware,
        routing::get,
        Extension, Router,
    };
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn setup_test_state() -> (AppState, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = BaseConfig::default();
        config.storage.base_path = temp_dir.path().to_path_buf();
        (AppState::from_config(&config).unwrap(), temp_dir)
    }

    fn create_test_token(state: &AppState, roles: &[&str]) -> String {
        let principal = Principal::new("1")
            .with_username("testuser")
            .with_roles(roles.iter().copied());
        state
            .authentication
            .token_service()
            .generate_token(&principal)
            .unwrap()
    }

    async fn whoami(Extension(principal): Extension<Principal>) -> String {
        principal.username
    }

    async fn test_handler() -> &'static str {
        "success"
    }

    fn protected_app(state: AppState) -> Router {
        Router::new()
            .route("/protected", get(whoami))
            .layer(middleware::from_fn_with_state(state.clone(), jwt_auth_middleware))
            .with_state(state)
    }

    fn get_request(uri: &str, auth: Option<String>) -> Request<Body> {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(auth) = auth {
            builder = builder.header("Authorization", auth);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_jwt_auth_middleware_success() {
        let (state, _dir) = setup_test_state();
        let token = create_test_token(&state, &["USER"]);

        let response = protected_app(state)
            .oneshot(get_request("/protected", Some(format!("Bearer {}", token))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"testuser");
    }

    #[tokio::test]
    async fn test_jwt_auth_middleware_missing_token() {
        let (state, _dir) = setup_test_state();

        let response = protected_app(state)
            .oneshot(get_request("/protected", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_jwt_auth_middleware_invalid_token() {
        let (state, _dir) = setup_test_state();

        let response = protected_app(state)
            .oneshot(get_request("/protected", Some("Bearer invalid-token".to_string())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_jwt_auth_middleware_rejects_basic() {
        let (state, _dir) = setup_test_state();

        let response = protected_app(state)
            .oneshot(get_request("/protected", Some("Basic dXNlcjpwYXNz".to_string())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_require_admin() {
        let (state, _dir) = setup_test_state();
        let app = Router::new()
            .route("/admin", get(test_handler))
            .layer(middleware::from_fn(require_admin))
            .layer(middleware::from_fn_with_state(state.clone(), jwt_auth_middleware))
            .with_state(state.clone());

        let user_token = create_test_token(&state, &["USER"]);
        let response = app
            .clone()
            .oneshot(get_request("/admin", Some(format!("Bearer {}", user_token))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let admin_token = create_test_token(&state, &["ADMIN"]);
        let response = app
            .oneshot(get_request("/admin", Some(format!("Bearer {}", admin_token))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_authorization_header() {
        let mut headers = HeaderMap::new();
        assert!(authorization_header(&headers).is_err());

        headers.insert(AUTHORIZATION, "Bearer valid-token-123".parse().unwrap());
        assert_eq!(authorization_header(&headers).unwrap(), "Bearer valid-token-123");
    }

    #[tokio::test]
    async fn test_principal_is_cached_per_token() {
        let (state, _dir) = setup_test_state();
        let token = create_test_token(&state, &["USER"]);
        let app = protected_app(state.clone());

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(get_request("/protected", Some(format!("Bearer {}", token))))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let stats = state.cache_manager.get_cache(PRINCIPAL_CACHE).stats();
        assert_eq!(stats.current_size, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }
}
