//! Bearer token authentication.
//!
//! Tokens are HS256 JWTs issued elsewhere; only verification happens here.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use uuid::Uuid;

use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::models::user::{Actor, Claims};

/// Identity of the caller, inserted into request extensions.
#[derive(Debug, Clone)]
pub struct AuthExtension {
    pub user_id: Uuid,
    pub roles: Vec<String>,
}

impl AuthExtension {
    pub fn from_claims(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            roles: claims.roles,
        }
    }

    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id, self.roles.clone())
    }
}

/// Verify a bearer token and return its claims.
pub fn verify_token(token: &str, key: &DecodingKey) -> Result<Claims> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(token, key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            AppError::Unauthorized("Invalid or expired token".to_string())
        })
}

fn bearer_token(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Require a valid bearer token on every request under `/api`.
pub async fn auth_middleware(
    State(state): State<SharedState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response> {
    let token = bearer_token(&request)
        .ok_or_else(|| AppError::Unauthorized("Unauthorized".to_string()))?;
    let claims = verify_token(token, &state.jwt_key)?;

    request
        .extensions_mut()
        .insert(AuthExtension::from_claims(claims));
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &[u8] = b"test-secret";

    fn token(claims: &Claims, secret: &[u8]) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret),
        )
        .unwrap()
    }

    fn claims(roles: &[&str]) -> Claims {
        Claims {
            sub: Uuid::new_v4(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            exp: (chrono::Utc::now().timestamp() + 3600) as usize,
        }
    }

    #[test]
    fn test_verify_valid_token() {
        let claims = claims(&["editor"]);
        let verified = verify_token(&token(&claims, SECRET), &DecodingKey::from_secret(SECRET)).unwrap();
        assert_eq!(verified.sub, claims.sub);
        assert_eq!(verified.roles, vec!["editor".to_string()]);
    }

    #[test]
    fn test_wrong_secret_is_unauthorized() {
        let err = verify_token(&token(&claims(&[]), b"other"), &DecodingKey::from_secret(SECRET))
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_expired_token_is_unauthorized() {
        let mut expired = claims(&["editor"]);
        expired.exp = 1;
        let err = verify_token(&token(&expired, SECRET), &DecodingKey::from_secret(SECRET))
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_extension_from_claims() {
        let ext = AuthExtension::from_claims(claims(&["reviewer", "section_editor"]));
        let actor = ext.actor();
        assert!(actor.is_editor());
        assert!(actor.is_reviewer());
        assert!(actor.require_editor().is_ok());
    }

    #[test]
    fn test_bearer_token_parsing() {
        let request = Request::builder()
            .header(header::AUTHORIZATION, "Bearer abc.def.ghi")
            .body(Body::empty())
            .unwrap();
        assert_eq!(bearer_token(&request), Some("abc.def.ghi"));

        let basic = Request::builder()
            .header(header::AUTHORIZATION, "Basic dXNlcg==")
            .body(Body::empty())
            .unwrap();
        assert_eq!(bearer_token(&basic), None);
    }
}
