//! Admin authentication: bearer JWTs checked before any admin handler runs.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::error::AppError;
use crate::state::AppState;

pub const NO_TOKEN: &str = "No token, authorization denied";
pub const INVALID_TOKEN: &str = "Token is not valid";

/// The authenticated admin, available to handlers as an extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub email: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken => AppError::Unauthorized(NO_TOKEN.to_string()),
            AuthError::InvalidToken(_) => AppError::Unauthorized(INVALID_TOKEN.to_string()),
            AuthError::Signing(e) => AppError::Internal(e.to_string()),
        }
    }
}

/// Admits or rejects a request on the strength of its headers.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, headers: &HeaderMap) -> Result<Identity, AuthError>;
    fn issue_token(&self, identity: &Identity) -> Result<String, AuthError>;
}

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

pub struct JwtAuthenticator {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry: Duration,
}

impl JwtAuthenticator {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            expiry: Duration::hours(config.expiry_hours),
        }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }
}

/// Extract bearer token from Authorization header
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

impl Authenticator for JwtAuthenticator {
    fn authenticate(&self, headers: &HeaderMap) -> Result<Identity, AuthError> {
        let token = bearer_token(headers).ok_or(AuthError::MissingToken)?;
        let claims = self.verify(token)?;
        Ok(Identity {
            id: claims.sub,
            email: claims.email,
        })
    }

    fn issue_token(&self, identity: &Identity) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: identity.id,
            email: identity.email.clone(),
            exp: (now + self.expiry).timestamp(),
            iat: now.timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(AuthError::Signing)
    }
}

/// Middleware guarding admin routes.
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match state.auth.authenticate(request.headers()) {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(e) => {
            tracing::warn!(uri = %request.uri(), error = %e, "rejected admin request");
            AppError::from(e).into_response()
        }
    }
}

/// bcrypt is CPU-bound; keep the async executor free.
pub async fn hash_password(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash(password, DEFAULT_COST))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(|e| AppError::Internal(e.to_string()))
}

pub async fn verify_password(password: String, password_hash: String) -> bool {
    tokio::task::spawn_blocking(move || verify(password, &password_hash).unwrap_or(false))
        .await
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn authenticator(secret: &str) -> JwtAuthenticator {
        JwtAuthenticator::new(&JwtConfig {
            secret: secret.to_string(),
            expiry_hours: 1,
        })
    }

    fn identity() -> Identity {
        Identity {
            id: Uuid::new_v4(),
            email: "admin@example.com".to_string(),
        }
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[test]
    fn issued_token_authenticates() {
        let auth = authenticator("secret");
        let who = identity();
        let token = auth.issue_token(&who).unwrap();
        assert_eq!(auth.authenticate(&bearer(&token)).unwrap(), who);
    }

    #[test]
    fn missing_header_is_rejected() {
        let err = authenticator("secret")
            .authenticate(&HeaderMap::new())
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingToken));
    }

    #[test]
    fn token_from_another_secret_is_rejected() {
        let token = authenticator("one").issue_token(&identity()).unwrap();
        let err = authenticator("two").authenticate(&bearer(&token)).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let auth = JwtAuthenticator::new(&JwtConfig {
            secret: "secret".to_string(),
            expiry_hours: -2,
        });
        let token = auth.issue_token(&identity()).unwrap();
        assert!(auth.authenticate(&bearer(&token)).is_err());
    }

    #[tokio::test]
    async fn password_hash_round_trip() {
        let hashed = hash_password("hunter22".to_string()).await.unwrap();
        assert!(verify_password("hunter22".to_string(), hashed.clone()).await);
        assert!(!verify_password("wrong".to_string(), hashed).await);
    }
}
