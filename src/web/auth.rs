//! JWT authentication for the web server.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use super::api::ApiError;
use super::AppState;
use crate::config::{Settings, UserConfig};
use crate::core::message::ActorRole;
use crate::error::Error;

/// JWT claims.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,     // Username
    pub role: ActorRole, // Resolved role
    pub exp: usize,      // Expiration time
    pub iat: usize,      // Issued at
}

/// Token signing parameters and known accounts.
pub struct AuthConfig {
    secret: String,
    algorithm: Algorithm,
    expiration_secs: u64,
    users: HashMap<String, UserConfig>,
}

impl AuthConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self, Error> {
        let algorithm = Algorithm::from_str(&settings.jwt_algorithm)
            .map_err(|e| Error::Config(format!("jwt_algorithm: {}", e)))?;
        Ok(Self {
            secret: settings.jwt_secret_key.clone(),
            algorithm,
            expiration_secs: settings.jwt_expiration_minutes * 60,
            users: settings.users.clone(),
        })
    }

    /// Check credentials and return the account's role.
    pub fn authenticate(&self, username: &str, password: &str) -> Option<ActorRole> {
        self.users
            .get(username)
            .filter(|user| user.password == password)
            .map(|user| user.role)
    }

    /// Generate a JWT token.
    pub fn generate_token(&self, username: &str, role: ActorRole) -> Result<String, Error> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| Error::Auth(e.to_string()))?
            .as_secs() as usize;

        let claims = Claims {
            sub: username.to_string(),
            role,
            exp: now + self.expiration_secs as usize,
            iat: now,
        };

        encode(
            &Header::new(self.algorithm),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| Error::Auth(e.to_string()))
    }

    /// Validate a JWT token.
    pub fn validate_token(&self, token: &str) -> Result<Claims, Error> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::new(self.algorithm),
        )
        .map_err(|e| Error::Auth(e.to_string()))?;

        Ok(token_data.claims)
    }
}

/// Extract token from Authorization header.
pub fn extract_token(auth_header: Option<&str>) -> Result<&str, String> {
    let header = auth_header.ok_or("Missing Authorization header")?;

    header
        .strip_prefix("Bearer ")
        .ok_or_else(|| "Invalid Authorization header format".to_string())
}

/// The authenticated caller of a request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub username: String,
    pub role: ActorRole,
}

impl AuthUser {
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.role.can_administer() {
            return Ok(());
        }
        tracing::warn!(
            "User {} attempted admin operation without permissions",
            self.username
        );
        Err(ApiError::Forbidden)
    }

    pub fn require_agent_or_admin(&self) -> Result<(), ApiError> {
        if self.role.can_write() {
            return Ok(());
        }
        tracing::warn!(
            "User {} attempted agent operation without permissions",
            self.username
        );
        Err(ApiError::Forbidden)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        let token = extract_token(header).map_err(|e| {
            tracing::debug!("Rejected request: {}", e);
            ApiError::Unauthorized
        })?;

        let claims = state.auth.validate_token(token).map_err(|e| {
            tracing::warn!("JWT error: {}", e);
            ApiError::Unauthorized
        })?;

        Ok(AuthUser {
            username: claims.sub,
            role: claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> AuthConfig {
        AuthConfig::from_settings(&Settings::default()).unwrap()
    }

    #[test]
    fn test_token_generation() {
        let auth = auth();
        let token = auth.generate_token("agent", ActorRole::Agent).unwrap();
        let claims = auth.validate_token(&token).unwrap();

        assert_eq!(claims.sub, "agent");
        assert_eq!(claims.role, ActorRole::Agent);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_token_signed_with_other_secret() {
        let token = auth().generate_token("admin", ActorRole::Admin).unwrap();

        let settings = Settings {
            jwt_secret_key: "another-secret".to_string(),
            ..Settings::default()
        };
        let other = AuthConfig::from_settings(&settings).unwrap();
        assert!(other.validate_token(&token).is_err());
    }

    #[test]
    fn test_authenticate() {
        let auth = auth();
        assert_eq!(auth.authenticate("admin", "admin_password"), Some(ActorRole::Admin));
        assert_eq!(auth.authenticate("admin", "wrong"), None);
        assert_eq!(auth.authenticate("nobody", "admin_password"), None);
    }

    #[test]
    fn test_extract_token() {
        assert_eq!(extract_token(Some("Bearer abc")), Ok("abc"));
        assert!(extract_token(Some("Basic abc")).is_err());
        assert!(extract_token(None).is_err());
    }
}
