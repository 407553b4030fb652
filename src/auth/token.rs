use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};

use crate::auth::user::User;
use crate::constants::{DEFAULT_TOKEN_TTL_HOURS, MAX_TOKEN_LENGTH};
use crate::error::{Result, SiteWorkError};

/// JWT Claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Email at issuance
    pub email: String,
    /// Role at issuance. Informational only: authorization re-reads the user.
    pub role: String,
    /// Expiration time (as UTC timestamp)
    pub exp: i64,
    /// Issued at (as UTC timestamp)
    pub iat: i64,
    /// Not before (as UTC timestamp)
    pub nbf: i64,
}

impl Claims {
    /// Creates claims for a user, valid for `hours`
    pub fn for_user(user: &User, hours: i64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: user.id.clone(),
            email: user.email.clone(),
            role: user.role.as_str().to_string(),
            exp: now + hours * 3600,
            iat: now,
            nbf: now,
        }
    }

    /// Check if the token is expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }
}

/// Manages JWT token operations
pub struct TokenManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_hours: i64,
}

impl TokenManager {
    /// Creates a new token manager with a secret and the default lifetime
    pub fn new(secret: &str) -> Self {
        Self::with_ttl(secret, DEFAULT_TOKEN_TTL_HOURS)
    }

    pub fn with_ttl(secret: &str, ttl_hours: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_nbf = true;
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl_hours,
        }
    }

    /// Issue a signed session token for a user
    pub fn issue_for(&self, user: &User) -> Result<String> {
        self.generate_token(&Claims::for_user(user, self.ttl_hours))
    }

    /// Generates a JWT token for the given claims
    pub fn generate_token(&self, claims: &Claims) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| SiteWorkError::SystemError(format!("Failed to generate token: {}", e)))
    }

    /// Validates and decodes a JWT token
    pub fn validate_token(&self, token: &str) -> Result<TokenData<Claims>> {
        if token.len() > MAX_TOKEN_LENGTH {
            return Err(SiteWorkError::AuthError("Token too long".to_string()));
        }
        if token.chars().any(|c| c.is_control()) {
            return Err(SiteWorkError::AuthError("Token contains invalid characters".to_string()));
        }

        decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            log::debug!("Token rejected: {}", e);
            SiteWorkError::AuthError("Invalid or expired token".to_string())
        })
    }

    /// Extracts claims from a token string
    pub fn get_claims(&self, token: &str) -> Result<Claims> {
        let token_data = self.validate_token(token)?;
        Ok(token_data.claims)
    }

    /// Validates a token and returns the user ID if valid
    pub fn validate_and_get_user_id(&self, token: &str) -> Result<String> {
        let claims = self.get_claims(token)?;

        if claims.sub.is_empty() {
            return Err(SiteWorkError::AuthError("Invalid token claims".to_string()));
        }

        Ok(claims.sub)
    }
}

/// Extracts bearer token from Authorization header
pub fn extract_bearer_token(auth_header: &str) -> Option<String> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Pick the request token: Authorization header first, then X-Auth-Token
pub fn extract_request_token(authorization: Option<&str>, x_auth_token: Option<&str>) -> Option<String> {
    if let Some(token) = authorization.and_then(extract_bearer_token) {
        return Some(token);
    }
    x_auth_token
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::user::UserRole;

    fn sample_user() -> User {
        User::new("Test User".into(), "test@example.com", UserRole::Manager, "hash".into())
    }

    #[test]
    fn test_issue_and_validate() {
        let manager = TokenManager::new("unit-test-signing-key-0123456789abcdef");
        let user = sample_user();
        let token = manager.issue_for(&user).unwrap();
        let claims = manager.get_claims(&token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, "manager");
        assert_eq!(claims.exp - claims.iat, DEFAULT_TOKEN_TTL_HOURS * 3600);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = TokenManager::new("unit-test-signing-key-0123456789abcdef");
        let other = TokenManager::new("another-signing-key-0123456789abcdef!");
        let token = issuer.issue_for(&sample_user()).unwrap();
        assert!(other.validate_token(&token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let manager = TokenManager::new("unit-test-signing-key-0123456789abcdef");
        let mut claims = Claims::for_user(&sample_user(), 1);
        claims.iat -= 7200;
        claims.nbf -= 7200;
        claims.exp = claims.iat + 3600;
        assert!(claims.is_expired());
        let token = manager.generate_token(&claims).unwrap();
        assert!(manager.validate_token(&token).is_err());
    }

    #[test]
    fn test_oversized_token_rejected() {
        let manager = TokenManager::new("unit-test-signing-key-0123456789abcdef");
        let token = "a".repeat(MAX_TOKEN_LENGTH + 1);
        assert!(matches!(manager.validate_token(&token), Err(SiteWorkError::AuthError(_))));
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc.def"), Some("abc.def".to_string()));
        assert_eq!(extract_bearer_token("Basic abc"), None);
        assert_eq!(extract_bearer_token("Bearer "), None);
    }

    #[test]
    fn test_extract_request_token_priority() {
        assert_eq!(
            extract_request_token(Some("Bearer first"), Some("second")),
            Some("first".to_string())
        );
        assert_eq!(extract_request_token(None, Some("second")), Some("second".to_string()));
        assert_eq!(extract_request_token(Some("Basic x"), None), None);
    }
}
