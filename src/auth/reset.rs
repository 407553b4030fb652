//! Single-use password reset tokens
//!
//! Only the SHA-256 digest of a token is stored. A token is valid from its
//! issuance until exactly one hour later and can be redeemed once.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::auth::user::User;
use crate::constants::{RESET_TOKEN_BYTES, RESET_TOKEN_TTL_SECS};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResetToken {
    /// Hex SHA-256 of the raw token
    pub token_hash: String,
    pub user_id: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
}

impl ResetToken {
    pub fn new(token_hash: String, user_id: String, issued_at: DateTime<Utc>) -> Self {
        Self {
            token_hash,
            user_id,
            issued_at,
            expires_at: issued_at + Duration::seconds(RESET_TOKEN_TTL_SECS),
            used_at: None,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_used(&self) -> bool {
        self.used_at.is_some()
    }
}

/// Generate a fresh URL-safe random token
pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Hex SHA-256 digest of a raw token
pub fn digest_token(token: &str) -> String {
    Sha256::digest(token.as_bytes())
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect()
}

/// Delivers reset tokens to account holders
#[async_trait]
pub trait ResetNotifier: Send + Sync {
    async fn send_reset_link(&self, user: &User, token: &str) -> Result<()>;
}

/// Writes the reset link to the server log.
///
/// SECURITY: the link is a bearer credential for the account. Anyone with
/// log access can take over the account until the token expires. Replace
/// with a mail notifier before production use.
pub struct LogResetNotifier {
    public_url: String,
}

impl LogResetNotifier {
    pub fn new(public_url: &str) -> Self {
        Self {
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn reset_link(&self, token: &str) -> String {
        format!("{}/reset-password?token={}", self.public_url, token)
    }
}

#[async_trait]
impl ResetNotifier for LogResetNotifier {
    async fn send_reset_link(&self, user: &User, token: &str) -> Result<()> {
        log::info!("Password reset link for {}: {}", user.email, self.reset_link(token));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_expires_exactly_one_hour_after_issue() {
        let issued = Utc::now();
        let token = ResetToken::new("d".into(), "u".into(), issued);
        assert_eq!(token.expires_at - issued, Duration::hours(1));
        assert!(!token.is_expired_at(issued + Duration::minutes(59) + Duration::seconds(59)));
        assert!(token.is_expired_at(issued + Duration::hours(1)));
    }

    #[test]
    fn test_generated_tokens_are_unique_and_url_safe() {
        let a = generate_reset_token();
        let b = generate_reset_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_digest_is_stable_hex() {
        let digest = digest_token("abc");
        assert_eq!(digest, "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");
        assert_ne!(digest_token("abd"), digest);
    }

    #[test]
    fn test_reset_link() {
        let notifier = LogResetNotifier::new("https://app.example.com/");
        assert_eq!(
            notifier.reset_link("tok"),
            "https://app.example.com/reset-password?token=tok"
        );
    }
}
