//! Server configuration module
//! Reads the HTTP listener, token, upload and database settings from the environment

use crate::constants::{
    DEFAULT_AUTH_ATTEMPTS_PER_MINUTE, DEFAULT_HOST, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_PORT,
    DEFAULT_TOKEN_TTL_HOURS, DEFAULT_UPLOAD_DIR,
};
use crate::error::{Result, SiteWorkError};
use crate::storage::postgrest::parse_database_url;
use crate::storage::StorageConfig;
use std::env;
use std::path::PathBuf;

/// Server configuration parameters
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// JWT secret for token signing/validation
    pub jwt_secret: String,
    /// Lifetime of issued session tokens
    pub token_ttl_hours: i64,
    /// Rate limit: login and reset attempts per minute per email
    pub auth_attempts_per_minute: u32,
    /// Directory that receives uploaded blobs
    pub upload_dir: PathBuf,
    pub max_upload_bytes: u64,
    /// Base URL of the web app, used in password reset links
    pub public_url: String,
    /// Development mode (relaxes nothing security-relevant, only logging)
    pub development_mode: bool,
    /// Persistence backend
    pub storage: StorageConfig,
    /// TLS configuration
    pub tls_cert_path: Option<String>,
    pub tls_key_path: Option<String>,
    /// Enable TLS
    pub enable_tls: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        panic!("ServerConfig::default() is not allowed for security reasons. Use ServerConfig::from_env() instead.");
    }
}

fn env_flag(name: &str) -> Option<bool> {
    env::var(name).ok().map(|v| v.to_lowercase() == "true" || v == "1")
}

/// First non-empty value among `names`
fn env_first(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| env::var(name).ok())
        .find(|value| !value.trim().is_empty())
}

impl ServerConfig {
    /// Create a test configuration - DANGEROUS: Only for testing!
    pub fn for_testing() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            jwt_secret: "test-jwt-secret-only-for-unit-tests-never-use-in-production".to_string(),
            token_ttl_hours: DEFAULT_TOKEN_TTL_HOURS,
            auth_attempts_per_minute: DEFAULT_AUTH_ATTEMPTS_PER_MINUTE,
            upload_dir: env::temp_dir().join(format!("sitework-test-uploads-{}", uuid::Uuid::new_v4())),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            public_url: "http://localhost:5173".to_string(),
            development_mode: true,
            storage: StorageConfig::memory(),
            tls_cert_path: None,
            tls_key_path: None,
            enable_tls: false,
        }
    }

    /// Validate that a secret meets security requirements
    fn validate_secret(secret: &str, secret_type: &str) -> Result<()> {
        if secret.len() < 32 {
            return Err(SiteWorkError::ConfigError(format!(
                "{} secret must be at least 32 characters long",
                secret_type
            )));
        }

        // Check for insecure default or example values
        let insecure_patterns = [
            "your-secret-key",
            "change-this",
            "changeme",
            "test-secret",
            "default",
            "secret",
            "password",
            "12345",
        ];

        for pattern in &insecure_patterns {
            if secret.to_lowercase().contains(pattern) {
                return Err(SiteWorkError::ConfigError(format!(
                    "{} secret contains insecure pattern '{}'. Please use a secure random secret generated with: openssl rand -base64 32",
                    secret_type, pattern
                )));
            }
        }

        // Ensure some complexity
        if secret.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(SiteWorkError::ConfigError(format!(
                "{} secret should contain mixed characters (letters, numbers, symbols) for security",
                secret_type
            )));
        }

        Ok(())
    }

    /// Load configuration from environment variables if available
    pub fn from_env() -> Result<Self> {
        let host = env::var("SITEWORK_HOST").unwrap_or(DEFAULT_HOST.to_string());
        let port = env::var("SITEWORK_PORT")
            .or_else(|_| env::var("PORT"))
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let jwt_secret = env::var("SITEWORK_JWT_SECRET")
            .or_else(|_| env::var("JWT_SECRET"))
            .map_err(|_| {
                SiteWorkError::ConfigError(
                    "JWT_SECRET environment variable is required for security. \
                     Generate one with: openssl rand -base64 32"
                        .to_string(),
                )
            })?;

        let token_ttl_hours = env::var("SITEWORK_TOKEN_TTL_HOURS")
            .ok()
            .and_then(|h| h.parse().ok())
            .filter(|h: &i64| *h > 0)
            .unwrap_or(DEFAULT_TOKEN_TTL_HOURS);

        let auth_attempts_per_minute = env::var("SITEWORK_AUTH_ATTEMPTS_PER_MINUTE")
            .ok()
            .and_then(|r| r.parse().ok())
            .filter(|r: &u32| *r > 0)
            .unwrap_or(DEFAULT_AUTH_ATTEMPTS_PER_MINUTE);

        let upload_dir = env::var("SITEWORK_UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_UPLOAD_DIR));

        let max_upload_bytes = env::var("SITEWORK_MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|b| b.parse().ok())
            .filter(|b: &u64| *b > 0)
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        let public_url = env::var("SITEWORK_PUBLIC_URL")
            .unwrap_or_else(|_| format!("http://localhost:{}", port));

        let development_mode = env_flag("SITEWORK_DEVELOPMENT_MODE").unwrap_or(false); // SECURITY: Default to production mode

        let db_url = env_first(&["SITEWORK_DB_URL", "SUPABASE_URL"]);
        let db_key = env_first(&["SITEWORK_DB_KEY", "SUPABASE_ANON_KEY"]);
        if let Some(url) = &db_url {
            parse_database_url(url)?;
        }
        if db_url.is_some() != db_key.is_some() {
            log::warn!("Only one of SITEWORK_DB_URL / SITEWORK_DB_KEY is set, falling back to in-memory store");
        }
        // Demo accounts share a published password, so seeding is opt-in
        let seed_demo_data = env_flag("SITEWORK_SEED_DEMO_DATA").unwrap_or(development_mode);
        let storage = StorageConfig::select(db_url, db_key, seed_demo_data);

        // TLS configuration
        let enable_tls = env_flag("SITEWORK_ENABLE_TLS").unwrap_or(false);
        let tls_cert_path = env::var("SITEWORK_TLS_CERT_PATH").ok();
        let tls_key_path = env::var("SITEWORK_TLS_KEY_PATH").ok();

        // Validate TLS configuration if enabled
        if enable_tls {
            if tls_cert_path.is_none() || tls_key_path.is_none() {
                return Err(SiteWorkError::ConfigError(
                    "TLS is enabled but SITEWORK_TLS_CERT_PATH or SITEWORK_TLS_KEY_PATH is not set"
                        .to_string(),
                ));
            }

            // Validate that certificate and key files exist
            if let (Some(cert_path), Some(key_path)) = (&tls_cert_path, &tls_key_path) {
                if !std::path::Path::new(cert_path).exists() {
                    return Err(SiteWorkError::ConfigError(format!(
                        "TLS certificate file does not exist: {}",
                        cert_path
                    )));
                }
                if !std::path::Path::new(key_path).exists() {
                    return Err(SiteWorkError::ConfigError(format!(
                        "TLS private key file does not exist: {}",
                        key_path
                    )));
                }
            }
        }

        Self::validate_secret(&jwt_secret, "JWT")?;

        Ok(Self {
            host,
            port,
            jwt_secret,
            token_ttl_hours,
            auth_attempts_per_minute,
            upload_dir,
            max_upload_bytes,
            public_url,
            development_mode,
            storage,
            tls_cert_path,
            tls_key_path,
            enable_tls,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "ServerConfig::default() is not allowed for security reasons")]
    fn test_default_panics() {
        let _ = ServerConfig::default();
    }

    #[test]
    fn test_for_testing_works_in_tests() {
        let config = ServerConfig::for_testing();
        assert!(config.jwt_secret.contains("test"));
        assert!(config.development_mode);
        assert!(!config.storage.is_hosted());
    }

    #[test]
    fn test_secret_rules() {
        assert!(ServerConfig::validate_secret("short", "JWT").is_err());
        assert!(ServerConfig::validate_secret(&"a".repeat(40), "JWT").is_err());
        assert!(ServerConfig::validate_secret("my-Secret-value-that-is-long-enough-1", "JWT").is_err());
        assert!(ServerConfig::validate_secret("q8Zr1v-Kp3x9Lm2Tn7Wb4Yc6Hd0Js5Fg", "JWT").is_ok());
    }

    #[test]
    fn test_database_url_rules() {
        assert!(parse_database_url("https://abc.supabase.co").is_ok());
        assert!(parse_database_url("not a url").is_err());
        assert!(parse_database_url("ftp://db.example.com").is_err());
    }

    #[test]
    fn test_from_env_requires_secrets() {
        // Clear any existing env vars
        env::remove_var("SITEWORK_JWT_SECRET");
        env::remove_var("JWT_SECRET");

        let result = ServerConfig::from_env();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("JWT_SECRET"));
    }
}
