// Fundamental configuration constants
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3030;
pub const API_PREFIX: &str = "api";
pub const UPLOADS_PATH: &str = "uploads";

// Authentication constants
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;
pub const MAX_TOKEN_LENGTH: usize = 4096;
pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const AUTH_MIN_DURATION_MS: u64 = 100;
pub const DEFAULT_AUTH_ATTEMPTS_PER_MINUTE: u32 = 10;

// Password reset tokens are valid for exactly one hour
pub const RESET_TOKEN_TTL_SECS: i64 = 3600;
pub const RESET_TOKEN_BYTES: usize = 32;

// Request limits
pub const MAX_JSON_BODY_BYTES: u64 = 64 * 1024;
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;
pub const DEFAULT_UPLOAD_DIR: &str = "./uploads";

// Hosted database client
pub const DB_REQUEST_TIMEOUT_SECS: u64 = 10;
