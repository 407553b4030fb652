use sitework::auth::password::{hash_password, verify_password};
use sitework::auth::reset::{digest_token, ResetToken};
use sitework::auth::token::{extract_request_token, Claims, TokenManager};
use sitework::auth::user::{User, UserRole};

const SECRET: &str = "q8Zr1v-Kp3x9Lm2Tn7Wb4Yc6Hd0Js5Fg-integration";

fn sample_user() -> User {
    User::new("Test User".to_string(), "test@example.com", UserRole::Manager, "hash".to_string())
}

#[test]
fn test_jwt_token_creation_and_validation() {
    let token_manager = TokenManager::new(SECRET);
    let user = sample_user();

    let token = token_manager.issue_for(&user).unwrap();
    assert!(!token.is_empty());

    let validated = token_manager.validate_token(&token).unwrap();
    assert_eq!(validated.claims.sub, user.id);
    assert_eq!(validated.claims.email, "test@example.com");
    assert_eq!(validated.claims.role, "manager");
    assert_eq!(validated.claims.exp - validated.claims.iat, 24 * 3600);
}

#[test]
fn test_invalid_token_validation() {
    let token_manager = TokenManager::new(SECRET);
    assert!(token_manager.validate_token("invalid.token.here").is_err());
}

#[test]
fn test_expired_token() {
    let token_manager = TokenManager::new(SECRET);
    let mut claims = Claims::for_user(&sample_user(), 1);

    // Manually set expiration to past
    claims.exp = claims.iat - 3600;
    assert!(claims.is_expired());

    let token = token_manager.generate_token(&claims).unwrap();
    assert!(token_manager.validate_token(&token).is_err());
}

#[test]
fn test_custom_ttl() {
    let token_manager = TokenManager::with_ttl(SECRET, 2);
    let token = token_manager.issue_for(&sample_user()).unwrap();
    let claims = token_manager.get_claims(&token).unwrap();
    assert_eq!(claims.exp - claims.iat, 2 * 3600);
}

#[test]
fn test_token_header_sources() {
    assert_eq!(
        extract_request_token(Some("Bearer abc"), Some("xyz")),
        Some("abc".to_string())
    );
    assert_eq!(extract_request_token(Some("Basic abc"), Some("xyz")), Some("xyz".to_string()));
    assert_eq!(extract_request_token(None, None), None);
}

#[test]
fn test_password_hash_roundtrip() {
    let hash = hash_password("correct horse 9").unwrap();
    assert!(verify_password("correct horse 9", &hash));
    assert!(!verify_password("wrong horse 9", &hash));
    assert_ne!(hash, hash_password("correct horse 9").unwrap());
}

#[test]
fn test_reset_token_lifetime() {
    let issued = chrono::Utc::now();
    let token = ResetToken::new(digest_token("raw"), "user-1".to_string(), issued);
    assert!(!token.is_expired_at(issued + chrono::Duration::seconds(3599)));
    assert!(token.is_expired_at(issued + chrono::Duration::seconds(3600)));
    assert!(!token.is_used());
}
