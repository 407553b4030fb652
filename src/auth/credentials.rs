//! Credential store: account lookup, sign-up, login, password changes and resets

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::auth::password::{check_password_strength, hash_password, verify_password};
use crate::auth::reset::{digest_token, generate_reset_token, ResetNotifier, ResetToken};
use crate::auth::user::{initials, normalize_email, User, UserRole};
use crate::constants::AUTH_MIN_DURATION_MS;
use crate::error::{Result, SiteWorkError};
use crate::security::AuthTimer;
use crate::security_logger::{SecurityEvent, SecurityLogger};
use crate::storage::SharedStorage;
use crate::validation::Validator;

const MAX_NAME_LENGTH: usize = 100;
const MAX_EMAIL_LENGTH: usize = 254;
const MAX_COMPANY_LENGTH: usize = 120;
const MAX_PHONE_LENGTH: usize = 32;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub company: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub company: Option<String>,
    pub phone: Option<String>,
}

pub struct CredentialStore {
    storage: SharedStorage,
    notifier: Arc<dyn ResetNotifier>,
    security_logger: Arc<SecurityLogger>,
    min_auth_duration: Duration,
}

impl CredentialStore {
    pub fn new(
        storage: SharedStorage,
        notifier: Arc<dyn ResetNotifier>,
        security_logger: Arc<SecurityLogger>,
    ) -> Self {
        Self {
            storage,
            notifier,
            security_logger,
            min_auth_duration: Duration::from_millis(AUTH_MIN_DURATION_MS),
        }
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.storage.users().get_user_by_email(&normalize_email(email)).await
    }

    pub async fn find_user_by_id(&self, user_id: &str) -> Result<Option<User>> {
        self.storage.users().get_user(user_id).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.storage.users().list_users().await
    }

    /// Register a new account with the given role
    pub async fn create_user(&self, request: SignupRequest, role: UserRole) -> Result<User> {
        let mut validator = Validator::new();
        validator.text("name", &request.name, MAX_NAME_LENGTH);
        validator.email("email", &request.email);
        validator.optional_text("email", Some(request.email.as_str()), MAX_EMAIL_LENGTH);
        validator.optional_text("company", request.company.as_deref(), MAX_COMPANY_LENGTH);
        validator.optional_text("phone", request.phone.as_deref(), MAX_PHONE_LENGTH);
        if let Some(error) = check_password_strength(&request.password, "password") {
            validator.push(error);
        }
        validator.finish()?;

        let password_hash = hash_password(&request.password)?;
        let mut user = User::new(request.name.trim().to_string(), &request.email, role, password_hash);
        user.company = non_blank(request.company);
        user.phone = non_blank(request.phone);

        // The backend enforces email uniqueness; this only gives a clearer error first
        if self.storage.users().get_user_by_email(&user.email).await?.is_some() {
            return Err(SiteWorkError::Conflict("Email already registered".to_string()));
        }
        let user = self.storage.users().create_user(user).await?;

        self.security_logger
            .log_event(SecurityEvent::AccountCreated { user_id: user.id.clone() })
            .await;
        log::info!("Created {} account {}", user.role, user.id);
        Ok(user)
    }

    /// Check an email/password pair. Takes at least a fixed minimum time
    /// whether or not the account exists.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>> {
        let timer = AuthTimer::new(self.min_auth_duration);
        let user = self.find_user_by_email(email).await;

        let outcome = match user {
            Ok(Some(user)) if verify_password(password, &user.password_hash) => Ok(Some(user)),
            Ok(Some(_)) => {
                self.log_auth_failure(email, "wrong password").await;
                Ok(None)
            }
            Ok(None) => {
                self.log_auth_failure(email, "unknown account").await;
                Ok(None)
            }
            Err(e) => Err(e),
        };

        timer.wait().await;
        if let Ok(Some(user)) = &outcome {
            self.security_logger
                .log_event(SecurityEvent::AuthenticationSuccess { user_id: user.id.clone() })
                .await;
        }
        outcome
    }

    pub async fn change_password(&self, user_id: &str, request: ChangePasswordRequest) -> Result<()> {
        let mut user = self
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| SiteWorkError::NotFound("User".to_string()))?;

        if !verify_password(&request.current_password, &user.password_hash) {
            self.log_auth_failure(&user.email, "wrong current password").await;
            return Err(SiteWorkError::invalid_field(
                "current_password",
                "Current password is incorrect",
            ));
        }
        if let Some(error) = check_password_strength(&request.new_password, "new_password") {
            return Err(SiteWorkError::Validation(vec![error]));
        }

        user.password_hash = hash_password(&request.new_password)?;
        user.touch();
        self.storage.users().update_user(user).await?;

        self.security_logger
            .log_event(SecurityEvent::PasswordChanged { user_id: user_id.to_string() })
            .await;
        Ok(())
    }

    pub async fn update_profile(&self, user_id: &str, request: UpdateProfileRequest) -> Result<User> {
        let mut validator = Validator::new();
        if let Some(name) = &request.name {
            validator.text("name", name, MAX_NAME_LENGTH);
        }
        validator.optional_text("company", request.company.as_deref(), MAX_COMPANY_LENGTH);
        validator.optional_text("phone", request.phone.as_deref(), MAX_PHONE_LENGTH);
        validator.finish()?;

        let mut user = self
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| SiteWorkError::NotFound("User".to_string()))?;

        if let Some(name) = request.name {
            user.name = name.trim().to_string();
            user.avatar = initials(&user.name);
        }
        if request.company.is_some() {
            user.company = non_blank(request.company);
        }
        if request.phone.is_some() {
            user.phone = non_blank(request.phone);
        }
        user.touch();

        self.storage.users().update_user(user.clone()).await?;
        Ok(user)
    }

    pub async fn update_role(&self, actor_id: &str, user_id: &str, role: UserRole) -> Result<User> {
        let mut user = self
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| SiteWorkError::NotFound("User".to_string()))?;

        if user.id == actor_id && role != user.role {
            return Err(SiteWorkError::BadRequest("You cannot change your own role".to_string()));
        }

        user.role = role;
        user.touch();
        self.storage.users().update_user(user.clone()).await?;

        self.security_logger
            .log_event(SecurityEvent::RoleChanged {
                user_id: user.id.clone(),
                changed_by: actor_id.to_string(),
                role: role.to_string(),
            })
            .await;
        Ok(user)
    }

    /// Start a password reset. Succeeds whether or not the account exists.
    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        let user = self.find_user_by_email(email).await?;

        self.security_logger
            .log_event(SecurityEvent::PasswordResetRequested {
                email: normalize_email(email),
                known_account: user.is_some(),
            })
            .await;

        if let Some(user) = user {
            let token = self.issue_reset_token_at(&user, Utc::now()).await?;
            self.notifier.send_reset_link(&user, &token).await?;
        }
        Ok(())
    }

    /// Store the digest of a fresh reset token and return the raw token
    pub async fn issue_reset_token_at(&self, user: &User, now: DateTime<Utc>) -> Result<String> {
        let reset_tokens = self.storage.reset_tokens();
        let removed = reset_tokens.delete_expired_reset_tokens(now).await?;
        if removed > 0 {
            log::debug!("Dropped {} expired reset tokens", removed);
        }

        let token = generate_reset_token();
        reset_tokens
            .store_reset_token(ResetToken::new(digest_token(&token), user.id.clone(), now))
            .await?;
        Ok(token)
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<()> {
        self.reset_password_at(token, new_password, Utc::now()).await
    }

    /// Redeem a reset token at `now`, setting a new password
    pub async fn reset_password_at(&self, token: &str, new_password: &str, now: DateTime<Utc>) -> Result<()> {
        if let Some(error) = check_password_strength(new_password, "password") {
            return Err(SiteWorkError::Validation(vec![error]));
        }

        let token_hash = digest_token(token.trim());
        let reset_tokens = self.storage.reset_tokens();
        let stored = match reset_tokens.get_reset_token(&token_hash).await? {
            Some(stored) => stored,
            None => return self.reject_reset("unknown token").await,
        };
        if stored.is_used() {
            return self.reject_reset("token already used").await;
        }
        if stored.is_expired_at(now) {
            return self.reject_reset("token expired").await;
        }
        if !reset_tokens.mark_reset_token_used(&token_hash, now).await? {
            return self.reject_reset("token already used").await;
        }

        let mut user = self
            .find_user_by_id(&stored.user_id)
            .await?
            .ok_or_else(|| SiteWorkError::NotFound("User".to_string()))?;
        user.password_hash = hash_password(new_password)?;
        user.touch();
        self.storage.users().update_user(user).await?;

        self.security_logger
            .log_event(SecurityEvent::PasswordChanged { user_id: stored.user_id })
            .await;
        Ok(())
    }

    async fn reject_reset(&self, reason: &str) -> Result<()> {
        self.security_logger
            .log_event(SecurityEvent::PasswordResetRejected { reason: reason.to_string() })
            .await;
        Err(SiteWorkError::BadRequest("Invalid or expired reset token".to_string()))
    }

    async fn log_auth_failure(&self, email: &str, reason: &str) {
        self.security_logger
            .log_event(SecurityEvent::AuthenticationFailed {
                email: normalize_email(email),
                reason: reason.to_string(),
            })
            .await;
    }

    #[cfg(test)]
    pub(crate) fn with_min_auth_duration(mut self, duration: Duration) -> Self {
        self.min_auth_duration = duration;
        self
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorageProvider;
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct CapturingNotifier {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl ResetNotifier for CapturingNotifier {
        async fn send_reset_link(&self, user: &User, token: &str) -> Result<()> {
            self.sent.lock().await.push((user.email.clone(), token.to_string()));
            Ok(())
        }
    }

    fn store() -> (CredentialStore, Arc<CapturingNotifier>) {
        let notifier = Arc::new(CapturingNotifier::default());
        let store = CredentialStore::new(
            Arc::new(MemoryStorageProvider::new()),
            notifier.clone(),
            Arc::new(SecurityLogger::new()),
        )
        .with_min_auth_duration(Duration::from_millis(1));
        (store, notifier)
    }

    fn signup(name: &str, email: &str, password: &str) -> SignupRequest {
        SignupRequest {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_signup_and_authenticate() {
        let (store, _) = store();
        let user = store
            .create_user(signup("Jane Doe", "Jane@Example.com", "password123"), UserRole::User)
            .await
            .unwrap();
        assert_eq!(user.email, "jane@example.com");
        assert_eq!(user.avatar, "JD");

        let found = store.authenticate("JANE@example.com", "password123").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));
        assert!(store.authenticate("jane@example.com", "wrong-pass1").await.unwrap().is_none());
        assert!(store.authenticate("nobody@example.com", "password123").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let (store, _) = store();
        store
            .create_user(signup("A", "dup@example.com", "password123"), UserRole::User)
            .await
            .unwrap();
        let err = store
            .create_user(signup("B", "DUP@example.com", "password456"), UserRole::User)
            .await
            .unwrap_err();
        assert!(matches!(err, SiteWorkError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_signup_validation_lists_fields() {
        let (store, _) = store();
        let err = store
            .create_user(signup("", "not-an-email", "short"), UserRole::User)
            .await
            .unwrap_err();
        match err {
            SiteWorkError::Validation(errors) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
                assert!(fields.contains(&"name"));
                assert!(fields.contains(&"email"));
                assert!(fields.contains(&"password"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_change_password_requires_current() {
        let (store, _) = store();
        let user = store
            .create_user(signup("A", "a@example.com", "password123"), UserRole::User)
            .await
            .unwrap();

        let wrong = ChangePasswordRequest {
            current_password: "nope".into(),
            new_password: "newpass456".into(),
        };
        assert!(store.change_password(&user.id, wrong).await.is_err());

        let right = ChangePasswordRequest {
            current_password: "password123".into(),
            new_password: "newpass456".into(),
        };
        store.change_password(&user.id, right).await.unwrap();
        assert!(store.authenticate("a@example.com", "newpass456").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_profile_update_rederives_initials() {
        let (store, _) = store();
        let user = store
            .create_user(signup("Jane Doe", "jd@example.com", "password123"), UserRole::User)
            .await
            .unwrap();
        let updated = store
            .update_profile(
                &user.id,
                UpdateProfileRequest {
                    name: Some("mary ann smith".into()),
                    company: Some("Acme Build".into()),
                    phone: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.avatar, "MA");
        assert_eq!(updated.company.as_deref(), Some("Acme Build"));
    }

    #[tokio::test]
    async fn test_reset_token_single_use() {
        let (store, notifier) = store();
        store
            .create_user(signup("A", "r@example.com", "password123"), UserRole::User)
            .await
            .unwrap();

        store.forgot_password("r@example.com").await.unwrap();
        let token = notifier.sent.lock().await[0].1.clone();

        store.reset_password(&token, "brandnew99").await.unwrap();
        assert!(store.authenticate("r@example.com", "brandnew99").await.unwrap().is_some());

        let err = store.reset_password(&token, "another123").await.unwrap_err();
        assert!(matches!(err, SiteWorkError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_reset_token_expires_after_one_hour() {
        let (store, _) = store();
        let user = store
            .create_user(signup("A", "e@example.com", "password123"), UserRole::User)
            .await
            .unwrap();

        let issued = Utc::now();
        let token = store.issue_reset_token_at(&user, issued).await.unwrap();
        let err = store
            .reset_password_at(&token, "brandnew99", issued + ChronoDuration::hours(1))
            .await
            .unwrap_err();
        assert!(matches!(err, SiteWorkError::BadRequest(_)));

        let token = store.issue_reset_token_at(&user, issued).await.unwrap();
        store
            .reset_password_at(&token, "brandnew99", issued + ChronoDuration::minutes(59))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_forgot_password_unknown_email_is_silent() {
        let (store, notifier) = store();
        store.forgot_password("ghost@example.com").await.unwrap();
        assert!(notifier.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_cannot_change_own_role() {
        let (store, _) = store();
        let admin = store
            .create_user(signup("Ad Min", "admin@example.com", "password123"), UserRole::Admin)
            .await
            .unwrap();
        let user = store
            .create_user(signup("Us Er", "user@example.com", "password123"), UserRole::User)
            .await
            .unwrap();

        assert!(store.update_role(&admin.id, &admin.id, UserRole::User).await.is_err());
        let promoted = store.update_role(&admin.id, &user.id, UserRole::Manager).await.unwrap();
        assert_eq!(promoted.role, UserRole::Manager);
    }
}
