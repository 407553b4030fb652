//! Security-focused logging module to track security events

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Types of security events to track
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SecurityEvent {
    // Authentication events
    AuthenticationFailed { email: String, reason: String },
    AuthenticationSuccess { user_id: String },
    TokenValidationFailed { reason: String },

    // Authorization events
    PermissionDenied { user_id: String, action: String },
    OwnershipDenied { user_id: String, resource: String, resource_id: String },

    // Account events
    AccountCreated { user_id: String },
    PasswordChanged { user_id: String },
    PasswordResetRequested { email: String, known_account: bool },
    PasswordResetRejected { reason: String },
    RoleChanged { user_id: String, changed_by: String, role: String },
}

impl SecurityEvent {
    /// Key used for counting and alert thresholds
    fn key(&self) -> &'static str {
        match self {
            SecurityEvent::AuthenticationFailed { .. } => "auth_failed",
            SecurityEvent::AuthenticationSuccess { .. } => "auth_success",
            SecurityEvent::TokenValidationFailed { .. } => "token_validation_failed",
            SecurityEvent::PermissionDenied { .. } => "permission_denied",
            SecurityEvent::OwnershipDenied { .. } => "ownership_denied",
            SecurityEvent::AccountCreated { .. } => "account_created",
            SecurityEvent::PasswordChanged { .. } => "password_changed",
            SecurityEvent::PasswordResetRequested { .. } => "password_reset_requested",
            SecurityEvent::PasswordResetRejected { .. } => "password_reset_rejected",
            SecurityEvent::RoleChanged { .. } => "role_changed",
        }
    }
}

/// A logged event as returned to administrators
#[derive(Debug, Clone, Serialize)]
pub struct SecurityEventRecord {
    #[serde(flatten)]
    pub event: SecurityEvent,
    pub recorded_at: DateTime<Utc>,
    #[serde(skip)]
    timestamp: Instant,
}

/// Security logger for tracking and alerting on security events
pub struct SecurityLogger {
    events: RwLock<Vec<SecurityEventRecord>>,
    event_counts: RwLock<HashMap<&'static str, usize>>,
    max_events: usize,
    alert_thresholds: HashMap<&'static str, usize>,
}

impl SecurityLogger {
    /// Create a new security logger
    pub fn new() -> Self {
        let mut alert_thresholds = HashMap::new();
        alert_thresholds.insert("auth_failed", 5);
        alert_thresholds.insert("token_validation_failed", 10);
        alert_thresholds.insert("permission_denied", 20);
        alert_thresholds.insert("ownership_denied", 10);
        alert_thresholds.insert("password_reset_requested", 10);
        alert_thresholds.insert("password_reset_rejected", 5);

        Self {
            events: RwLock::new(Vec::new()),
            event_counts: RwLock::new(HashMap::new()),
            max_events: 10000,
            alert_thresholds,
        }
    }

    /// Log a security event
    pub async fn log_event(&self, event: SecurityEvent) {
        let key = event.key();

        {
            let mut events = self.events.write().await;
            events.push(SecurityEventRecord {
                event: event.clone(),
                recorded_at: Utc::now(),
                timestamp: Instant::now(),
            });

            // Limit memory usage
            if events.len() > self.max_events {
                let excess = events.len() - self.max_events;
                events.drain(0..excess);
            }
        }

        {
            let mut counts = self.event_counts.write().await;
            let count = counts.entry(key).or_insert(0);
            *count += 1;

            if let Some(&threshold) = self.alert_thresholds.get(key) {
                if *count >= threshold {
                    log::error!("SECURITY ALERT: {} events of type '{}' detected", count, key);
                    log::error!("Sample event: {:?}", event);
                    *count = 0; // Reset counter after alert
                }
            }
        }

        match &event {
            SecurityEvent::AuthenticationFailed { email, reason } => {
                log::warn!("SECURITY: Authentication failed - Email: {}, Reason: {}", email, reason);
            }
            SecurityEvent::AuthenticationSuccess { user_id } => {
                log::info!("SECURITY: Authentication success - User: {}", user_id);
            }
            SecurityEvent::TokenValidationFailed { reason } => {
                log::warn!("SECURITY: Token validation failed - Reason: {}", reason);
            }
            SecurityEvent::PermissionDenied { user_id, action } => {
                log::warn!("SECURITY: Permission denied - User: {}, Action: {}", user_id, action);
            }
            SecurityEvent::OwnershipDenied { user_id, resource, resource_id } => {
                log::warn!(
                    "SECURITY: Ownership check failed - User: {}, Resource: {} {}",
                    user_id,
                    resource,
                    resource_id
                );
            }
            SecurityEvent::AccountCreated { user_id } => {
                log::info!("SECURITY: Account created - User: {}", user_id);
            }
            SecurityEvent::PasswordChanged { user_id } => {
                log::info!("SECURITY: Password changed - User: {}", user_id);
            }
            SecurityEvent::PasswordResetRequested { email, known_account } => {
                log::info!(
                    "SECURITY: Password reset requested - Email: {}, Known account: {}",
                    email,
                    known_account
                );
            }
            SecurityEvent::PasswordResetRejected { reason } => {
                log::warn!("SECURITY: Password reset rejected - Reason: {}", reason);
            }
            SecurityEvent::RoleChanged { user_id, changed_by, role } => {
                log::warn!(
                    "SECURITY: Role changed - User: {}, New role: {}, By: {}",
                    user_id,
                    role,
                    changed_by
                );
            }
        }
    }

    /// Get security events recorded within `duration`, newest first
    pub async fn get_recent_events(&self, duration: Duration) -> Vec<SecurityEventRecord> {
        let events = self.events.read().await;
        let cutoff = Instant::now().checked_sub(duration);

        events
            .iter()
            .rev()
            .filter(|record| cutoff.map_or(true, |cutoff| record.timestamp > cutoff))
            .cloned()
            .collect()
    }

    /// Get event statistics (counts since the last alert per kind)
    pub async fn get_event_stats(&self) -> HashMap<&'static str, usize> {
        let counts = self.event_counts.read().await;
        counts.clone()
    }

    /// Clean up old events
    pub async fn cleanup_old_events(&self, max_age: Duration) {
        let mut events = self.events.write().await;
        if let Some(cutoff) = Instant::now().checked_sub(max_age) {
            events.retain(|event| event.timestamp > cutoff);
        }
    }

    /// Start periodic cleanup task
    pub fn start_cleanup_task(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(300)); // Every 5 minutes
            loop {
                interval.tick().await;
                self.cleanup_old_events(Duration::from_secs(3600 * 24)).await; // Keep 24 hours
            }
        });
    }
}

impl Default for SecurityLogger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_are_recorded_and_counted() {
        let logger = SecurityLogger::new();
        logger
            .log_event(SecurityEvent::PermissionDenied {
                user_id: "u1".into(),
                action: "manage:users".into(),
            })
            .await;
        logger
            .log_event(SecurityEvent::AuthenticationSuccess { user_id: "u1".into() })
            .await;

        let recent = logger.get_recent_events(Duration::from_secs(60)).await;
        assert_eq!(recent.len(), 2);
        assert!(matches!(recent[0].event, SecurityEvent::AuthenticationSuccess { .. }));

        let json = serde_json::to_value(&recent[1]).unwrap();
        assert_eq!(json["kind"], "permission_denied");
        assert_eq!(json["action"], "manage:users");
        assert!(json.get("recorded_at").is_some());
        let stats = logger.get_event_stats().await;
        assert_eq!(stats.get("permission_denied"), Some(&1));
    }

    #[tokio::test]
    async fn test_counter_resets_after_alert() {
        let logger = SecurityLogger::new();
        for _ in 0..5 {
            logger
                .log_event(SecurityEvent::AuthenticationFailed {
                    email: "x@example.com".into(),
                    reason: "bad password".into(),
                })
                .await;
        }
        let stats = logger.get_event_stats().await;
        assert_eq!(stats.get("auth_failed"), Some(&0));
    }
}
