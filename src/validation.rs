//! Field-level validation for request bodies
//!
//! Checks accumulate into a list so the client sees every problem at once,
//! reported as `{ "errors": [{ "message", "field" }] }`.

use std::str::FromStr;

use crate::error::{FieldError, Result, SiteWorkError};

#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    pub fn error(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    /// Require a non-blank string no longer than `max_len` characters
    pub fn text(&mut self, field: &str, value: &str, max_len: usize) {
        if value.trim().is_empty() {
            self.error(field, format!("{} is required", field));
        } else if value.chars().count() > max_len {
            self.error(field, format!("{} must be at most {} characters", field, max_len));
        }
    }

    /// Optional string: only the length is checked when present
    pub fn optional_text(&mut self, field: &str, value: Option<&str>, max_len: usize) {
        if let Some(value) = value {
            if value.chars().count() > max_len {
                self.error(field, format!("{} must be at most {} characters", field, max_len));
            }
        }
    }

    pub fn email(&mut self, field: &str, value: &str) {
        let value = value.trim();
        let valid = match value.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && domain.contains('.')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
                    && !value.chars().any(char::is_whitespace)
            }
            None => false,
        };
        if !valid {
            self.error(field, "Invalid email address");
        }
    }

    pub fn range(&mut self, field: &str, value: Option<f64>, min: f64, max: f64) {
        if let Some(value) = value {
            if !value.is_finite() || value < min || value > max {
                self.error(field, format!("{} must be between {} and {}", field, min, max));
            }
        }
    }

    pub fn non_negative(&mut self, field: &str, value: Option<f64>) {
        if let Some(value) = value {
            if !value.is_finite() || value < 0.0 {
                self.error(field, format!("{} must be a non-negative number", field));
            }
        }
    }

    /// Parse an enum member, recording a field error on unknown values
    pub fn parse<T>(&mut self, field: &str, value: Option<&str>) -> Option<T>
    where
        T: FromStr<Err = SiteWorkError>,
    {
        let raw = value?;
        match raw.parse::<T>() {
            Ok(parsed) => Some(parsed),
            Err(_) => {
                self.error(field, format!("Invalid {} '{}'", field, raw));
                None
            }
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(SiteWorkError::Validation(self.errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::user::UserRole;

    #[test]
    fn test_collects_all_errors() {
        let mut v = Validator::new();
        v.text("name", "  ", 10);
        v.email("email", "nope");
        v.range("progress", Some(120.0), 0.0, 100.0);
        match v.finish() {
            Err(SiteWorkError::Validation(errors)) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["name", "email", "progress"]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_email_rules() {
        for good in ["a@b.co", "first.last@site.example.org"] {
            let mut v = Validator::new();
            v.email("email", good);
            assert!(v.is_valid(), "{} should be valid", good);
        }
        for bad in ["", "@b.co", "a@b", "a@.co", "a b@c.de"] {
            let mut v = Validator::new();
            v.email("email", bad);
            assert!(!v.is_valid(), "{} should be invalid", bad);
        }
    }

    #[test]
    fn test_parse_enum() {
        let mut v = Validator::new();
        assert_eq!(v.parse::<UserRole>("role", Some("manager")), Some(UserRole::Manager));
        assert_eq!(v.parse::<UserRole>("role", None), None);
        assert!(v.is_valid());
        assert_eq!(v.parse::<UserRole>("role", Some("owner")), None);
        assert!(!v.is_valid());
    }

    #[test]
    fn test_rejects_non_finite() {
        let mut v = Validator::new();
        v.non_negative("budget", Some(f64::NAN));
        assert!(!v.is_valid());
    }
}
