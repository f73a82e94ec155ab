//! Field validation for new accounts.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::error;

use super::user_store::UserStore;
use crate::error::{FieldError, ValidationFailure};

/// Attribute map handed to a [`Validator`].
pub type ValidationPayload = Map<String, Value>;

/// Maximum username length in characters.
pub const USERNAME_MAX_LENGTH: usize = 15;

/// Minimum password length in characters.
pub const PASSWORD_MIN_LENGTH: usize = 6;

/// Maximum registration reason length in characters.
pub const REGISTER_REASON_MAX_LENGTH: usize = 50;

/// Validates an attribute payload.
#[async_trait]
pub trait Validator: Send + Sync {
    async fn validate(&self, payload: &ValidationPayload) -> Result<(), ValidationFailure>;
}

/// Rule set for registration payloads.
///
/// CAPTCHA answers are checked for presence only; verifying them with the
/// provider belongs to the provider integration.
pub struct UserValidator {
    store: Arc<dyn UserStore>,
}

impl UserValidator {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    async fn check_username(&self, payload: &ValidationPayload, errors: &mut Vec<FieldError>) {
        let username = payload.get("username").and_then(Value::as_str).unwrap_or("");
        if username.is_empty() {
            errors.push(FieldError::new("username", "username is required"));
            return;
        }
        if username.chars().count() > USERNAME_MAX_LENGTH {
            errors.push(FieldError::new(
                "username",
                format!("username may not be longer than {USERNAME_MAX_LENGTH} characters"),
            ));
        }
        if username.chars().any(char::is_whitespace) {
            errors.push(FieldError::new("username", "username may not contain spaces"));
        }

        match self.store.username_exists(username).await {
            Ok(true) => errors.push(FieldError::new(
                "username",
                "username has already been taken",
            )),
            Ok(false) => {}
            Err(e) => {
                error!(error = %e, "username uniqueness check failed");
                errors.push(FieldError::new("username", "username could not be verified"));
            }
        }
    }
}

#[async_trait]
impl Validator for UserValidator {
    async fn validate(&self, payload: &ValidationPayload) -> Result<(), ValidationFailure> {
        let mut errors = Vec::new();

        self.check_username(payload, &mut errors).await;

        // An absent key means the account is created without a password.
        match payload.get("password") {
            None => {}
            Some(Value::String(password)) => {
                if password.chars().count() < PASSWORD_MIN_LENGTH {
                    errors.push(FieldError::new(
                        "password",
                        format!("password must be at least {PASSWORD_MIN_LENGTH} characters"),
                    ));
                }
                if let Some(Value::String(confirmation)) = payload.get("password_confirmation") {
                    if confirmation != password {
                        errors.push(FieldError::new(
                            "password",
                            "password confirmation does not match",
                        ));
                    }
                }
            }
            Some(_) => errors.push(FieldError::new("password", "password is required")),
        }

        if let Some(reason) = payload.get("register_reason").and_then(Value::as_str) {
            if reason.chars().count() > REGISTER_REASON_MAX_LENGTH {
                errors.push(FieldError::new(
                    "register_reason",
                    format!(
                        "register reason may not be longer than {REGISTER_REASON_MAX_LENGTH} characters"
                    ),
                ));
            }
        }

        if let Some(Value::Array(challenge)) = payload.get("captcha") {
            let answered = |i: usize| {
                challenge
                    .get(i)
                    .and_then(Value::as_str)
                    .is_some_and(|s| !s.is_empty())
            };
            if !answered(0) || !answered(1) {
                errors.push(FieldError::new("captcha", "captcha is required"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationFailure::new(errors))
        }
    }
}

impl std::fmt::Debug for UserValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserValidator").finish()
    }
}
