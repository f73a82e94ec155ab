//! User model.

use anyhow::Result;
use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{DomainEvent, Outbox};

/// Account status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i16)]
pub enum UserStatus {
    #[default]
    Normal = 1,
    PendingReview = 2,
}

impl UserStatus {
    pub fn as_i16(self) -> i16 {
        self as i16
    }
}

/// Allow-listed fields a new account is built from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub register_ip: String,
    pub register_port: Option<u16>,
    pub register_reason: String,
}

/// User record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Assigned by the store; `None` until persisted.
    pub id: Option<Uuid>,
    pub username: String,
    /// Argon2 hash, or empty for accounts without a password.
    #[serde(skip_serializing)]
    pub password: String,
    pub register_ip: String,
    pub register_port: Option<u16>,
    pub register_reason: String,
    pub status: UserStatus,
    pub expired_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    outbox: Outbox,
}

impl User {
    /// Build an unsaved user, hashing the password.
    ///
    /// An empty password stays empty: the account exists but can never
    /// authenticate with a password.
    pub fn register(input: NewUser) -> Result<Self> {
        let password = if input.password.is_empty() {
            String::new()
        } else {
            hash_password(&input.password)?
        };

        Ok(Self {
            id: None,
            username: input.username,
            password,
            register_ip: input.register_ip,
            register_port: input.register_port,
            register_reason: input.register_reason,
            status: UserStatus::Normal,
            expired_at: None,
            created_at: Utc::now(),
            outbox: Outbox::new(),
        })
    }

    /// Check if this user awaits moderator review.
    pub fn is_pending_review(&self) -> bool {
        self.status == UserStatus::PendingReview
    }

    /// Whether a paid membership has lapsed (or never started).
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expired_at.is_some_and(|at| at <= now)
    }

    /// Current attribute values, keyed by column name.
    pub fn attributes(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut attrs = serde_json::Map::new();
        if let Some(id) = self.id {
            attrs.insert("id".into(), id.to_string().into());
        }
        attrs.insert("username".into(), self.username.clone().into());
        attrs.insert("password".into(), self.password.clone().into());
        attrs.insert("register_ip".into(), self.register_ip.clone().into());
        attrs.insert(
            "register_port".into(),
            self.register_port
                .map_or(serde_json::Value::Null, |p| p.into()),
        );
        attrs.insert(
            "register_reason".into(),
            self.register_reason.clone().into(),
        );
        attrs.insert("status".into(), self.status.as_i16().into());
        attrs.insert(
            "expired_at".into(),
            self.expired_at
                .map_or(serde_json::Value::Null, |t| t.to_rfc3339().into()),
        );
        attrs.insert("created_at".into(), self.created_at.to_rfc3339().into());
        attrs
    }

    /// Queue an event for dispatch after the user is saved.
    pub fn raise(&mut self, event: DomainEvent) {
        self.outbox.raise(event);
    }

    /// Drain pending events, oldest first.
    pub fn release_events(&mut self) -> Vec<DomainEvent> {
        self.outbox.release()
    }

    pub fn pending_events(&self) -> usize {
        self.outbox.len()
    }

    /// Verify a password against this user's hash.
    pub fn verify_password(&self, password: &str) -> bool {
        if self.password.is_empty() {
            return false;
        }

        let Ok(parsed_hash) = PasswordHash::new(&self.password) else {
            return false;
        };

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn new_user(password: &str) -> NewUser {
        NewUser {
            username: "alice".into(),
            password: password.into(),
            register_ip: "10.0.0.1".into(),
            register_port: Some(4431),
            register_reason: String::new(),
        }
    }

    #[test]
    fn test_password_hashing() {
        let user = User::register(new_user("test_password_123")).unwrap();

        assert!(user.password.starts_with("$argon2"));
        assert!(user.verify_password("test_password_123"));
        assert!(!user.verify_password("wrong_password"));
    }

    #[test]
    fn empty_password_never_authenticates() {
        let user = User::register(new_user("")).unwrap();

        assert!(user.password.is_empty());
        assert!(!user.verify_password(""));
        assert!(!user.verify_password("anything"));
    }

    #[test]
    fn new_user_defaults() {
        let user = User::register(new_user("secret1")).unwrap();
        assert_eq!(user.status, UserStatus::Normal);
        assert!(user.id.is_none());
        assert!(user.expired_at.is_none());
        assert!(!user.is_expired(Utc::now()));
    }

    #[test]
    fn attributes_carry_status_code() {
        let mut user = User::register(new_user("")).unwrap();
        user.status = UserStatus::PendingReview;
        let attrs = user.attributes();
        assert_eq!(attrs["status"], 2);
        assert_eq!(attrs["register_port"], 4431);
        assert!(!attrs.contains_key("id"));
    }

    #[test]
    fn password_hash_not_serialized() {
        let user = User::register(new_user("secret1")).unwrap();
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password").is_none());
    }
}
