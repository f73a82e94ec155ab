//! Raw registration input and the values derived from it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::NewUser;

/// Raw registration form fields, keyed by field name.
///
/// Recognised keys: `username`, `password`, `password_confirmation`,
/// `register_ip`, `register_port`, `register_reason`, `captcha_ticket`,
/// `captcha_rand_str`. Anything else is carried along untouched so
/// observers can read it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistrationInput(BTreeMap<String, String>);

impl RegistrationInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build input from `(field, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Whether `field` was supplied at all (an empty value counts).
    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.0.insert(field.into(), value.into());
    }

    /// Project onto the allow-listed account fields.
    ///
    /// A `register_port` that is not a valid port number is dropped.
    pub fn new_user(&self) -> NewUser {
        let text = |field: &str| self.get(field).unwrap_or_default().to_string();
        NewUser {
            username: text("username"),
            password: text("password"),
            register_ip: text("register_ip"),
            register_port: self
                .get("register_port")
                .and_then(|p| p.trim().parse::<u16>().ok()),
            register_reason: text("register_reason"),
        }
    }

    /// Field value as JSON, `null` when absent.
    pub(crate) fn value(&self, field: &str) -> Value {
        self.get(field).map_or(Value::Null, |v| Value::String(v.to_string()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RegistrationInput {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

/// CAPTCHA answer the validator must verify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptchaChallenge {
    pub ticket: String,
    pub rand_str: String,
    pub ip: String,
}

impl CaptchaChallenge {
    /// Challenge answered by `input`; missing fields become empty strings.
    pub fn from_input(input: &RegistrationInput) -> Self {
        let text = |field: &str| input.get(field).unwrap_or_default().to_string();
        Self {
            ticket: text("captcha_ticket"),
            rand_str: text("captcha_rand_str"),
            ip: text("register_ip"),
        }
    }

    /// Positional `[ticket, rand_str, ip]` form used in validation payloads.
    pub fn to_value(&self) -> Value {
        Value::Array(vec![
            self.ticket.clone().into(),
            self.rand_str.clone().into(),
            self.ip.clone().into(),
        ])
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn new_user_keeps_only_allow_listed_fields() {
        let input = RegistrationInput::from_pairs([
            ("username", "alice"),
            ("password", "secret1"),
            ("register_ip", "10.0.0.1"),
            ("register_port", "8080"),
            ("register_reason", "hello"),
            ("is_admin", "1"),
        ]);

        let user = input.new_user();
        assert_eq!(user.username, "alice");
        assert_eq!(user.password, "secret1");
        assert_eq!(user.register_port, Some(8080));
        assert_eq!(user.register_reason, "hello");
    }

    #[test]
    fn invalid_port_is_dropped() {
        let input = RegistrationInput::from_pairs([("register_port", "99999")]);
        assert_eq!(input.new_user().register_port, None);
    }

    #[test]
    fn empty_value_counts_as_supplied() {
        let input = RegistrationInput::from_pairs([("register_reason", "")]);
        assert!(input.has("register_reason"));
        assert!(!input.has("username"));
        assert_eq!(input.value("username"), Value::Null);
    }

    #[test]
    fn captcha_uses_register_ip() {
        let input = RegistrationInput::from_pairs([
            ("captcha_ticket", "t"),
            ("captcha_rand_str", "r"),
            ("register_ip", "1.2.3.4"),
        ]);
        let challenge = CaptchaChallenge::from_input(&input);
        assert_eq!(challenge.to_value(), serde_json::json!(["t", "r", "1.2.3.4"]));
    }

    #[test]
    fn deserializes_from_flat_map() {
        let input: RegistrationInput =
            serde_json::from_str(r#"{"username":"bob","password":""}"#).unwrap();
        assert_eq!(input.get("password"), Some(""));
    }
}
