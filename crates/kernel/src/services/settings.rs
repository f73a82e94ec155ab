//! Site settings lookups.
//!
//! Settings are scoped key/value pairs (`default`, `qcloud`, ...). Values are
//! loosely typed JSON and are compared with loose semantics: `"2"` equals
//! `2`, and `0`, `"0"`, `""`, `false` and missing keys are all false.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

/// Scope used when a setting has no provider scope.
pub const DEFAULT_SCOPE: &str = "default";

/// Read-only source of site settings.
pub trait SettingsRepository: Send + Sync {
    /// Raw value of `key` in `scope`, if set.
    fn get(&self, key: &str, scope: &str) -> Option<Value>;

    /// Value of `key`, or `default` when unset.
    fn get_or(&self, key: &str, scope: &str, default: Value) -> Value {
        self.get(key, scope).unwrap_or(default)
    }

    /// Truthiness of `key`; unset is false.
    fn flag(&self, key: &str, scope: &str) -> bool {
        self.get(key, scope).is_some_and(|v| is_truthy(&v))
    }
}

/// Loose truthiness of a setting value.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Loose equality of a setting value with an integer.
pub fn loose_eq_int(value: &Value, n: i64) -> bool {
    match value {
        Value::Null => n == 0,
        Value::Bool(b) => *b == (n != 0),
        Value::Number(num) => num
            .as_i64()
            .map_or_else(|| num.as_f64() == Some(n as f64), |i| i == n),
        Value::String(s) => s.trim().parse::<f64>().is_ok_and(|f| f == n as f64),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Loose equality of a setting value with a string.
pub fn loose_eq_str(value: &Value, s: &str) -> bool {
    match value {
        Value::String(v) => v == s,
        Value::Number(n) => n.to_string() == s,
        Value::Bool(b) => is_truthy(&Value::String(s.to_string())) == *b,
        Value::Null => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// In-memory settings, optionally loaded from a TOML file.
///
/// Top-level tables are scopes; top-level scalar keys belong to
/// [`DEFAULT_SCOPE`]:
///
/// ```toml
/// register_validate = true
/// site_mode = "pay"
///
/// [qcloud]
/// qcloud_captcha = true
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemorySettings {
    values: HashMap<(String, String), Value>,
}

impl InMemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    pub fn with(mut self, scope: &str, key: &str, value: impl Into<Value>) -> Self {
        self.set(scope, key, value);
        self
    }

    pub fn set(&mut self, scope: &str, key: &str, value: impl Into<Value>) {
        self.values
            .insert((scope.to_string(), key.to_string()), value.into());
    }

    /// Parse settings from TOML text.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let table: toml::Table = input.parse().context("invalid settings TOML")?;
        let mut settings = Self::new();

        for (name, value) in table {
            match value {
                toml::Value::Table(scoped) => {
                    for (key, value) in scoped {
                        let json = serde_json::to_value(value)
                            .with_context(|| format!("invalid value for {name}.{key}"))?;
                        settings.set(&name, &key, json);
                    }
                }
                other => {
                    let json = serde_json::to_value(other)
                        .with_context(|| format!("invalid value for {name}"))?;
                    settings.set(DEFAULT_SCOPE, &name, json);
                }
            }
        }

        Ok(settings)
    }

    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        Self::from_toml_str(&text)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl SettingsRepository for InMemorySettings {
    fn get(&self, key: &str, scope: &str) -> Option<Value> {
        self.values
            .get(&(scope.to_string(), key.to_string()))
            .cloned()
    }
}
