//! TOML-based application configuration.
//!
//! Stores:
//! - Study server location
//! - Default session shape (cycles, focus and break minutes, subject)
//! - The account sessions are reported for
//! - Alert preferences
//!
//! Configuration is stored at `~/.config/planora/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::error::ConfigError;
use crate::timer::{
    SessionConfig, DEFAULT_BREAK_MINUTES, DEFAULT_FOCUS_MINUTES, DEFAULT_TOTAL_CYCLES,
};

/// Study server connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Session shape used when a fresh session starts without explicit options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDefaults {
    #[serde(default = "default_total_cycles")]
    pub total_cycles: u32,
    #[serde(default = "default_focus_minutes")]
    pub focus_minutes: u32,
    #[serde(default = "default_break_minutes")]
    pub break_minutes: u32,
    #[serde(default)]
    pub subject: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsConfig {
    /// Ring the terminal bell when a dialog becomes due.
    #[serde(default = "default_true")]
    pub bell: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/planora/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionDefaults,
    #[serde(default)]
    pub user: UserConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".into()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_total_cycles() -> u32 {
    DEFAULT_TOTAL_CYCLES
}
fn default_focus_minutes() -> u32 {
    DEFAULT_FOCUS_MINUTES
}
fn default_break_minutes() -> u32 {
    DEFAULT_BREAK_MINUTES
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            total_cycles: default_total_cycles(),
            focus_minutes: default_focus_minutes(),
            break_minutes: default_break_minutes(),
            subject: None,
        }
    }
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self { bell: true }
    }
}

impl SessionDefaults {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            total_cycles: self.total_cycles,
            focus_minutes: self.focus_minutes,
            break_minutes: self.break_minutes,
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(ConfigError::UnknownKey(key.to_string()));
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current
                    .as_object_mut()
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
                let existing = obj
                    .get(part)
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
                    ),
                    serde_json::Value::Number(_) => {
                        let n = value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?;
                        serde_json::Value::Number(n.into())
                    }
                    serde_json::Value::Object(_) => {
                        return Err(invalid("cannot replace a whole section".into()));
                    }
                    _ if value.is_empty() => serde_json::Value::Null,
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current
                .get_mut(part)
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        }

        Err(ConfigError::UnknownKey(key.to_string()))
    }

    fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("config.toml"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from disk or return (and write) the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content),
            Err(_) => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
        }
    }

    /// Parse and validate TOML content.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let cfg: Config =
            toml::from_str(content).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.clone(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(&path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Reject values the timer could never run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.session
            .session_config()
            .validate()
            .map_err(|e| ConfigError::InvalidValue {
                key: "session".into(),
                message: e.to_string(),
            })?;
        url::Url::parse(&self.server.base_url).map_err(|e| ConfigError::InvalidValue {
            key: "server.base_url".into(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without persisting it.
    ///
    /// An empty value clears optional string fields.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| {
            ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            }
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and persist. Returns error if key is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("falling back to default configuration: {e}");
            Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed = Config::parse(&toml_str).unwrap();
        assert_eq!(parsed.session.total_cycles, 4);
        assert_eq!(parsed.session.focus_minutes, 20);
        assert_eq!(parsed.session.break_minutes, 5);
        assert!(parsed.alerts.bell);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let cfg = Config::parse("[session]\nfocus_minutes = 45\n").unwrap();
        assert_eq!(cfg.session.focus_minutes, 45);
        assert_eq!(cfg.session.total_cycles, 4);
        assert_eq!(cfg.server.base_url, "http://127.0.0.1:5000");
        assert_eq!(cfg.server.timeout_secs, 10);
    }

    #[test]
    fn zero_cycles_rejected() {
        let result = Config::parse("[session]\ntotal_cycles = 0\n");
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("session.focus_minutes").as_deref(), Some("20"));
        assert_eq!(cfg.get("alerts.bell").as_deref(), Some("true"));
        assert_eq!(cfg.get("user.user_id").as_deref(), Some("null"));
        assert!(cfg.get("session.missing_key").is_none());
    }

    #[test]
    fn apply_updates_number_and_optional_string() {
        let mut cfg = Config::default();
        cfg.apply("session.total_cycles", "6").unwrap();
        cfg.apply("user.user_id", "student-42").unwrap();
        assert_eq!(cfg.session.total_cycles, 6);
        assert_eq!(cfg.user.user_id.as_deref(), Some("student-42"));

        cfg.apply("user.user_id", "").unwrap();
        assert!(cfg.user.user_id.is_none());
    }

    #[test]
    fn apply_rejects_unknown_key() {
        let mut cfg = Config::default();
        let result = cfg.apply("session.nonexistent_key", "value");
        assert!(matches!(result, Err(ConfigError::UnknownKey(_))));
    }

    #[test]
    fn apply_rejects_invalid_type() {
        let mut cfg = Config::default();
        assert!(cfg.apply("alerts.bell", "not_a_bool").is_err());
        assert!(cfg.apply("session.focus_minutes", "soon").is_err());
        assert!(cfg.alerts.bell);
        assert_eq!(cfg.session.focus_minutes, 20);
    }

    #[test]
    fn apply_rejects_invalid_url() {
        let mut cfg = Config::default();
        assert!(cfg.apply("server.base_url", "not a url").is_err());
        assert_eq!(cfg.server.base_url, "http://127.0.0.1:5000");
    }
}
