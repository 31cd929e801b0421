//! Engine configuration and attribute files
//!
//! Configuration is read from TOML:
//!
//! ```toml
//! [delimiters]
//! start = "$"
//! stop = "$"
//!
//! [render]
//! trace = true
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::value::Value;

/// Errors that can occur when loading configuration or attribute files
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Characters that open and close an expression island in template text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Delimiters {
    pub start: char,
    pub stop: char,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            start: '<',
            stop: '>',
        }
    }
}

impl Delimiters {
    pub fn new(start: char, stop: char) -> Self {
        Self { start, stop }
    }
}

/// Per-render interpreter settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Record template enter/exit events and log them at trace level
    pub trace: bool,
}

impl RenderConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the render trace
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }
}

/// Configuration shared by a group and the renders started from it
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub delimiters: Delimiters,
    pub render: RenderConfig,
}

impl EngineConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Set the island delimiters used when compiling templates
    pub fn with_delimiters(mut self, delimiters: Delimiters) -> Self {
        self.delimiters = delimiters;
        self
    }

    /// Set the render configuration
    pub fn with_render(mut self, render: RenderConfig) -> Self {
        self.render = render;
        self
    }

    /// Enable or disable the render trace
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.render.trace = trace;
        self
    }
}

/// Load template attributes from a TOML file
///
/// Each top-level key becomes one attribute. Tables become map values and
/// arrays become lists.
pub fn load_attributes(path: &Path) -> Result<BTreeMap<String, Value>, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_attributes(&content)
}

/// Parse template attributes from a TOML string
pub fn parse_attributes(content: &str) -> Result<BTreeMap<String, Value>, ConfigError> {
    let table: toml::Table = toml::from_str(content)?;
    Ok(table
        .into_iter()
        .map(|(key, value)| (key, Value::from(value)))
        .collect())
}

impl From<toml::Value> for Value {
    fn from(value: toml::Value) -> Self {
        match value {
            toml::Value::String(s) => Value::Str(s),
            toml::Value::Integer(i) => Value::Int(i),
            toml::Value::Float(f) => Value::Float(f),
            toml::Value::Boolean(b) => Value::Bool(b),
            toml::Value::Datetime(d) => Value::Str(d.to_string()),
            toml::Value::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            toml::Value::Table(table) => Value::Map(
                table
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.delimiters, Delimiters::new('<', '>'));
        assert!(!config.render.trace);
    }

    #[test]
    fn test_parse_config() {
        let config = EngineConfig::from_str(
            r#"
            [delimiters]
            start = "$"
            stop = "$"

            [render]
            trace = true
            "#,
        )
        .expect("Should parse");
        assert_eq!(config.delimiters, Delimiters::new('$', '$'));
        assert!(config.render.trace);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = EngineConfig::from_str("[render]\ntrace = true\n").expect("Should parse");
        assert_eq!(config.delimiters, Delimiters::default());
        assert!(config.render.trace);
    }

    #[test]
    fn test_invalid_config() {
        let result = EngineConfig::from_str("[delimiters]\nstart = 3\n");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_parse_attributes() {
        let attrs = parse_attributes(
            r#"
            names = ["Ter", "Tom"]
            age = 34

            [user]
            name = "parrt"
            "#,
        )
        .expect("Should parse");

        assert!(matches!(&attrs["names"], Value::List(items) if items.len() == 2));
        assert!(matches!(attrs["age"], Value::Int(34)));
        match &attrs["user"] {
            Value::Map(map) => assert!(matches!(&map["name"], Value::Str(s) if s == "parrt")),
            other => panic!("Expected map, got {:?}", other),
        }
    }
}
