//! Rule option values shared by the legacy and engine schemas.
//!
//! Both schemas carry the same closed set of value shapes: booleans,
//! numbers, strings, regular-expression patterns, and flat lists of
//! those. Records never appear inside a rule option; they exist only at
//! the map level, which [`crate::merge`] handles separately.

use std::fmt;

use serde::ser::{Serialize, SerializeSeq, Serializer};
use thiserror::Error;

/// Error turning host-supplied data into a settings value.
#[derive(Debug, Error)]
pub enum ValueError {
    /// The JSON shape has no equivalent rule-option form.
    #[error("unsupported rule option shape: {0}")]
    Unsupported(String),

    /// A pattern option failed to compile.
    #[error("invalid pattern option: {0}")]
    Pattern(#[from] regex::Error),
}

/// A single rule option in either schema.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsValue {
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    /// A regular expression, stored as its validated source. Serializes
    /// as a plain string, which is how pattern options travel in JSON
    /// configuration files.
    Pattern(String),
    List(Vec<SettingsValue>),
}

impl SettingsValue {
    /// Builds a pattern option, rejecting sources that do not compile.
    pub fn pattern(source: &str) -> Result<Self, ValueError> {
        regex::Regex::new(source)?;
        Ok(SettingsValue::Pattern(source.to_string()))
    }

    /// Builds a list of string options, the shape ban lists use.
    pub fn strings<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SettingsValue::List(
            items
                .into_iter()
                .map(|s| SettingsValue::String(s.into()))
                .collect(),
        )
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingsValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, SettingsValue::List(_))
    }

    /// Converts host JSON into a settings value.
    ///
    /// Plain strings stay strings; callers that know an option is a
    /// pattern should go through [`SettingsValue::pattern`] so the
    /// source gets validated. Null and nested objects have no
    /// rule-option form and are rejected.
    pub fn from_json(value: serde_json::Value) -> Result<Self, ValueError> {
        match value {
            serde_json::Value::Bool(b) => Ok(SettingsValue::Bool(b)),
            serde_json::Value::Number(n) => Ok(SettingsValue::Number(n)),
            serde_json::Value::String(s) => Ok(SettingsValue::String(s)),
            serde_json::Value::Array(items) => {
                let converted: Result<Vec<_>, _> =
                    items.into_iter().map(SettingsValue::from_json).collect();
                Ok(SettingsValue::List(converted?))
            }
            other => Err(ValueError::Unsupported(other.to_string())),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            SettingsValue::Bool(b) => serde_json::Value::Bool(*b),
            SettingsValue::Number(n) => serde_json::Value::Number(n.clone()),
            SettingsValue::String(s) | SettingsValue::Pattern(s) => {
                serde_json::Value::String(s.clone())
            }
            SettingsValue::List(items) => {
                serde_json::Value::Array(items.iter().map(SettingsValue::to_json).collect())
            }
        }
    }
}

impl fmt::Display for SettingsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl Serialize for SettingsValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SettingsValue::Bool(b) => serializer.serialize_bool(*b),
            SettingsValue::Number(n) => n.serialize(serializer),
            SettingsValue::String(s) | SettingsValue::Pattern(s) => serializer.serialize_str(s),
            SettingsValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

impl From<bool> for SettingsValue {
    fn from(b: bool) -> Self {
        SettingsValue::Bool(b)
    }
}

impl From<i64> for SettingsValue {
    fn from(n: i64) -> Self {
        SettingsValue::Number(n.into())
    }
}

impl From<u64> for SettingsValue {
    fn from(n: u64) -> Self {
        SettingsValue::Number(n.into())
    }
}

impl From<&str> for SettingsValue {
    fn from(s: &str) -> Self {
        SettingsValue::String(s.to_string())
    }
}

impl From<String> for SettingsValue {
    fn from(s: String) -> Self {
        SettingsValue::String(s)
    }
}

impl From<Vec<SettingsValue>> for SettingsValue {
    fn from(items: Vec<SettingsValue>) -> Self {
        SettingsValue::List(items)
    }
}

/// One entry in the engine `rules` map.
///
/// The wire forms are `false`, `true`, and `[true, settings]`. A rule is
/// never shipped as `[false, settings]`; disabling discards settings.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleConfig {
    /// The rule is off.
    Disabled,
    /// The rule runs with its built-in defaults.
    Enabled,
    /// The rule runs with explicit settings.
    Configured(SettingsValue),
}

impl RuleConfig {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, RuleConfig::Disabled)
    }

    pub fn settings(&self) -> Option<&SettingsValue> {
        match self {
            RuleConfig::Configured(value) => Some(value),
            _ => None,
        }
    }

    /// Collapses the entry back to the flat value it carries: `false`,
    /// `true`, or the configured settings themselves.
    pub fn into_setting(self) -> SettingsValue {
        match self {
            RuleConfig::Disabled => SettingsValue::Bool(false),
            RuleConfig::Enabled => SettingsValue::Bool(true),
            RuleConfig::Configured(value) => value,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            RuleConfig::Disabled => serde_json::Value::Bool(false),
            RuleConfig::Enabled => serde_json::Value::Bool(true),
            RuleConfig::Configured(value) => {
                serde_json::Value::Array(vec![serde_json::Value::Bool(true), value.to_json()])
            }
        }
    }
}

/// A flat legacy value becomes the matching engine entry: booleans flip
/// the rule on or off, anything else enables it with settings.
impl From<SettingsValue> for RuleConfig {
    fn from(value: SettingsValue) -> Self {
        match value {
            SettingsValue::Bool(true) => RuleConfig::Enabled,
            SettingsValue::Bool(false) => RuleConfig::Disabled,
            other => RuleConfig::Configured(other),
        }
    }
}

impl From<bool> for RuleConfig {
    fn from(b: bool) -> Self {
        if b {
            RuleConfig::Enabled
        } else {
            RuleConfig::Disabled
        }
    }
}

impl fmt::Display for RuleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl Serialize for RuleConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RuleConfig::Disabled => serializer.serialize_bool(false),
            RuleConfig::Enabled => serializer.serialize_bool(true),
            RuleConfig::Configured(value) => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element(&true)?;
                seq.serialize_element(value)?;
                seq.end()
            }
        }
    }
}
