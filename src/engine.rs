//! Engine-facing configuration, violations, and the rule-engine seam.
//!
//! The validation engine is a black box behind [`RuleEngine`]: the
//! pipeline hands it a resolved [`EngineConfig`] once per run and one
//! normalized document per call, and gets back structured violations.
//! Nothing here knows how individual rules work.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Deserialize;
use thiserror::Error;

use crate::legacy::{htmllint_defaults, translate, LegacyRules};
use crate::merge::{merge_rules_map, merge_settings_map, MergePolicy};
use crate::settings::{RuleConfig, SettingsValue};

/// The nested configuration shape the engine consumes.
///
/// Engine-wide settings sit at the top level next to the per-rule map.
/// Serialized form is a single JSON object with the settings flattened
/// in and a `rules` key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineConfig {
    /// Engine-wide options, promoted out of the per-rule namespace.
    pub settings: BTreeMap<String, SettingsValue>,
    /// Rule name to entry.
    pub rules: BTreeMap<String, RuleConfig>,
}

impl EngineConfig {
    pub fn new() -> Self {
        EngineConfig::default()
    }

    /// The engine's built-in preset: the legacy default table expressed
    /// in the nested schema, promoted options and all.
    pub fn default_preset() -> Self {
        translate(&LegacyRules::new(), &htmllint_defaults())
    }

    /// Builder-style top-level setting.
    pub fn setting(mut self, name: &str, value: impl Into<SettingsValue>) -> Self {
        self.settings.insert(name.to_string(), value.into());
        self
    }

    /// Builder-style rule entry. Accepts `bool` for plain toggles and
    /// [`SettingsValue`] for enable-with-settings entries.
    pub fn rule(mut self, name: &str, entry: impl Into<RuleConfig>) -> Self {
        self.rules.insert(name.to_string(), entry.into());
        self
    }

    /// Merges a later layer into this one: settings and rules each merge
    /// key by key, sequences inside entries replace.
    pub fn apply(&mut self, over: EngineConfig) {
        let policy = MergePolicy::default();
        merge_settings_map(&mut self.settings, over.settings, policy);
        merge_rules_map(&mut self.rules, over.rules, policy);
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (name, value) in &self.settings {
            map.insert(name.clone(), value.to_json());
        }
        let rules: serde_json::Map<String, serde_json::Value> = self
            .rules
            .iter()
            .map(|(name, entry)| (name.clone(), entry.to_json()))
            .collect();
        map.insert("rules".to_string(), serde_json::Value::Object(rules));
        serde_json::Value::Object(map)
    }
}

impl Serialize for EngineConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.settings.len() + 1))?;
        for (name, value) in &self.settings {
            map.serialize_entry(name, value)?;
        }
        map.serialize_entry("rules", &self.rules)?;
        map.end()
    }
}

/// Start of an offending span, 1-based, in the text handed to the
/// engine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, Deserialize,
)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Position { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A single engine finding.
#[derive(Debug, Clone, PartialEq, serde::Serialize, Deserialize)]
pub struct Violation {
    /// Rule identifier, e.g. `attr-bans`.
    pub rule: String,
    /// Engine diagnostic code, e.g. `E001`.
    pub code: String,
    /// Structured payload. Empty payloads are omitted from rendered
    /// messages.
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
    pub position: Position,
}

impl Violation {
    pub fn new(rule: &str, code: &str, position: Position) -> Self {
        Violation {
            rule: rule.to_string(),
            code: code.to_string(),
            data: serde_json::Map::new(),
            position,
        }
    }

    /// Builder-style payload entry.
    pub fn with_data(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }
}

/// Failure reported by the engine itself.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    /// The engine rejected the resolved configuration up front.
    #[error("configuration rejected: {0}")]
    Config(String),
    /// A per-document check failed outright.
    #[error("{0}")]
    Check(String),
}

impl EngineError {
    pub fn config(message: impl Into<String>) -> Self {
        EngineError::Config(message.into())
    }

    pub fn check(message: impl Into<String>) -> Self {
        EngineError::Check(message.into())
    }
}

/// The external rule-validation engine.
///
/// One [`check`](RuleEngine::check) call per document: normalized text
/// in, violations out. The engine holds no per-document state across
/// calls, which is what makes the concurrent fan-out safe.
#[async_trait]
pub trait RuleEngine: Send + Sync {
    /// Inspects the resolved configuration before any document runs.
    /// A rejection aborts the whole run.
    fn validate(&self, _config: &EngineConfig) -> Result<(), EngineError> {
        Ok(())
    }

    /// Checks one document's normalized text against the configuration.
    async fn check(
        &self,
        text: &str,
        config: &EngineConfig,
    ) -> Result<Vec<Violation>, EngineError>;
}
