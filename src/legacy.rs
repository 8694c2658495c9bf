//! The legacy flat rule schema and its translation into the engine
//! schema.
//!
//! The previous generation of the linter took one flat map: every key
//! was a rule name and every value was that rule's option, with `false`
//! meaning off. The current engine wants a nested shape instead, where
//! engine-wide settings sit at the top level next to a `rules` map whose
//! entries are `false`, `true`, or `[true, settings]`. [`translate`]
//! carries configurations across that gap so existing projects keep
//! working without a rewrite.

use std::collections::BTreeMap;

use crate::engine::EngineConfig;
use crate::merge::{merge_settings_map, MergePolicy};
use crate::settings::{RuleConfig, SettingsValue, ValueError};

/// Option names that configure the engine as a whole rather than a
/// single rule. The translator moves these out of the rules map into
/// the top-level settings, carrying the raw effective value.
pub const PROMOTED_SETTINGS: [&str; 6] = [
    "maxerr",
    "text-ignore-regex",
    "raw-ignore-regex",
    "attr-name-ignore-regex",
    "id-class-ignore-regex",
    "line-max-len-ignore-regex",
];

/// A legacy flat rule map: rule name to flat option value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegacyRules {
    entries: BTreeMap<String, SettingsValue>,
}

impl LegacyRules {
    pub fn new() -> Self {
        LegacyRules::default()
    }

    /// Builder-style insert for assembling override maps.
    pub fn set(mut self, name: &str, value: impl Into<SettingsValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<SettingsValue>) {
        self.entries.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&SettingsValue> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SettingsValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Merges a later layer into this one. Sequences replace, so an
    /// override ban list stands alone instead of growing the default.
    pub fn apply(&mut self, over: LegacyRules) {
        merge_settings_map(&mut self.entries, over.entries, MergePolicy::default());
    }

    /// Reads a flat rule map out of host JSON.
    pub fn from_json(value: serde_json::Value) -> Result<Self, ValueError> {
        match value {
            serde_json::Value::Object(map) => {
                let mut rules = LegacyRules::new();
                for (name, entry) in map {
                    rules
                        .entries
                        .insert(name, SettingsValue::from_json(entry)?);
                }
                Ok(rules)
            }
            other => Err(ValueError::Unsupported(other.to_string())),
        }
    }
}

/// The flat default preset the legacy linter shipped with.
///
/// Translation merges user overrides onto this table first, so a legacy
/// configuration that names three rules still resolves the other
/// fifty-odd the way the old linter did.
pub fn htmllint_defaults() -> LegacyRules {
    let mut rules = LegacyRules::new();
    rules.insert("maxerr", false);
    rules.insert("raw-ignore-regex", false);
    rules.insert(
        "attr-bans",
        SettingsValue::strings([
            "align",
            "background",
            "bgcolor",
            "border",
            "frameborder",
            "longdesc",
            "marginwidth",
            "marginheight",
            "scrolling",
            "style",
            "width",
        ]),
    );
    rules.insert("indent-delta", false);
    rules.insert("indent-style", "nonmixed");
    rules.insert("indent-width", 4i64);
    rules.insert("indent-width-cont", false);
    rules.insert("spec-char-escape", true);
    rules.insert("text-ignore-regex", false);
    rules.insert("tag-bans", SettingsValue::strings(["b", "i"]));
    rules.insert("tag-close", true);
    rules.insert("tag-name-lowercase", true);
    rules.insert("tag-name-match", true);
    rules.insert("tag-self-close", false);
    rules.insert("doctype-first", false);
    rules.insert("doctype-html5", false);
    rules.insert("attr-name-style", "dash");
    rules.insert("attr-name-ignore-regex", false);
    rules.insert("attr-no-dup", true);
    rules.insert("attr-no-unsafe-char", true);
    rules.insert("attr-order", false);
    rules.insert("attr-quote-style", "double");
    rules.insert("attr-req-value", true);
    rules.insert("attr-new-line", false);
    rules.insert("attr-validate", true);
    rules.insert("id-no-dup", true);
    rules.insert("id-class-no-ad", true);
    rules.insert("id-class-style", "underscore");
    rules.insert("class-no-dup", true);
    rules.insert("class-style", false);
    rules.insert("id-class-ignore-regex", false);
    rules.insert("img-req-alt", true);
    rules.insert("img-req-src", true);
    rules.insert("html-valid-content-model", true);
    rules.insert("head-valid-content-model", true);
    rules.insert("href-style", false);
    rules.insert("link-req-noopener", true);
    rules.insert("label-req-for", true);
    rules.insert("line-end-style", "lf");
    rules.insert("line-no-trailing-whitespace", true);
    rules.insert("line-max-len", false);
    rules.insert("line-max-len-ignore-regex", false);
    rules.insert("head-req-title", true);
    rules.insert("title-no-dup", true);
    rules.insert("title-max-len", 60i64);
    rules.insert("html-req-lang", false);
    rules.insert("lang-style", "case");
    rules.insert("fig-req-figcaption", false);
    rules.insert("focusable-tabindex-style", false);
    rules.insert("input-radio-req-name", true);
    rules.insert("input-req-label", false);
    rules.insert("table-req-caption", false);
    rules.insert("table-req-header", false);
    rules.insert("tag-req-attr", false);
    rules.insert("link-min-length-4", false);
    rules.insert("input-btn-req-value-or-title", false);
    rules.insert("button-req-content", false);
    rules.insert("label-no-enc-textarea-or-select", false);
    rules.insert("fieldset-contains-legend", false);
    rules
}

/// Translates a legacy flat rule map into the engine schema.
///
/// `config` is merged onto `defaults` (later layer wins, sequences
/// replace), then every entry moves across: booleans toggle the rule,
/// anything else enables it with settings. Entries named in
/// [`PROMOTED_SETTINGS`] leave the rules map for the top-level settings,
/// keeping their raw effective value rather than the enabled-with-
/// settings wrapper. Every merged key ends up in exactly one of the two
/// maps. Unknown rule names pass through untouched; validating them is
/// the engine's job.
pub fn translate(config: &LegacyRules, defaults: &LegacyRules) -> EngineConfig {
    let mut merged = defaults.clone();
    merged.apply(config.clone());

    let mut rules: BTreeMap<String, RuleConfig> = merged
        .entries
        .into_iter()
        .map(|(name, value)| (name, RuleConfig::from(value)))
        .collect();

    let mut settings = BTreeMap::new();
    for name in PROMOTED_SETTINGS {
        if let Some(entry) = rules.remove(name) {
            settings.insert(name.to_string(), entry.into_setting());
        }
    }

    EngineConfig { settings, rules }
}
