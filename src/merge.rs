//! Layered configuration merge with an explicit per-kind policy.
//!
//! Configuration arrives in layers (built-in preset, stylistic preset,
//! user overrides) and later layers win. The one place naive deep-merge
//! gets this wrong is sequences: concatenating a user's `tag-bans` list
//! onto the preset's would make ban lists impossible to relax, so
//! sequences are replaced wholesale. Keyed records merge key by key and
//! scalars are overwritten.

use std::collections::BTreeMap;

use crate::settings::{RuleConfig, SettingsValue};

/// How two layers combine for one kind of value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeRule {
    /// The later layer wins wholesale.
    Replace,
    /// Recurse into matching keys, keep unmatched keys from both sides.
    /// For sequences this means concatenation.
    Merge,
    /// The later value wins.
    Overwrite,
}

/// Merge behavior keyed by value kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergePolicy {
    pub sequences: MergeRule,
    pub records: MergeRule,
    /// Scalars carry no structure, so anything other than the later
    /// value winning is unrepresentable. The field states the policy.
    pub scalars: MergeRule,
}

impl Default for MergePolicy {
    /// The layering policy the pipeline uses everywhere: sequences
    /// replace, records merge, scalars overwrite.
    fn default() -> Self {
        MergePolicy {
            sequences: MergeRule::Replace,
            records: MergeRule::Merge,
            scalars: MergeRule::Overwrite,
        }
    }
}

/// Combines two option values under `policy`. Mismatched kinds fall back
/// to the later value.
pub fn merge_value(base: SettingsValue, over: SettingsValue, policy: MergePolicy) -> SettingsValue {
    match (base, over) {
        (SettingsValue::List(base_items), SettingsValue::List(over_items)) => {
            match policy.sequences {
                MergeRule::Replace | MergeRule::Overwrite => SettingsValue::List(over_items),
                MergeRule::Merge => {
                    let mut items = base_items;
                    items.extend(over_items);
                    SettingsValue::List(items)
                }
            }
        }
        // Scalars have no recursive structure, so every rule collapses
        // to the later value. Mismatched kinds land here too.
        (_, over) => over,
    }
}

/// Merges a later settings layer into `base` under `policy`.
pub fn merge_settings_map(
    base: &mut BTreeMap<String, SettingsValue>,
    over: BTreeMap<String, SettingsValue>,
    policy: MergePolicy,
) {
    merge_keyed(base, over, policy, merge_value);
}

/// Merges a later rules layer into `base` under `policy`.
pub fn merge_rules_map(
    base: &mut BTreeMap<String, RuleConfig>,
    over: BTreeMap<String, RuleConfig>,
    policy: MergePolicy,
) {
    merge_keyed(base, over, policy, merge_rule_entry);
}

fn merge_rule_entry(base: RuleConfig, over: RuleConfig, policy: MergePolicy) -> RuleConfig {
    match (base, over) {
        (RuleConfig::Configured(base_value), RuleConfig::Configured(over_value)) => {
            RuleConfig::Configured(merge_value(base_value, over_value, policy))
        }
        (_, over) => over,
    }
}

fn merge_keyed<V>(
    base: &mut BTreeMap<String, V>,
    over: BTreeMap<String, V>,
    policy: MergePolicy,
    combine: impl Fn(V, V, MergePolicy) -> V,
) {
    if policy.records == MergeRule::Replace {
        *base = over;
        return;
    }
    for (key, over_value) in over {
        match base.remove(&key) {
            Some(base_value) => {
                base.insert(key, combine(base_value, over_value, policy));
            }
            None => {
                base.insert(key, over_value);
            }
        }
    }
}
