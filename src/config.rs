//! Host-facing options and their resolution into a runnable setup.
//!
//! Hosts hand over an [`Options`] value with only the fields they care
//! about changed. [`Options::resolve`] layers the engine preset, the
//! stylistic preset, and the host's own configuration into the final
//! [`EngineConfig`], validates the document selector, and pins the
//! concurrency ceiling to a concrete number.

use std::time::Duration;

use thiserror::Error;

use crate::engine::EngineConfig;
use crate::frame::FrameOptions;
use crate::legacy::{htmllint_defaults, translate, LegacyRules};
use crate::settings::SettingsValue;

/// Everything a host can adjust about a validation run.
#[derive(Debug, Clone)]
pub struct Options {
    /// Glob selecting which documents get validated.
    pub html: String,
    /// Modern-format engine overrides. When present, the legacy field
    /// is ignored.
    pub linthtml: Option<EngineConfig>,
    /// Legacy flat-format configuration, translated on the fly when no
    /// modern configuration is supplied.
    pub htmllint: Option<LegacyRules>,
    /// Elements pruned from documents before validation.
    pub ignore_tags: Vec<String>,
    /// Concurrency ceiling. `None` means one slot per logical CPU.
    pub parallelism: Option<usize>,
    /// Deadline for a single engine check. `None` waits indefinitely.
    pub document_timeout: Option<Duration>,
    /// Context-frame rendering knobs for the report.
    pub frame: FrameOptions,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            html: "**/*.html".to_string(),
            linthtml: None,
            htmllint: None,
            // Elements whose content is not the author's own markup.
            ignore_tags: ["code", "pre", "svg", "textarea"]
                .iter()
                .map(|tag| tag.to_string())
                .collect(),
            parallelism: None,
            document_timeout: None,
            frame: FrameOptions::default(),
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Options::default()
    }

    pub fn with_html(mut self, pattern: &str) -> Self {
        self.html = pattern.to_string();
        self
    }

    pub fn with_engine_config(mut self, config: EngineConfig) -> Self {
        self.linthtml = Some(config);
        self
    }

    pub fn with_legacy_config(mut self, rules: LegacyRules) -> Self {
        self.htmllint = Some(rules);
        self
    }

    pub fn with_ignore_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_parallelism(mut self, ceiling: usize) -> Self {
        self.parallelism = Some(ceiling);
        self
    }

    pub fn with_document_timeout(mut self, deadline: Duration) -> Self {
        self.document_timeout = Some(deadline);
        self
    }

    pub fn with_frame(mut self, frame: FrameOptions) -> Self {
        self.frame = frame;
        self
    }

    /// Resolves the layered configuration into a runnable setup.
    ///
    /// The modern path stacks host overrides on the engine preset and
    /// the stylistic preset. The legacy path goes through
    /// [`translate`] instead and sees neither preset; translation
    /// merges the legacy default table itself.
    pub fn resolve(self) -> Result<Resolved, ConfigError> {
        globset::Glob::new(&self.html).map_err(|source| ConfigError::Selector {
            pattern: self.html.clone(),
            source,
        })?;

        let engine_config = match (self.linthtml, &self.htmllint) {
            (Some(user), _) => {
                let mut config = EngineConfig::default_preset();
                config.apply(stylistic_preset());
                config.apply(user);
                config
            }
            (None, Some(legacy)) => translate(legacy, &htmllint_defaults()),
            (None, None) => {
                let mut config = EngineConfig::default_preset();
                config.apply(stylistic_preset());
                config
            }
        };

        let parallelism = match self.parallelism {
            None => num_cpus::get().max(1),
            Some(0) => return Err(ConfigError::Parallelism),
            Some(ceiling) => ceiling,
        };

        Ok(Resolved {
            selector: self.html,
            engine_config,
            ignore_tags: self.ignore_tags,
            parallelism,
            document_timeout: self.document_timeout,
            frame: self.frame,
        })
    }
}

/// A resolved, validated setup ready to run.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub selector: String,
    pub engine_config: EngineConfig,
    pub ignore_tags: Vec<String>,
    pub parallelism: usize,
    pub document_timeout: Option<Duration>,
    pub frame: FrameOptions,
}

/// Problem found while resolving options.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid document selector {pattern:?}: {source}")]
    Selector {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("parallelism ceiling must be at least 1")]
    Parallelism,
}

/// The stylistic layer applied on top of the engine preset for the
/// modern configuration path. It widens the obsolete-markup bans and
/// switches off whitespace-era formatting rules that fight generated
/// HTML.
pub fn stylistic_preset() -> EngineConfig {
    EngineConfig::new()
        // Entity-shaped query strings inside URLs trip the escape rule.
        .setting(
            "text-ignore-regex",
            SettingsValue::Pattern("&[a-zA-Z0-9]+=".to_string()),
        )
        // https://www.w3.org/TR/html5-diff/#obsolete-attributes
        .rule(
            "attr-bans",
            SettingsValue::strings([
                "align",
                "alink",
                "background",
                "bgcolor",
                "border",
                "cellpadding",
                "cellspacing",
                "char",
                "charoff",
                "clear",
                "compact",
                "frame",
                "frameborder",
                "hspace",
                "link",
                "marginheight",
                "marginwidth",
                "noshade",
                "nowrap",
                "rules",
                "scrolling",
                "size",
                "text",
                "valign",
                "vlink",
                "vspace",
            ]),
        )
        .rule("attr-req-value", false)
        .rule("doctype-first", true)
        .rule("id-class-style", false)
        .rule("indent-style", false)
        .rule("indent-width", false)
        .rule("line-end-style", false)
        .rule("line-no-trailing-whitespace", false)
        // https://www.w3.org/TR/html5-diff/#obsolete-elements
        .rule(
            "tag-bans",
            SettingsValue::strings([
                "acronym", "applet", "basefont", "big", "center", "dir", "font", "frame",
                "frameset", "isindex", "noframes", "strike", "tt",
            ]),
        )
        .rule("tag-name-lowercase", false)
        .rule("title-max-len", false)
}
