//! Bounded-concurrency validation over a document collection.
//!
//! The pipeline never touches a filesystem. The host hands over its
//! in-memory collection of named text buffers, a selector picks the
//! documents to validate, and each selected document is pruned and
//! checked by the engine with at most the configured number of checks
//! in flight. Failures aggregate into a [`Report`]; a clean run returns
//! nothing.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::{ConfigError, Options, Resolved};
use crate::engine::{EngineConfig, EngineError, RuleEngine};
use crate::frame::FrameOptions;
use crate::prune::strip_ignored_tags;
use crate::report::{DocumentFailure, Report};

/// A named text buffer in the host's collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub contents: String,
}

impl Document {
    pub fn new(contents: impl Into<String>) -> Self {
        Document {
            contents: contents.into(),
        }
    }
}

impl From<&str> for Document {
    fn from(contents: &str) -> Self {
        Document::new(contents)
    }
}

impl From<String> for Document {
    fn from(contents: String) -> Self {
        Document::new(contents)
    }
}

/// The host's collection, keyed by relative path.
pub type DocumentSet = BTreeMap<String, Document>;

/// Host-supplied path selection.
///
/// The pipeline only filters keys the host already has; how a pattern
/// matches is the host's business. Implementations must preserve input
/// order and return a subset of the given paths.
pub trait PathMatcher: Send + Sync {
    fn select(&self, pattern: &str, paths: &[String]) -> Vec<String>;
}

/// Glob selection used when the host does not bring its own matcher.
/// `*` stays within one path component, `**` crosses them.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobSelector;

impl PathMatcher for GlobSelector {
    fn select(&self, pattern: &str, paths: &[String]) -> Vec<String> {
        let glob = globset::GlobBuilder::new(pattern)
            .literal_separator(true)
            .build();
        match glob {
            Ok(glob) => {
                let matcher = glob.compile_matcher();
                paths
                    .iter()
                    .filter(|path| matcher.is_match(path.as_str()))
                    .cloned()
                    .collect()
            }
            Err(err) => {
                // Resolution validates the configured selector up
                // front, so this only fires for patterns injected some
                // other way.
                warn!("document selector {pattern:?} failed to compile: {err}");
                Vec::new()
            }
        }
    }
}

/// Error from a validation run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The engine rejected the resolved configuration; no document was
    /// checked.
    #[error(transparent)]
    Config(#[from] EngineError),

    /// Validation ran and flagged documents. The report renders to the
    /// failure text the host surfaces.
    #[error("{0}")]
    Validation(Report),
}

impl PipelineError {
    /// The attached report, when validation produced one.
    pub fn report(&self) -> Option<&Report> {
        match self {
            PipelineError::Validation(report) => Some(report),
            PipelineError::Config(_) => None,
        }
    }
}

/// The validation pipeline: selection, pruning, bounded engine fan-out,
/// report aggregation.
pub struct Pipeline {
    resolved: Resolved,
    engine: Arc<dyn RuleEngine>,
}

impl Pipeline {
    /// Resolves `options` and binds the engine.
    pub fn new(options: Options, engine: Arc<dyn RuleEngine>) -> Result<Self, ConfigError> {
        Ok(Pipeline {
            resolved: options.resolve()?,
            engine,
        })
    }

    /// The configuration every engine call will receive.
    pub fn engine_config(&self) -> &EngineConfig {
        &self.resolved.engine_config
    }

    /// Runs validation with the built-in glob selector.
    pub async fn run(&self, documents: &DocumentSet) -> Result<(), PipelineError> {
        self.run_with_matcher(documents, &GlobSelector).await
    }

    /// Runs validation, selecting documents through `matcher`.
    ///
    /// Checks start in selection order and at most the configured
    /// ceiling run at once. Every selected document is checked; one
    /// document's failure never stops the others. An empty report is
    /// `Ok`.
    pub async fn run_with_matcher(
        &self,
        documents: &DocumentSet,
        matcher: &dyn PathMatcher,
    ) -> Result<(), PipelineError> {
        let paths: Vec<String> = documents.keys().cloned().collect();
        let selected = matcher.select(&self.resolved.selector, &paths);
        debug!(
            "selected {} of {} documents for validation",
            selected.len(),
            paths.len()
        );

        self.engine.validate(&self.resolved.engine_config)?;

        let config = Arc::new(self.resolved.engine_config.clone());
        let ignore_tags = Arc::new(self.resolved.ignore_tags.clone());
        let deadline = self.resolved.document_timeout;
        let slots = Arc::new(Semaphore::new(
            self.resolved.parallelism.min(Semaphore::MAX_PERMITS),
        ));

        let mut tasks: JoinSet<Option<DocumentFailure>> = JoinSet::new();
        for path in selected {
            let Some(document) = documents.get(&path) else {
                warn!("selector returned {path:?}, which is not in the collection");
                continue;
            };

            // Taking the permit before spawning keeps starts in
            // selection order and caps the work in flight; the loop
            // parks here whenever the ceiling is reached.
            let Ok(permit) = Arc::clone(&slots).acquire_owned().await else {
                debug!("validation slots closed before {path}");
                break;
            };

            let engine = Arc::clone(&self.engine);
            let config = Arc::clone(&config);
            let ignore_tags = Arc::clone(&ignore_tags);
            let frame = self.resolved.frame.clone();
            let contents = document.contents.clone();
            tasks.spawn(async move {
                let _permit = permit;
                check_document(
                    engine.as_ref(),
                    &config,
                    &path,
                    &contents,
                    &ignore_tags,
                    deadline,
                    &frame,
                )
                .await
            });
        }

        // Single consumer: completions arrive one at a time in whatever
        // order checks finish, so appending needs no lock.
        let mut report = Report::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some(failure)) => report.push(failure),
                Ok(None) => {}
                Err(error) => {
                    // A panicking engine implementation loses its
                    // document attribution; surface the loss instead of
                    // swallowing it.
                    warn!("validation task aborted: {error}");
                    report.push(DocumentFailure::engine(
                        "(unattributed document)",
                        &EngineError::check(format!("validation task aborted: {error}")),
                    ));
                }
            }
        }

        if report.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::Validation(report))
        }
    }
}

async fn check_document(
    engine: &dyn RuleEngine,
    config: &EngineConfig,
    path: &str,
    contents: &str,
    ignore_tags: &[String],
    deadline: Option<Duration>,
    frame: &FrameOptions,
) -> Option<DocumentFailure> {
    let text = strip_ignored_tags(contents, ignore_tags);

    let outcome = match deadline {
        Some(limit) => match tokio::time::timeout(limit, engine.check(&text, config)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("{path}: engine check exceeded {limit:?}");
                return Some(DocumentFailure::timed_out(path, limit));
            }
        },
        None => engine.check(&text, config).await,
    };

    match outcome {
        Ok(violations) if violations.is_empty() => {
            debug!("{path}: clean");
            None
        }
        Ok(violations) => {
            debug!("{path}: {} violation(s)", violations.len());
            Some(DocumentFailure::violations(path, &violations, &text, frame))
        }
        Err(error) => {
            warn!("{path}: engine failure: {error}");
            Some(DocumentFailure::engine(path, &error))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn paths(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_glob_selector_filters_and_preserves_order() {
        let paths = paths(&[
            "about.html",
            "assets/site.css",
            "index.html",
            "posts/one.html",
        ]);
        assert_eq!(
            GlobSelector.select("**/*.html", &paths),
            ["about.html", "index.html", "posts/one.html"]
        );
    }

    #[test]
    fn test_glob_selector_keeps_star_within_one_component() {
        let paths = paths(&["index.html", "posts/one.html"]);
        assert_eq!(GlobSelector.select("*.html", &paths), ["index.html"]);
    }

    #[test]
    fn test_glob_selector_rejects_nothing_on_bad_pattern() {
        let paths = paths(&["index.html"]);
        assert_eq!(
            GlobSelector.select("docs/{unclosed", &paths),
            Vec::<String>::new()
        );
    }

    #[test]
    fn test_document_from_str() {
        assert_eq!(Document::from("<p>x</p>"), Document::new("<p>x</p>"));
        assert_eq!(
            Document::from(String::from("<p>x</p>")).contents,
            "<p>x</p>"
        );
    }
}
