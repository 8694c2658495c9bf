//! HTML lint gate for build pipelines.
//!
//! `lintgate` sits between a static-site or asset pipeline and a
//! black-box HTML rule engine. It takes the host's in-memory document
//! collection, selects the HTML documents, prunes elements whose
//! content should never be linted, fans the survivors out to the engine
//! under a concurrency ceiling, and folds every finding into one
//! human-readable failure report with source-context frames.
//!
//! It also carries configurations across a schema break: projects still
//! holding the old flat rule map get it translated into the engine's
//! nested schema on the fly, with engine-wide options promoted out of
//! the per-rule namespace. See [`legacy::translate`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use lintgate::{Document, DocumentSet, Options, Pipeline};
//! # use lintgate::{EngineConfig, EngineError, RuleEngine, Violation};
//! # struct NoopEngine;
//! # #[async_trait::async_trait]
//! # impl RuleEngine for NoopEngine {
//! #     async fn check(
//! #         &self,
//! #         _text: &str,
//! #         _config: &EngineConfig,
//! #     ) -> Result<Vec<Violation>, EngineError> {
//! #         Ok(Vec::new())
//! #     }
//! # }
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let mut documents = DocumentSet::new();
//! documents.insert("index.html".into(), Document::new("<!DOCTYPE html><p>hi</p>"));
//!
//! let pipeline = Pipeline::new(Options::default(), Arc::new(NoopEngine))?;
//! match pipeline.run(&documents).await {
//!     Ok(()) => println!("all documents passed"),
//!     Err(failure) => eprintln!("{failure}"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod frame;
pub mod legacy;
pub mod merge;
pub mod pipeline;
pub mod prune;
pub mod report;
pub mod settings;

pub use config::{stylistic_preset, ConfigError, Options, Resolved};
pub use engine::{EngineConfig, EngineError, Position, RuleEngine, Violation};
pub use frame::{render_frame, FrameOptions};
pub use legacy::{htmllint_defaults, translate, LegacyRules, PROMOTED_SETTINGS};
pub use merge::{MergePolicy, MergeRule};
pub use pipeline::{
    Document, DocumentSet, GlobSelector, PathMatcher, Pipeline, PipelineError,
};
pub use prune::strip_ignored_tags;
pub use report::{DocumentFailure, FailureKind, Report};
pub use settings::{RuleConfig, SettingsValue, ValueError};
