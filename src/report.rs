//! Aggregate failure report assembly.
//!
//! Each document that fails validation contributes one block: the
//! document path, then every finding with its context frame, indented
//! one level per nesting step. Blocks join with blank lines into the
//! single report string the host surfaces. An empty report is the
//! success case and renders to nothing.

use std::fmt;
use std::time::Duration;

use crate::engine::{EngineError, Violation};
use crate::frame::{render_frame, FrameOptions};

/// Why a document appears in the report.
#[derive(Debug, Clone, PartialEq)]
pub enum FailureKind {
    /// The engine completed and flagged content.
    Violations { count: usize, rendered: String },
    /// The engine call itself failed.
    Engine { message: String },
    /// The engine call exceeded the per-document deadline.
    TimedOut { after: Duration },
}

/// One document's failure block.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentFailure {
    pub path: String,
    pub kind: FailureKind,
}

impl DocumentFailure {
    /// Builds a block from engine findings. `text` must be the exact
    /// text the engine checked or the frames will point at the wrong
    /// content.
    pub fn violations(
        path: &str,
        violations: &[Violation],
        text: &str,
        opts: &FrameOptions,
    ) -> Self {
        let rendered = violations
            .iter()
            .map(|violation| render_violation(violation, text, opts))
            .collect::<Vec<_>>()
            .join("\n\n");
        DocumentFailure {
            path: path.to_string(),
            kind: FailureKind::Violations {
                count: violations.len(),
                rendered,
            },
        }
    }

    pub fn engine(path: &str, error: &EngineError) -> Self {
        DocumentFailure {
            path: path.to_string(),
            kind: FailureKind::Engine {
                message: error.to_string(),
            },
        }
    }

    pub fn timed_out(path: &str, after: Duration) -> Self {
        DocumentFailure {
            path: path.to_string(),
            kind: FailureKind::TimedOut { after },
        }
    }

    pub fn render(&self) -> String {
        let body = match &self.kind {
            FailureKind::Violations { rendered, .. } => rendered.clone(),
            FailureKind::Engine { message } => format!("rule engine failure: {message}"),
            FailureKind::TimedOut { after } => {
                format!("validation timed out after {after:?}")
            }
        };
        format!("{}:\n\n{}", self.path, indent(&body, "  "))
    }
}

/// One finding: the rule line, a blank line, then the indented frame.
/// The payload rides on the rule line as compact JSON when non-empty.
fn render_violation(violation: &Violation, text: &str, opts: &FrameOptions) -> String {
    let frame = render_frame(text, violation.position, opts);
    let data = if violation.data.is_empty() {
        String::new()
    } else {
        let payload = serde_json::Value::Object(violation.data.clone());
        format!(" {payload}:")
    };
    format!(
        "{} ({}):{}\n\n{}",
        violation.rule,
        violation.code,
        data,
        indent(&frame, "  ")
    )
}

/// Ordered collection of per-document failures. Empty means the run
/// passed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    failures: Vec<DocumentFailure>,
}

impl Report {
    pub fn new() -> Self {
        Report::default()
    }

    pub fn push(&mut self, failure: DocumentFailure) {
        self.failures.push(failure);
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn failures(&self) -> &[DocumentFailure] {
        &self.failures
    }

    /// Orders blocks by document path. Failures arrive in completion
    /// order; hosts that want a deterministic report sort first.
    pub fn sort_by_document(&mut self) {
        self.failures.sort_by(|a, b| a.path.cmp(&b.path));
    }

    pub fn render(&self) -> String {
        self.failures
            .iter()
            .map(DocumentFailure::render)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| format!("{prefix}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
