//! End-to-end pipeline tests
//!
//! The engine is stubbed: checks flag a marker substring so violations,
//! failures, and timings can be scripted per document.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lintgate::{
    Document, DocumentSet, EngineConfig, EngineError, FailureKind, FrameOptions, Options,
    PathMatcher, Pipeline, PipelineError, Position, RuleEngine, SettingsValue, Violation,
};

/// Flags every occurrence of a marker substring with its line and
/// column, and keeps counters the concurrency tests read back.
struct MarkerEngine {
    marker: &'static str,
    delay: Option<Duration>,
    checks: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MarkerEngine {
    fn new(marker: &'static str) -> Self {
        MarkerEngine {
            marker,
            delay: None,
            checks: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    fn with_delay(marker: &'static str, delay: Duration) -> Self {
        MarkerEngine {
            delay: Some(delay),
            ..MarkerEngine::new(marker)
        }
    }

    fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }

    fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RuleEngine for MarkerEngine {
    async fn check(
        &self,
        text: &str,
        _config: &EngineConfig,
    ) -> Result<Vec<Violation>, EngineError> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let violations = marker_violations(text, self.marker);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(violations)
    }
}

fn marker_violations(text: &str, marker: &str) -> Vec<Violation> {
    let mut violations = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let mut offset = 0;
        while let Some(found) = line[offset..].find(marker) {
            let column = offset + found + 1;
            violations.push(
                Violation::new("banned-marker", "E016", Position::new(index + 1, column))
                    .with_data("marker", marker),
            );
            offset += found + marker.len();
        }
    }
    violations
}

/// Rejects every configuration at validation time.
struct RejectingEngine {
    checks: AtomicUsize,
}

#[async_trait]
impl RuleEngine for RejectingEngine {
    fn validate(&self, _config: &EngineConfig) -> Result<(), EngineError> {
        Err(EngineError::config("unknown rule: made-up-rule"))
    }

    async fn check(
        &self,
        _text: &str,
        _config: &EngineConfig,
    ) -> Result<Vec<Violation>, EngineError> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}

/// Fails the check outright for any text containing `boom`.
struct ExplosiveEngine {
    checks: AtomicUsize,
}

#[async_trait]
impl RuleEngine for ExplosiveEngine {
    async fn check(
        &self,
        text: &str,
        _config: &EngineConfig,
    ) -> Result<Vec<Violation>, EngineError> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        if text.contains("boom") {
            Err(EngineError::check("engine exploded"))
        } else {
            Ok(Vec::new())
        }
    }
}

/// A minimal real rule: flags `<name` occurrences for every tag the
/// configured `tag-bans` entry carries.
struct TagBanEngine;

#[async_trait]
impl RuleEngine for TagBanEngine {
    async fn check(
        &self,
        text: &str,
        config: &EngineConfig,
    ) -> Result<Vec<Violation>, EngineError> {
        let Some(entry) = config.rules.get("tag-bans") else {
            return Ok(Vec::new());
        };
        if !entry.is_enabled() {
            return Ok(Vec::new());
        }
        let mut violations = Vec::new();
        if let Some(SettingsValue::List(banned)) = entry.settings() {
            for tag in banned {
                if let SettingsValue::String(name) = tag {
                    violations.extend(marker_violations(text, &format!("<{name}")));
                }
            }
        }
        Ok(violations)
    }
}

/// Sleeps whenever the text asks for it, so completion order can be
/// scripted per document.
struct StaggerEngine;

#[async_trait]
impl RuleEngine for StaggerEngine {
    async fn check(
        &self,
        text: &str,
        _config: &EngineConfig,
    ) -> Result<Vec<Violation>, EngineError> {
        if text.contains("linger") {
            tokio::time::sleep(Duration::from_millis(60)).await;
        }
        Ok(marker_violations(text, "<b>"))
    }
}

fn docs(entries: &[(&str, &str)]) -> DocumentSet {
    entries
        .iter()
        .map(|(path, contents)| (path.to_string(), Document::new(*contents)))
        .collect()
}

#[tokio::test]
async fn test_clean_documents_pass() {
    let engine = Arc::new(MarkerEngine::new("<b>"));
    let pipeline = Pipeline::new(Options::default(), engine.clone()).unwrap();
    let documents = docs(&[
        ("about.html", "<p>fine</p>"),
        ("index.html", "<p>also fine</p>"),
    ]);

    pipeline.run(&documents).await.unwrap();
    assert_eq!(engine.checks(), 2);
}

#[tokio::test]
async fn test_only_selected_documents_are_checked() {
    let engine = Arc::new(MarkerEngine::new("<b>"));
    let pipeline = Pipeline::new(Options::default(), engine.clone()).unwrap();
    let documents = docs(&[
        ("assets/app.css", "b { color: red }"),
        ("index.html", "<b>flagged</b>"),
        ("readme.txt", "<b>not html</b>"),
    ]);

    let err = pipeline.run(&documents).await.unwrap_err();
    assert_eq!(engine.checks(), 1);

    let report = err.report().expect("validation report");
    assert_eq!(report.len(), 1);
    assert_eq!(report.failures()[0].path, "index.html");
}

#[tokio::test]
async fn test_one_violating_document_under_ceiling_one() {
    let engine = Arc::new(MarkerEngine::new("<b>"));
    let options = Options::default().with_parallelism(1);
    let pipeline = Pipeline::new(options, engine.clone()).unwrap();
    let documents = docs(&[
        ("a.html", "<p>clean</p>"),
        ("b.html", "<b>flagged</b>"),
    ]);

    let err = pipeline.run(&documents).await.unwrap_err();
    assert_eq!(engine.checks(), 2);
    assert_eq!(engine.max_in_flight(), 1);

    let report = err.report().expect("validation report");
    assert_eq!(report.len(), 1);
    assert_eq!(report.failures()[0].path, "b.html");
    match &report.failures()[0].kind {
        FailureKind::Violations { count, .. } => assert_eq!(*count, 1),
        other => panic!("unexpected failure kind: {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_in_flight_checks_never_exceed_the_ceiling() {
    let engine = Arc::new(MarkerEngine::with_delay("<b>", Duration::from_millis(25)));
    let options = Options::default().with_parallelism(2);
    let pipeline = Pipeline::new(options, engine.clone()).unwrap();
    let documents = docs(&[
        ("a.html", "<p>1</p>"),
        ("b.html", "<p>2</p>"),
        ("c.html", "<p>3</p>"),
        ("d.html", "<p>4</p>"),
        ("e.html", "<p>5</p>"),
        ("f.html", "<p>6</p>"),
    ]);

    pipeline.run(&documents).await.unwrap();
    assert_eq!(engine.checks(), 6);
    assert!(engine.max_in_flight() <= 2, "ceiling was breached");
}

#[tokio::test]
async fn test_document_of_only_ignored_content_is_clean() {
    let engine = Arc::new(MarkerEngine::new("<b>"));
    let pipeline = Pipeline::new(Options::default(), engine.clone()).unwrap();
    let documents = docs(&[("snippets.html", "<pre><b>sample</b></pre>")]);

    // The document is still checked; the engine just sees no content.
    pipeline.run(&documents).await.unwrap();
    assert_eq!(engine.checks(), 1);
}

#[tokio::test]
async fn test_unterminated_ignored_tag_swallows_the_rest() {
    let engine = Arc::new(MarkerEngine::new("<b>"));
    let pipeline = Pipeline::new(Options::default(), engine.clone()).unwrap();
    let documents = docs(&[("broken.html", "intro<pre>\n<b>never seen</b>")]);

    pipeline.run(&documents).await.unwrap();
    assert_eq!(engine.checks(), 1);
}

#[tokio::test]
async fn test_custom_ignore_tags_replace_the_defaults() {
    let documents = docs(&[("inline.html", "<script><b>x</b></script>")]);

    // script is not in the default ignore list, so its content counts.
    let engine = Arc::new(MarkerEngine::new("<b>"));
    let pipeline = Pipeline::new(Options::default(), engine.clone()).unwrap();
    assert!(pipeline.run(&documents).await.is_err());

    let options = Options::default().with_ignore_tags(["script"]);
    let pipeline = Pipeline::new(options, Arc::new(MarkerEngine::new("<b>"))).unwrap();
    pipeline.run(&documents).await.unwrap();
}

#[tokio::test]
async fn test_frames_point_at_the_pruned_text() {
    let engine = Arc::new(MarkerEngine::new("<b>"));
    let pipeline = Pipeline::new(Options::default(), engine.clone()).unwrap();
    // Pruning the svg leaves an empty line 2, so the flagged tag sits
    // on line 3 of what the engine saw.
    let documents = docs(&[("page.html", "<h1>t</h1>\n<svg>junk</svg>\n<b>x</b>")]);

    let err = pipeline.run(&documents).await.unwrap_err();
    let rendered = err.to_string();
    assert!(rendered.contains("> 3 | <b>x</b>"), "got:\n{rendered}");
}

#[tokio::test]
async fn test_frame_options_shape_the_rendered_window() {
    let options = Options::default().with_frame(FrameOptions {
        lines_above: 0,
        lines_below: 0,
        color: false,
    });
    let engine = Arc::new(MarkerEngine::new("<b>"));
    let pipeline = Pipeline::new(options, engine.clone()).unwrap();
    let documents = docs(&[("page.html", "<p>a</p>\n<b>x</b>\n<p>c</p>")]);

    let err = pipeline.run(&documents).await.unwrap_err();
    let rendered = err.to_string();
    assert!(rendered.contains("> 2 | <b>x</b>"), "got:\n{rendered}");
    assert!(!rendered.contains("1 | <p>a</p>"));
    assert!(!rendered.contains("3 | <p>c</p>"));
}

#[tokio::test]
async fn test_engine_reads_rule_entries_from_the_resolved_config() {
    let documents = docs(&[("old.html", "<center>x</center>")]);

    // The stylistic layer bans center, and the entry reaches the
    // engine through the resolved configuration.
    let pipeline = Pipeline::new(Options::default(), Arc::new(TagBanEngine)).unwrap();
    let err = pipeline.run(&documents).await.unwrap_err();
    let report = err.report().expect("validation report");
    assert_eq!(report.len(), 1);
    assert_eq!(report.failures()[0].path, "old.html");

    // Disabling the rule travels the same path.
    let options = Options::default()
        .with_engine_config(EngineConfig::new().rule("tag-bans", false));
    let pipeline = Pipeline::new(options, Arc::new(TagBanEngine)).unwrap();
    pipeline.run(&documents).await.unwrap();
}

#[tokio::test]
async fn test_engine_failure_is_reported_without_stopping_the_run() {
    let engine = Arc::new(ExplosiveEngine {
        checks: AtomicUsize::new(0),
    });
    let pipeline = Pipeline::new(Options::default(), engine.clone()).unwrap();
    let documents = docs(&[
        ("bad.html", "<p>boom</p>"),
        ("good.html", "<p>fine</p>"),
    ]);

    let err = pipeline.run(&documents).await.unwrap_err();
    // Both documents completed despite the failure.
    assert_eq!(engine.checks.load(Ordering::SeqCst), 2);

    let report = err.report().expect("validation report");
    assert_eq!(report.len(), 1);
    assert_eq!(report.failures()[0].path, "bad.html");
    match &report.failures()[0].kind {
        FailureKind::Engine { message } => assert_eq!(message, "engine exploded"),
        other => panic!("unexpected failure kind: {other:?}"),
    }
}

#[tokio::test]
async fn test_config_rejection_aborts_before_any_check() {
    let engine = Arc::new(RejectingEngine {
        checks: AtomicUsize::new(0),
    });
    let pipeline = Pipeline::new(Options::default(), engine.clone()).unwrap();
    let documents = docs(&[("index.html", "<p>x</p>")]);

    let err = pipeline.run(&documents).await.unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)));
    assert!(err.report().is_none());
    assert_eq!(engine.checks.load(Ordering::SeqCst), 0);
    assert_eq!(err.to_string(), "configuration rejected: unknown rule: made-up-rule");
}

#[tokio::test]
async fn test_slow_engine_calls_hit_the_deadline() {
    let engine = Arc::new(MarkerEngine::with_delay("<b>", Duration::from_millis(200)));
    let options = Options::default()
        .with_parallelism(1)
        .with_document_timeout(Duration::from_millis(20));
    let pipeline = Pipeline::new(options, engine.clone()).unwrap();
    let documents = docs(&[("slow.html", "<p>x</p>")]);

    let err = pipeline.run(&documents).await.unwrap_err();
    let report = err.report().expect("validation report");
    assert_eq!(report.len(), 1);
    assert_eq!(
        report.failures()[0].kind,
        FailureKind::TimedOut {
            after: Duration::from_millis(20)
        }
    );
    assert!(err.to_string().contains("validation timed out after"));
}

#[tokio::test]
async fn test_report_block_renders_exactly() {
    let engine = Arc::new(MarkerEngine::new("<b>"));
    let pipeline = Pipeline::new(Options::default(), engine.clone()).unwrap();
    let documents = docs(&[("page.html", "<html>\n<b>x</b>\n</html>")]);

    let err = pipeline.run(&documents).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "page.html:\n\
         \n\
         \x20 banned-marker (E016): {\"marker\":\"<b>\"}:\n\
         \x20\x20\n\
         \x20     1 | <html>\n\
         \x20   > 2 | <b>x</b>\n\
         \x20       | ^\n\
         \x20     3 | </html>"
    );
}

#[tokio::test]
async fn test_custom_matcher_controls_selection_and_order() {
    struct ReverseMatcher;

    impl PathMatcher for ReverseMatcher {
        fn select(&self, _pattern: &str, paths: &[String]) -> Vec<String> {
            let mut picked: Vec<String> = paths
                .iter()
                .filter(|path| path.ends_with(".html"))
                .cloned()
                .collect();
            picked.reverse();
            picked
        }
    }

    let engine = Arc::new(MarkerEngine::new("<b>"));
    let options = Options::default().with_parallelism(1);
    let pipeline = Pipeline::new(options, engine.clone()).unwrap();
    let documents = docs(&[
        ("a.html", "<b>first key</b>"),
        ("notes.txt", "<b>skipped</b>"),
        ("z.html", "<b>last key</b>"),
    ]);

    let err = pipeline
        .run_with_matcher(&documents, &ReverseMatcher)
        .await
        .unwrap_err();
    assert_eq!(engine.checks(), 2);

    // Ceiling 1 runs strictly in the matcher's order, so the reversed
    // selection shows up as the report order.
    let report = err.report().expect("validation report");
    let order: Vec<&str> = report
        .failures()
        .iter()
        .map(|failure| failure.path.as_str())
        .collect();
    assert_eq!(order, ["z.html", "a.html"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_no_failure_is_lost_when_completion_order_inverts() {
    let options = Options::default().with_parallelism(2);
    let pipeline = Pipeline::new(options, Arc::new(StaggerEngine)).unwrap();
    let documents = docs(&[
        ("a.html", "<b>linger</b>"),
        ("b.html", "<b>quick</b>"),
    ]);

    let err = pipeline.run(&documents).await.unwrap_err();
    let report = err.report().expect("validation report");

    // b finishes while a is still sleeping; a's findings still land.
    let order: Vec<&str> = report
        .failures()
        .iter()
        .map(|failure| failure.path.as_str())
        .collect();
    assert_eq!(order, ["b.html", "a.html"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_ceiling_changes_timing_not_results() {
    let documents = docs(&[
        ("a.html", "<b>x</b>"),
        ("b.html", "<p>clean</p>"),
        ("c.html", "<b>y</b>\n<b>z</b>"),
        ("d.html", "<p>clean</p>"),
    ]);

    let mut outcomes = Vec::new();
    for ceiling in [1, 8] {
        let engine = Arc::new(MarkerEngine::new("<b>"));
        let options = Options::default().with_parallelism(ceiling);
        let pipeline = Pipeline::new(options, engine.clone()).unwrap();
        let err = pipeline.run(&documents).await.unwrap_err();
        assert_eq!(engine.checks(), 4);

        let mut report = err.report().expect("validation report").clone();
        report.sort_by_document();
        outcomes.push(report);
    }
    assert_eq!(outcomes[0], outcomes[1]);
}

#[tokio::test]
async fn test_sorting_makes_reports_deterministic() {
    let engine = Arc::new(MarkerEngine::new("<b>"));
    let options = Options::default().with_parallelism(4);
    let pipeline = Pipeline::new(options, engine.clone()).unwrap();
    let documents = docs(&[
        ("c.html", "<b>x</b>"),
        ("a.html", "<b>y</b>"),
        ("b.html", "<b>z</b>"),
    ]);

    let err = pipeline.run(&documents).await.unwrap_err();
    let mut report = err.report().expect("validation report").clone();
    report.sort_by_document();
    let order: Vec<&str> = report
        .failures()
        .iter()
        .map(|failure| failure.path.as_str())
        .collect();
    assert_eq!(order, ["a.html", "b.html", "c.html"]);
}

#[test]
fn test_pipeline_exposes_the_resolved_engine_config() {
    let pipeline =
        Pipeline::new(Options::default(), Arc::new(MarkerEngine::new("<b>"))).unwrap();
    let config = pipeline.engine_config();
    assert!(config.rules.contains_key("doctype-first"));
    assert!(config.settings.contains_key("text-ignore-regex"));
}
