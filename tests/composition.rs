// Composition tests — store, gate, admin surface, and harness wired together.
//
// These exercise the data flow between modules:
//   Database -> PolicyStore -> ModerationGate -> Decision
// with in-process scorers and backends. The SQLite case writes one file
// under the system temp directory.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use edugate::db::{self, Database, MemoryDatabase};
use edugate::error::ModerationError;
use edugate::moderation::gate::{REASON_POLICY_UNAVAILABLE, REASON_SCORER_DEGRADED};
use edugate::moderation::{ContentSubmission, ModerationEngine};
use edugate::policy::{Policy, PolicyUpdate};
use edugate::toxicity::rate_limiter::RateLimiter;
use edugate::toxicity::ToxicityScorer;

// ============================================================
// Test doubles
// ============================================================

struct FixedScorer {
    score: f64,
    calls: AtomicUsize,
}

impl FixedScorer {
    fn new(score: f64) -> Arc<Self> {
        Arc::new(Self {
            score,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ToxicityScorer for FixedScorer {
    async fn score_text(&self, _text: &str) -> Result<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.score)
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

struct FailingScorer;

#[async_trait]
impl ToxicityScorer for FailingScorer {
    async fn score_text(&self, _text: &str) -> Result<f64> {
        anyhow::bail!("upstream returned 503")
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

struct HangingScorer;

#[async_trait]
impl ToxicityScorer for HangingScorer {
    async fn score_text(&self, _text: &str) -> Result<f64> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(0.0)
    }

    fn name(&self) -> &'static str {
        "hanging"
    }
}

/// Scores instantly but admits at most two requests per second, like a
/// free-tier API.
struct ThrottledScorer {
    limiter: RateLimiter,
    sent: AtomicUsize,
}

#[async_trait]
impl ToxicityScorer for ThrottledScorer {
    async fn score_text(&self, _text: &str) -> Result<f64> {
        self.limiter.acquire().await;
        self.sent.fetch_add(1, Ordering::SeqCst);
        Ok(0.1)
    }

    async fn score_text_before(&self, _text: &str, deadline: tokio::time::Instant) -> Result<f64> {
        self.limiter.acquire_before(deadline).await?;
        self.sent.fetch_add(1, Ordering::SeqCst);
        Ok(0.1)
    }

    fn name(&self) -> &'static str {
        "throttled"
    }
}

/// A backend whose every call fails, as if the database were unreachable.
struct UnreachableDatabase;

#[async_trait]
impl Database for UnreachableDatabase {
    async fn table_count(&self) -> Result<i64> {
        anyhow::bail!("connection refused")
    }

    async fn load_policy(&self) -> Result<Option<Policy>> {
        anyhow::bail!("connection refused")
    }

    async fn insert_policy_if_absent(&self, _policy: &Policy) -> Result<Policy> {
        anyhow::bail!("connection refused")
    }

    async fn compare_and_swap_policy(&self, _expected: u64, _policy: &Policy) -> Result<bool> {
        anyhow::bail!("connection refused")
    }
}

fn engine_with(scorer: Option<Arc<dyn ToxicityScorer>>) -> ModerationEngine {
    ModerationEngine::new(
        Arc::new(MemoryDatabase::new()),
        scorer,
        Duration::from_millis(100),
    )
}

async fn enable_external_scoring(engine: &ModerationEngine) {
    engine
        .admin
        .update_policy(
            &PolicyUpdate {
                external_scoring_enabled: Some(true),
                ..Default::default()
            },
            "instructor@example.edu",
        )
        .await
        .unwrap();
}

// ============================================================
// Scorer degradation
// ============================================================

#[tokio::test]
async fn failing_scorer_degrades_to_keyword_rules() {
    let engine = engine_with(Some(Arc::new(FailingScorer)));
    enable_external_scoring(&engine).await;

    let decision = engine
        .gate
        .evaluate(&ContentSubmission::from_text("Photosynthesis explained"))
        .await
        .unwrap();

    assert!(decision.approved);
    assert_eq!(decision.reason.as_deref(), Some(REASON_SCORER_DEGRADED));
    assert!(decision.confidence.is_none());
}

#[tokio::test]
async fn timed_out_scorer_degrades_to_keyword_rules() {
    let engine = engine_with(Some(Arc::new(HangingScorer)));
    enable_external_scoring(&engine).await;

    let started = std::time::Instant::now();
    let decision = engine
        .gate
        .evaluate(&ContentSubmission::from_text("Photosynthesis explained"))
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(decision.approved);
    assert_eq!(decision.reason.as_deref(), Some(REASON_SCORER_DEGRADED));
    assert!(decision.confidence.is_none());
}

#[tokio::test]
async fn scorer_recovers_after_a_burst_beyond_its_rate_limit() {
    let scorer = Arc::new(ThrottledScorer {
        limiter: RateLimiter::new(2.0),
        sent: AtomicUsize::new(0),
    });
    let engine = engine_with(Some(scorer.clone()));
    enable_external_scoring(&engine).await;
    let submission = ContentSubmission::from_text("Photosynthesis explained");

    let first = engine.gate.evaluate(&submission).await.unwrap();
    assert_eq!(first.confidence, Some(0.1));

    // Past the 100ms scorer timeout for every caller in the burst
    for _ in 0..10 {
        let decision = engine.gate.evaluate(&submission).await.unwrap();
        assert_eq!(decision.reason.as_deref(), Some(REASON_SCORER_DEGRADED));
    }
    assert_eq!(scorer.sent.load(Ordering::SeqCst), 1);

    // Once the next slot comes round, scoring works again
    tokio::time::sleep(Duration::from_millis(600)).await;
    let decision = engine.gate.evaluate(&submission).await.unwrap();
    assert_eq!(decision.confidence, Some(0.1));
    assert!(decision.reason.is_none());
    assert_eq!(scorer.sent.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn degraded_scorer_still_applies_keyword_rejection() {
    let engine = engine_with(Some(Arc::new(FailingScorer)));
    enable_external_scoring(&engine).await;

    let decision = engine
        .gate
        .evaluate(&ContentSubmission::from_text("Check out this funny meme"))
        .await
        .unwrap();

    assert!(!decision.approved);
}

#[tokio::test]
async fn missing_scorer_degrades_when_scoring_enabled() {
    let engine = engine_with(None);
    enable_external_scoring(&engine).await;

    let decision = engine
        .harness
        .dry_run("Photosynthesis explained")
        .await
        .unwrap();
    assert!(decision.approved);
    assert_eq!(decision.reason.as_deref(), Some(REASON_SCORER_DEGRADED));
}

#[tokio::test]
async fn scorer_not_consulted_when_scoring_disabled() {
    let scorer = FixedScorer::new(0.99);
    let engine = engine_with(Some(scorer.clone()));

    let decision = engine
        .harness
        .dry_run("Photosynthesis explained")
        .await
        .unwrap();
    assert!(decision.approved);
    assert!(decision.reason.is_none());
    assert_eq!(scorer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn toxic_score_rejects_with_confidence() {
    let engine = engine_with(Some(FixedScorer::new(0.92)));
    enable_external_scoring(&engine).await;

    let decision = engine
        .harness
        .dry_run("Photosynthesis explained")
        .await
        .unwrap();
    assert!(!decision.approved);
    assert_eq!(decision.confidence, Some(0.92));
}

// ============================================================
// Admin updates
// ============================================================

#[tokio::test]
async fn out_of_range_threshold_leaves_policy_unchanged() {
    let engine = engine_with(None);
    let before = engine.admin.get_policy().await.unwrap();

    let err = engine
        .admin
        .update_policy(
            &PolicyUpdate {
                toxicity_threshold: Some(1.5),
                ..Default::default()
            },
            "instructor@example.edu",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ModerationError::InvalidPolicy(_)));

    let after = engine.admin.get_policy().await.unwrap();
    assert_eq!(after.toxicity_threshold, before.toxicity_threshold);
    assert_eq!(after.version, before.version);
}

#[tokio::test]
async fn update_records_actor_and_takes_effect() {
    let engine = engine_with(None);
    let before = engine.admin.get_policy().await.unwrap();

    let policy = engine
        .admin
        .update_policy(
            &PolicyUpdate {
                custom_banned_words: Some(vec!["  Clickbait ".to_string()]),
                ..Default::default()
            },
            "instructor@example.edu",
        )
        .await
        .unwrap();

    assert_eq!(policy.updated_by.as_deref(), Some("instructor@example.edu"));
    assert!(policy.last_updated >= before.last_updated);
    assert!(policy.banned_words.contains("clickbait"));
    assert!(policy.banned_words.contains("memes"));

    let decision = engine
        .harness
        .dry_run("Ten CLICKBAIT headlines")
        .await
        .unwrap();
    assert!(!decision.approved);
}

#[tokio::test]
async fn concurrent_updates_are_all_committed() {
    let engine = Arc::new(engine_with(None));
    engine.admin.get_policy().await.unwrap();

    let mut handles = Vec::new();
    for i in 0..8u32 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine
                .admin
                .update_policy(
                    &PolicyUpdate {
                        toxicity_threshold: Some(f64::from(i) / 10.0),
                        ..Default::default()
                    },
                    &format!("admin-{i}"),
                )
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let policy = engine.admin.get_policy().await.unwrap();
    assert_eq!(policy.version, 9);
    assert!((0.0..=0.7).contains(&policy.toxicity_threshold));
}

#[tokio::test]
async fn readers_never_see_partial_word_lists() {
    let engine = Arc::new(engine_with(None));
    engine.admin.get_policy().await.unwrap();

    let writer = {
        let engine = engine.clone();
        tokio::spawn(async move {
            for i in 0..20 {
                let words = vec![format!("alpha{i}"), format!("beta{i}")];
                engine
                    .admin
                    .update_policy(
                        &PolicyUpdate {
                            custom_banned_words: Some(words),
                            ..Default::default()
                        },
                        "writer",
                    )
                    .await
                    .unwrap();
            }
        })
    };

    for _ in 0..50 {
        let policy = engine.store.current().await.unwrap();
        // Custom terms always arrive as a pair from the same update
        assert!(policy.custom_banned_words.is_empty() || policy.custom_banned_words.len() == 2);
        tokio::task::yield_now().await;
    }
    writer.await.unwrap();
}

// ============================================================
// Dry runs
// ============================================================

#[tokio::test]
async fn dry_run_is_idempotent_without_policy_change() {
    let engine = engine_with(Some(FixedScorer::new(0.3)));
    enable_external_scoring(&engine).await;

    for text in ["Fun tutorial on gossip in media studies", "hello class", "memes"] {
        let first = engine.harness.dry_run(text).await.unwrap();
        let second = engine.harness.dry_run(text).await.unwrap();
        assert!(first.same_outcome(&second), "dry run of {text:?} changed");
    }
}

#[tokio::test]
async fn dry_run_many_preserves_input_order() {
    let engine = engine_with(None);
    let texts = vec![
        "memes".to_string(),
        "Photosynthesis explained".to_string(),
        "gossip study".to_string(),
    ];

    let results = engine.harness.dry_run_many(&texts, 2).await;
    let approved: Vec<bool> = results.into_iter().map(|r| r.unwrap().approved).collect();
    assert_eq!(approved, vec![false, true, true]);
}

// ============================================================
// Store failure
// ============================================================

#[tokio::test]
async fn unreachable_store_fails_evaluation_closed() {
    let engine = ModerationEngine::new(
        Arc::new(UnreachableDatabase),
        None,
        Duration::from_millis(100),
    );
    let submission = ContentSubmission::from_text("Photosynthesis explained");

    let err = engine.gate.evaluate(&submission).await.unwrap_err();
    assert!(matches!(err, ModerationError::StoreUnavailable(_)));

    let decision = engine.gate.evaluate_or_reject(&submission).await;
    assert!(!decision.approved);
    assert_eq!(decision.reason.as_deref(), Some(REASON_POLICY_UNAVAILABLE));

    let err = engine.admin.get_policy().await.unwrap_err();
    assert!(matches!(err, ModerationError::StoreUnavailable(_)));
}

// ============================================================
// SQLite persistence
// ============================================================

#[cfg(feature = "sqlite")]
#[tokio::test]
async fn sqlite_policy_survives_reopen() {
    let path = std::env::temp_dir().join(format!(
        "edugate-composition-{}.db",
        std::process::id()
    ));
    let path_str = path.to_string_lossy().to_string();
    let _ = std::fs::remove_file(&path);

    {
        let engine = ModerationEngine::new(
            db::initialize_sqlite(&path_str).unwrap(),
            None,
            Duration::from_millis(100),
        );
        engine
            .admin
            .update_policy(
                &PolicyUpdate {
                    strict_mode: Some(true),
                    toxicity_threshold: Some(0.25),
                    ..Default::default()
                },
                "instructor@example.edu",
            )
            .await
            .unwrap();
    }

    let engine = ModerationEngine::new(
        db::open_sqlite(&path_str).unwrap(),
        None,
        Duration::from_millis(100),
    );
    let policy = engine.admin.get_policy().await.unwrap();
    assert!(policy.strict_mode);
    assert_eq!(policy.toxicity_threshold, 0.25);
    assert_eq!(policy.version, 2);
    assert_eq!(policy.updated_by.as_deref(), Some("instructor@example.edu"));

    let decision = engine
        .harness
        .dry_run("Fun tutorial on gossip in media studies")
        .await
        .unwrap();
    assert!(!decision.approved);

    drop(engine);
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{path_str}{suffix}"));
    }
}
