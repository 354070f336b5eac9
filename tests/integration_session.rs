//! End-to-end session integration tests
//!
//! Exercises the full engine with deterministic stub steps and a real
//! artifact store on disk, without any network access.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::mpsc;

use driftloop::domain::{ImageArtifact, IterationStatus, LoopEvent, LoopSession, SessionOutcome};
use driftloop::engine::{Caption, Expand, FeedbackEngine, Synthesize};
use driftloop::store::{ArtifactStore, Category};

/// Deterministic expansion stub that persists like the real adapter.
struct StoreBackedExpand {
    store: Arc<ArtifactStore>,
}

#[async_trait]
impl Expand for StoreBackedExpand {
    async fn expand(&self, short: &str) -> String {
        let expanded = format!("A detailed, vivid rendition of: {}", short);
        self.store
            .save_text(Category::Prompt, &expanded)
            .expect("prompt write");
        expanded
    }
}

/// Deterministic synthesis stub that persists a real PNG.
struct StoreBackedSynthesize {
    store: Arc<ArtifactStore>,
}

#[async_trait]
impl Synthesize for StoreBackedSynthesize {
    async fn synthesize(&self, _prompt: &str) -> Option<ImageArtifact> {
        let image = image::DynamicImage::new_rgba8(8, 8);
        let path = self.store.save_image(&image).expect("image write");
        Some(ImageArtifact::new(image, path))
    }
}

/// Deterministic captioning stub that persists like the real adapter.
struct StoreBackedCaption {
    store: Arc<ArtifactStore>,
}

#[async_trait]
impl Caption for StoreBackedCaption {
    async fn caption(&self, _image: &ImageArtifact) -> Option<String> {
        let description = "A grand piano bathed in amber stage light".to_string();
        self.store
            .save_text(Category::Description, &description)
            .expect("description write");
        Some(description)
    }
}

fn files_with_prefix(dir: &std::path::Path, prefix: &str) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(prefix))
        })
        .collect()
}

/// Integration test: single iteration, all steps succeed, exactly one
/// artifact per category.
#[tokio::test]
async fn test_single_iteration_end_to_end() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(ArtifactStore::open(dir.path()).unwrap());
    let (tx, mut rx) = mpsc::channel(256);

    let engine = FeedbackEngine::new(
        StoreBackedExpand { store: store.clone() },
        StoreBackedSynthesize { store: store.clone() },
        StoreBackedCaption { store: store.clone() },
        tx,
    );

    let mut session = LoopSession::new("A cat playing piano", 1);
    let outcome = engine.run_session(&mut session).await;

    assert_eq!(outcome, SessionOutcome::Complete);
    assert_eq!(session.history.len(), 1);
    assert_eq!(session.history[0].status, IterationStatus::Complete);

    // Exactly one write per category
    let prompts_dir = dir.path().join("prompts");
    let images_dir = dir.path().join("images");
    assert_eq!(files_with_prefix(&prompts_dir, "prompt_").len(), 1);
    assert_eq!(files_with_prefix(&prompts_dir, "description_").len(), 1);
    assert_eq!(files_with_prefix(&images_dir, "image_").len(), 1);

    // The session prompt advanced to the caption
    assert_eq!(
        session.current_prompt,
        "A grand piano bathed in amber stage light"
    );

    // Event stream ends with session completion
    drop(engine);
    let mut last = None;
    while let Some(event) = rx.recv().await {
        last = Some(event);
    }
    assert!(matches!(last, Some(LoopEvent::SessionComplete { iterations: 1 })));
}

/// Integration test: each completed iteration appends one artifact per
/// category and threads its description forward.
#[tokio::test]
async fn test_three_iterations_accumulate_artifacts() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(ArtifactStore::open(dir.path()).unwrap());
    let (tx, _rx) = mpsc::channel(256);

    let engine = FeedbackEngine::new(
        StoreBackedExpand { store: store.clone() },
        StoreBackedSynthesize { store: store.clone() },
        StoreBackedCaption { store: store.clone() },
        tx,
    );

    let mut session = LoopSession::new("a quiet forest", 3);
    let outcome = engine.run_session(&mut session).await;

    assert_eq!(outcome, SessionOutcome::Complete);
    assert_eq!(session.history.len(), 3);

    let prompts_dir = dir.path().join("prompts");
    let images_dir = dir.path().join("images");
    assert_eq!(files_with_prefix(&prompts_dir, "prompt_").len(), 3);
    assert_eq!(files_with_prefix(&prompts_dir, "description_").len(), 3);
    assert_eq!(files_with_prefix(&images_dir, "image_").len(), 3);

    // Round-trip: each iteration's description is the next iteration's input
    for pair in session.history.windows(2) {
        let description = pair[0].description.as_deref().unwrap();
        let next_expanded = pair[1].expanded_prompt.as_deref().unwrap();
        assert!(next_expanded.contains(description));
    }
}

/// Integration test: a failing synthesis step at the second iteration stops
/// the session with exactly two history entries.
#[tokio::test]
async fn test_session_aborts_midway() {
    struct FlakySynthesize {
        store: Arc<ArtifactStore>,
        calls: std::sync::atomic::AtomicU32,
    }

    #[async_trait]
    impl Synthesize for FlakySynthesize {
        async fn synthesize(&self, _prompt: &str) -> Option<ImageArtifact> {
            let call = self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
            if call == 2 {
                return None;
            }
            let image = image::DynamicImage::new_rgba8(8, 8);
            let path = self.store.save_image(&image).expect("image write");
            Some(ImageArtifact::new(image, path))
        }
    }

    let dir = TempDir::new().unwrap();
    let store = Arc::new(ArtifactStore::open(dir.path()).unwrap());
    let (tx, _rx) = mpsc::channel(256);

    let engine = FeedbackEngine::new(
        StoreBackedExpand { store: store.clone() },
        FlakySynthesize {
            store: store.clone(),
            calls: std::sync::atomic::AtomicU32::new(0),
        },
        StoreBackedCaption { store: store.clone() },
        tx,
    );

    let mut session = LoopSession::new("seed", 3);
    let outcome = engine.run_session(&mut session).await;

    assert_eq!(
        outcome,
        SessionOutcome::Aborted {
            iteration: 1,
            status: IterationStatus::FailedAtSynthesis,
        }
    );
    assert_eq!(session.history.len(), 2);
    assert_eq!(session.history[1].status, IterationStatus::FailedAtSynthesis);

    // Only the first iteration got all the way through
    let prompts_dir = dir.path().join("prompts");
    assert_eq!(files_with_prefix(&prompts_dir, "prompt_").len(), 2);
    assert_eq!(files_with_prefix(&prompts_dir, "description_").len(), 1);
}
