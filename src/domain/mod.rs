//! Domain types for the feedback loop.

pub mod event;

pub use event::{EventSender, ExpansionSource, LoopEvent};

use std::path::PathBuf;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// A decoded raster image plus the path it was persisted to.
///
/// Never mutated after creation; owned by the producing step until handed to
/// captioning and the event stream (which only sees the path).
#[derive(Debug, Clone)]
pub struct ImageArtifact {
    pub image: DynamicImage,
    pub path: PathBuf,
}

impl ImageArtifact {
    pub fn new(image: DynamicImage, path: PathBuf) -> Self {
        Self { image, path }
    }
}

/// Outcome of a single iteration of the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IterationStatus {
    /// All three steps succeeded
    Complete,
    /// Expansion produced no usable prompt. The shipped expansion adapter
    /// degrades to the original prompt instead, so it never emits this.
    FailedAtExpansion,
    /// The image provider returned nothing, or the bytes could not be
    /// fetched or decoded
    FailedAtSynthesis,
    /// The vision model produced no caption
    FailedAtCaptioning,
}

impl IterationStatus {
    /// Whether the session may continue past this iteration.
    pub fn is_complete(&self) -> bool {
        matches!(self, IterationStatus::Complete)
    }
}

/// Result of one loop iteration.
///
/// Created at the start of an iteration, fully populated or short-circuited
/// on first failure, immutable once returned.
#[derive(Debug, Clone)]
pub struct IterationResult {
    pub iteration: u32,
    pub expanded_prompt: Option<String>,
    pub image: Option<ImageArtifact>,
    pub description: Option<String>,
    pub status: IterationStatus,
}

impl IterationResult {
    /// A result that failed before producing the given artifacts.
    pub fn failed(iteration: u32, status: IterationStatus) -> Self {
        Self {
            iteration,
            expanded_prompt: None,
            image: None,
            description: None,
            status,
        }
    }
}

/// One full run of the feedback loop across a fixed number of iterations.
#[derive(Debug)]
pub struct LoopSession {
    pub initial_prompt: String,
    pub max_iterations: u32,
    /// Input to the next iteration; rewritten exactly once per completed
    /// iteration with that iteration's description.
    pub current_prompt: String,
    pub history: Vec<IterationResult>,
}

impl LoopSession {
    pub fn new(initial_prompt: impl Into<String>, max_iterations: u32) -> Self {
        let initial_prompt = initial_prompt.into();
        Self {
            current_prompt: initial_prompt.clone(),
            initial_prompt,
            max_iterations,
            history: Vec::new(),
        }
    }

    /// Whether the session has hit a failed iteration and must not continue.
    pub fn is_terminated(&self) -> bool {
        self.history
            .last()
            .is_some_and(|result| !result.status.is_complete())
    }
}

/// Final outcome of a session run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Every iteration completed
    Complete,
    /// An iteration failed and the session stopped early
    Aborted {
        iteration: u32,
        status: IterationStatus,
    },
}
