//! Feedback loop engine - sequences expand → synthesize → caption and
//! threads each iteration's caption into the next iteration's prompt.

pub mod caption;
pub mod expand;
pub mod synthesize;

pub use caption::CaptionAdapter;
pub use expand::ExpansionAdapter;
pub use synthesize::SynthesisAdapter;

use async_trait::async_trait;

use crate::domain::event::{self, EventSender, LoopEvent};
use crate::domain::{ImageArtifact, IterationResult, IterationStatus, LoopSession, SessionOutcome};

/// Prompt expansion step. Degrades instead of failing: the returned prompt
/// may be the input unchanged, but it is always usable.
#[async_trait]
pub trait Expand: Send + Sync {
    async fn expand(&self, short: &str) -> String;
}

/// Image synthesis step. `None` is terminal for the current iteration.
#[async_trait]
pub trait Synthesize: Send + Sync {
    async fn synthesize(&self, prompt: &str) -> Option<ImageArtifact>;
}

/// Captioning step. `None` is terminal for the current iteration.
#[async_trait]
pub trait Caption: Send + Sync {
    async fn caption(&self, image: &ImageArtifact) -> Option<String>;
}

/// The orchestrator. Owns no state beyond its adapters and the event
/// channel; all session state lives in [`LoopSession`].
pub struct FeedbackEngine<X, S, C>
where
    X: Expand,
    S: Synthesize,
    C: Caption,
{
    expander: X,
    synthesizer: S,
    captioner: C,
    events: EventSender,
}

impl<X, S, C> FeedbackEngine<X, S, C>
where
    X: Expand,
    S: Synthesize,
    C: Caption,
{
    pub fn new(expander: X, synthesizer: S, captioner: C, events: EventSender) -> Self {
        Self {
            expander,
            synthesizer,
            captioner,
            events,
        }
    }

    /// Run one iteration: expand → synthesize → caption, short-circuiting
    /// on the first step that returns nothing.
    pub async fn run_iteration(&self, iteration: u32, prompt: &str) -> IterationResult {
        event::emit(&self.events, LoopEvent::IterationStarted { iteration }).await;

        // Expansion never aborts; worst case it hands back `prompt` itself.
        let expanded = self.expander.expand(prompt).await;

        let Some(image) = self.synthesizer.synthesize(&expanded).await else {
            return IterationResult {
                iteration,
                expanded_prompt: Some(expanded),
                image: None,
                description: None,
                status: IterationStatus::FailedAtSynthesis,
            };
        };

        let Some(description) = self.captioner.caption(&image).await else {
            return IterationResult {
                iteration,
                expanded_prompt: Some(expanded),
                image: Some(image),
                description: None,
                status: IterationStatus::FailedAtCaptioning,
            };
        };

        IterationResult {
            iteration,
            expanded_prompt: Some(expanded),
            image: Some(image),
            description: Some(description),
            status: IterationStatus::Complete,
        }
    }

    /// Drive a session to completion or first failure.
    ///
    /// Iterations run strictly sequentially; the first non-Complete result
    /// terminates the session without consuming remaining iterations.
    pub async fn run_session(&self, session: &mut LoopSession) -> SessionOutcome {
        for iteration in 0..session.max_iterations {
            let result = self.run_iteration(iteration, &session.current_prompt).await;
            let status = result.status;

            if let Some(description) = &result.description {
                session.current_prompt = description.clone();
            }
            session.history.push(result);

            if !status.is_complete() {
                log::warn!("Session aborted at iteration {}: {:?}", iteration, status);
                event::emit(
                    &self.events,
                    LoopEvent::SessionAborted { iteration, status },
                )
                .await;
                return SessionOutcome::Aborted { iteration, status };
            }

            event::emit(&self.events, LoopEvent::IterationComplete { iteration }).await;
        }

        event::emit(
            &self.events,
            LoopEvent::SessionComplete {
                iterations: session.max_iterations,
            },
        )
        .await;
        SessionOutcome::Complete
    }
}
