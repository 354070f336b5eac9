//! Typed status events emitted by the engine and step adapters.
//!
//! The driver subscribes to the receiving end and renders events as they
//! arrive; a dropped receiver never fails the pipeline.

use std::path::PathBuf;

use tokio::sync::mpsc;

use crate::domain::IterationStatus;
use crate::store::Category;

/// Sender half of the event stream.
pub type EventSender = mpsc::Sender<LoopEvent>;

/// Which provider produced an expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionSource {
    /// Local expansion endpoint
    Local,
    /// Remote fallback model
    Fallback,
}

/// Status events, in the order a consumer will see them within an iteration.
#[derive(Debug, Clone)]
pub enum LoopEvent {
    IterationStarted {
        iteration: u32,
    },
    /// Expansion attempt started
    Expanding,
    /// Expansion succeeded
    Expanded {
        prompt: String,
        source: ExpansionSource,
    },
    /// Local expansion failed; trying the remote fallback
    ExpansionFallback {
        reason: String,
    },
    /// Both expansion providers failed; continuing with the original prompt
    ExpansionDegraded {
        reason: String,
    },
    /// Image synthesis started
    Synthesizing,
    /// Image synthesized, fetched, decoded, and persisted
    ImageReady {
        path: PathBuf,
    },
    SynthesisFailed {
        reason: String,
    },
    /// Captioning started
    Captioning,
    /// Caption produced; becomes the next iteration's prompt
    Described {
        description: String,
    },
    CaptioningFailed {
        reason: String,
    },
    /// An artifact write failed; the iteration continues regardless
    ArtifactWriteFailed {
        category: Category,
        reason: String,
    },
    IterationComplete {
        iteration: u32,
    },
    SessionComplete {
        iterations: u32,
    },
    SessionAborted {
        iteration: u32,
        status: IterationStatus,
    },
}

/// Send an event, ignoring a closed channel.
///
/// Presentation is an observer: if nobody is listening the loop keeps going.
pub async fn emit(events: &EventSender, event: LoopEvent) {
    if let Err(e) = events.send(event).await {
        log::debug!("Event receiver dropped: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_delivers_event() {
        let (tx, mut rx) = mpsc::channel(4);
        emit(&tx, LoopEvent::IterationStarted { iteration: 0 }).await;

        match rx.recv().await {
            Some(LoopEvent::IterationStarted { iteration }) => assert_eq!(iteration, 0),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_emit_tolerates_dropped_receiver() {
        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        // Must not panic or error out
        emit(&tx, LoopEvent::Expanding).await;
    }

    #[test]
    fn test_expansion_source_equality() {
        assert_eq!(ExpansionSource::Local, ExpansionSource::Local);
        assert_ne!(ExpansionSource::Local, ExpansionSource::Fallback);
    }

    #[test]
    fn test_events_are_cloneable() {
        let event = LoopEvent::Described {
            description: "a moonlit harbor".to_string(),
        };
        let copy = event.clone();
        match copy {
            LoopEvent::Described { description } => assert_eq!(description, "a moonlit harbor"),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
