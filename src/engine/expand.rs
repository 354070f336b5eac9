//! Prompt expansion with local-first fallback.
//!
//! The local endpoint gets the raw short prompt; the remote fallback gets it
//! wrapped in an instruction template. If both fail the original prompt is
//! returned unchanged - expansion degrades, it never aborts an iteration.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::event::{self, EventSender, ExpansionSource, LoopEvent};
use crate::engine::Expand;
use crate::provider::TextModel;
use crate::store::{ArtifactStore, Category};

/// Instruction wrapped around the short prompt for the fallback model.
const FALLBACK_INSTRUCTION: &str = "You are a creative prompt engineer for image generation. \
    Expand this short prompt into a detailed and vivid scene description including style, \
    lighting, mood, and composition. Just provide the expanded prompt without explanations: ";

/// Expansion step: local endpoint, then remote fallback, then degradation.
pub struct ExpansionAdapter<P, F>
where
    P: TextModel,
    F: TextModel,
{
    local: Arc<P>,
    fallback: Arc<F>,
    store: Arc<ArtifactStore>,
    events: EventSender,
}

impl<P, F> ExpansionAdapter<P, F>
where
    P: TextModel,
    F: TextModel,
{
    pub fn new(local: Arc<P>, fallback: Arc<F>, store: Arc<ArtifactStore>, events: EventSender) -> Self {
        Self {
            local,
            fallback,
            store,
            events,
        }
    }

    /// Persist an expanded prompt; a write failure is reported, not fatal.
    async fn persist(&self, prompt: &str) {
        if let Err(e) = self.store.save_text(Category::Prompt, prompt) {
            log::warn!("Failed to persist expanded prompt: {}", e);
            event::emit(
                &self.events,
                LoopEvent::ArtifactWriteFailed {
                    category: Category::Prompt,
                    reason: e.to_string(),
                },
            )
            .await;
        }
    }

    async fn expand_with_fallback(&self, short: &str) -> String {
        let wrapped = format!("{}{}", FALLBACK_INSTRUCTION, short);
        match self.fallback.generate(&wrapped).await {
            Ok(expanded) => {
                self.persist(&expanded).await;
                event::emit(
                    &self.events,
                    LoopEvent::Expanded {
                        prompt: expanded.clone(),
                        source: ExpansionSource::Fallback,
                    },
                )
                .await;
                expanded
            }
            Err(e) => {
                log::warn!("Fallback expansion failed: {}", e);
                event::emit(
                    &self.events,
                    LoopEvent::ExpansionDegraded {
                        reason: e.to_string(),
                    },
                )
                .await;
                short.to_string()
            }
        }
    }
}

#[async_trait]
impl<P, F> Expand for ExpansionAdapter<P, F>
where
    P: TextModel,
    F: TextModel,
{
    async fn expand(&self, short: &str) -> String {
        event::emit(&self.events, LoopEvent::Expanding).await;

        match self.local.generate(short).await {
            Ok(expanded) => {
                self.persist(&expanded).await;
                event::emit(
                    &self.events,
                    LoopEvent::Expanded {
                        prompt: expanded.clone(),
                        source: ExpansionSource::Local,
                    },
                )
                .await;
                expanded
            }
            Err(e) => {
                log::warn!("Local expansion failed, falling back: {}", e);
                event::emit(
                    &self.events,
                    LoopEvent::ExpansionFallback {
                        reason: e.to_string(),
                    },
                )
                .await;
                self.expand_with_fallback(short).await
            }
        }
    }
}
