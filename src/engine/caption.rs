//! Image captioning: temp-file handoff to the vision model.
//!
//! The provider consumes a file, not in-memory bytes, so the image is
//! written to a scratch path for the duration of the call and removed
//! unconditionally afterwards.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::ImageArtifact;
use crate::domain::event::{self, EventSender, LoopEvent};
use crate::engine::Caption;
use crate::provider::VisionModel;
use crate::store::{ArtifactStore, Category};

/// Instruction handed to the vision model.
const CAPTION_INSTRUCTION: &str = "Describe this image in detail as if you were creating a \
    prompt for an image generator. Be creative and focus on visual elements, style, mood, and \
    atmosphere. Do not start with phrases like 'This image shows' or 'I can see'. Just describe \
    the content directly.";

/// Captioning step over a vision model.
pub struct CaptionAdapter<V>
where
    V: VisionModel,
{
    vision: Arc<V>,
    store: Arc<ArtifactStore>,
    events: EventSender,
}

impl<V> CaptionAdapter<V>
where
    V: VisionModel,
{
    pub fn new(vision: Arc<V>, store: Arc<ArtifactStore>, events: EventSender) -> Self {
        Self {
            vision,
            store,
            events,
        }
    }

    async fn fail(&self, reason: String) -> Option<String> {
        log::warn!("Captioning failed: {}", reason);
        event::emit(&self.events, LoopEvent::CaptioningFailed { reason }).await;
        None
    }
}

#[async_trait]
impl<V> Caption for CaptionAdapter<V>
where
    V: VisionModel,
{
    async fn caption(&self, image: &ImageArtifact) -> Option<String> {
        event::emit(&self.events, LoopEvent::Captioning).await;

        let temp_path = self.store.temp_image_path();
        if let Err(e) = image.image.save(&temp_path) {
            return self.fail(format!("temp image write failed: {}", e)).await;
        }

        let outcome = self.vision.describe(&temp_path, CAPTION_INSTRUCTION).await;

        // Cleanup happens whether the provider succeeded or not.
        if let Err(e) = std::fs::remove_file(&temp_path) {
            log::warn!("Failed to remove temp image {}: {}", temp_path.display(), e);
        }

        match outcome {
            Ok(description) => {
                if let Err(e) = self.store.save_text(Category::Description, &description) {
                    log::warn!("Failed to persist description: {}", e);
                    event::emit(
                        &self.events,
                        LoopEvent::ArtifactWriteFailed {
                            category: Category::Description,
                            reason: e.to_string(),
                        },
                    )
                    .await;
                }
                event::emit(
                    &self.events,
                    LoopEvent::Described {
                        description: description.clone(),
                    },
                )
                .await;
                Some(description)
            }
            Err(e) => self.fail(format!("provider error: {}", e)).await,
        }
    }
}
