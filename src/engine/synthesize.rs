//! Image synthesis: diffusion call, byte fetch, decode, persist.
//!
//! Any fault here is terminal for the current iteration - zero outputs,
//! fetch failure, and decode failure all collapse into a `None` result the
//! engine maps to `FailedAtSynthesis`.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::event::{self, EventSender, LoopEvent};
use crate::domain::ImageArtifact;
use crate::engine::Synthesize;
use crate::provider::{DiffusionModel, ImageFetcher};
use crate::store::{ArtifactStore, Category};

/// Synthesis step over a diffusion model and an image fetcher.
pub struct SynthesisAdapter<D, F>
where
    D: DiffusionModel,
    F: ImageFetcher,
{
    diffusion: Arc<D>,
    fetcher: Arc<F>,
    store: Arc<ArtifactStore>,
    events: EventSender,
}

impl<D, F> SynthesisAdapter<D, F>
where
    D: DiffusionModel,
    F: ImageFetcher,
{
    pub fn new(diffusion: Arc<D>, fetcher: Arc<F>, store: Arc<ArtifactStore>, events: EventSender) -> Self {
        Self {
            diffusion,
            fetcher,
            store,
            events,
        }
    }

    async fn fail(&self, reason: String) -> Option<ImageArtifact> {
        log::warn!("Synthesis failed: {}", reason);
        event::emit(&self.events, LoopEvent::SynthesisFailed { reason }).await;
        None
    }
}

#[async_trait]
impl<D, F> Synthesize for SynthesisAdapter<D, F>
where
    D: DiffusionModel,
    F: ImageFetcher,
{
    async fn synthesize(&self, prompt: &str) -> Option<ImageArtifact> {
        event::emit(&self.events, LoopEvent::Synthesizing).await;

        let urls = match self.diffusion.predict(prompt).await {
            Ok(urls) => urls,
            Err(e) => return self.fail(format!("provider error: {}", e)).await,
        };

        let Some(url) = urls.first() else {
            return self.fail("provider returned no outputs".to_string()).await;
        };

        let bytes = match self.fetcher.fetch(url).await {
            Ok(bytes) => bytes,
            Err(e) => return self.fail(format!("image fetch failed: {}", e)).await,
        };

        let image = match image::load_from_memory(&bytes) {
            Ok(image) => image,
            Err(e) => return self.fail(format!("image decode failed: {}", e)).await,
        };

        // The store is a tolerated side effect: a failed write is reported
        // but the artifact still flows to captioning from memory.
        let path = match self.store.save_image(&image) {
            Ok(path) => path,
            Err(e) => {
                log::warn!("Failed to persist image: {}", e);
                event::emit(
                    &self.events,
                    LoopEvent::ArtifactWriteFailed {
                        category: Category::Image,
                        reason: e.to_string(),
                    },
                )
                .await;
                self.store.temp_image_path()
            }
        };

        event::emit(&self.events, LoopEvent::ImageReady { path: path.clone() }).await;
        Some(ImageArtifact::new(image, path))
    }
}
