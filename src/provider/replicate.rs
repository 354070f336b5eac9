//! Replicate client - the remote inference marketplace.
//!
//! A prediction is created with `POST /v1/predictions` and polled until it
//! reaches a terminal status. Text models return their output as a sequence
//! of chunks, concatenated in delivery order; the diffusion model returns
//! output image URLs.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use serde_json::{Value, json};

use crate::config::ReplicateConfig;
use crate::provider::{DiffusionModel, ProviderError, ProviderResult, TextModel, VisionModel};

/// Llama 3 8B Instruct, used for fallback prompt expansion.
pub const LLAMA3_MODEL: &str =
    "meta/llama-3-8b-instruct:2d19859030ff705a87c746f7e96eea03aefb71f166725aee39692f1476566d48";

/// Stable Diffusion, used for image synthesis.
pub const STABLE_DIFFUSION_MODEL: &str =
    "stability-ai/stable-diffusion:ac732df83cea7fff18b8472768c88ad041fa750ff7682a21affe81863cbe77e4";

/// LLaVA 13B, used for image captioning.
pub const LLAVA_MODEL: &str =
    "yorickvp/llava-13b:2facb4a474a0462c15041b78b1ad70952ea46b5ec6ad29583c0b29dbd4249591";

/// Extract the version hash from an `owner/model:hash` identifier.
fn version_hash(model: &str) -> &str {
    model.rsplit(':').next().unwrap_or(model)
}

/// Concatenate a prediction's text output chunks in delivery order.
fn concat_chunks(output: &Value) -> String {
    match output {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_str())
            .collect::<String>(),
        _ => String::new(),
    }
}

/// Client for the Replicate prediction API.
#[derive(Clone)]
pub struct ReplicateClient {
    client: Client,
    base_url: String,
    token: String,
    poll_interval: Duration,
    max_polls: u32,
}

impl ReplicateClient {
    pub fn new(token: String, config: &ReplicateConfig) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            max_polls: config.max_polls,
        })
    }

    /// Run a model to completion and return its `output` value.
    pub async fn run(&self, model: &str, input: Value) -> ProviderResult<Value> {
        let body = json!({
            "version": version_hash(model),
            "input": input
        });

        let url = format!("{}/v1/predictions", self.base_url);
        let created = self.send(self.client.post(&url).json(&body)).await?;

        let id = created["id"]
            .as_str()
            .ok_or_else(|| ProviderError::InvalidResponse("prediction has no id".to_string()))?
            .to_string();

        log::debug!("Created prediction {} for {}", id, model);
        self.poll(&id).await
    }

    /// Poll a prediction until it reaches a terminal status.
    async fn poll(&self, id: &str) -> ProviderResult<Value> {
        let url = format!("{}/v1/predictions/{}", self.base_url, id);

        for _ in 0..self.max_polls {
            let prediction = self.send(self.client.get(&url)).await?;

            match prediction["status"].as_str() {
                Some("succeeded") => return Ok(prediction["output"].clone()),
                Some("failed") | Some("canceled") => {
                    let reason = prediction["error"]
                        .as_str()
                        .unwrap_or("no error detail")
                        .to_string();
                    return Err(ProviderError::Prediction(reason));
                }
                // starting / processing
                _ => tokio::time::sleep(self.poll_interval).await,
            }
        }

        Err(ProviderError::Timeout {
            waited: self.poll_interval * self.max_polls,
        })
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> ProviderResult<Value> {
        let response = request
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Content-Type", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("not JSON: {}", e)))
    }
}

impl std::fmt::Debug for ReplicateClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplicateClient")
            .field("base_url", &self.base_url)
            .field("max_polls", &self.max_polls)
            .finish()
    }
}

/// A Replicate-hosted text model.
#[derive(Debug, Clone)]
pub struct ReplicateTextModel {
    client: ReplicateClient,
    model: String,
}

impl ReplicateTextModel {
    pub fn new(client: ReplicateClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl TextModel for ReplicateTextModel {
    async fn generate(&self, prompt: &str) -> ProviderResult<String> {
        let output = self
            .client
            .run(&self.model, json!({ "prompt": prompt }))
            .await?;
        Ok(concat_chunks(&output).trim().to_string())
    }
}

/// Fixed synthesis settings - identical prompts reproduce identical images.
#[derive(Debug, Clone)]
pub struct SynthesisSettings {
    pub width: u32,
    pub height: u32,
    pub num_outputs: u32,
    pub scheduler: &'static str,
    pub num_inference_steps: u32,
    pub guidance_scale: f64,
    pub seed: u64,
    pub negative_prompt: &'static str,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            width: 768,
            height: 768,
            num_outputs: 1,
            scheduler: "K_EULER_ANCESTRAL",
            num_inference_steps: 50,
            guidance_scale: 7.5,
            seed: 42,
            negative_prompt: "ugly, blurry, poor quality, deformed, disfigured",
        }
    }
}

/// A Replicate-hosted diffusion model with fixed settings.
#[derive(Debug, Clone)]
pub struct ReplicateDiffusionModel {
    client: ReplicateClient,
    model: String,
    settings: SynthesisSettings,
}

impl ReplicateDiffusionModel {
    pub fn new(client: ReplicateClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            settings: SynthesisSettings::default(),
        }
    }

    fn build_input(&self, prompt: &str) -> Value {
        json!({
            "prompt": prompt,
            "width": self.settings.width,
            "height": self.settings.height,
            "num_outputs": self.settings.num_outputs,
            "scheduler": self.settings.scheduler,
            "num_inference_steps": self.settings.num_inference_steps,
            "guidance_scale": self.settings.guidance_scale,
            "seed": self.settings.seed,
            "negative_prompt": self.settings.negative_prompt,
        })
    }
}

#[async_trait]
impl DiffusionModel for ReplicateDiffusionModel {
    async fn predict(&self, prompt: &str) -> ProviderResult<Vec<String>> {
        let output = self.client.run(&self.model, self.build_input(prompt)).await?;

        let urls = match output {
            Value::Array(items) => items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
            Value::String(url) => vec![url],
            _ => Vec::new(),
        };
        Ok(urls)
    }
}

/// A Replicate-hosted vision model. The image file is inlined as a
/// `data:` URI, the HTTP equivalent of handing the provider a file handle.
#[derive(Debug, Clone)]
pub struct ReplicateVisionModel {
    client: ReplicateClient,
    model: String,
}

impl ReplicateVisionModel {
    pub fn new(client: ReplicateClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    fn data_uri(bytes: &[u8]) -> String {
        format!("data:image/png;base64,{}", BASE64.encode(bytes))
    }
}

#[async_trait]
impl VisionModel for ReplicateVisionModel {
    async fn describe(&self, image_path: &Path, instruction: &str) -> ProviderResult<String> {
        let bytes = std::fs::read(image_path)?;
        let input = json!({
            "image": Self::data_uri(&bytes),
            "prompt": instruction,
        });

        let output = self.client.run(&self.model, input).await?;
        Ok(concat_chunks(&output).trim().to_string())
    }
}
