//! Artifact store - persists prompts, descriptions, and images.
//!
//! Append-only file sink under a configured output root. Every save uses a
//! fresh UUID, so unrelated sessions can share the root without coordination.

use std::fs;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DriftloopError, Result};

/// Artifact categories, each with its own subdirectory and filename prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    /// Expanded prompt text
    Prompt,
    /// Caption-derived description text
    Description,
    /// Synthesized image
    Image,
}

impl Category {
    fn subdir(&self) -> &'static str {
        match self {
            Category::Prompt | Category::Description => "prompts",
            Category::Image => "images",
        }
    }

    fn prefix(&self) -> &'static str {
        match self {
            Category::Prompt => "prompt",
            Category::Description => "description",
            Category::Image => "image",
        }
    }

    fn extension(&self) -> &'static str {
        match self {
            Category::Prompt | Category::Description => "txt",
            Category::Image => "png",
        }
    }
}

/// File-backed artifact store.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Open a store rooted at `root`, creating the category subdirectories
    /// if absent. Idempotent.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        for subdir in ["images", "prompts"] {
            fs::create_dir_all(root.join(subdir))
                .map_err(|e| DriftloopError::Storage(format!("Failed to create {}: {}", subdir, e)))?;
        }
        Ok(Self { root })
    }

    /// Output root this store writes under.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Build a fresh unique path for a category.
    fn unique_path(&self, category: Category) -> PathBuf {
        self.root.join(category.subdir()).join(format!(
            "{}_{}.{}",
            category.prefix(),
            Uuid::new_v4(),
            category.extension()
        ))
    }

    /// Persist text under the Prompt or Description category.
    pub fn save_text(&self, category: Category, content: &str) -> Result<PathBuf> {
        debug_assert!(category != Category::Image, "use save_image for images");
        let path = self.unique_path(category);
        fs::write(&path, content)?;
        log::debug!("Saved {:?} artifact to {}", category, path.display());
        Ok(path)
    }

    /// Persist an image as PNG under the Image category.
    pub fn save_image(&self, image: &DynamicImage) -> Result<PathBuf> {
        let path = self.unique_path(Category::Image);
        image.save(&path)?;
        log::debug!("Saved image artifact to {}", path.display());
        Ok(path)
    }

    /// A unique scratch path under the images directory, for handing an
    /// image to a provider that consumes files. The caller deletes it.
    pub fn temp_image_path(&self) -> PathBuf {
        self.root
            .join("images")
            .join(format!("temp_{}.png", Uuid::new_v4()))
    }
}
