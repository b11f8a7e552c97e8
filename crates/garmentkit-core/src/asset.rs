//! Asset boundaries
//!
//! Image bytes arrive through an async source and uploads leave through an
//! async uploader. The engine only ever sees an [`ImageRef`] and raw bytes.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::AssetLoadError;
use crate::ids::ImageRef;

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAsset {
    pub url: ImageRef,
}

/// Fetches encoded image bytes for an image reference
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Fetch the raw (still encoded) bytes for `image`
    async fn fetch(&self, image: &ImageRef) -> Result<Vec<u8>, AssetLoadError>;
}

/// Uploads a user file and hands back a URL the engine can reference
#[async_trait]
pub trait AssetUploader: Send + Sync {
    /// Upload `bytes` under a suggested file name
    async fn upload(&self, name: &str, bytes: Vec<u8>) -> Result<UploadedAsset, AssetLoadError>;
}

/// In-memory asset store, used by tests and by hosts that preload images.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetStore {
    assets: Arc<RwLock<HashMap<ImageRef, Vec<u8>>>>,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, image: ImageRef, bytes: Vec<u8>) {
        self.assets.write().insert(image, bytes);
    }

    pub fn contains(&self, image: &ImageRef) -> bool {
        self.assets.read().contains_key(image)
    }

    pub fn len(&self) -> usize {
        self.assets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.read().is_empty()
    }
}

#[async_trait]
impl AssetSource for MemoryAssetStore {
    async fn fetch(&self, image: &ImageRef) -> Result<Vec<u8>, AssetLoadError> {
        self.assets
            .read()
            .get(image)
            .cloned()
            .ok_or_else(|| AssetLoadError::NotFound {
                image: image.to_string(),
            })
    }
}

#[async_trait]
impl AssetUploader for MemoryAssetStore {
    async fn upload(&self, name: &str, bytes: Vec<u8>) -> Result<UploadedAsset, AssetLoadError> {
        if bytes.is_empty() {
            return Err(AssetLoadError::Upload {
                name: name.to_string(),
                reason: "empty file".to_string(),
            });
        }
        let url = ImageRef::new(format!("mem://{}/{}", uuid::Uuid::new_v4(), name));
        self.insert(url.clone(), bytes);
        tracing::debug!("Uploaded {} as {}", name, url);
        Ok(UploadedAsset { url })
    }
}

/// Reads images from a directory; references are paths relative to `root`.
#[derive(Debug, Clone)]
pub struct FileAssetSource {
    root: PathBuf,
}

impl FileAssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, image: &ImageRef) -> PathBuf {
        let reference = image.as_str();
        let relative = reference.strip_prefix("file://").unwrap_or(reference);
        self.root.join(relative)
    }
}

#[async_trait]
impl AssetSource for FileAssetSource {
    async fn fetch(&self, image: &ImageRef) -> Result<Vec<u8>, AssetLoadError> {
        let path = self.resolve(image);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(AssetLoadError::NotFound {
                image: image.to_string(),
            }),
            Err(e) => Err(AssetLoadError::Fetch {
                image: image.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}
