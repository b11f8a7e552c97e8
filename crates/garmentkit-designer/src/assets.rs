//! Image decoding and the decoded-image cache used by the rasterizer.

use garmentkit_core::{AssetLoadError, AssetSource, ImageRef};
use image::RgbaImage;
use std::collections::HashMap;
use std::sync::Arc;

/// A decoded image ready to be placed on a surface.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub image: ImageRef,
    pub pixels: Arc<RgbaImage>,
}

impl DecodedImage {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

/// Decode encoded image bytes (PNG, JPEG, ...) into RGBA pixels
pub fn decode(image: &ImageRef, bytes: &[u8]) -> Result<DecodedImage, AssetLoadError> {
    let decoded = image::load_from_memory(bytes).map_err(|e| AssetLoadError::Decode {
        image: image.to_string(),
        reason: e.to_string(),
    })?;
    let pixels = decoded.to_rgba8();
    if pixels.width() == 0 || pixels.height() == 0 {
        return Err(AssetLoadError::Empty {
            image: image.to_string(),
        });
    }
    Ok(DecodedImage {
        image: image.clone(),
        pixels: Arc::new(pixels),
    })
}

/// Fetch through `source` and decode
pub async fn load(source: &dyn AssetSource, image: &ImageRef) -> Result<DecodedImage, AssetLoadError> {
    let bytes = source.fetch(image).await?;
    decode(image, &bytes)
}

/// Decoded images keyed by reference.
#[derive(Debug, Clone, Default)]
pub struct AssetCache {
    images: HashMap<ImageRef, Arc<RgbaImage>>,
}

impl AssetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, decoded: &DecodedImage) {
        self.images
            .insert(decoded.image.clone(), decoded.pixels.clone());
    }

    pub fn get(&self, image: &ImageRef) -> Option<&Arc<RgbaImage>> {
        self.images.get(image)
    }

    pub fn contains(&self, image: &ImageRef) -> bool {
        self.images.contains_key(image)
    }

    /// Drop everything not referenced by `keep`
    pub fn retain_only<'a>(&mut self, keep: impl IntoIterator<Item = &'a ImageRef>) {
        let keep: std::collections::HashSet<&ImageRef> = keep.into_iter().collect();
        self.images.retain(|k, _| keep.contains(k));
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}
