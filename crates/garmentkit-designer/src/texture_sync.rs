//! Texture synchronizer.
//!
//! Committed surface mutations mark their part dirty. A flush rasterizes
//! each dirty part once, flips it vertically for the renderer's inverted V
//! axis and publishes it as the part's live texture. Parts with a stroke or
//! gesture in progress stay dirty until the interaction concludes.

use garmentkit_core::{Color, DesignEvent, EventBus, PartId, TextureEvent};
use image::RgbaImage;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::arena::SurfaceArena;
use crate::assets::AssetCache;
use crate::raster;

/// A texture handed to the renderer.
#[derive(Debug, Clone)]
pub struct PublishedTexture {
    pub part: PartId,
    /// Increases with every publish, across all parts
    pub generation: u64,
    /// Flipped raster, bottom row first
    pub image: Arc<RgbaImage>,
}

/// Flip a top-left-origin raster into texture orientation
pub fn orient_for_texture(raster: &RgbaImage) -> RgbaImage {
    image::imageops::flip_vertical(raster)
}

#[derive(Debug, Default)]
pub struct TextureSync {
    dirty: BTreeSet<PartId>,
    published: HashMap<PartId, PublishedTexture>,
    generation: u64,
}

impl TextureSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_dirty(&mut self, part: &PartId) {
        self.dirty.insert(part.clone());
    }

    pub fn is_dirty(&self, part: &PartId) -> bool {
        self.dirty.contains(part)
    }

    pub fn dirty_parts(&self) -> impl Iterator<Item = &PartId> {
        self.dirty.iter()
    }

    /// Latest texture for a part
    pub fn texture(&self, part: &PartId) -> Option<&PublishedTexture> {
        self.published.get(part)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Orient and publish a flattened raster for `part`
    pub fn publish(&mut self, part: &PartId, raster: &RgbaImage, bus: &EventBus) -> PublishedTexture {
        self.generation += 1;
        let texture = PublishedTexture {
            part: part.clone(),
            generation: self.generation,
            image: Arc::new(orient_for_texture(raster)),
        };
        self.published.insert(part.clone(), texture.clone());
        self.dirty.remove(part);
        bus.publish(DesignEvent::Texture(TextureEvent::Published {
            part: part.clone(),
            generation: texture.generation,
            width: raster.width(),
            height: raster.height(),
        }));
        texture
    }

    /// Flatten and publish every dirty part that is not mid-interaction.
    ///
    /// `base_color` supplies each part's background. Returns the parts
    /// published, in part order.
    pub fn flush(
        &mut self,
        arena: &SurfaceArena,
        base_color: impl Fn(&PartId) -> Color,
        images: &AssetCache,
        bus: &EventBus,
    ) -> Vec<PartId> {
        let ready: Vec<PartId> = self
            .dirty
            .iter()
            .filter(|part| arena.get(part).is_none_or(|engine| !engine.is_busy()))
            .cloned()
            .collect();

        let mut published = Vec::with_capacity(ready.len());
        for part in ready {
            let Some(engine) = arena.get(&part) else {
                // Evicted since it was marked; nothing to draw.
                self.dirty.remove(&part);
                continue;
            };
            let raster = raster::flatten(engine.surface(), base_color(&part), images);
            self.publish(&part, &raster, bus);
            published.push(part);
        }

        if !published.is_empty() {
            tracing::debug!("Published {} texture(s)", published.len());
        }
        published
    }

    /// Drop every texture and dirty mark (model switch, design load)
    pub fn clear(&mut self, bus: &EventBus) {
        self.dirty.clear();
        self.published.clear();
        bus.publish(DesignEvent::Texture(TextureEvent::Cleared));
    }
}
