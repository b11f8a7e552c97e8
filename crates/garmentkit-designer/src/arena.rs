//! Per-part surface arena.
//!
//! Surfaces and their histories are created lazily the first time a part is
//! activated and live until the arena is reset. A reset (model switch or
//! design load) evicts every engine and bumps the epoch, so work started
//! against the old arena can tell it is stale.

use garmentkit_core::PartId;
use garmentkit_settings::EditorConfig;
use std::collections::BTreeMap;

use crate::engine::SurfaceEngine;

#[derive(Debug, Clone)]
pub struct SurfaceArena {
    engines: BTreeMap<PartId, SurfaceEngine>,
    epoch: u64,
    config: EditorConfig,
}

impl SurfaceArena {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            engines: BTreeMap::new(),
            epoch: 0,
            config,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Incremented on every reset
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn get(&self, part: &PartId) -> Option<&SurfaceEngine> {
        self.engines.get(part)
    }

    pub fn get_mut(&mut self, part: &PartId) -> Option<&mut SurfaceEngine> {
        self.engines.get_mut(part)
    }

    /// Engine for `part`, created empty on first use
    pub fn get_or_create(&mut self, part: &PartId) -> &mut SurfaceEngine {
        let config = &self.config;
        self.engines.entry(part.clone()).or_insert_with(|| {
            tracing::debug!("Creating surface for part {}", part);
            SurfaceEngine::new(part.clone(), config)
        })
    }

    /// Put a fully built engine in place (design load)
    pub fn insert(&mut self, engine: SurfaceEngine) {
        self.engines.insert(engine.part().clone(), engine);
    }

    pub fn contains(&self, part: &PartId) -> bool {
        self.engines.contains_key(part)
    }

    pub fn parts(&self) -> impl Iterator<Item = &PartId> {
        self.engines.keys()
    }

    pub fn engines(&self) -> impl Iterator<Item = &SurfaceEngine> {
        self.engines.values()
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    /// Evict every surface and history; returns how many were dropped
    pub fn reset(&mut self) -> usize {
        let evicted = self.engines.len();
        self.engines.clear();
        self.epoch += 1;
        tracing::debug!("Surface arena reset (epoch {}, {} evicted)", self.epoch, evicted);
        evicted
    }

    /// Replace the whole arena with `other`, bumping the epoch past both
    pub(crate) fn replace_with(&mut self, mut other: SurfaceArena) {
        other.epoch = self.epoch.max(other.epoch) + 1;
        *self = other;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lazy_creation_and_persistence() {
        let mut arena = SurfaceArena::new(EditorConfig::default());
        let body = PartId::new("body");
        assert!(arena.get(&body).is_none());
        arena.get_or_create(&body).checkpoint();
        assert_eq!(arena.get_or_create(&body).history().len(), 2);
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn test_reset_evicts_and_bumps_epoch() {
        let mut arena = SurfaceArena::new(EditorConfig::default());
        arena.get_or_create(&PartId::new("body"));
        arena.get_or_create(&PartId::new("collar"));
        assert_eq!(arena.reset(), 2);
        assert!(arena.is_empty());
        assert_eq!(arena.epoch(), 1);
    }
}
