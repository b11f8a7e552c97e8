//! Garment models and their part sets.
//!
//! Geometry lives with the external renderer; the engine only needs to know
//! which parts a model has so it can key surfaces, colors and textures.

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::ids::PartId;

/// A selectable garment model and its ordered part set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GarmentModel {
    pub name: String,
    pub parts: Vec<PartId>,
}

impl GarmentModel {
    pub fn new(name: impl Into<String>, parts: &[&str]) -> Self {
        Self {
            name: name.into(),
            parts: parts.iter().map(|p| PartId::new(*p)).collect(),
        }
    }

    pub fn has_part(&self, part: &PartId) -> bool {
        self.parts.contains(part)
    }

    /// The part that is active right after the model is selected.
    pub fn default_part(&self) -> Option<&PartId> {
        self.parts.first()
    }

    /// Position of a part in the model's part order.
    pub fn part_index(&self, part: &PartId) -> Option<usize> {
        self.parts.iter().position(|p| p == part)
    }

    /// Validate that `part` belongs to this model
    pub fn require_part(&self, part: &PartId) -> Result<(), ModelError> {
        if self.has_part(part) {
            Ok(())
        } else {
            Err(ModelError::UnknownPart {
                model: self.name.clone(),
                part: part.to_string(),
            })
        }
    }
}

/// Registry of known garment models.
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    models: Vec<GarmentModel>,
}

impl ModelCatalog {
    /// Catalog with the built-in garments.
    pub fn builtin() -> Self {
        Self {
            models: vec![
                GarmentModel::new(
                    "tshirt",
                    &["body", "front", "back", "left-sleeve", "right-sleeve", "collar"],
                ),
                GarmentModel::new(
                    "hoodie",
                    &["body", "hood", "left-sleeve", "right-sleeve", "pocket", "cuffs"],
                ),
                GarmentModel::new(
                    "polo",
                    &["body", "collar", "placket", "left-sleeve", "right-sleeve"],
                ),
                GarmentModel::new("tank-top", &["body", "front", "back", "trim"]),
            ],
        }
    }

    pub fn empty() -> Self {
        Self { models: Vec::new() }
    }

    /// Add or replace a model by name
    pub fn register(&mut self, model: GarmentModel) {
        self.models.retain(|m| m.name != model.name);
        self.models.push(model);
    }

    pub fn get(&self, name: &str) -> Result<&GarmentModel, ModelError> {
        self.models
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| ModelError::UnknownModel(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.iter().map(|m| m.name.as_str())
    }
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
