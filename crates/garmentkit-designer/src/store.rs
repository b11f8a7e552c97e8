//! On-disk design store.
//!
//! Designs live under `<root>/<user>/<name>.json`. The user always comes
//! from the [`SessionContext`] passed in; the store keeps no notion of a
//! current user.

use anyhow::{Context, Result};
use garmentkit_core::{DesignFileError, SessionContext};
use std::path::{Path, PathBuf};

use crate::design_file::DesignFile;

const EXTENSION: &str = "json";

#[derive(Debug, Clone)]
pub struct DesignStore {
    root: PathBuf,
}

impl DesignStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store under the platform config directory (`<config>/garmentkit/designs`)
    pub fn open_default() -> Result<Self> {
        let dir = garmentkit_settings::config_dir().context("Failed to locate config directory")?;
        Ok(Self::new(dir.join("designs")))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn user_dir(&self, ctx: &SessionContext) -> Result<PathBuf, DesignFileError> {
        let user = ctx.require_user()?;
        Ok(self.root.join(sanitize(user.as_str())))
    }

    fn path_for(&self, ctx: &SessionContext, name: &str) -> Result<PathBuf, DesignFileError> {
        let trimmed = name.trim();
        if trimmed.is_empty() || trimmed.contains(['/', '\\']) || trimmed.starts_with('.') {
            return Err(DesignFileError::Io(format!("Invalid design name '{}'", name)));
        }
        Ok(self
            .user_dir(ctx)?
            .join(format!("{}.{}", trimmed, EXTENSION)))
    }

    /// Write `file` as `name` for the context's user
    pub fn save(&self, ctx: &SessionContext, name: &str, file: &DesignFile) -> Result<PathBuf> {
        let path = self.path_for(ctx, name)?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create design directory {}", dir.display()))?;
        }
        file.save_to_file(&path)?;
        tracing::info!("Saved design '{}' to {}", name, path.display());
        Ok(path)
    }

    pub fn load(&self, ctx: &SessionContext, name: &str) -> Result<DesignFile> {
        let path = self.path_for(ctx, name)?;
        if !path.exists() {
            return Err(DesignFileError::NotFound(name.to_string()).into());
        }
        let file = DesignFile::load_from_file(&path)?;
        tracing::info!("Loaded design '{}' from {}", name, path.display());
        Ok(file)
    }

    /// Names of the context user's designs, sorted
    pub fn list(&self, ctx: &SessionContext) -> Result<Vec<String>> {
        let dir = self.user_dir(ctx)?;
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&dir)
            .with_context(|| format!("Failed to list designs in {}", dir.display()))?
        {
            let path = entry.context("Failed to read design entry")?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Remove a saved design; `false` if there was none
    pub fn delete(&self, ctx: &SessionContext, name: &str) -> Result<bool> {
        let path = self.path_for(ctx, name)?;
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&path)
            .with_context(|| format!("Failed to delete design {}", path.display()))?;
        Ok(true)
    }
}

fn sanitize(user: &str) -> String {
    user.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
