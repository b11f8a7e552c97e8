//! Undo/redo history for a part surface.
//!
//! A history is a list of full snapshots and a cursor pointing at the entry
//! that matches the live surface. It is never empty: a fresh history holds
//! the snapshot of the surface it was created for.

use garmentkit_core::{DesignFileError, HistoryError};

use crate::surface::SurfaceBlob;

/// Undo/redo stack of surface snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryStack<T = SurfaceBlob> {
    entries: Vec<T>,
    cursor: usize,
    max_entries: usize,
}

impl<T: Clone> HistoryStack<T> {
    /// Start a history at `initial`, keeping at most `max_entries` (0 = unbounded)
    pub fn new(initial: T, max_entries: usize) -> Self {
        Self {
            entries: vec![initial],
            cursor: 0,
            max_entries,
        }
    }

    /// Rebuild a history from stored entries and cursor, as found in a design file
    pub fn from_parts(
        entries: Vec<T>,
        cursor: usize,
        max_entries: usize,
    ) -> Result<Self, HistoryError> {
        if entries.is_empty() {
            return Err(HistoryError::Empty);
        }
        if cursor >= entries.len() {
            return Err(HistoryError::CursorOutOfRange {
                cursor,
                len: entries.len(),
            });
        }
        Ok(Self {
            entries,
            cursor,
            max_entries,
        })
    }

    /// Append `entry` after the cursor, discarding any redo branch
    pub fn push(&mut self, entry: T) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(entry);
        if self.max_entries > 0 && self.entries.len() > self.max_entries {
            let excess = self.entries.len() - self.max_entries;
            self.entries.drain(..excess);
        }
        self.cursor = self.entries.len() - 1;
    }

    /// Step back; `None` at the oldest entry
    pub fn undo(&mut self) -> Option<&T> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(&self.entries[self.cursor])
    }

    /// Step forward; `None` at the newest entry
    pub fn redo(&mut self) -> Option<&T> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        Some(&self.entries[self.cursor])
    }

    /// Step back only if `restore` accepts the older entry
    ///
    /// Returns `None` when already at the oldest entry. On `Err` the cursor
    /// stays where it was.
    pub fn undo_with<R, E>(
        &mut self,
        restore: impl FnOnce(&T) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        if self.cursor == 0 {
            return None;
        }
        let result = restore(&self.entries[self.cursor - 1]);
        if result.is_ok() {
            self.cursor -= 1;
        }
        Some(result)
    }

    /// Step forward only if `restore` accepts the newer entry
    pub fn redo_with<R, E>(
        &mut self,
        restore: impl FnOnce(&T) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        let result = restore(&self.entries[self.cursor + 1]);
        if result.is_ok() {
            self.cursor += 1;
        }
        Some(result)
    }

    pub fn current(&self) -> &T {
        &self.entries[self.cursor]
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }
}

impl HistoryStack<SurfaceBlob> {
    /// Like [`HistoryStack::from_parts`] with the part named in the error
    pub fn restore(
        part: &str,
        entries: Vec<SurfaceBlob>,
        cursor: usize,
        max_entries: usize,
    ) -> Result<Self, DesignFileError> {
        Self::from_parts(entries, cursor, max_entries).map_err(|source| {
            DesignFileError::History {
                part: part.to_string(),
                source,
            }
        })
    }
}
