//! Drawing mode state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Drawing modes; exactly one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DrawingMode {
    /// Select and manipulate objects
    #[default]
    Select,
    /// Freehand paint
    Brush,
    /// Freehand erase
    Eraser,
    /// Waiting for an "apply" action to insert text
    TextInsert,
    /// Waiting for an "apply" action to insert a logo image
    LogoInsert,
}

impl DrawingMode {
    pub fn name(&self) -> &'static str {
        match self {
            DrawingMode::Select => "select",
            DrawingMode::Brush => "brush",
            DrawingMode::Eraser => "eraser",
            DrawingMode::TextInsert => "text-insert",
            DrawingMode::LogoInsert => "logo-insert",
        }
    }

    /// Brush and eraser consume pointer down/move/up as a stroke.
    pub fn draws_strokes(&self) -> bool {
        matches!(self, DrawingMode::Brush | DrawingMode::Eraser)
    }

    /// Only select mode arms the manipulation controller.
    pub fn manipulates(&self) -> bool {
        matches!(self, DrawingMode::Select)
    }

    /// Insert modes wait for an explicit apply action.
    pub fn inserts(&self) -> bool {
        matches!(self, DrawingMode::TextInsert | DrawingMode::LogoInsert)
    }
}

impl fmt::Display for DrawingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A mode change and the clean-up it requires from the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeTransition {
    pub from: DrawingMode,
    pub to: DrawingMode,
}

impl ModeTransition {
    pub fn is_change(&self) -> bool {
        self.from != self.to
    }
}

/// Holds the active mode.
///
/// Every switch deselects the selected object and cancels an in-progress
/// stroke or gesture without a history push; the machine reports the
/// transition and the session performs that clean-up.
#[derive(Debug, Clone, Default)]
pub struct ModeMachine {
    mode: DrawingMode,
}

impl ModeMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> DrawingMode {
        self.mode
    }

    /// Switch to `mode`
    pub fn switch(&mut self, mode: DrawingMode) -> ModeTransition {
        let transition = ModeTransition {
            from: self.mode,
            to: mode,
        };
        self.mode = mode;
        transition
    }

    /// Finish an insert mode after its apply action; back to select
    ///
    /// Returns `None` if the active mode is not an insert mode.
    pub fn complete_insert(&mut self) -> Option<ModeTransition> {
        self.mode
            .inserts()
            .then(|| self.switch(DrawingMode::Select))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_select() {
        let machine = ModeMachine::new();
        assert_eq!(machine.mode(), DrawingMode::Select);
        assert!(machine.mode().manipulates());
    }

    #[test]
    fn test_insert_returns_to_select() {
        let mut machine = ModeMachine::new();
        machine.switch(DrawingMode::TextInsert);
        let t = machine.complete_insert().unwrap();
        assert_eq!(t.from, DrawingMode::TextInsert);
        assert_eq!(machine.mode(), DrawingMode::Select);
        assert!(machine.complete_insert().is_none());
    }

    #[test]
    fn test_only_one_capability_per_mode() {
        for mode in [
            DrawingMode::Select,
            DrawingMode::Brush,
            DrawingMode::Eraser,
            DrawingMode::TextInsert,
            DrawingMode::LogoInsert,
        ] {
            let caps = [mode.draws_strokes(), mode.manipulates(), mode.inserts()];
            assert_eq!(caps.iter().filter(|c| **c).count(), 1, "{}", mode);
        }
    }
}
