//! Session context passed explicitly into save/load operations.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DesignFileError;

/// Identity of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who is performing a save/load.
///
/// Hosts build one of these from their auth layer and hand it to every
/// persistence call; the engine never looks up a "current user" itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    user: Option<UserId>,
    display_name: Option<String>,
}

impl SessionContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_user(user: UserId) -> Self {
        Self {
            user: Some(user),
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn user(&self) -> Option<&UserId> {
        self.user.as_ref()
    }

    /// Name recorded as the author of saved designs
    pub fn author(&self) -> Option<&str> {
        self.display_name
            .as_deref()
            .or_else(|| self.user.as_ref().map(UserId::as_str))
    }

    /// The user, or `Unauthenticated` for anonymous sessions
    pub fn require_user(&self) -> Result<&UserId, DesignFileError> {
        self.user.as_ref().ok_or(DesignFileError::Unauthenticated)
    }
}
