//! Origin tags identify the writer of the shared document.
//!
//! A client drops feed updates carrying its own tag, since those are echoes
//! of its own saves.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Identity;

/// Identifier of a writing session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OriginTag(String);

impl OriginTag {
    /// Wrap a raw tag.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Tag text as written to `updatedBy`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OriginTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a session derives its origin tag from the signed-in identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginPolicy {
    /// The identity's email. Two sessions of one account share a tag and
    /// do not see each other's writes.
    #[default]
    Email,
    /// `email#<uuid>`, fresh for every sign-in.
    PerSession,
}

impl OriginPolicy {
    /// Issue a tag for a new session of `identity`.
    #[must_use]
    pub fn issue(self, identity: &Identity) -> OriginTag {
        match self {
            Self::Email => OriginTag::new(identity.email.clone()),
            Self::PerSession => OriginTag::new(format!("{}#{}", identity.email, Uuid::new_v4())),
        }
    }
}
