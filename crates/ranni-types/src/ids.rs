//! Identifier types.
//!
//! Actions are identified by a small integer that indexes directly into the
//! action catalog; the catalog validates the id space once at construction,
//! so lookups are slice accesses rather than string-keyed map probes.
//!
//! Episodes use UUID v7 (time-ordered) so run logs sort chronologically.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one episode driven through an environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EpisodeId(pub Uuid);

impl EpisodeId {
    /// Create a new identifier using UUID v7 (time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Return the inner [`Uuid`] value.
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for EpisodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for EpisodeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index of an action within the action catalog.
///
/// Ids are dense: a catalog with `n` definitions accepts ids `0..n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(pub u16);

impl ActionId {
    /// Return the id as a slice index.
    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

impl core::fmt::Display for ActionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u16> for ActionId {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn episode_ids_are_unique_and_time_ordered() {
        let first = EpisodeId::new();
        let second = EpisodeId::new();
        assert_ne!(first, second);
        assert_eq!(first.into_inner().get_version_num(), 7);
        assert_eq!(first.to_string(), first.into_inner().to_string());
    }

    #[test]
    fn action_id_serializes_as_bare_integer() {
        let json = serde_json::to_string(&ActionId(7)).unwrap_or_default();
        assert_eq!(json, "7");
    }

    #[test]
    fn action_id_index_and_display() {
        let id = ActionId::from(12);
        assert_eq!(id.index(), 12);
        assert_eq!(id.to_string(), "#12");
    }
}
