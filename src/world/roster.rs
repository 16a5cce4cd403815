//! Remote Roster
//!
//! Last-known positions of the other connected players. Positions are shown
//! exactly as received: no interpolation, no extrapolation.

use std::collections::BTreeMap;
use std::fmt;
use serde::{Serialize, Deserialize};

use crate::core::vec2::Vec2;

/// Server-assigned player identifier.
///
/// Implements Ord so roster iteration (and therefore render order) is stable.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    /// Create from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Mapping from remote player id to last-known position.
#[derive(Clone, Debug, Default)]
pub struct RemoteRoster {
    players: BTreeMap<PlayerId, Vec2>,
}

impl RemoteRoster {
    /// Create an empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole roster with a complete snapshot.
    ///
    /// Players absent from the snapshot are dropped. Duplicate ids keep the
    /// last position listed.
    pub fn replace_snapshot<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (PlayerId, Vec2)>,
    {
        self.players = entries.into_iter().collect();
    }

    /// Insert a player or overwrite its position. Returns true if it was new.
    pub fn upsert(&mut self, id: PlayerId, position: Vec2) -> bool {
        self.players.insert(id, position).is_none()
    }

    /// Remove a player. Unknown ids are a no-op and return false.
    pub fn remove(&mut self, id: &PlayerId) -> bool {
        self.players.remove(id).is_some()
    }

    /// Last-known position of a player.
    pub fn get(&self, id: &PlayerId) -> Option<Vec2> {
        self.players.get(id).copied()
    }

    /// Check if a player is known.
    pub fn contains(&self, id: &PlayerId) -> bool {
        self.players.contains_key(id)
    }

    /// Number of known players.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Check if no remote players are known.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Iterate players in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&PlayerId, Vec2)> + '_ {
        self.players.iter().map(|(id, pos)| (id, *pos))
    }

    /// Iterate ids in order.
    pub fn ids(&self) -> impl Iterator<Item = &PlayerId> + '_ {
        self.players.keys()
    }
}
