//! Protocol Messages
//!
//! Wire format for the client ↔ server event channel.
//! All messages are JSON text frames with a `type` tag.

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::vec2::Vec2;
use crate::world::roster::PlayerId;

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Local player's committed position.
    PositionUpdate {
        /// World x
        x: f64,
        /// World y
        y: f64,
    },

    /// Request a block at a canonical point.
    CreateBlock {
        /// World x
        x: f64,
        /// World y
        y: f64,
    },

    /// Request removal of the block at a canonical point.
    DeleteBlock {
        /// World x
        x: f64,
        /// World y
        y: f64,
    },
}

impl ClientMessage {
    /// Position update for a point.
    pub fn position(p: Vec2) -> Self {
        ClientMessage::PositionUpdate { x: p.x, y: p.y }
    }

    /// Create intent for a point.
    pub fn create_block(p: Vec2) -> Self {
        ClientMessage::CreateBlock { x: p.x, y: p.y }
    }

    /// Delete intent for a point.
    pub fn delete_block(p: Vec2) -> Self {
        ClientMessage::DeleteBlock { x: p.x, y: p.y }
    }
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// One remote player in a roster message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    /// Server-assigned id.
    pub id: PlayerId,
    /// World x
    pub x: f64,
    /// World y
    pub y: f64,
}

impl RosterEntry {
    /// Position as a vector.
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// A block's canonical point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlockPoint {
    /// World x
    pub x: f64,
    /// World y
    pub y: f64,
}

impl BlockPoint {
    /// Point as a vector.
    pub fn point(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

impl From<Vec2> for BlockPoint {
    fn from(p: Vec2) -> Self {
        Self { x: p.x, y: p.y }
    }
}

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Complete roster.
    RosterSnapshot {
        /// Every connected remote player.
        players: Vec<RosterEntry>,
    },

    /// One player's new position (or first sighting).
    RosterUpdate(RosterEntry),

    /// A player left.
    PlayerDisconnected {
        /// Departed player.
        id: PlayerId,
    },

    /// Complete block set, sent once on connect.
    BlocksSnapshot {
        /// Every placed block.
        blocks: Vec<BlockPoint>,
    },

    /// A block was placed.
    BlockCreated(BlockPoint),

    /// A block was removed.
    BlockDeleted(BlockPoint),
}

/// Inbound payload could not be decoded.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Missing or wrong-shaped fields, unknown type tag, invalid JSON.
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::RosterSnapshot { .. } => "roster_snapshot",
            ServerMessage::RosterUpdate(_) => "roster_update",
            ServerMessage::PlayerDisconnected { .. } => "player_disconnected",
            ServerMessage::BlocksSnapshot { .. } => "blocks_snapshot",
            ServerMessage::BlockCreated(_) => "block_created",
            ServerMessage::BlockDeleted(_) => "block_deleted",
        }
    }
}
