//! Network Layer
//!
//! Event-channel client for the world server. Protocol types and the sync
//! client are synchronous; only `transport` runs async tasks.

pub mod protocol;
pub mod sync;
pub mod transport;

pub use protocol::{BlockPoint, ClientMessage, ProtocolError, RosterEntry, ServerMessage};
pub use sync::{IntentKind, IntentOutcome, PendingIntent, SyncClient, SyncConfig, SyncStats};
pub use transport::{connect, Connection, ConnectionTasks, Loopback, Outbound, OutgoingChannel, TransportError};
