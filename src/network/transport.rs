//! WebSocket Transport
//!
//! Binds the sync client to a bidirectional event channel. A connection runs
//! two background tasks: the writer drains a queue of serialized frames, the
//! reader forwards text frames to an inbound queue in arrival order. Neither
//! task touches session state; the host loop drains the inbound queue
//! between ticks.

use std::collections::VecDeque;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::network::protocol::ClientMessage;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// WebSocket handshake or stream failure.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Outbound message could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Outbound queue is at capacity.
    #[error("Outbound queue full")]
    QueueFull,

    /// The connection is gone.
    #[error("Channel closed")]
    Closed,
}

/// Fire-and-forget sink for outbound messages.
///
/// Implementations must not block: a send either queues the message or
/// fails immediately.
pub trait Outbound {
    /// Queue one message for delivery.
    fn send(&mut self, msg: &ClientMessage) -> Result<(), TransportError>;
}

/// Sending half of a live connection.
#[derive(Clone, Debug)]
pub struct OutgoingChannel {
    /// Serialized frames waiting for the writer task.
    pub sender: mpsc::Sender<String>,
}

impl Outbound for OutgoingChannel {
    fn send(&mut self, msg: &ClientMessage) -> Result<(), TransportError> {
        let json = msg.to_json()?;
        self.sender.try_send(json).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TransportError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => TransportError::Closed,
        })
    }
}

/// An open WebSocket connection.
pub struct Connection {
    /// Outbound half.
    pub outgoing: OutgoingChannel,
    /// Inbound text frames in delivery order.
    pub incoming: mpsc::Receiver<String>,
    tasks: ConnectionTasks,
}

impl Connection {
    /// Split into the outbound half, the inbound queue and the task handles.
    pub fn into_parts(self) -> (OutgoingChannel, mpsc::Receiver<String>, ConnectionTasks) {
        (self.outgoing, self.incoming, self.tasks)
    }

    /// Stop both background tasks.
    pub fn shutdown(self) {
        self.tasks.shutdown();
    }
}

/// Reader and writer task handles of a connection.
#[derive(Debug)]
pub struct ConnectionTasks {
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl ConnectionTasks {
    /// Abort both tasks.
    pub fn shutdown(self) {
        self.reader.abort();
        self.writer.abort();
    }
}

/// Open a WebSocket connection to `url`.
#[instrument(skip(queue_capacity))]
pub async fn connect(url: &str, queue_capacity: usize) -> Result<Connection, TransportError> {
    let (ws_stream, _) = connect_async(url).await?;
    info!("WebSocket connected");

    let (mut write, mut read) = ws_stream.split();
    let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<String>(queue_capacity);
    let (incoming_tx, incoming_rx) = mpsc::channel::<String>(queue_capacity);

    let reader = tokio::spawn(async move {
        while let Some(frame) = read.next().await {
            let text = match frame {
                Ok(Message::Text(text)) => text,
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Dropping non-UTF-8 binary frame: {}", e);
                        continue;
                    }
                },
                Ok(Message::Close(_)) => {
                    info!("Server closed connection");
                    break;
                }
                Ok(_) => continue,
                Err(e) => {
                    error!("WebSocket read error: {}", e);
                    break;
                }
            };
            // Backpressure instead of dropping: inbound events must not be lost.
            if incoming_tx.send(text).await.is_err() {
                debug!("Inbound queue dropped, reader exiting");
                break;
            }
        }
        info!("Reader task ended");
    });

    let writer = tokio::spawn(async move {
        while let Some(json) = outgoing_rx.recv().await {
            debug!("Sending: {}", json);
            if let Err(e) = write.send(Message::Text(json)).await {
                error!("Failed to send message: {}", e);
                break;
            }
        }
        let _ = write.close().await;
        info!("Writer task ended");
    });

    Ok(Connection {
        outgoing: OutgoingChannel { sender: outgoing_tx },
        incoming: incoming_rx,
        tasks: ConnectionTasks { reader, writer },
    })
}

/// In-process outbound sink that records messages instead of sending them.
///
/// Used for offline play (the host echoes intents back as confirmations)
/// and in tests. `set_link_up(false)` makes every send fail as if the
/// connection had dropped.
#[derive(Debug)]
pub struct Loopback {
    sent: VecDeque<ClientMessage>,
    link_up: bool,
}

impl Default for Loopback {
    fn default() -> Self {
        Self {
            sent: VecDeque::new(),
            link_up: true,
        }
    }
}

impl Loopback {
    /// Create an empty loopback with the link up.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the link going down or coming back.
    pub fn set_link_up(&mut self, up: bool) {
        self.link_up = up;
    }

    /// Messages recorded so far, oldest first.
    pub fn sent(&self) -> impl Iterator<Item = &ClientMessage> + '_ {
        self.sent.iter()
    }

    /// Number of recorded messages.
    pub fn len(&self) -> usize {
        self.sent.len()
    }

    /// Check if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.sent.is_empty()
    }

    /// Take all recorded messages.
    pub fn drain(&mut self) -> Vec<ClientMessage> {
        self.sent.drain(..).collect()
    }
}

impl Outbound for Loopback {
    fn send(&mut self, msg: &ClientMessage) -> Result<(), TransportError> {
        if !self.link_up {
            return Err(TransportError::Closed);
        }
        self.sent.push_back(msg.clone());
        Ok(())
    }
}
