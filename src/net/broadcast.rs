//! Outbound delivery to connected participants
//!
//! Rooms and the lobby only know participant ids. The connection layer
//! registers one outbound queue per participant; sends to unknown or closed
//! queues are dropped silently.

use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::warn;

use crate::lobby::participant::ParticipantId;
use crate::metrics::Metrics;
use crate::net::protocol::{encode, ServerMessage};

/// Encoded message shared between every recipient
pub type OutboundFrame = Arc<Vec<u8>>;

/// Fire-and-forget delivery of server messages
pub trait Broadcaster: Send + Sync {
    fn send(&self, to: ParticipantId, message: &ServerMessage);

    fn broadcast(&self, to: &[ParticipantId], message: &ServerMessage) {
        for id in to {
            self.send(*id, message);
        }
    }
}

/// Broadcaster backed by per-connection unbounded queues
pub struct ConnectionBroadcaster {
    outbound: RwLock<HashMap<ParticipantId, mpsc::UnboundedSender<OutboundFrame>>>,
    metrics: Arc<Metrics>,
}

impl ConnectionBroadcaster {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self {
            outbound: RwLock::new(HashMap::new()),
            metrics,
        }
    }

    /// Register a participant and return the receiving end of its queue
    pub fn register(&self, id: ParticipantId) -> mpsc::UnboundedReceiver<OutboundFrame> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.outbound.write().insert(id, tx);
        rx
    }

    pub fn unregister(&self, id: ParticipantId) {
        self.outbound.write().remove(&id);
    }

    pub fn connected(&self) -> usize {
        self.outbound.read().len()
    }

    fn encode_frame(&self, message: &ServerMessage) -> Option<OutboundFrame> {
        match encode(message) {
            Ok(bytes) => Some(Arc::new(bytes)),
            Err(e) => {
                warn!("Failed to encode outbound message: {}", e);
                None
            }
        }
    }

    fn deliver(&self, to: ParticipantId, frame: &OutboundFrame) {
        let outbound = self.outbound.read();
        if let Some(tx) = outbound.get(&to) {
            if tx.send(Arc::clone(frame)).is_ok() {
                self.metrics.record_message_sent(frame.len());
            }
        }
    }
}

impl Broadcaster for ConnectionBroadcaster {
    fn send(&self, to: ParticipantId, message: &ServerMessage) {
        if let Some(frame) = self.encode_frame(message) {
            self.deliver(to, &frame);
        }
    }

    /// Encodes once for all recipients
    fn broadcast(&self, to: &[ParticipantId], message: &ServerMessage) {
        if let Some(frame) = self.encode_frame(message) {
            for id in to {
                self.deliver(*id, &frame);
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::protocol::decode;
    use uuid::Uuid;

    #[test]
    fn test_registered_participant_receives() {
        let broadcaster = ConnectionBroadcaster::new(Arc::new(Metrics::new()));
        let id = Uuid::new_v4();
        let mut rx = broadcaster.register(id);

        broadcaster.send(id, &ServerMessage::Countdown { count: 3 });

        let frame = rx.try_recv().unwrap();
        let decoded: ServerMessage = decode(&frame).unwrap();
        assert_eq!(decoded, ServerMessage::Countdown { count: 3 });
    }

    #[test]
    fn test_broadcast_shares_one_encoding() {
        let broadcaster = ConnectionBroadcaster::new(Arc::new(Metrics::new()));
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut rx_a = broadcaster.register(a);
        let mut rx_b = broadcaster.register(b);

        broadcaster.broadcast(&[a, b], &ServerMessage::OpponentDisconnected);

        let fa = rx_a.try_recv().unwrap();
        let fb = rx_b.try_recv().unwrap();
        assert!(Arc::ptr_eq(&fa, &fb));
    }

    #[test]
    fn test_unknown_and_closed_are_dropped() {
        let metrics = Arc::new(Metrics::new());
        let broadcaster = ConnectionBroadcaster::new(Arc::clone(&metrics));
        let id = Uuid::new_v4();
        let rx = broadcaster.register(id);
        drop(rx);

        broadcaster.send(id, &ServerMessage::OpponentDisconnected);
        broadcaster.send(Uuid::new_v4(), &ServerMessage::OpponentDisconnected);

        assert_eq!(metrics.snapshot().messages_sent, 0);
    }

    #[test]
    fn test_unregister() {
        let broadcaster = ConnectionBroadcaster::new(Arc::new(Metrics::new()));
        let id = Uuid::new_v4();
        let mut rx = broadcaster.register(id);
        assert_eq!(broadcaster.connected(), 1);

        broadcaster.unregister(id);
        broadcaster.send(id, &ServerMessage::OpponentDisconnected);

        assert_eq!(broadcaster.connected(), 0);
        assert!(rx.try_recv().is_err());
    }
}
