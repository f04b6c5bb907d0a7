//! Lobby coordinator
//!
//! A single task owns the participant directory, the match queue and the room
//! registry. Connections and room tasks talk to it through `LobbyHandle`.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::game::state::Slot;
use crate::lobby::participant::{ParticipantDirectory, ParticipantId, ParticipantState};
use crate::lobby::queue::MatchQueue;
use crate::lobby::registry::RoomRegistry;
use crate::lobby::room::{Room, RoomId};
use crate::lobby::room_runner::spawn_room;
use crate::metrics::Metrics;
use crate::net::broadcast::Broadcaster;
use crate::net::protocol::ServerMessage;

/// Requests handled by the lobby task
#[derive(Debug)]
pub enum LobbyCommand {
    Connect { participant: ParticipantId },
    JoinQueue { participant: ParticipantId },
    PaddleMove { participant: ParticipantId, y: Option<f32> },
    Disconnect { participant: ParticipantId },
    /// Sent by a room task once its post-game delay has elapsed
    RoomFinished { room_id: RoomId },
    Stats { reply: oneshot::Sender<LobbyStats> },
    Shutdown,
}

/// Lobby counts at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LobbyStats {
    pub participants: usize,
    pub queued: usize,
    pub rooms: usize,
}

/// Cheap, clonable sender to the lobby task
/// Sends after the lobby has stopped are dropped.
#[derive(Debug, Clone)]
pub struct LobbyHandle {
    tx: mpsc::UnboundedSender<LobbyCommand>,
}

impl LobbyHandle {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<LobbyCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, command: LobbyCommand) {
        let _ = self.tx.send(command);
    }

    pub fn connect(&self, participant: ParticipantId) {
        self.send(LobbyCommand::Connect { participant });
    }

    pub fn join_queue(&self, participant: ParticipantId) {
        self.send(LobbyCommand::JoinQueue { participant });
    }

    pub fn paddle_move(&self, participant: ParticipantId, y: Option<f32>) {
        self.send(LobbyCommand::PaddleMove { participant, y });
    }

    pub fn disconnect(&self, participant: ParticipantId) {
        self.send(LobbyCommand::Disconnect { participant });
    }

    pub fn room_finished(&self, room_id: RoomId) {
        self.send(LobbyCommand::RoomFinished { room_id });
    }

    /// `None` if the lobby has stopped
    pub async fn stats(&self) -> Option<LobbyStats> {
        let (reply, rx) = oneshot::channel();
        self.send(LobbyCommand::Stats { reply });
        rx.await.ok()
    }

    pub fn shutdown(&self) {
        self.send(LobbyCommand::Shutdown);
    }
}

/// Lobby state, owned by the lobby task
pub struct LobbyManager {
    participants: ParticipantDirectory,
    queue: MatchQueue,
    rooms: RoomRegistry,
    broadcaster: Arc<dyn Broadcaster>,
    metrics: Arc<Metrics>,
    /// Given to room tasks so they can report back
    handle: LobbyHandle,
    /// Seeds each room's rng
    rng: StdRng,
}

impl LobbyManager {
    pub fn new(
        max_rooms: usize,
        broadcaster: Arc<dyn Broadcaster>,
        metrics: Arc<Metrics>,
        handle: LobbyHandle,
        rng: StdRng,
    ) -> Self {
        Self {
            participants: ParticipantDirectory::new(),
            queue: MatchQueue::new(),
            rooms: RoomRegistry::new(max_rooms),
            broadcaster,
            metrics,
            handle,
            rng,
        }
    }

    pub fn stats(&self) -> LobbyStats {
        LobbyStats {
            participants: self.participants.len(),
            queued: self.queue.len(),
            rooms: self.rooms.len(),
        }
    }

    /// Apply one command; returns false once the lobby should stop
    pub fn handle(&mut self, command: LobbyCommand) -> bool {
        match command {
            LobbyCommand::Connect { participant } => {
                if !self.participants.insert(participant) {
                    debug!("Participant {} connected twice", participant);
                }
            }
            LobbyCommand::JoinQueue { participant } => self.join_queue(participant),
            LobbyCommand::PaddleMove { participant, y } => self.paddle_move(participant, y),
            LobbyCommand::Disconnect { participant } => self.disconnect(participant),
            LobbyCommand::RoomFinished { room_id } => {
                self.destroy_room(room_id);
                self.try_match();
            }
            LobbyCommand::Stats { reply } => {
                let _ = reply.send(self.stats());
            }
            LobbyCommand::Shutdown => {
                self.shutdown();
                return false;
            }
        }
        self.metrics.set_lobby_gauges(self.queue.len(), self.rooms.len());
        true
    }

    fn join_queue(&mut self, id: ParticipantId) {
        let Some(participant) = self.participants.get_mut(id) else {
            debug!("Ignoring join from unknown participant {}", id);
            return;
        };
        if !participant.is_idle() {
            debug!("Ignoring join from {} ({:?})", id, participant.state);
            return;
        }
        if self.queue.enqueue(id) {
            participant.state = ParticipantState::Queued;
            info!("Participant {} queued ({} waiting)", id, self.queue.len());
        }
        self.try_match();
    }

    /// Pair waiting participants while there is room capacity
    fn try_match(&mut self) {
        while self.rooms.has_capacity() {
            let Some((first, second)) = self.queue.pop_pair() else {
                return;
            };
            if !self.create_room(first, second) {
                return;
            }
        }
        if self.queue.len() >= 2 {
            debug!(
                "Room limit reached, {} participants waiting",
                self.queue.len()
            );
        }
    }

    fn create_room(&mut self, first: ParticipantId, second: ParticipantId) -> bool {
        let room_id = self.rooms.allocate_id();
        let room = Room::new(
            room_id,
            [first, second],
            StdRng::seed_from_u64(self.rng.gen()),
            Arc::clone(&self.broadcaster),
            Arc::clone(&self.metrics),
        );
        let handle = spawn_room(room, self.handle.clone());

        if let Err(e) = self.rooms.insert(handle) {
            warn!("Could not register room {}: {}", room_id, e);
            self.queue.push_front_pair(first, second);
            return false;
        }

        self.participants.set_state(
            first,
            ParticipantState::InRoom {
                room_id,
                slot: Slot::One,
            },
        );
        self.participants.set_state(
            second,
            ParticipantState::InRoom {
                room_id,
                slot: Slot::Two,
            },
        );
        self.metrics.matches_started.fetch_add(1, Ordering::Relaxed);
        info!("Room {} created ({} active)", room_id, self.rooms.len());
        true
    }

    fn paddle_move(&mut self, id: ParticipantId, y: Option<f32>) {
        let Some((room_id, slot)) = self.participants.get(id).and_then(|p| p.room()) else {
            return;
        };
        if let Some(room) = self.rooms.get(room_id) {
            room.paddle_move(slot, y);
        }
    }

    fn disconnect(&mut self, id: ParticipantId) {
        let Some(participant) = self.participants.remove(id) else {
            return;
        };

        match participant.state {
            ParticipantState::Idle => {}
            ParticipantState::Queued => {
                self.queue.remove(id);
            }
            ParticipantState::InRoom { room_id, .. } => {
                if let Some(opponent) = self.rooms.get(room_id).and_then(|r| r.opponent_of(id)) {
                    self.broadcaster
                        .send(opponent, &ServerMessage::OpponentDisconnected);
                }
                if self.destroy_room(room_id) {
                    self.metrics.matches_abandoned.fetch_add(1, Ordering::Relaxed);
                }
                self.try_match();
            }
        }
        debug!("Participant {} disconnected", id);
    }

    /// Cancel a room's task, release its participants and forget it.
    /// Unknown ids are ignored; returns whether a room was removed.
    fn destroy_room(&mut self, room_id: RoomId) -> bool {
        let Some(room) = self.rooms.remove(room_id) else {
            return false;
        };
        room.cancel();
        for participant in room.players() {
            self.participants.release_from_room(participant, room_id);
        }
        info!("Room {} destroyed ({} active)", room_id, self.rooms.len());
        true
    }

    fn shutdown(&mut self) {
        let count = self.rooms.len();
        for room in self.rooms.drain() {
            room.cancel();
        }
        info!("Lobby shut down, {} rooms cancelled", count);
    }
}

/// Start the lobby task
pub fn spawn_lobby(
    max_rooms: usize,
    broadcaster: Arc<dyn Broadcaster>,
    metrics: Arc<Metrics>,
) -> (LobbyHandle, JoinHandle<()>) {
    let (handle, mut rx) = LobbyHandle::channel();
    let mut manager = LobbyManager::new(
        max_rooms,
        broadcaster,
        metrics,
        handle.clone(),
        StdRng::from_entropy(),
    );

    let task = tokio::spawn(async move {
        while let Some(command) = rx.recv().await {
            if !manager.handle(command) {
                break;
            }
        }
    });

    (handle, task)
}
