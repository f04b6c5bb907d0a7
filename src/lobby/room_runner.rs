//! Timer-driven task that owns one `Room`
//!
//! The task runs the countdown, the fixed-rate tick loop and the post-game
//! grace delay, and applies paddle input between ticks. All room mutation
//! happens on this task. Aborting it cancels every pending timer.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tracing::debug;

use crate::game::constants::timing::{COUNTDOWN_STEP, FINISH_GRACE, TICK_INTERVAL};
use crate::game::state::Slot;
use crate::lobby::manager::LobbyHandle;
use crate::lobby::participant::ParticipantId;
use crate::lobby::room::{Room, RoomId, RoomPhase};

/// Input forwarded to a running room
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RoomCommand {
    PaddleMove { slot: Slot, y: Option<f32> },
}

/// Lobby-side handle to a running room task
pub struct RoomHandle {
    id: RoomId,
    players: [ParticipantId; 2],
    commands: mpsc::UnboundedSender<RoomCommand>,
    task: JoinHandle<()>,
}

impl RoomHandle {
    pub(crate) fn new(
        id: RoomId,
        players: [ParticipantId; 2],
        commands: mpsc::UnboundedSender<RoomCommand>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            id,
            players,
            commands,
            task,
        }
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn players(&self) -> [ParticipantId; 2] {
        self.players
    }

    /// The participant in the other slot, if `participant` is in this room
    pub fn opponent_of(&self, participant: ParticipantId) -> Option<ParticipantId> {
        match self.players {
            [a, b] if a == participant => Some(b),
            [a, b] if b == participant => Some(a),
            _ => None,
        }
    }

    pub fn paddle_move(&self, slot: Slot, y: Option<f32>) {
        // Task already gone means the room is being torn down
        let _ = self.commands.send(RoomCommand::PaddleMove { slot, y });
    }

    /// Stop the room task and every timer it owns
    pub fn cancel(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for RoomHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawn the task driving `room` from its current phase
pub fn spawn_room(room: Room, lobby: LobbyHandle) -> RoomHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let id = room.id();
    let players = room.players();
    let task = tokio::spawn(run_room(room, rx, lobby));
    RoomHandle::new(id, players, tx, task)
}

async fn run_room(mut room: Room, mut commands: mpsc::UnboundedReceiver<RoomCommand>, lobby: LobbyHandle) {
    room.announce();

    if room.phase() == RoomPhase::Countdown {
        let mut countdown = interval_at(Instant::now() + COUNTDOWN_STEP, COUNTDOWN_STEP);
        loop {
            tokio::select! {
                _ = countdown.tick() => {
                    if room.countdown_step() {
                        break;
                    }
                }
                Some(command) = commands.recv() => apply(&mut room, command),
            }
        }
    }

    if room.phase() == RoomPhase::Playing {
        let mut ticker = interval_at(Instant::now() + TICK_INTERVAL, TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                now = ticker.tick() => {
                    if room.tick(now) != RoomPhase::Playing {
                        break;
                    }
                }
                Some(command) = commands.recv() => apply(&mut room, command),
            }
        }
    }

    sleep(FINISH_GRACE).await;
    room.close();
    debug!("Room {} grace period over", room.id());
    lobby.room_finished(room.id());
}

fn apply(room: &mut Room, command: RoomCommand) {
    match command {
        RoomCommand::PaddleMove { slot, y } => room.apply_paddle_move(slot, y),
    }
}
