//! One two-player match
//!
//! A `Room` owns the match state and drives it through
//! Forming -> Countdown -> Playing -> Finished -> Destroyed. It never touches
//! timers itself; the room runner calls into it on each countdown step and
//! tick, so everything here is synchronous and deterministic for a given rng.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant as StdInstant;

use rand::rngs::StdRng;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::game::constants::timing::{COUNTDOWN_FROM, TICK_INTERVAL};
use crate::game::game_loop::{step, GameEvent, StepOutcome};
use crate::game::match_result::MatchResult;
use crate::game::state::{GameState, Slot};
use crate::lobby::participant::ParticipantId;
use crate::metrics::Metrics;
use crate::net::broadcast::Broadcaster;
use crate::net::protocol::{GameSnapshot, PowerupSnapshot, ServerMessage};

pub type RoomId = u64;

/// Room lifecycle; transitions only move forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RoomPhase {
    Forming,
    Countdown,
    Playing,
    Finished,
    Destroyed,
}

pub struct Room {
    id: RoomId,
    phase: RoomPhase,
    players: [ParticipantId; 2],
    state: GameState,
    rng: StdRng,
    /// Next countdown value to announce
    countdown: u8,
    last_tick: Option<Instant>,
    events: Vec<GameEvent>,
    result: Option<MatchResult>,
    broadcaster: Arc<dyn Broadcaster>,
    metrics: Arc<Metrics>,
}

impl Room {
    /// `players[0]` takes slot one, `players[1]` slot two
    pub fn new(
        id: RoomId,
        players: [ParticipantId; 2],
        rng: StdRng,
        broadcaster: Arc<dyn Broadcaster>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            id,
            phase: RoomPhase::Forming,
            players,
            state: GameState::new(),
            rng,
            countdown: COUNTDOWN_FROM,
            last_tick: None,
            events: Vec::with_capacity(4),
            result: None,
            broadcaster,
            metrics,
        }
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn phase(&self) -> RoomPhase {
        self.phase
    }

    pub fn players(&self) -> [ParticipantId; 2] {
        self.players
    }

    pub fn participant(&self, slot: Slot) -> ParticipantId {
        self.players[slot.index()]
    }

    pub fn slot_of(&self, participant: ParticipantId) -> Option<Slot> {
        Slot::BOTH
            .into_iter()
            .find(|slot| self.participant(*slot) == participant)
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    pub fn result(&self) -> Option<&MatchResult> {
        self.result.as_ref()
    }

    fn transition(&mut self, to: RoomPhase) {
        debug_assert!(to > self.phase, "room {} moved {:?} -> {:?}", self.id, self.phase, to);
        debug!("Room {} {:?} -> {:?}", self.id, self.phase, to);
        self.phase = to;
    }

    fn broadcast(&self, message: &ServerMessage) {
        self.broadcaster.broadcast(&self.players, message);
    }

    /// Tell each participant their slot and start the countdown
    pub fn announce(&mut self) {
        if self.phase != RoomPhase::Forming {
            return;
        }
        for slot in Slot::BOTH {
            self.broadcaster.send(
                self.participant(slot),
                &ServerMessage::MatchFound {
                    player_number: slot,
                },
            );
        }
        self.transition(RoomPhase::Countdown);
    }

    /// Emit the next countdown value; returns true once play has started
    pub fn countdown_step(&mut self) -> bool {
        if self.phase != RoomPhase::Countdown {
            return self.phase >= RoomPhase::Playing;
        }

        let count = self.countdown;
        self.broadcast(&ServerMessage::Countdown { count });

        if count == 0 {
            self.start_play();
            true
        } else {
            self.countdown -= 1;
            false
        }
    }

    fn start_play(&mut self) {
        self.state.reset_ball(&mut self.rng);
        self.state.schedule_next_powerup(&mut self.rng);
        self.last_tick = None;
        self.transition(RoomPhase::Playing);
    }

    /// Latest paddle position from a participant; ignored unless playing
    pub fn apply_paddle_move(&mut self, slot: Slot, y: Option<f32>) {
        if self.phase != RoomPhase::Playing {
            return;
        }
        let y = y.unwrap_or(crate::game::constants::field::CENTER_Y);
        self.state.set_paddle_y(slot, y);
    }

    /// Run one tick at `now`, using the real time since the previous tick
    pub fn tick(&mut self, now: Instant) -> RoomPhase {
        let dt = match self.last_tick {
            Some(last) => now.saturating_duration_since(last),
            None => TICK_INTERVAL,
        };
        self.last_tick = Some(now);
        self.advance(dt.as_secs_f32())
    }

    /// Step the simulation by `dt` seconds and publish the results
    pub fn advance(&mut self, dt: f32) -> RoomPhase {
        if self.phase != RoomPhase::Playing {
            return self.phase;
        }

        let started = StdInstant::now();
        let mut events = std::mem::take(&mut self.events);
        let outcome = step(&mut self.state, dt, &mut self.rng, &mut events);

        for event in events.drain(..) {
            self.broadcast(&event_message(&event));
        }
        self.events = events;

        match outcome {
            StepOutcome::Continue => {
                self.broadcast(&ServerMessage::GameState(GameSnapshot::from_game_state(
                    &self.state,
                )));
            }
            StepOutcome::Finished(result) => self.finish(result),
        }

        self.metrics.record_tick_time(started.elapsed());
        self.phase
    }

    fn finish(&mut self, result: MatchResult) {
        self.broadcast(&ServerMessage::GameOver {
            winner: result.winner,
        });
        self.metrics.matches_completed.fetch_add(1, Ordering::Relaxed);
        info!(
            "Room {} over: player {} wins {}-{} after {:.1}s",
            self.id,
            result.winner.number(),
            result.score.p1,
            result.score.p2,
            result.duration
        );
        self.result = Some(result);
        self.transition(RoomPhase::Finished);
    }

    /// Mark the room as torn down
    pub fn close(&mut self) {
        if self.phase < RoomPhase::Destroyed {
            self.transition(RoomPhase::Destroyed);
        }
    }
}

fn event_message(event: &GameEvent) -> ServerMessage {
    match *event {
        GameEvent::Scored { scorer, score } => ServerMessage::Score {
            p1: score.p1,
            p2: score.p2,
            scorer,
        },
        GameEvent::PowerupSpawned(ref powerup) => {
            ServerMessage::PowerupSpawn(PowerupSnapshot::from(powerup))
        }
        GameEvent::PowerupCollected { powerup, collector } => ServerMessage::PowerupCollected {
            id: powerup.id,
            ptype: powerup.kind,
            target_player: collector,
        },
    }
}
