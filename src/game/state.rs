//! Authoritative match state for one room
//!
//! Contains the paddles, primary ball, extra balls, score, the field power-up
//! and active effects. Everything here is plain data plus small helpers; the
//! per-tick rules live in `game::systems`.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::game::constants::{ball, field, paddle, powerup};
use crate::util::vec2::Vec2;

/// Player slot within a room. Slot one owns the left paddle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Slot {
    One,
    Two,
}

impl Slot {
    pub const BOTH: [Slot; 2] = [Slot::One, Slot::Two];

    /// Wire player number (1 or 2)
    pub fn number(self) -> u8 {
        match self {
            Slot::One => 1,
            Slot::Two => 2,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Slot::One => 0,
            Slot::Two => 1,
        }
    }

    pub fn opponent(self) -> Slot {
        match self {
            Slot::One => Slot::Two,
            Slot::Two => Slot::One,
        }
    }

    /// x of this slot's paddle centre line
    pub fn paddle_x(self) -> f32 {
        match self {
            Slot::One => paddle::MARGIN,
            Slot::Two => field::WIDTH - paddle::MARGIN,
        }
    }

    /// Sign of horizontal velocity for a ball travelling away from this paddle
    pub fn outward(self) -> f32 {
        match self {
            Slot::One => 1.0,
            Slot::Two => -1.0,
        }
    }
}

impl From<Slot> for u8 {
    fn from(slot: Slot) -> u8 {
        slot.number()
    }
}

impl TryFrom<u8> for Slot {
    type Error = InvalidSlot;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Slot::One),
            2 => Ok(Slot::Two),
            other => Err(InvalidSlot(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid player slot {0}, expected 1 or 2")]
pub struct InvalidSlot(pub u8);

/// A paddle, identified by its slot's index in `GameState::paddles`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paddle {
    /// Centre y
    pub y: f32,
    pub height: f32,
}

impl Paddle {
    pub fn half_height(&self) -> f32 {
        self.height / 2.0
    }

    pub fn covers(&self, y: f32) -> bool {
        y >= self.y - self.half_height() && y <= self.y + self.half_height()
    }
}

impl Default for Paddle {
    fn default() -> Self {
        Self {
            y: field::CENTER_Y,
            height: paddle::HEIGHT,
        }
    }
}

/// A ball. The primary ball's scalar speed is kept on `GameState`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Ball {
    pub position: Vec2,
    pub velocity: Vec2,
}

impl Ball {
    pub fn new(position: Vec2, velocity: Vec2) -> Self {
        Self { position, velocity }
    }

    /// Ball centred on the field, at rest
    pub fn centered() -> Self {
        Self::new(Vec2::new(field::CENTER_X, field::CENTER_Y), Vec2::ZERO)
    }

    /// Slot whose paddle this ball is travelling toward, if any
    pub fn heading_toward(&self) -> Option<Slot> {
        if self.velocity.x < 0.0 {
            Some(Slot::One)
        } else if self.velocity.x > 0.0 {
            Some(Slot::Two)
        } else {
            None
        }
    }

    /// True once the ball is fully past either side wall
    pub fn out_of_play(&self) -> bool {
        self.position.x < -ball::OUT_OF_BOUNDS || self.position.x > field::WIDTH + ball::OUT_OF_BOUNDS
    }
}

/// Score pair; only ever increases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Score {
    pub p1: u32,
    pub p2: u32,
}

impl Score {
    pub fn get(&self, slot: Slot) -> u32 {
        match slot {
            Slot::One => self.p1,
            Slot::Two => self.p2,
        }
    }

    pub fn award(&mut self, slot: Slot) {
        match slot {
            Slot::One => self.p1 += 1,
            Slot::Two => self.p2 += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.p1 + self.p2
    }
}

/// Power-up kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerupKind {
    PaddleGrow,
    PaddleShrink,
    BallSpeed,
    MultiBall,
}

impl PowerupKind {
    pub const ALL: [PowerupKind; 4] = [
        PowerupKind::PaddleGrow,
        PowerupKind::PaddleShrink,
        PowerupKind::BallSpeed,
        PowerupKind::MultiBall,
    ];

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

/// Power-up identifier, unique within a room
pub type PowerupId = u32;

/// A collectible sitting on the field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Powerup {
    pub id: PowerupId,
    pub position: Vec2,
    pub kind: PowerupKind,
}

/// Kinds of timed effect. multi_ball is instantaneous and has no effect entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    PaddleGrow,
    PaddleShrink,
    BallSpeed,
}

/// A timed modifier active in the room
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Effect {
    pub kind: EffectKind,
    /// Affected paddle; `None` for the global ball_speed effect
    pub target: Option<Slot>,
    /// Seconds left
    pub remaining: f32,
}

/// All simulation state for one match
#[derive(Debug, Clone)]
pub struct GameState {
    pub paddles: [Paddle; 2],
    /// Primary ball, the only one that scores
    pub ball: Ball,
    /// Scalar speed of the primary ball before any boost
    pub ball_speed: f32,
    pub extra_balls: Vec<Ball>,
    pub score: Score,
    /// At most one power-up on the field
    pub powerup: Option<Powerup>,
    pub effects: Vec<Effect>,
    /// Simulated seconds since play started
    pub clock: f32,
    /// Clock value at which the next power-up may spawn
    pub next_powerup_at: f32,
    next_powerup_id: PowerupId,
}

impl GameState {
    pub fn new() -> Self {
        Self {
            paddles: [Paddle::default(); 2],
            ball: Ball::centered(),
            ball_speed: ball::INITIAL_SPEED,
            extra_balls: Vec::new(),
            score: Score::default(),
            powerup: None,
            effects: Vec::new(),
            clock: 0.0,
            next_powerup_at: 0.0,
            next_powerup_id: 1,
        }
    }

    pub fn paddle(&self, slot: Slot) -> &Paddle {
        &self.paddles[slot.index()]
    }

    pub fn paddle_mut(&mut self, slot: Slot) -> &mut Paddle {
        &mut self.paddles[slot.index()]
    }

    /// Move a paddle centre, clamped to the field
    pub fn set_paddle_y(&mut self, slot: Slot, y: f32) {
        let y = if y.is_nan() { field::CENTER_Y } else { y };
        self.paddle_mut(slot).y = y.clamp(0.0, field::HEIGHT);
    }

    /// Put the primary ball back in the centre with a random launch.
    /// Clears extra balls and the ball_speed effect.
    pub fn reset_ball<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.ball_speed = ball::INITIAL_SPEED;

        let angle = rng.gen_range(-ball::LAUNCH_SPREAD..ball::LAUNCH_SPREAD);
        let direction = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        let launch = Vec2::from_angle(angle, self.ball_speed);

        self.ball = Ball::new(
            Vec2::new(field::CENTER_X, field::CENTER_Y),
            Vec2::new(launch.x * direction, launch.y),
        );
        self.extra_balls.clear();
        self.effects.retain(|e| e.kind != EffectKind::BallSpeed);
    }

    pub fn speed_boost_active(&self) -> bool {
        self.effects.iter().any(|e| e.kind == EffectKind::BallSpeed)
    }

    /// Primary ball speed with every active boost applied, capped
    pub fn effective_ball_speed(&self) -> f32 {
        let boosts = self
            .effects
            .iter()
            .filter(|e| e.kind == EffectKind::BallSpeed)
            .count();
        (self.ball_speed * ball::BOOST_MULTIPLIER.powi(boosts as i32)).min(ball::BOOSTED_MAX_SPEED)
    }

    /// Pick the next spawn time, uniform in the spawn window
    pub fn schedule_next_powerup<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let delay_ms = rng.gen_range(powerup::SPAWN_MIN_MS..=powerup::SPAWN_MAX_MS);
        self.next_powerup_at = self.clock + delay_ms as f32 / 1000.0;
    }

    pub fn alloc_powerup_id(&mut self) -> PowerupId {
        let id = self.next_powerup_id;
        self.next_powerup_id += 1;
        id
    }

    /// Total balls in play
    pub fn ball_count(&self) -> usize {
        1 + self.extra_balls.len()
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}
