use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::game::state::{EffectKind, GameState, Powerup, PowerupId, PowerupKind, Slot};

/// Messages from client to server
/// JSON objects tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Ask to be matched with an opponent
    JoinQueue,
    /// Desired paddle centre; absent means the field centre
    PaddleMove {
        #[serde(default)]
        y: Option<f32>,
    },
}

impl ClientMessage {
    const KNOWN_TYPES: [&'static str; 2] = ["join_queue", "paddle_move"];
}

/// Messages from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Paired into a room with this slot
    MatchFound { player_number: Slot },
    /// Pre-game countdown: 3, 2, 1, 0
    Countdown { count: u8 },
    /// Full snapshot, once per tick while playing
    GameState(GameSnapshot),
    /// A point was scored
    Score { p1: u32, p2: u32, scorer: Slot },
    /// A power-up appeared on the field
    PowerupSpawn(PowerupSnapshot),
    /// A power-up was picked up
    PowerupCollected {
        id: PowerupId,
        ptype: PowerupKind,
        target_player: Slot,
    },
    /// Match over
    GameOver { winner: Slot },
    /// The other participant left; the room is gone
    OpponentDisconnected,
}

/// Position-only ball view
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallSnapshot {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaddlesSnapshot {
    pub p1_y: f32,
    pub p2_y: f32,
    pub p1_h: f32,
    pub p2_h: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSnapshot {
    pub p1: u32,
    pub p2: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerupSnapshot {
    pub id: PowerupId,
    pub x: f32,
    pub y: f32,
    pub ptype: PowerupKind,
}

impl From<&Powerup> for PowerupSnapshot {
    fn from(p: &Powerup) -> Self {
        Self {
            id: p.id,
            x: p.position.x,
            y: p.position.y,
            ptype: p.kind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectSnapshot {
    #[serde(rename = "type")]
    pub kind: EffectKind,
    /// 1 or 2, or 0 for a global effect
    pub target_player: u8,
    pub remaining: f32,
}

/// Full per-tick room snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub ball: BallSnapshot,
    pub extra_balls: Vec<BallSnapshot>,
    pub paddles: PaddlesSnapshot,
    pub score: ScoreSnapshot,
    pub powerups: Vec<PowerupSnapshot>,
    pub effects: Vec<EffectSnapshot>,
}

impl GameSnapshot {
    pub fn from_game_state(state: &GameState) -> Self {
        let ball = |b: &crate::game::state::Ball| BallSnapshot {
            x: b.position.x,
            y: b.position.y,
        };

        Self {
            ball: ball(&state.ball),
            extra_balls: state.extra_balls.iter().map(ball).collect(),
            paddles: PaddlesSnapshot {
                p1_y: state.paddle(Slot::One).y,
                p2_y: state.paddle(Slot::Two).y,
                p1_h: state.paddle(Slot::One).height,
                p2_h: state.paddle(Slot::Two).height,
            },
            score: ScoreSnapshot {
                p1: state.score.p1,
                p2: state.score.p2,
            },
            powerups: state.powerup.iter().map(PowerupSnapshot::from).collect(),
            effects: state
                .effects
                .iter()
                .map(|e| EffectSnapshot {
                    kind: e.kind,
                    target_player: e.target.map_or(0, Slot::number),
                    remaining: e.remaining,
                })
                .collect(),
        }
    }
}

/// Encode a message as JSON
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, EncodeError> {
    serde_json::to_vec(message).map_err(|e| EncodeError(e.to_string()))
}

/// Decode a message from JSON
pub fn decode<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, DecodeError> {
    serde_json::from_slice(data).map_err(|e| DecodeError(e.to_string()))
}

/// Decode an inbound client message
/// `Ok(None)` for a well-formed object with an unrecognised `type`;
/// those are ignored rather than treated as errors.
pub fn decode_client_message(data: &[u8]) -> Result<Option<ClientMessage>, DecodeError> {
    let value: Value = decode(data)?;
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| DecodeError("missing string field `type`".to_string()))?;

    if !ClientMessage::KNOWN_TYPES.contains(&kind) {
        return Ok(None);
    }

    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| DecodeError(e.to_string()))
}

#[derive(Debug, thiserror::Error)]
#[error("Encode error: {0}")]
pub struct EncodeError(String);

#[derive(Debug, thiserror::Error)]
#[error("Decode error: {0}")]
pub struct DecodeError(String);
