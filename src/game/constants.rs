//! Game constants
//!
//! Every value in this file is part of the wire contract with the client:
//! the client renders with the same field size, paddle geometry and ball size,
//! so none of these are runtime-configurable.

use std::time::Duration;

/// Playing field dimensions
pub mod field {
    /// Field width in world units
    pub const WIDTH: f32 = 1280.0;
    /// Field height in world units
    pub const HEIGHT: f32 = 720.0;
    /// Horizontal centre
    pub const CENTER_X: f32 = WIDTH / 2.0;
    /// Vertical centre (also the default paddle position)
    pub const CENTER_Y: f32 = HEIGHT / 2.0;
}

/// Paddle geometry
pub mod paddle {
    /// Paddle width
    pub const WIDTH: f32 = 20.0;
    /// Base paddle height
    pub const HEIGHT: f32 = 120.0;
    /// Distance from each side wall to the paddle centre line
    pub const MARGIN: f32 = 40.0;
    /// Height multiplier while a paddle_grow effect is active
    pub const GROW_FACTOR: f32 = 1.5;
    /// Height multiplier while a paddle_shrink effect is active
    pub const SHRINK_FACTOR: f32 = 0.5;
}

/// Ball constants
pub mod ball {
    use std::f32::consts::{FRAC_PI_3, FRAC_PI_4};

    /// Ball is a square of this side length
    pub const SIZE: f32 = 20.0;
    /// Half extent used for wall, paddle and pickup overlap
    pub const HALF_SIZE: f32 = SIZE / 2.0;
    /// Launch speed after every reset (units/s)
    pub const INITIAL_SPEED: f32 = 400.0;
    /// Hard cap on the primary ball's scalar speed
    pub const MAX_SPEED: f32 = 800.0;
    /// Speed multiplier applied on every paddle hit
    pub const SPEED_INCREASE: f32 = 1.05;
    /// Extra multiplier while the ball_speed effect is active
    pub const BOOST_MULTIPLIER: f32 = 1.5;
    /// Cap on the boosted (effective) speed
    pub const BOOSTED_MAX_SPEED: f32 = MAX_SPEED * BOOST_MULTIPLIER;
    /// Deflection angle at the very edge of a paddle (60 degrees)
    pub const MAX_DEFLECTION: f32 = FRAC_PI_3;
    /// Launch angle is uniform in [-LAUNCH_SPREAD, LAUNCH_SPREAD) (45 degrees)
    pub const LAUNCH_SPREAD: f32 = FRAC_PI_4;
    /// A ball past this distance beyond a side wall is out of play
    pub const OUT_OF_BOUNDS: f32 = SIZE;
    /// Extra ball horizontal velocity = primary vx * this
    pub const EXTRA_BALL_VX_FACTOR: f32 = -0.8;
    /// Extra ball vertical velocity = primary vy * this
    pub const EXTRA_BALL_VY_FACTOR: f32 = -1.2;
}

/// Power-up constants
pub mod powerup {
    /// Pickup radius around the power-up centre
    pub const RADIUS: f32 = 15.0;
    /// Duration of paddle_grow / paddle_shrink (seconds)
    pub const EFFECT_DURATION: f32 = 5.0;
    /// Nominal duration of ball_speed; in practice it lasts until the next point
    pub const SPEED_BOOST_DURATION: f32 = 99.0;
    /// Minimum delay between spawns (milliseconds)
    pub const SPAWN_MIN_MS: u64 = 5000;
    /// Maximum delay between spawns (milliseconds, inclusive)
    pub const SPAWN_MAX_MS: u64 = 10000;
    /// Top/bottom band kept free of power-ups
    pub const SPAWN_MARGIN_Y: f32 = 60.0;
    /// Maximum power-ups on the field at once
    pub const MAX_ON_FIELD: usize = 1;
}

/// Match rules
pub mod rules {
    /// First player to this many points wins
    pub const WINNING_SCORE: u32 = 5;
}

/// Server timing
pub mod timing {
    use super::Duration;

    /// Simulation tick rate in Hz
    pub const TICK_RATE: u32 = 60;
    /// Nominal interval between ticks
    pub const TICK_INTERVAL: Duration = Duration::from_nanos(1_000_000_000 / TICK_RATE as u64);
    /// First countdown value sent to clients
    pub const COUNTDOWN_FROM: u8 = 3;
    /// Spacing between countdown events
    pub const COUNTDOWN_STEP: Duration = Duration::from_secs(1);
    /// Delay between game_over and room destruction
    pub const FINISH_GRACE: Duration = Duration::from_secs(3);
}

/// Networking constants
pub mod net {
    /// Maximum reliable message size
    pub const MAX_MESSAGE_SIZE: usize = 65536;
    /// Maximum datagram (unreliable) size
    pub const MAX_DATAGRAM_SIZE: usize = 1200;
}

/// Left edge x of the paddle whose centre line is at `center_x`
#[inline]
pub fn paddle_left(center_x: f32) -> f32 {
    center_x - paddle::WIDTH / 2.0
}

/// Right edge x of the paddle whose centre line is at `center_x`
#[inline]
pub fn paddle_right(center_x: f32) -> f32 {
    center_x + paddle::WIDTH / 2.0
}
