//! Ball movement and collision
//!
//! Integration, top/bottom wall reflection, paddle contact and goal
//! detection. Only the primary ball changes speed or angle on a paddle hit.

use crate::game::constants::{ball, field, paddle_left, paddle_right};
use crate::game::state::{Ball, GameState, Paddle, Slot};

/// Integrate position from velocity
/// position += velocity * dt, nothing else
#[inline]
pub fn integrate(ball: &mut Ball, dt: f32) {
    ball.position += ball.velocity * dt;
}

/// Reflect off the top and bottom walls
/// Clamps the ball inside the field and forces vertical velocity back into
/// play. Returns true if a wall was hit.
pub fn reflect_walls(ball: &mut Ball) -> bool {
    if ball.position.y - ball::HALF_SIZE <= 0.0 {
        ball.position.y = ball::HALF_SIZE;
        ball.velocity.y = ball.velocity.y.abs();
        true
    } else if ball.position.y + ball::HALF_SIZE >= field::HEIGHT {
        ball.position.y = field::HEIGHT - ball::HALF_SIZE;
        ball.velocity.y = -ball.velocity.y.abs();
        true
    } else {
        false
    }
}

/// Paddle the ball is touching, if it is travelling toward that paddle
pub fn paddle_contact(ball: &Ball, paddles: &[Paddle; 2]) -> Option<Slot> {
    let slot = ball.heading_toward()?;
    let paddle = &paddles[slot.index()];
    let x = slot.paddle_x();

    let overlaps_x = ball.position.x - ball::HALF_SIZE <= paddle_right(x)
        && ball.position.x + ball::HALF_SIZE >= paddle_left(x);

    (overlaps_x && paddle.covers(ball.position.y)).then_some(slot)
}

/// Paddle an extra ball is touching
/// Looser than `paddle_contact`: the ball may be anywhere from the paddle face
/// back to the side wall.
pub fn extra_paddle_contact(ball: &Ball, paddles: &[Paddle; 2]) -> Option<Slot> {
    let slot = ball.heading_toward()?;
    let x = slot.paddle_x();

    let within_x = match slot {
        Slot::One => ball.position.x - ball::HALF_SIZE <= paddle_right(x) && ball.position.x > 0.0,
        Slot::Two => ball.position.x + ball::HALF_SIZE >= paddle_left(x) && ball.position.x < field::WIDTH,
    };

    (within_x && paddles[slot.index()].covers(ball.position.y)).then_some(slot)
}

/// Move the ball onto the struck paddle's face
fn clamp_to_face(ball: &mut Ball, slot: Slot) {
    let x = slot.paddle_x();
    ball.position.x = match slot {
        Slot::One => paddle_right(x) + ball::HALF_SIZE,
        Slot::Two => paddle_left(x) - ball::HALF_SIZE,
    };
}

/// Resolve a primary-ball paddle hit
/// The outgoing direction depends only on where the ball struck the paddle;
/// incoming velocity is discarded.
pub fn bounce_primary(state: &mut GameState, slot: Slot) {
    clamp_to_face(&mut state.ball, slot);

    let paddle = *state.paddle(slot);
    let rel_y = ((state.ball.position.y - paddle.y) / paddle.half_height()).clamp(-1.0, 1.0);
    let angle = rel_y * ball::MAX_DEFLECTION;

    state.ball_speed = (state.ball_speed * ball::SPEED_INCREASE).min(ball::MAX_SPEED);
    let speed = state.effective_ball_speed();

    state.ball.velocity.x = slot.outward() * angle.cos() * speed;
    state.ball.velocity.y = angle.sin() * speed;
}

/// Resolve an extra-ball paddle hit: horizontal direction only
pub fn bounce_extra(ball: &mut Ball, slot: Slot) {
    clamp_to_face(ball, slot);
    ball.velocity.x = slot.outward() * ball.velocity.x.abs();
}

/// Slot that scores if the ball has left the field
pub fn goal_scored(ball: &Ball) -> Option<Slot> {
    if ball.position.x < -ball::OUT_OF_BOUNDS {
        Some(Slot::Two)
    } else if ball.position.x > field::WIDTH + ball::OUT_OF_BOUNDS {
        Some(Slot::One)
    } else {
        None
    }
}
