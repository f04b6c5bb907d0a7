//! Power-up spawning, pickup and timed effects

use rand::Rng;

use crate::game::constants::{ball, field, paddle, powerup};
use crate::game::state::{Ball, Effect, EffectKind, GameState, Powerup, PowerupKind, Slot};
use crate::util::vec2::Vec2;

/// Spawn a power-up if one is due and the field is empty
/// Schedules the following spawn when it fires.
pub fn maybe_spawn<R: Rng + ?Sized>(state: &mut GameState, rng: &mut R) -> Option<Powerup> {
    if state.clock < state.next_powerup_at || state.powerup.is_some() {
        return None;
    }

    let position = Vec2::new(
        field::WIDTH / 4.0 + rng.gen::<f32>() * (field::WIDTH / 2.0),
        powerup::SPAWN_MARGIN_Y + rng.gen::<f32>() * (field::HEIGHT - 2.0 * powerup::SPAWN_MARGIN_Y),
    );
    let spawned = Powerup {
        id: state.alloc_powerup_id(),
        position,
        kind: PowerupKind::random(rng),
    };

    state.powerup = Some(spawned);
    state.schedule_next_powerup(rng);
    Some(spawned)
}

/// Slot credited with a pickup by this ball
/// Attribution follows travel direction, not which paddle last touched it.
pub fn collector_of(ball: &Ball) -> Slot {
    if ball.velocity.x > 0.0 {
        Slot::One
    } else {
        Slot::Two
    }
}

/// Take the field power-up if `ball` overlaps it
pub fn try_pickup(state: &mut GameState, ball: &Ball) -> Option<(Powerup, Slot)> {
    let field_powerup = state.powerup?;
    if ball.position.distance_to(field_powerup.position) >= powerup::RADIUS + ball::HALF_SIZE {
        return None;
    }

    state.powerup = None;
    let collector = collector_of(ball);
    apply(state, field_powerup.kind, collector);
    Some((field_powerup, collector))
}

/// Apply a collected power-up
pub fn apply(state: &mut GameState, kind: PowerupKind, collector: Slot) {
    match kind {
        PowerupKind::PaddleGrow => {
            state.paddle_mut(collector).height = paddle::HEIGHT * paddle::GROW_FACTOR;
            state.effects.push(Effect {
                kind: EffectKind::PaddleGrow,
                target: Some(collector),
                remaining: powerup::EFFECT_DURATION,
            });
        }
        PowerupKind::PaddleShrink => {
            let opponent = collector.opponent();
            state.paddle_mut(opponent).height = paddle::HEIGHT * paddle::SHRINK_FACTOR;
            state.effects.push(Effect {
                kind: EffectKind::PaddleShrink,
                target: Some(opponent),
                remaining: powerup::EFFECT_DURATION,
            });
        }
        PowerupKind::BallSpeed => {
            state.effects.push(Effect {
                kind: EffectKind::BallSpeed,
                target: None,
                remaining: powerup::SPEED_BOOST_DURATION,
            });
        }
        PowerupKind::MultiBall => {
            let primary = state.ball;
            state.extra_balls.push(Ball::new(
                primary.position,
                primary
                    .velocity
                    .scale(ball::EXTRA_BALL_VX_FACTOR, ball::EXTRA_BALL_VY_FACTOR),
            ));
        }
    }
}

/// Count down active effects, reverting paddles as they expire
pub fn update_effects(state: &mut GameState, dt: f32) {
    let mut reverted: [bool; 2] = [false; 2];

    state.effects.retain_mut(|effect| {
        effect.remaining -= dt;
        if effect.remaining > 0.0 {
            return true;
        }
        match effect.kind {
            EffectKind::PaddleGrow | EffectKind::PaddleShrink => {
                if let Some(target) = effect.target {
                    reverted[target.index()] = true;
                }
            }
            EffectKind::BallSpeed => {}
        }
        false
    });

    for slot in Slot::BOTH {
        if reverted[slot.index()] {
            state.paddle_mut(slot).height = paddle::HEIGHT;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0xB411)
    }

    fn place(state: &mut GameState, kind: PowerupKind, at: Vec2) -> Powerup {
        let p = Powerup {
            id: state.alloc_powerup_id(),
            position: at,
            kind,
        };
        state.powerup = Some(p);
        p
    }

    #[test]
    fn test_spawn_waits_for_schedule() {
        let mut rng = rng();
        let mut state = GameState::new();
        state.next_powerup_at = 5.0;
        state.clock = 4.9;
        assert!(maybe_spawn(&mut state, &mut rng).is_none());

        state.clock = 5.0;
        let spawned = maybe_spawn(&mut state, &mut rng).unwrap();
        assert_eq!(spawned.id, 1);
        assert_eq!(state.powerup, Some(spawned));
        assert!(state.next_powerup_at >= 10.0 && state.next_powerup_at <= 15.0);
    }

    #[test]
    fn test_spawn_bounds() {
        let mut rng = rng();
        let mut state = GameState::new();
        for _ in 0..200 {
            state.powerup = None;
            state.clock = state.next_powerup_at;
            let p = maybe_spawn(&mut state, &mut rng).unwrap();
            assert!(p.position.x >= 320.0 && p.position.x <= 960.0);
            assert!(p.position.y >= 60.0 && p.position.y <= 660.0);
        }
    }

    #[test]
    fn test_at_most_one_on_field() {
        let mut rng = rng();
        let mut state = GameState::new();
        assert!(maybe_spawn(&mut state, &mut rng).is_some());

        // Due again, but the field is occupied
        state.clock = state.next_powerup_at + 100.0;
        assert!(maybe_spawn(&mut state, &mut rng).is_none());

        state.powerup = None;
        assert!(maybe_spawn(&mut state, &mut rng).is_some());
    }

    #[test]
    fn test_collector_attribution() {
        let right = Ball::new(Vec2::ZERO, Vec2::new(10.0, 0.0));
        let left = Ball::new(Vec2::ZERO, Vec2::new(-10.0, 0.0));
        let still = Ball::new(Vec2::ZERO, Vec2::ZERO);
        assert_eq!(collector_of(&right), Slot::One);
        assert_eq!(collector_of(&left), Slot::Two);
        assert_eq!(collector_of(&still), Slot::Two);
    }

    #[test]
    fn test_pickup_radius() {
        let mut state = GameState::new();
        place(&mut state, PowerupKind::BallSpeed, Vec2::new(600.0, 300.0));

        let far = Ball::new(Vec2::new(625.0, 300.0), Vec2::new(100.0, 0.0));
        assert!(try_pickup(&mut state, &far).is_none());
        assert!(state.powerup.is_some());

        let near = Ball::new(Vec2::new(624.0, 300.0), Vec2::new(100.0, 0.0));
        let (taken, collector) = try_pickup(&mut state, &near).unwrap();
        assert_eq!(taken.kind, PowerupKind::BallSpeed);
        assert_eq!(collector, Slot::One);
        assert!(state.powerup.is_none());
        assert!(state.speed_boost_active());
    }

    #[test]
    fn test_grow_applies_to_collector() {
        let mut state = GameState::new();
        apply(&mut state, PowerupKind::PaddleGrow, Slot::Two);
        assert_eq!(state.paddle(Slot::Two).height, 180.0);
        assert_eq!(state.paddle(Slot::One).height, 120.0);
        assert_eq!(state.effects[0].target, Some(Slot::Two));
    }

    #[test]
    fn test_shrink_applies_to_opponent() {
        let mut state = GameState::new();
        apply(&mut state, PowerupKind::PaddleShrink, Slot::One);
        assert_eq!(state.paddle(Slot::Two).height, 60.0);
        assert_eq!(state.paddle(Slot::One).height, 120.0);
        assert_eq!(state.effects[0].kind, EffectKind::PaddleShrink);
        assert_eq!(state.effects[0].target, Some(Slot::Two));
    }

    #[test]
    fn test_multi_ball_from_primary() {
        let mut state = GameState::new();
        state.ball = Ball::new(Vec2::new(500.0, 200.0), Vec2::new(300.0, 100.0));
        apply(&mut state, PowerupKind::MultiBall, Slot::One);

        assert_eq!(state.extra_balls.len(), 1);
        let extra = state.extra_balls[0];
        assert_eq!(extra.position, Vec2::new(500.0, 200.0));
        assert!(extra.velocity.approx_eq(Vec2::new(-240.0, -120.0), 1e-3));
        assert!(state.effects.is_empty());
    }

    #[test]
    fn test_grow_reverts_after_duration() {
        let mut state = GameState::new();
        apply(&mut state, PowerupKind::PaddleGrow, Slot::One);

        // Just under five seconds of 60 Hz ticks
        for _ in 0..299 {
            update_effects(&mut state, 1.0 / 60.0);
        }
        assert_eq!(state.paddle(Slot::One).height, 180.0);

        for _ in 0..2 {
            update_effects(&mut state, 1.0 / 60.0);
        }
        assert_eq!(state.paddle(Slot::One).height, 120.0);
        assert!(state.effects.is_empty());
    }

    #[test]
    fn test_speed_boost_outlives_paddle_effects() {
        let mut state = GameState::new();
        apply(&mut state, PowerupKind::BallSpeed, Slot::One);
        apply(&mut state, PowerupKind::PaddleShrink, Slot::Two);

        update_effects(&mut state, 6.0);

        assert_eq!(state.effects.len(), 1);
        assert_eq!(state.effects[0].kind, EffectKind::BallSpeed);
        assert_eq!(state.paddle(Slot::One).height, 120.0);
    }

    #[test]
    fn test_every_kind_applies() {
        for kind in PowerupKind::ALL {
            let mut state = GameState::new();
            apply(&mut state, kind, Slot::One);
            let changed = !state.effects.is_empty() || !state.extra_balls.is_empty();
            assert!(changed, "{kind:?} had no effect");
        }
    }
}
