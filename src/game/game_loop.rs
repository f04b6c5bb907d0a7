//! One simulation step for a room
//!
//! Order per step: effects, spawn, primary ball, extra balls. The primary ball
//! is the only one that can score; a score that reaches the winning threshold
//! ends the step immediately.

use rand::Rng;
use smallvec::SmallVec;

use crate::game::match_result::{determine_result, MatchResult};
use crate::game::state::{GameState, Powerup, Score, Slot};
use crate::game::systems::{physics, powerup};

/// Something clients need to hear about besides the snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GameEvent {
    Scored { scorer: Slot, score: Score },
    PowerupSpawned(Powerup),
    PowerupCollected { powerup: Powerup, collector: Slot },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    Continue,
    Finished(MatchResult),
}

/// Advance the match by `dt` seconds, appending events in emission order
pub fn step<R: Rng + ?Sized>(
    state: &mut GameState,
    dt: f32,
    rng: &mut R,
    events: &mut Vec<GameEvent>,
) -> StepOutcome {
    state.clock += dt;
    powerup::update_effects(state, dt);

    if let Some(spawned) = powerup::maybe_spawn(state, rng) {
        events.push(GameEvent::PowerupSpawned(spawned));
    }

    // Primary ball
    physics::integrate(&mut state.ball, dt);
    physics::reflect_walls(&mut state.ball);
    if let Some(slot) = physics::paddle_contact(&state.ball, &state.paddles) {
        physics::bounce_primary(state, slot);
    }
    let primary = state.ball;
    if let Some((taken, collector)) = powerup::try_pickup(state, &primary) {
        events.push(GameEvent::PowerupCollected {
            powerup: taken,
            collector,
        });
    }
    if let Some(scorer) = physics::goal_scored(&state.ball) {
        state.score.award(scorer);
        events.push(GameEvent::Scored {
            scorer,
            score: state.score,
        });
        if let Some(result) = determine_result(state) {
            return StepOutcome::Finished(result);
        }
        state.reset_ball(rng);
    }

    // Extra balls; any spawned during this loop move from the next step
    let mut gone: SmallVec<[usize; 4]> = SmallVec::new();
    let count = state.extra_balls.len();
    for i in 0..count {
        let mut ball = state.extra_balls[i];
        physics::integrate(&mut ball, dt);
        physics::reflect_walls(&mut ball);
        if let Some(slot) = physics::extra_paddle_contact(&ball, &state.paddles) {
            physics::bounce_extra(&mut ball, slot);
        }
        state.extra_balls[i] = ball;

        if let Some((taken, collector)) = powerup::try_pickup(state, &ball) {
            events.push(GameEvent::PowerupCollected {
                powerup: taken,
                collector,
            });
        }
        if ball.out_of_play() {
            gone.push(i);
        }
    }
    for i in gone.into_iter().rev() {
        state.extra_balls.remove(i);
    }

    StepOutcome::Continue
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::constants::{ball, field};
    use crate::game::state::{Ball, PowerupKind};
    use crate::util::vec2::Vec2;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const DT: f32 = 1.0 / 60.0;

    fn playing_state(rng: &mut StdRng) -> GameState {
        let mut state = GameState::new();
        state.reset_ball(rng);
        state.schedule_next_powerup(rng);
        state
    }

    #[test]
    fn test_step_integrates_midfield() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut state = playing_state(&mut rng);
        state.ball = Ball::new(Vec2::new(640.0, 360.0), Vec2::new(300.0, 150.0));
        let mut events = Vec::new();

        let outcome = step(&mut state, DT, &mut rng, &mut events);

        assert_eq!(outcome, StepOutcome::Continue);
        assert!(state.ball.position.approx_eq(Vec2::new(645.0, 362.5), 1e-3));
        assert!(events.is_empty());
    }

    #[test]
    fn test_score_resets_ball() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut state = playing_state(&mut rng);
        state.ball = Ball::new(Vec2::new(-15.0, 100.0), Vec2::new(-400.0, 0.0));
        state.extra_balls.push(Ball::centered());
        let mut events = Vec::new();

        let outcome = step(&mut state, DT, &mut rng, &mut events);

        assert_eq!(outcome, StepOutcome::Continue);
        assert_eq!(
            events,
            vec![GameEvent::Scored {
                scorer: Slot::Two,
                score: Score { p1: 0, p2: 1 },
            }]
        );
        assert_eq!(state.ball.position, Vec2::new(field::CENTER_X, field::CENTER_Y));
        assert_eq!(state.ball_speed, ball::INITIAL_SPEED);
        assert!(state.extra_balls.is_empty());
    }

    #[test]
    fn test_winning_point_finishes() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut state = playing_state(&mut rng);
        state.score = Score { p1: 0, p2: 4 };
        state.ball = Ball::new(Vec2::new(-15.0, 100.0), Vec2::new(-400.0, 0.0));
        let mut events = Vec::new();

        let outcome = step(&mut state, DT, &mut rng, &mut events);

        match outcome {
            StepOutcome::Finished(result) => {
                assert_eq!(result.winner, Slot::Two);
                assert_eq!(result.score, Score { p1: 0, p2: 5 });
            }
            StepOutcome::Continue => panic!("match should have finished"),
        }
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_score_never_decreases() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut state = playing_state(&mut rng);
        let mut events = Vec::new();
        let mut last = state.score.total();

        // Paddles parked at the top so most balls get through
        state.set_paddle_y(Slot::One, 0.0);
        state.set_paddle_y(Slot::Two, 0.0);

        for _ in 0..60 * 120 {
            let outcome = step(&mut state, DT, &mut rng, &mut events);
            assert!(state.score.total() >= last);
            last = state.score.total();
            if matches!(outcome, StepOutcome::Finished(_)) {
                break;
            }
        }
        assert!(last > 0);
    }

    #[test]
    fn test_multi_ball_extra_ball_removed_without_score() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut state = playing_state(&mut rng);
        state.next_powerup_at = f32::MAX;
        state.ball = Ball::new(Vec2::new(600.0, 300.0), Vec2::new(300.0, 120.0));
        state.powerup = Some(Powerup {
            id: state.alloc_powerup_id(),
            position: Vec2::new(610.0, 302.0),
            kind: PowerupKind::MultiBall,
        });
        let mut events = Vec::new();

        step(&mut state, DT, &mut rng, &mut events);

        assert_eq!(state.extra_balls.len(), 1);
        let extra = state.extra_balls[0];
        assert!(extra.velocity.approx_eq(Vec2::new(-240.0, -144.0), 1e-3));
        match events[0] {
            GameEvent::PowerupCollected { powerup, collector } => {
                assert_eq!(powerup.kind, PowerupKind::MultiBall);
                assert_eq!(collector, Slot::One);
            }
            other => panic!("unexpected event {other:?}"),
        }

        // Send the extra ball out past the left wall, clear of the paddle
        state.extra_balls[0] = Ball::new(Vec2::new(-19.0, 50.0), Vec2::new(-300.0, 0.0));
        state.ball = Ball::new(Vec2::new(640.0, 360.0), Vec2::new(100.0, 0.0));
        events.clear();

        step(&mut state, DT, &mut rng, &mut events);

        assert!(state.extra_balls.is_empty());
        assert_eq!(state.score, Score::default());
        assert!(events.is_empty());
    }

    #[test]
    fn test_extra_ball_saved_behind_paddle() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut state = playing_state(&mut rng);
        state.next_powerup_at = f32::MAX;
        state.ball = Ball::new(Vec2::new(640.0, 600.0), Vec2::new(100.0, 0.0));
        state.extra_balls.push(Ball::new(Vec2::new(15.0, 360.0), Vec2::new(-300.0, 0.0)));
        let mut events = Vec::new();

        step(&mut state, DT, &mut rng, &mut events);

        assert_eq!(state.extra_balls.len(), 1);
        assert_eq!(state.extra_balls[0].position.x, 60.0);
        assert_eq!(state.extra_balls[0].velocity, Vec2::new(300.0, 0.0));
    }

    #[test]
    fn test_extra_ball_pickup_credits_its_direction() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut state = playing_state(&mut rng);
        state.next_powerup_at = f32::MAX;
        state.ball = Ball::new(Vec2::new(640.0, 600.0), Vec2::new(300.0, 0.0));
        state.extra_balls.push(Ball::new(Vec2::new(400.0, 200.0), Vec2::new(-300.0, 0.0)));
        state.powerup = Some(Powerup {
            id: state.alloc_powerup_id(),
            position: Vec2::new(395.0, 200.0),
            kind: PowerupKind::PaddleGrow,
        });
        let mut events = Vec::new();

        step(&mut state, DT, &mut rng, &mut events);

        assert_eq!(state.paddle(Slot::Two).height, 180.0);
        assert!(matches!(
            events[0],
            GameEvent::PowerupCollected {
                collector: Slot::Two,
                ..
            }
        ));
    }

    #[test]
    fn test_spawn_event_emitted() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut state = playing_state(&mut rng);
        state.ball = Ball::new(Vec2::new(640.0, 700.0), Vec2::new(10.0, 0.0));
        state.clock = state.next_powerup_at;
        let mut events = Vec::new();

        step(&mut state, DT, &mut rng, &mut events);

        assert!(matches!(events[0], GameEvent::PowerupSpawned(_)));
        assert!(state.powerup.is_some());
    }

    #[test]
    fn test_at_most_one_powerup_over_long_run() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut state = playing_state(&mut rng);
        let mut events = Vec::new();
        for _ in 0..60 * 180 {
            if let StepOutcome::Finished(_) = step(&mut state, DT, &mut rng, &mut events) {
                break;
            }
            let on_field = usize::from(state.powerup.is_some());
            assert!(on_field <= 1);
        }
    }
}
