//! Match end detection and final result
//!
//! A match ends as soon as either side reaches the winning score.

use crate::game::constants::rules::WINNING_SCORE;
use crate::game::state::{GameState, Score, Slot};

/// Final result of a completed match
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult {
    pub winner: Slot,
    pub score: Score,
    /// Simulated seconds of play
    pub duration: f32,
}

/// Winner, if the score has reached the winning threshold
pub fn check_match_end(score: &Score) -> Option<Slot> {
    if score.p1 >= WINNING_SCORE {
        Some(Slot::One)
    } else if score.p2 >= WINNING_SCORE {
        Some(Slot::Two)
    } else {
        None
    }
}

/// Build the final result for a finished match
pub fn determine_result(state: &GameState) -> Option<MatchResult> {
    check_match_end(&state.score).map(|winner| MatchResult {
        winner,
        score: state.score,
        duration: state.clock,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_winner_below_threshold() {
        let score = Score { p1: 4, p2: 4 };
        assert_eq!(check_match_end(&score), None);
    }

    #[test]
    fn test_winner_at_threshold() {
        assert_eq!(check_match_end(&Score { p1: 5, p2: 3 }), Some(Slot::One));
        assert_eq!(check_match_end(&Score { p1: 0, p2: 5 }), Some(Slot::Two));
    }

    #[test]
    fn test_determine_result() {
        let mut state = GameState::new();
        state.score = Score { p1: 2, p2: 5 };
        state.clock = 93.5;

        let result = determine_result(&state).unwrap();
        assert_eq!(result.winner, Slot::Two);
        assert_eq!(result.score, Score { p1: 2, p2: 5 });
        assert_eq!(result.duration, 93.5);
    }

    #[test]
    fn test_determine_result_in_progress() {
        let state = GameState::new();
        assert!(determine_result(&state).is_none());
    }
}
