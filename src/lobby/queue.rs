//! First-come-first-served match queue
//!
//! Participants are paired strictly in arrival order. A pair that cannot be
//! placed goes back to the head of the queue.

use std::collections::VecDeque;

use crate::lobby::participant::ParticipantId;

#[derive(Debug, Default)]
pub struct MatchQueue {
    waiting: VecDeque<ParticipantId>,
}

impl MatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the back; returns false if already queued
    pub fn enqueue(&mut self, id: ParticipantId) -> bool {
        if self.contains(id) {
            return false;
        }
        self.waiting.push_back(id);
        true
    }

    pub fn remove(&mut self, id: ParticipantId) -> bool {
        match self.waiting.iter().position(|queued| *queued == id) {
            Some(index) => {
                self.waiting.remove(index);
                true
            }
            None => false,
        }
    }

    /// The two longest-waiting participants, in arrival order
    pub fn pop_pair(&mut self) -> Option<(ParticipantId, ParticipantId)> {
        if self.waiting.len() < 2 {
            return None;
        }
        let first = self.waiting.pop_front()?;
        let second = self.waiting.pop_front()?;
        Some((first, second))
    }

    /// Put a pair back at the head, keeping their order
    pub fn push_front_pair(&mut self, first: ParticipantId, second: ParticipantId) {
        self.waiting.push_front(second);
        self.waiting.push_front(first);
    }

    pub fn contains(&self, id: ParticipantId) -> bool {
        self.waiting.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.waiting.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }
}
