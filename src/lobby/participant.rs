//! Connected participants and where each one is
//!
//! Only participants announced by a connection exist here; lookups for
//! anyone else are no-ops.

use hashbrown::HashMap;
use uuid::Uuid;

use crate::game::state::Slot;
use crate::lobby::room::RoomId;

/// Identifier for one connected client
pub type ParticipantId = Uuid;

/// Where a participant currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantState {
    /// Connected, not queued, not playing
    Idle,
    /// Waiting in the match queue
    Queued,
    /// Assigned to a room
    InRoom { room_id: RoomId, slot: Slot },
}

/// A connected client as seen by the lobby
#[derive(Debug, Clone)]
pub struct Participant {
    pub id: ParticipantId,
    pub state: ParticipantState,
}

impl Participant {
    pub fn new(id: ParticipantId) -> Self {
        Self {
            id,
            state: ParticipantState::Idle,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state == ParticipantState::Idle
    }

    pub fn room(&self) -> Option<(RoomId, Slot)> {
        match self.state {
            ParticipantState::InRoom { room_id, slot } => Some((room_id, slot)),
            ParticipantState::Idle | ParticipantState::Queued => None,
        }
    }
}

/// Every participant known to the lobby
/// A participant is in at most one of: idle, the queue, a room.
#[derive(Debug, Default)]
pub struct ParticipantDirectory {
    participants: HashMap<ParticipantId, Participant>,
}

impl ParticipantDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a participant; returns false if already present
    pub fn insert(&mut self, id: ParticipantId) -> bool {
        if self.participants.contains_key(&id) {
            return false;
        }
        self.participants.insert(id, Participant::new(id));
        true
    }

    pub fn get_mut(&mut self, id: ParticipantId) -> Option<&mut Participant> {
        self.participants.get_mut(&id)
    }

    pub fn get(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.get(&id)
    }

    pub fn remove(&mut self, id: ParticipantId) -> Option<Participant> {
        self.participants.remove(&id)
    }

    pub fn set_state(&mut self, id: ParticipantId, state: ParticipantState) {
        if let Some(p) = self.participants.get_mut(&id) {
            p.state = state;
        }
    }

    /// Return a participant to idle if they are still in `room_id`
    pub fn release_from_room(&mut self, id: ParticipantId, room_id: RoomId) {
        if let Some(p) = self.participants.get_mut(&id) {
            if matches!(p.room(), Some((current, _)) if current == room_id) {
                p.state = ParticipantState::Idle;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_participant_is_idle() {
        let p = Participant::new(Uuid::new_v4());
        assert!(p.is_idle());
        assert_eq!(p.room(), None);
    }

    #[test]
    fn test_insert_once() {
        let mut dir = ParticipantDirectory::new();
        let id = Uuid::new_v4();
        assert!(dir.insert(id));
        assert!(!dir.insert(id));
        assert_eq!(dir.len(), 1);
    }

    #[test]
    fn test_room_assignment_and_release() {
        let mut dir = ParticipantDirectory::new();
        let id = Uuid::new_v4();
        dir.insert(id);
        dir.set_state(id, ParticipantState::InRoom { room_id: 4, slot: Slot::Two });
        assert_eq!(dir.get(id).unwrap().room(), Some((4, Slot::Two)));

        // Releasing from a different room leaves the assignment alone
        dir.release_from_room(id, 9);
        assert!(!dir.get(id).unwrap().is_idle());

        dir.release_from_room(id, 4);
        assert!(dir.get(id).unwrap().is_idle());
    }

    #[test]
    fn test_get_mut_only_known() {
        let mut dir = ParticipantDirectory::new();
        let id = Uuid::new_v4();
        assert!(dir.get_mut(id).is_none());
        assert!(dir.is_empty());

        dir.insert(id);
        if let Some(p) = dir.get_mut(id) {
            p.state = ParticipantState::Queued;
        }
        assert_eq!(dir.get(id).unwrap().state, ParticipantState::Queued);
        assert!(dir.remove(id).is_some());
        assert!(dir.is_empty());
    }
}
