//! Live room handles
//!
//! Room ids count up from 1 and are not reused. Insertion fails once the
//! configured room limit is reached.

use hashbrown::HashMap;

use crate::lobby::room::RoomId;
use crate::lobby::room_runner::RoomHandle;

/// Live rooms, keyed by id
pub struct RoomRegistry {
    rooms: HashMap<RoomId, RoomHandle>,
    next_id: RoomId,
    max_rooms: usize,
}

impl RoomRegistry {
    pub fn new(max_rooms: usize) -> Self {
        Self {
            rooms: HashMap::new(),
            next_id: 1,
            max_rooms,
        }
    }

    /// Ids are never reused within a process
    pub fn allocate_id(&mut self) -> RoomId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn has_capacity(&self) -> bool {
        self.rooms.len() < self.max_rooms
    }

    pub fn insert(&mut self, handle: RoomHandle) -> Result<(), RegistryError> {
        if !self.has_capacity() {
            return Err(RegistryError::AtCapacity(self.max_rooms));
        }
        if self.rooms.contains_key(&handle.id()) {
            return Err(RegistryError::DuplicateRoom(handle.id()));
        }
        self.rooms.insert(handle.id(), handle);
        Ok(())
    }

    pub fn get(&self, id: RoomId) -> Option<&RoomHandle> {
        self.rooms.get(&id)
    }

    pub fn remove(&mut self, id: RoomId) -> Option<RoomHandle> {
        self.rooms.remove(&id)
    }

    /// Remove every room, leaving the registry empty
    pub fn drain(&mut self) -> impl Iterator<Item = RoomHandle> + '_ {
        self.rooms.drain().map(|(_, handle)| handle)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Room limit reached ({0})")]
    AtCapacity(usize),
    #[error("Room {0} already registered")]
    DuplicateRoom(RoomId),
}
