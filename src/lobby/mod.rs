//! Matchmaking and room management
//!
//! The lobby task pairs queued participants into rooms; each room then runs
//! on its own task until it finishes or a participant leaves.

pub mod manager;
pub mod participant;
pub mod queue;
pub mod registry;
pub mod room;
pub mod room_runner;
