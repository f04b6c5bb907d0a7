//! Pong Arena Server Library
//!
//! An authoritative two-player paddle-and-ball match server using
//! WebTransport. Participants queue, get paired into rooms, and receive the
//! simulated state at a fixed tick rate.

pub mod config;
pub mod game;
pub mod lobby;
pub mod metrics;
pub mod net;
pub mod util;
