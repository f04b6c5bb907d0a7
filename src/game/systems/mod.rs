pub mod physics;
pub mod powerup;
