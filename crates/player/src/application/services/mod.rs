//! Application services

pub mod movement_service;

pub use movement_service::{MovePhase, MovementService};
