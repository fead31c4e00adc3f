//! Ports - trait boundaries of the player client

pub mod outbound;
