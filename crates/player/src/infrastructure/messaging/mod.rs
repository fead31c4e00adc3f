//! Messaging infrastructure
//!
//! The EventChannel decouples the turn-action pipeline from the collaborators
//! that react to it (audio, notifications, the combat log pane).

pub mod event_channel;

pub use event_channel::{EventChannel, Subscription};
