//! Outbound ports - interfaces the client consumes
//!
//! Traits and event types at the boundary between the application layer and
//! the outside world (remote combat server, animation layer).

pub mod client_events;
pub mod combat_gateway;
pub mod presentation_port;

pub use client_events::{topics, ClientEvent};
pub use combat_gateway::{CombatGatewayPort, GatewayError};
pub use presentation_port::{MoveAnimation, PresentationSink, ReactionAnimation};

#[cfg(any(test, feature = "testing"))]
pub use combat_gateway::MockCombatGatewayPort;
#[cfg(any(test, feature = "testing"))]
pub use presentation_port::MockPresentationSink;
