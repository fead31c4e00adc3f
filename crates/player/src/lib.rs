//! Skirmish Player - client-side turn-action resolution pipeline
//!
//! The client half of a turn-based tactical combat game, reduced to the part
//! with real orchestration: taking a movement intent, round-tripping it
//! through the authoritative combat server, animating the result, and
//! resolving triggered reactions one at a time - with strict ordering and a
//! guarantee that no two move sequences are ever in flight at once.
//!
//! Layers:
//! - `ports`: trait boundaries (combat gateway, presentation sink) and the
//!   events the pipeline broadcasts
//! - `state`: the shared combat state collaborators read
//! - `infrastructure`: the event channel and the reqwest gateway adapter
//! - `application`: the movement/reaction orchestrator and its config
//! - `presentation`: the dice roll presenter
//! - `runner`: composition root

pub mod application;
pub mod infrastructure;
pub mod ports;
pub mod presentation;
pub mod runner;
pub mod state;

pub use application::config::AnimationTimings;
pub use application::dto::{IgnoreReason, MoveOutcome, ReactionEntry};
pub use application::services::{MovePhase, MovementService};
pub use infrastructure::http::CombatApiClient;
pub use infrastructure::messaging::{EventChannel, Subscription};
pub use ports::outbound::{
    topics, ClientEvent, CombatGatewayPort, GatewayError, MoveAnimation, PresentationSink,
    ReactionAnimation,
};
pub use presentation::{RollPresenter, RollPresenterSink, RollSurface};
pub use runner::{build, Client, ClientConfig};
pub use state::{Combatant, CombatLogEntry, LogKind, SharedCombatState};
