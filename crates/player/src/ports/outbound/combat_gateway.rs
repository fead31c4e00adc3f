//! Combat Gateway Port - the remote combat server's API surface
//!
//! The authoritative rules engine lives server-side; the client only ever
//! talks to it through this trait. Concrete transports (the reqwest adapter,
//! test mocks) implement it.

use async_trait::async_trait;
use thiserror::Error;

use skirmish_protocol::{MoveResponse, ReachableCellsResponse, ReactionKind, ReactionResponse};

/// Transport-level failures reaching the combat server.
///
/// Server-side rejections of well-formed operations are not errors; they
/// arrive as `success: false` in the response body.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Connection-level failure (DNS, refused, dropped mid-body).
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-2xx HTTP response.
    #[error("server returned {status}: {message}")]
    Http { status: u16, message: String },

    /// 2xx response whose body did not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The round trip exceeded the configured deadline.
    #[error("request timed out after {millis}ms")]
    Timeout { millis: u64 },
}

/// Port for the remote combat server operations the pipeline consumes.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CombatGatewayPort: Send + Sync {
    /// Fetch the set of cells the combatant may move to this turn.
    async fn get_reachable_cells(
        &self,
        combat_id: &str,
        combatant_id: &str,
    ) -> Result<ReachableCellsResponse, GatewayError>;

    /// Request a move to the given cell. The server owns legality and cost;
    /// the response reports the spent distance and any triggered reactions.
    async fn move_combatant(
        &self,
        combat_id: &str,
        combatant_id: &str,
        x: i32,
        y: i32,
    ) -> Result<MoveResponse, GatewayError>;

    /// Resolve one reaction (e.g. an opportunity attack) against the
    /// combatant whose action triggered it.
    async fn use_reaction(
        &self,
        combat_id: &str,
        reactor_id: &str,
        reaction: ReactionKind,
        trigger_source_id: &str,
    ) -> Result<ReactionResponse, GatewayError>;
}
