//! Application-layer types for the movement pipeline
//!
//! Local representations of wire data, with `From` conversions at the
//! adapter boundary, plus the outcome type `request_move` reports back to
//! the UI layer.

use skirmish_protocol::{Position, ReactionEntryData, ReactionKind};

/// One triggered reaction, normalized from either wire shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ReactionEntry {
    /// Combatant making the reaction. Entries without one are skipped.
    pub attacker_id: Option<String>,
    /// Combatant whose action triggered the reaction; defaults to the mover.
    pub trigger_target_id: Option<String>,
    pub kind: ReactionKind,
}

impl From<ReactionEntryData> for ReactionEntry {
    fn from(data: ReactionEntryData) -> Self {
        match data {
            ReactionEntryData::Id(id) => Self {
                attacker_id: (!id.is_empty()).then_some(id),
                trigger_target_id: None,
                kind: ReactionKind::OpportunityAttack,
            },
            ReactionEntryData::Entry {
                attacker_id,
                trigger_target_id,
                kind,
            } => Self {
                attacker_id: attacker_id.filter(|id| !id.is_empty()),
                trigger_target_id,
                kind,
            },
        }
    }
}

/// Why a `request_move` call was ignored without touching the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Not the acting player's turn.
    NotYourTurn,
    /// A targeting mode is active; clicks are target picks, not moves.
    Targeting,
    /// Another move sequence is in flight.
    MoveInFlight,
    /// Movement mode was never armed; the click is not a move.
    MovementModeOff,
    /// Target cell is not in the current reachable set.
    Unreachable,
    /// No active combatant or combat session to move in.
    NoActiveCombat,
}

/// Result of one `request_move` invocation.
///
/// Failures are reported here (and as log entries / error events), never
/// raised to the caller as `Err` - the UI layer has nothing to catch.
#[derive(Debug, Clone, PartialEq)]
pub enum MoveOutcome {
    /// The move committed; all triggered reactions were attempted.
    Moved {
        from: Position,
        to: Position,
        reactions_attempted: usize,
    },
    /// The click selected the combatant occupying the cell instead.
    Selected { combatant_id: String },
    /// Preconditions failed; nothing happened.
    Ignored(IgnoreReason),
    /// The gateway failed or the server rejected the move.
    Failed { message: String },
}
