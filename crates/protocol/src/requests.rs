//! Request body types for the combat API.
//!
//! Each struct is the JSON body of one REST operation. Identifiers that are
//! part of the resource path (combat id, combatant id) do not appear here.

use serde::{Deserialize, Serialize};

/// Body of `POST /combats/{combat_id}/combatants/{combatant_id}/move`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveCombatantRequest {
    pub x: i32,
    pub y: i32,
}

/// Body of `POST /combats/{combat_id}/combatants/{reactor_id}/reaction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UseReactionRequest {
    /// Wire identifier of the reaction kind (e.g. `"opportunity_attack"`).
    pub reaction_type: String,
    /// Combatant whose action triggered the reaction.
    pub trigger_source_id: String,
}
