//! Response types returned by the combat API.

use serde::{Deserialize, Serialize};

use crate::types::{AttackRollData, DamageRollData, Position, ReactionKind};

// =============================================================================
// Movement
// =============================================================================

/// Response of the reachable-cells query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ReachableCellsResponse {
    /// Cells the combatant may move to with its remaining movement budget.
    #[serde(default)]
    pub reachable: Vec<Position>,
}

/// Response of the move operation.
///
/// `success: false` is a server-side rejection of a well-formed request
/// (e.g. a cell that became illegal between refresh and click); transport
/// and HTTP errors never produce this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveResponse {
    pub success: bool,
    /// Distance actually spent, in movement units (not cells).
    #[serde(default)]
    pub distance: Option<u32>,
    /// Human-readable narration or rejection reason.
    #[serde(default)]
    pub description: Option<String>,
    /// Reactions triggered by this move, in resolution order.
    #[serde(default)]
    pub opportunity_attacks: Vec<ReactionEntryData>,
}

/// One triggered reaction as it appears on the wire.
///
/// Older servers send a bare attacker id string; newer ones send a
/// structured entry. Both deserialize into this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReactionEntryData {
    Id(String),
    Entry {
        #[serde(default)]
        attacker_id: Option<String>,
        #[serde(default)]
        trigger_target_id: Option<String>,
        #[serde(default)]
        kind: ReactionKind,
    },
}

// =============================================================================
// Reactions
// =============================================================================

/// Response of the use-reaction operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionResponse {
    pub success: bool,
    /// Damage dealt by the reaction; zero or absent on a miss.
    #[serde(default)]
    pub damage_dealt: Option<i32>,
    /// Human-readable narration of the outcome.
    #[serde(default)]
    pub description: Option<String>,
    /// Attack roll breakdown for presentation; optional.
    #[serde(default)]
    pub attack_roll: Option<AttackRollData>,
    /// Damage roll breakdown for presentation; optional.
    #[serde(default)]
    pub damage_roll: Option<DamageRollData>,
    /// Partial combat-state update to merge into the client's copy.
    #[serde(default)]
    pub combat_state: Option<CombatStateDelta>,
}

/// Partial combat state returned alongside a resolved reaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CombatStateDelta {
    #[serde(default)]
    pub combatants: Vec<CombatantStateData>,
}

/// Per-combatant fields the server may update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatantStateData {
    pub id: String,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub hp: Option<i32>,
    #[serde(default)]
    pub movement_remaining: Option<u32>,
}

// =============================================================================
// Errors
// =============================================================================

/// Body the server attaches to non-2xx responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_response_accepts_bare_id_reactions() {
        let json = r#"{
            "success": true,
            "distance": 5,
            "opportunity_attacks": ["goblin-1", {"attacker_id": "orc-2", "kind": "opportunity_attack"}]
        }"#;
        let resp: MoveResponse = serde_json::from_str(json).expect("valid json");
        assert!(resp.success);
        assert_eq!(resp.distance, Some(5));
        assert_eq!(resp.opportunity_attacks.len(), 2);
        assert_eq!(
            resp.opportunity_attacks[0],
            ReactionEntryData::Id("goblin-1".to_string())
        );
    }

    #[test]
    fn reaction_response_minimal_body() {
        let resp: ReactionResponse =
            serde_json::from_str(r#"{"success": true}"#).expect("valid json");
        assert!(resp.success);
        assert_eq!(resp.damage_dealt, None);
        assert!(resp.combat_state.is_none());
    }

    #[test]
    fn reaction_entry_without_attacker_id() {
        let entry: ReactionEntryData =
            serde_json::from_str(r#"{"trigger_target_id": "pc-1"}"#).expect("valid json");
        match entry {
            ReactionEntryData::Entry { attacker_id, .. } => assert!(attacker_id.is_none()),
            ReactionEntryData::Id(_) => panic!("expected structured entry"),
        }
    }
}
