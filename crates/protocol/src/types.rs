//! Shared value objects used across requests and responses.

use serde::{Deserialize, Serialize};

// =============================================================================
// Grid Types
// =============================================================================

/// Integer grid coordinates on the combat map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Chebyshev distance: the number of king-move steps between two cells.
    pub fn steps_to(&self, other: Position) -> u32 {
        let dx = (other.x - self.x).unsigned_abs();
        let dy = (other.y - self.y).unsigned_abs();
        dx.max(dy)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// =============================================================================
// Reaction Types
// =============================================================================

/// Kind of reaction a combatant can take in response to another's action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReactionKind {
    #[default]
    OpportunityAttack,
    /// Unknown reaction kind (for forward compatibility)
    #[serde(other)]
    Unknown,
}

impl ReactionKind {
    /// Wire identifier sent back to the server when using the reaction.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpportunityAttack => "opportunity_attack",
            Self::Unknown => "unknown",
        }
    }
}

// =============================================================================
// Roll Breakdown Types
// =============================================================================

/// Whether a d20 roll was made with advantage, disadvantage, or neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AdvantageState {
    #[default]
    Normal,
    Advantage,
    Disadvantage,
    /// Unknown state (for forward compatibility)
    #[serde(other)]
    Unknown,
}

/// Breakdown of a single attack roll, as computed by the server.
///
/// All fields beyond the total are presentation detail and may be absent;
/// consumers must degrade gracefully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AttackRollData {
    /// Final roll total (die + modifier), authoritative.
    pub total: i32,
    /// Face value of the die that was kept.
    #[serde(default)]
    pub die: Option<i32>,
    /// Number of sides on the attack die (d20 unless stated otherwise).
    #[serde(default)]
    pub die_size: Option<u32>,
    /// Flat modifier added to the die.
    #[serde(default)]
    pub modifier: Option<i32>,
    /// Both raw die values when rolled with advantage or disadvantage.
    #[serde(default)]
    pub rolls: Vec<i32>,
    #[serde(default)]
    pub advantage: AdvantageState,
    /// Natural-20 critical hit.
    #[serde(default)]
    pub critical: bool,
}

/// Breakdown of a damage roll, as computed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DamageRollData {
    /// Authoritative damage total.
    pub total: i32,
    /// Individual die results.
    #[serde(default)]
    pub dice: Vec<i32>,
    /// Number of sides on the damage dice.
    #[serde(default)]
    pub die_size: Option<u32>,
    #[serde(default)]
    pub modifier: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_to_is_chebyshev() {
        let a = Position::new(2, 2);
        assert_eq!(a.steps_to(Position::new(2, 3)), 1);
        assert_eq!(a.steps_to(Position::new(5, 4)), 3);
        assert_eq!(a.steps_to(Position::new(-1, 2)), 3);
        assert_eq!(a.steps_to(a), 0);
    }

    #[test]
    fn unknown_reaction_kind_deserializes() {
        let kind: ReactionKind = serde_json::from_str("\"shield_parry\"").expect("valid json");
        assert_eq!(kind, ReactionKind::Unknown);
    }

    #[test]
    fn attack_roll_defaults_optional_fields() {
        let roll: AttackRollData = serde_json::from_str("{\"total\": 17}").expect("valid json");
        assert_eq!(roll.total, 17);
        assert_eq!(roll.die, None);
        assert_eq!(roll.advantage, AdvantageState::Normal);
        assert!(!roll.critical);
    }
}
