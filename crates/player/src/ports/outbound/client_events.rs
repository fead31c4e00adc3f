//! Client Events - notifications broadcast by the turn-action pipeline
//!
//! These events are published through the EventChannel as the pipeline
//! progresses. They are coarse-grained, serializable, and consumed by
//! collaborators the pipeline never sees directly (audio, toasts, the grid
//! renderer, the combat log pane).

use serde::{Deserialize, Serialize};
use skirmish_protocol::Position;

/// Topic names events are published under.
///
/// Subscription is by topic; within one topic delivery follows subscription
/// order. No ordering is guaranteed across topics.
pub mod topics {
    pub const MOVEMENT_STARTED: &str = "movement:started";
    pub const MOVEMENT_COMPLETED: &str = "movement:completed";
    pub const OPPORTUNITY_ATTACK_RESOLVED: &str = "reaction:opportunityAttackResolved";
    pub const ERROR_OCCURRED: &str = "error:occurred";
    pub const COMBATANT_SELECTED: &str = "combatant:selected";
}

/// Events published through the EventChannel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// A confirmed move is about to animate. Published before the mover's
    /// position changes in shared state, so consumers still observe the
    /// `from` cell as current.
    MovementStarted {
        combatant_id: String,
        from: Position,
        to: Position,
        /// Cosmetic path the animation follows; never authoritative.
        path: Vec<Position>,
    },

    /// A move sequence finished, including all triggered reactions.
    MovementCompleted {
        combatant_id: String,
        from: Position,
        to: Position,
    },

    /// An opportunity attack against the mover was resolved.
    OpportunityAttackResolved {
        attacker_id: String,
        target_id: String,
        hit: bool,
        damage: i32,
        description: String,
    },

    /// Something in the pipeline failed; collaborators surface this to the
    /// player (toast, log highlight).
    ErrorOccurred { message: String },

    /// A click outside movement mode landed on an occupied cell and was
    /// reinterpreted as selecting that combatant.
    CombatantSelected { combatant_id: String },
}

impl ClientEvent {
    /// Topic this event is published under.
    pub fn topic(&self) -> &'static str {
        match self {
            Self::MovementStarted { .. } => topics::MOVEMENT_STARTED,
            Self::MovementCompleted { .. } => topics::MOVEMENT_COMPLETED,
            Self::OpportunityAttackResolved { .. } => topics::OPPORTUNITY_ATTACK_RESOLVED,
            Self::ErrorOccurred { .. } => topics::ERROR_OCCURRED,
            Self::CombatantSelected { .. } => topics::COMBATANT_SELECTED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_matches_variant() {
        let event = ClientEvent::ErrorOccurred {
            message: "boom".to_string(),
        };
        assert_eq!(event.topic(), topics::ERROR_OCCURRED);
    }

    #[test]
    fn events_round_trip_through_json() {
        let event = ClientEvent::MovementStarted {
            combatant_id: "pc-1".to_string(),
            from: Position::new(2, 2),
            to: Position::new(2, 3),
            path: vec![Position::new(2, 3)],
        };
        let json = serde_json::to_string(&event).expect("serializable");
        let back: ClientEvent = serde_json::from_str(&json).expect("deserializable");
        assert_eq!(back, event);
    }
}
