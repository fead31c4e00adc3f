//! Presentation Port - the pipeline's view of the animation layer
//!
//! The orchestrator never touches rendering. It awaits these two calls at
//! its animation suspension points; a concrete sink decides what "animate"
//! means (drive the dice presenter, sleep out the configured durations, or
//! return immediately in tests).

use async_trait::async_trait;

use skirmish_protocol::{AttackRollData, DamageRollData, Position};

/// A confirmed move about to be animated.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveAnimation {
    pub combatant_id: String,
    pub from: Position,
    pub to: Position,
    /// Cosmetic path, used only for animation pacing.
    pub path: Vec<Position>,
}

/// A resolved reaction to be presented before the pipeline continues.
#[derive(Debug, Clone, PartialEq)]
pub struct ReactionAnimation {
    pub attacker_id: String,
    pub attacker_name: String,
    pub target_id: String,
    pub hit: bool,
    pub damage: i32,
    pub description: String,
    pub attack_roll: Option<AttackRollData>,
    pub damage_roll: Option<DamageRollData>,
}

/// Sink the orchestrator drives at its animation points.
///
/// Calls are awaited: the pipeline does not advance until the sink returns.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PresentationSink: Send + Sync {
    /// Let the move animation visually catch up to the committed state.
    async fn move_animated(&self, animation: MoveAnimation);

    /// Present one resolved reaction (dice roll, result) before the next
    /// reaction is attempted.
    async fn reaction_animated(&self, animation: ReactionAnimation);
}
