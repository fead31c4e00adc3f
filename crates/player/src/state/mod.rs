//! Shared client-side state

pub mod combat_state;

pub use combat_state::{Combatant, CombatLogEntry, LogKind, SharedCombatState};
