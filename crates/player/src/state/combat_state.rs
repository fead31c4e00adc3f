//! Shared Combat State - the client's copy of the combat session
//!
//! One store holds combatant positions, turn/mode flags, the reachable-cell
//! set, the cosmetic path preview, and the combat log. Many collaborators
//! read it; the movement pipeline is the only writer while a move is in
//! flight (the orchestrator's phase guard enforces that).
//!
//! Positions are never mutated optimistically - only after a confirmed
//! server response.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use skirmish_protocol::{CombatStateDelta, Position};

/// One combatant as the client knows it.
#[derive(Debug, Clone, PartialEq)]
pub struct Combatant {
    pub id: String,
    pub name: String,
    pub position: Position,
    pub hp: i32,
    /// Movement budget left this turn, in the server's movement units.
    pub movement_remaining: u32,
}

/// Classification of combat log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    Movement,
    Reaction,
    Error,
    Info,
}

/// One line of the combat log.
#[derive(Debug, Clone, PartialEq)]
pub struct CombatLogEntry {
    pub kind: LogKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct CombatStateInner {
    combat_id: Option<String>,
    combatants: HashMap<String, Combatant>,
    active_combatant_id: Option<String>,
    is_player_turn: bool,
    /// Movement mode must be armed deliberately; a bare click is a selection.
    movement_mode_armed: bool,
    /// While targeting a spell or attack, clicks are not moves.
    targeting_mode: bool,
    /// Last server answer; stale until refreshed after a move or turn start.
    reachable: Vec<Position>,
    path_preview: Vec<Position>,
    log: Vec<CombatLogEntry>,
}

/// Cloneable handle to the shared combat state.
#[derive(Clone, Default)]
pub struct SharedCombatState {
    inner: Arc<Mutex<CombatStateInner>>,
}

impl SharedCombatState {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CombatStateInner> {
        // A poisoned lock only means a reader panicked; the data is still
        // the last consistent write.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    // =========================================================================
    // Session
    // =========================================================================

    pub fn combat_id(&self) -> Option<String> {
        self.lock().combat_id.clone()
    }

    pub fn set_combat_id(&self, combat_id: Option<String>) {
        self.lock().combat_id = combat_id;
    }

    pub fn active_combatant_id(&self) -> Option<String> {
        self.lock().active_combatant_id.clone()
    }

    pub fn set_active_combatant(&self, combatant_id: Option<String>) {
        self.lock().active_combatant_id = combatant_id;
    }

    pub fn is_player_turn(&self) -> bool {
        self.lock().is_player_turn
    }

    pub fn set_player_turn(&self, is_player_turn: bool) {
        self.lock().is_player_turn = is_player_turn;
    }

    pub fn movement_mode_armed(&self) -> bool {
        self.lock().movement_mode_armed
    }

    pub fn arm_movement_mode(&self, armed: bool) {
        self.lock().movement_mode_armed = armed;
    }

    pub fn targeting_mode(&self) -> bool {
        self.lock().targeting_mode
    }

    pub fn set_targeting_mode(&self, targeting: bool) {
        self.lock().targeting_mode = targeting;
    }

    // =========================================================================
    // Combatants
    // =========================================================================

    pub fn upsert_combatant(&self, combatant: Combatant) {
        self.lock()
            .combatants
            .insert(combatant.id.clone(), combatant);
    }

    /// Load a server-provided roster, preserving the server's map keys.
    ///
    /// Some servers key the roster by display name rather than id; lookups
    /// tolerate that (see [`SharedCombatState::combatant`]).
    pub fn load_roster(&self, entries: Vec<(String, Combatant)>) {
        let mut inner = self.lock();
        inner.combatants.clear();
        inner.combatants.extend(entries);
    }

    /// Look up a combatant by id.
    ///
    /// Falls back to a linear scan over entries whose `id` field matches,
    /// which tolerates maps keyed inconsistently by the server (e.g. by
    /// display name).
    pub fn combatant(&self, combatant_id: &str) -> Option<Combatant> {
        let inner = self.lock();
        inner.combatants.get(combatant_id).cloned().or_else(|| {
            inner
                .combatants
                .values()
                .find(|c| c.id == combatant_id)
                .cloned()
        })
    }

    pub fn position_of(&self, combatant_id: &str) -> Option<Position> {
        self.combatant(combatant_id).map(|c| c.position)
    }

    /// Combatant standing on the given cell, if any.
    pub fn occupant_at(&self, cell: Position) -> Option<String> {
        self.lock()
            .combatants
            .values()
            .find(|c| c.position == cell)
            .map(|c| c.id.clone())
    }

    /// Commit a confirmed move: new position plus server-reported cost.
    pub fn apply_move(&self, combatant_id: &str, to: Position, distance_spent: u32) {
        let mut inner = self.lock();
        if let Some(combatant) = inner.combatants.get_mut(combatant_id) {
            combatant.position = to;
            combatant.movement_remaining =
                combatant.movement_remaining.saturating_sub(distance_spent);
        }
    }

    /// Merge a partial combat-state update returned by the server.
    pub fn apply_delta(&self, delta: &CombatStateDelta) {
        let mut inner = self.lock();
        for update in &delta.combatants {
            if let Some(combatant) = inner.combatants.get_mut(&update.id) {
                if let Some(position) = update.position {
                    combatant.position = position;
                }
                if let Some(hp) = update.hp {
                    combatant.hp = hp;
                }
                if let Some(movement) = update.movement_remaining {
                    combatant.movement_remaining = movement;
                }
            }
        }
    }

    // =========================================================================
    // Reachable cells & path preview
    // =========================================================================

    pub fn set_reachable(&self, cells: Vec<Position>) {
        self.lock().reachable = cells;
    }

    pub fn clear_reachable(&self) {
        self.lock().reachable.clear();
    }

    pub fn is_reachable(&self, cell: Position) -> bool {
        self.lock().reachable.contains(&cell)
    }

    pub fn reachable(&self) -> Vec<Position> {
        self.lock().reachable.clone()
    }

    pub fn set_path_preview(&self, path: Vec<Position>) {
        self.lock().path_preview = path;
    }

    pub fn clear_path_preview(&self) {
        self.lock().path_preview.clear();
    }

    pub fn path_preview(&self) -> Vec<Position> {
        self.lock().path_preview.clone()
    }

    // =========================================================================
    // Combat log
    // =========================================================================

    pub fn push_log(&self, kind: LogKind, message: impl Into<String>) {
        let entry = CombatLogEntry {
            kind,
            message: message.into(),
            timestamp: Utc::now(),
        };
        self.lock().log.push(entry);
    }

    pub fn log(&self) -> Vec<CombatLogEntry> {
        self.lock().log.clone()
    }
}
