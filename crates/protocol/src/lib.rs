//! Skirmish Protocol - Wire types for the combat API
//!
//! This crate contains the request and response shapes exchanged between the
//! player client and the authoritative combat server:
//! - Grid and roll value objects
//! - Request DTOs for movement and reaction operations
//! - Response DTOs, including the reaction entries a move can trigger
//!
//! # Design Principles
//!
//! 1. **Minimal dependencies** - Only serde and serde_json
//! 2. **No business logic** - Pure data types and serialization
//! 3. **Forward compatible** - Optional fields default, unknown enum values
//!    collapse into `Unknown` rather than failing deserialization

pub mod requests;
pub mod responses;
pub mod types;

pub use requests::{MoveCombatantRequest, UseReactionRequest};
pub use responses::{
    ApiErrorBody, CombatStateDelta, CombatantStateData, MoveResponse, ReachableCellsResponse,
    ReactionEntryData, ReactionResponse,
};
pub use types::{AdvantageState, AttackRollData, DamageRollData, Position, ReactionKind};
