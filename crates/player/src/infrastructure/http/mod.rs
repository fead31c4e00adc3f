//! HTTP infrastructure

pub mod combat_api;

pub use combat_api::CombatApiClient;
