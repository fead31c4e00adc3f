//! Service layer error types

use thiserror::Error;

use crate::ports::outbound::GatewayError;

/// Errors surfaced by application services with a caller that can act on
/// them (e.g. an explicit reachable-set refresh). The movement pipeline
/// itself converts failures into log entries and `error:occurred` events
/// instead of returning them.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Operation needs an id the session does not have.
    #[error("no {0} id in the current combat session")]
    MissingId(&'static str),
}

/// Default gateway round-trip timeout in milliseconds.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Get the request timeout from environment variable or use default.
pub fn get_request_timeout_ms() -> u64 {
    std::env::var("SKIRMISH_REQUEST_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS)
}
