//! Composition root for the player client.
//!
//! Builds the event channel, shared state, gateway adapter, presenter, and
//! movement pipeline, wired together the one way production uses them. Tests
//! and embedders that need different wiring construct the pieces directly.

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::application::config::AnimationTimings;
use crate::application::error::get_request_timeout_ms;
use crate::application::services::MovementService;
use crate::infrastructure::http::CombatApiClient;
use crate::infrastructure::messaging::EventChannel;
use crate::ports::outbound::PresentationSink;
use crate::presentation::{RollPresenter, RollPresenterSink, RollSurface};
use crate::state::SharedCombatState;

/// Default combat API base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:3000/api/";

/// Client configuration, resolved from the environment.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base: Url,
    pub timings: AnimationTimings,
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Read configuration from `SKIRMISH_*` environment variables, falling
    /// back to defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        let raw = std::env::var("SKIRMISH_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let api_base = Url::parse(&raw)?;
        Ok(Self {
            api_base,
            timings: AnimationTimings::default(),
            request_timeout: Duration::from_millis(get_request_timeout_ms()),
        })
    }
}

/// The wired-up client: every piece a UI shell needs to drive a combat.
pub struct Client {
    pub channel: EventChannel,
    pub state: SharedCombatState,
    pub presenter: RollPresenter,
    pub movement: Arc<MovementService>,
}

/// Wire the pipeline against the HTTP gateway and the given roll surface.
pub fn build(config: &ClientConfig, surface: Arc<dyn RollSurface>) -> Client {
    let channel = EventChannel::new();
    let state = SharedCombatState::new();
    let gateway = Arc::new(CombatApiClient::new(config.api_base.clone()));
    let presenter = RollPresenter::new(surface, config.timings.clone());
    let sink: Arc<dyn PresentationSink> = Arc::new(RollPresenterSink::new(
        presenter.clone(),
        config.timings.clone(),
    ));

    let movement = Arc::new(
        MovementService::new(gateway, state.clone(), channel.clone(), sink)
            .with_request_timeout(config.request_timeout),
    );

    Client {
        channel,
        state,
        presenter,
        movement,
    }
}

/// Install the default tracing subscriber (`RUST_LOG`-style filtering).
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
