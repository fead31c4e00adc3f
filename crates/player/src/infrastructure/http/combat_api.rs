//! HTTP adapter for the combat API.
//!
//! Implements the gateway port over a REST backend with reqwest. Every call
//! carries a fresh request id header so client and server logs can be
//! correlated.

use async_trait::async_trait;
use url::Url;

use skirmish_protocol::{
    ApiErrorBody, MoveCombatantRequest, MoveResponse, ReachableCellsResponse, ReactionKind,
    ReactionResponse, UseReactionRequest,
};

use crate::ports::outbound::{CombatGatewayPort, GatewayError};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Reqwest-backed combat API client.
#[derive(Clone)]
pub struct CombatApiClient {
    http: reqwest::Client,
    base: Url,
}

impl CombatApiClient {
    /// Create a client against the given API base URL.
    pub fn new(base: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            base,
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::Transport("API base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, GatewayError> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let response = request
            .header(REQUEST_ID_HEADER, &request_id)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body: ApiErrorBody = response.json().await.unwrap_or_default();
            let message = body
                .message
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
            tracing::warn!(%request_id, %status, %message, "combat API call failed");
            return Err(GatewayError::Http {
                status: status.as_u16(),
                message,
            });
        }

        tracing::debug!(%request_id, %status, "combat API call succeeded");
        response
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

#[async_trait]
impl CombatGatewayPort for CombatApiClient {
    async fn get_reachable_cells(
        &self,
        combat_id: &str,
        combatant_id: &str,
    ) -> Result<ReachableCellsResponse, GatewayError> {
        let url = self.endpoint(&["combats", combat_id, "combatants", combatant_id, "reachable"])?;
        self.execute(self.http.get(url)).await
    }

    async fn move_combatant(
        &self,
        combat_id: &str,
        combatant_id: &str,
        x: i32,
        y: i32,
    ) -> Result<MoveResponse, GatewayError> {
        let url = self.endpoint(&["combats", combat_id, "combatants", combatant_id, "move"])?;
        self.execute(self.http.post(url).json(&MoveCombatantRequest { x, y }))
            .await
    }

    async fn use_reaction(
        &self,
        combat_id: &str,
        reactor_id: &str,
        reaction: ReactionKind,
        trigger_source_id: &str,
    ) -> Result<ReactionResponse, GatewayError> {
        let url = self.endpoint(&["combats", combat_id, "combatants", reactor_id, "reaction"])?;
        let body = UseReactionRequest {
            reaction_type: reaction.as_str().to_string(),
            trigger_source_id: trigger_source_id.to_string(),
        };
        self.execute(self.http.post(url).json(&body)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_segments_under_the_base_path() {
        let client = CombatApiClient::new(
            Url::parse("http://localhost:3000/api/").expect("valid url"),
        );
        let url = client
            .endpoint(&["combats", "combat-1", "combatants", "pc-1", "move"])
            .expect("joinable");
        assert_eq!(
            url.as_str(),
            "http://localhost:3000/api/combats/combat-1/combatants/pc-1/move"
        );
    }

    #[test]
    fn endpoint_handles_base_without_trailing_slash() {
        let client =
            CombatApiClient::new(Url::parse("http://localhost:3000/api").expect("valid url"));
        let url = client
            .endpoint(&["combats", "c", "combatants", "p", "reachable"])
            .expect("joinable");
        assert_eq!(
            url.as_str(),
            "http://localhost:3000/api/combats/c/combatants/p/reachable"
        );
    }
}
