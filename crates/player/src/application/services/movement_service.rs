//! Movement Service - the turn-action resolution pipeline
//!
//! Takes a player's movement intent, round-trips it through the combat
//! server, lets the animation catch up, then resolves any triggered
//! reactions one at a time - each its own server round trip and dice
//! presentation. At most one move sequence is in flight per session; the
//! phase guard rejects re-entry until the sequence returns to `Idle`.
//!
//! Failures never propagate to the caller as errors. They become combat log
//! entries and `error:occurred` events, which is where the toast UI and
//! audio collaborators pick them up.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::timeout;

use skirmish_protocol::Position;

use crate::application::dto::{IgnoreReason, MoveOutcome, ReactionEntry};
use crate::application::error::{get_request_timeout_ms, ServiceError};
use crate::infrastructure::messaging::EventChannel;
use crate::ports::outbound::{
    ClientEvent, CombatGatewayPort, GatewayError, MoveAnimation, PresentationSink,
    ReactionAnimation,
};
use crate::state::{LogKind, SharedCombatState};

/// Phases of one move sequence.
///
/// The `Idle -> Validating` transition doubles as the mutual-exclusion
/// guard: it only succeeds when no other sequence is in flight, and every
/// exit path returns the phase to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MovePhase {
    #[default]
    Idle,
    Validating,
    AwaitingServerMove,
    AnimatingMove,
    ResolvingReactions,
}

/// Orchestrates movement and the reactions it triggers.
pub struct MovementService {
    gateway: Arc<dyn CombatGatewayPort>,
    state: SharedCombatState,
    channel: EventChannel,
    sink: Arc<dyn PresentationSink>,
    request_timeout: Duration,
    phase: Mutex<MovePhase>,
}

impl MovementService {
    pub fn new(
        gateway: Arc<dyn CombatGatewayPort>,
        state: SharedCombatState,
        channel: EventChannel,
        sink: Arc<dyn PresentationSink>,
    ) -> Self {
        Self {
            gateway,
            state,
            channel,
            sink,
            request_timeout: Duration::from_millis(get_request_timeout_ms()),
            phase: Mutex::new(MovePhase::Idle),
        }
    }

    /// Override the gateway round-trip deadline.
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn phase(&self) -> MovePhase {
        *self.phase.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether a move sequence is currently in flight.
    pub fn is_moving(&self) -> bool {
        self.phase() != MovePhase::Idle
    }

    fn try_begin(&self) -> bool {
        let mut phase = self.phase.lock().unwrap_or_else(|e| e.into_inner());
        if *phase == MovePhase::Idle {
            *phase = MovePhase::Validating;
            true
        } else {
            false
        }
    }

    fn advance(&self, to: MovePhase) {
        let mut phase = self.phase.lock().unwrap_or_else(|e| e.into_inner());
        tracing::trace!(from = ?*phase, ?to, "move phase transition");
        *phase = to;
    }

    // =========================================================================
    // Movement intent
    // =========================================================================

    /// Handle a cell click as a movement request.
    ///
    /// When any precondition fails the call is a no-op, except that a click
    /// landing on an occupied cell is reinterpreted as selecting that
    /// combatant - the deliberate guard against stray clicks becoming moves.
    pub async fn request_move(&self, target: Position) -> MoveOutcome {
        let (combat_id, mover_id) = match (self.state.combat_id(), self.state.active_combatant_id())
        {
            (Some(combat_id), Some(mover_id)) => (combat_id, mover_id),
            _ => return self.reinterpret_click(target, IgnoreReason::NoActiveCombat),
        };

        if !self.state.is_player_turn() {
            return self.reinterpret_click(target, IgnoreReason::NotYourTurn);
        }
        if self.state.targeting_mode() {
            return self.reinterpret_click(target, IgnoreReason::Targeting);
        }
        if !self.try_begin() {
            return self.reinterpret_click(target, IgnoreReason::MoveInFlight);
        }

        // The phase guard is held from here on; every exit resets it.
        if !self.state.movement_mode_armed() {
            self.advance(MovePhase::Idle);
            return self.reinterpret_click(target, IgnoreReason::MovementModeOff);
        }
        if !self.state.is_reachable(target) {
            self.advance(MovePhase::Idle);
            return self.reinterpret_click(target, IgnoreReason::Unreachable);
        }
        let Some(from) = self.state.position_of(&mover_id) else {
            self.advance(MovePhase::Idle);
            return self.reinterpret_click(target, IgnoreReason::NoActiveCombat);
        };

        let outcome = self.run_move(&combat_id, &mover_id, from, target).await;
        self.state.clear_path_preview();
        self.advance(MovePhase::Idle);
        outcome
    }

    /// Recompute the cosmetic path preview for a hovered cell.
    ///
    /// Ignored while a move is in flight; the running sequence owns the
    /// preview until it completes.
    pub fn preview_path(&self, hovered: Position) {
        if self.is_moving() {
            return;
        }
        let Some(mover_id) = self.state.active_combatant_id() else {
            return;
        };
        let Some(from) = self.state.position_of(&mover_id) else {
            return;
        };
        self.state.set_path_preview(compute_path(from, hovered));
    }

    /// Refresh the reachable-cell set for the active combatant (turn start).
    pub async fn refresh_reachable_cells(&self) -> Result<usize, ServiceError> {
        let combat_id = self
            .state
            .combat_id()
            .ok_or(ServiceError::MissingId("combat"))?;
        let combatant_id = self
            .state
            .active_combatant_id()
            .ok_or(ServiceError::MissingId("combatant"))?;

        let response = self
            .call_gateway(self.gateway.get_reachable_cells(&combat_id, &combatant_id))
            .await?;
        let count = response.reachable.len();
        self.state.set_reachable(response.reachable);
        Ok(count)
    }

    // =========================================================================
    // Pipeline internals
    // =========================================================================

    async fn run_move(
        &self,
        combat_id: &str,
        mover_id: &str,
        from: Position,
        target: Position,
    ) -> MoveOutcome {
        let path = compute_path(from, target);
        self.state.set_path_preview(path.clone());

        self.advance(MovePhase::AwaitingServerMove);
        let response = match self
            .call_gateway(
                self.gateway
                    .move_combatant(combat_id, mover_id, target.x, target.y),
            )
            .await
        {
            Ok(response) => response,
            Err(error) => return self.fail_move(mover_id, format!("Move failed: {error}")),
        };

        if !response.success {
            let reason = response
                .description
                .unwrap_or_else(|| "the server rejected the move".to_string());
            return self.fail_move(mover_id, format!("Move rejected: {reason}"));
        }

        // Published before the position mutation so animation consumers
        // still observe the pre-move cell as current.
        self.channel.publish(&ClientEvent::MovementStarted {
            combatant_id: mover_id.to_string(),
            from,
            to: target,
            path: path.clone(),
        });

        self.advance(MovePhase::AnimatingMove);
        self.sink
            .move_animated(MoveAnimation {
                combatant_id: mover_id.to_string(),
                from,
                to: target,
                path,
            })
            .await;

        let distance = response.distance.unwrap_or_else(|| from.steps_to(target));
        self.state.apply_move(mover_id, target, distance);
        let mover_name = self.display_name(mover_id);
        self.state
            .push_log(LogKind::Movement, format!("{mover_name} moves to {target}"));

        self.advance(MovePhase::ResolvingReactions);
        let entries: Vec<ReactionEntry> = response
            .opportunity_attacks
            .into_iter()
            .map(Into::into)
            .collect();
        let reactions_attempted = self.resolve_reactions(mover_id, &entries).await;

        self.refresh_reachable_after_move(combat_id, mover_id).await;

        self.channel.publish(&ClientEvent::MovementCompleted {
            combatant_id: mover_id.to_string(),
            from,
            to: target,
        });

        MoveOutcome::Moved {
            from,
            to: target,
            reactions_attempted,
        }
    }

    /// Resolve triggered reactions strictly in server order.
    ///
    /// One failed entry never aborts the rest of the batch: each failure is
    /// logged and broadcast individually, and the loop continues.
    pub(crate) async fn resolve_reactions(
        &self,
        mover_id: &str,
        entries: &[ReactionEntry],
    ) -> usize {
        if entries.is_empty() {
            return 0;
        }

        let Some(combat_id) = self.state.combat_id().filter(|id| !id.is_empty()) else {
            self.report_error("Cannot resolve reactions: no combat id".to_string());
            return 0;
        };
        if mover_id.is_empty() {
            self.report_error("Cannot resolve reactions: no mover id".to_string());
            return 0;
        }

        let mut attempted = 0;
        for entry in entries {
            let Some(attacker_id) = entry.attacker_id.as_deref() else {
                tracing::debug!("skipping reaction entry without attacker id");
                continue;
            };
            // Direct lookup with a scan fallback tolerates rosters the
            // server keyed by something other than the id.
            let attacker_name = self.display_name(attacker_id);
            let target_id = entry.trigger_target_id.as_deref().unwrap_or(mover_id);
            let target_name = self.display_name(target_id);

            // Announce before resolving, so the log reads in causal order
            // even if the resolution fails.
            self.state.push_log(
                LogKind::Reaction,
                format!("{attacker_name} makes an opportunity attack against {target_name}!"),
            );

            attempted += 1;
            let result = self
                .call_gateway(
                    self.gateway
                        .use_reaction(&combat_id, attacker_id, entry.kind, target_id),
                )
                .await;

            let response = match result {
                Ok(response) if response.success => response,
                Ok(response) => {
                    let reason = response
                        .description
                        .unwrap_or_else(|| "the server rejected the reaction".to_string());
                    self.report_error(format!("{attacker_name}'s reaction failed: {reason}"));
                    continue;
                }
                Err(error) => {
                    self.report_error(format!("{attacker_name}'s reaction failed: {error}"));
                    continue;
                }
            };

            let damage = response.damage_dealt.unwrap_or(0);
            let hit = damage > 0;
            let description = response.description.clone().unwrap_or_else(|| {
                if hit {
                    format!("{attacker_name} hits {target_name} for {damage} damage")
                } else {
                    format!("{attacker_name} misses {target_name}")
                }
            });

            self.state.push_log(LogKind::Reaction, description.clone());
            self.channel.publish(&ClientEvent::OpportunityAttackResolved {
                attacker_id: attacker_id.to_string(),
                target_id: target_id.to_string(),
                hit,
                damage,
                description: description.clone(),
            });
            if let Some(delta) = &response.combat_state {
                self.state.apply_delta(delta);
            }

            // Let the attack presentation play out before the next entry;
            // each reaction may change state the next one should see.
            self.sink
                .reaction_animated(ReactionAnimation {
                    attacker_id: attacker_id.to_string(),
                    attacker_name,
                    target_id: target_id.to_string(),
                    hit,
                    damage,
                    description,
                    attack_roll: response.attack_roll,
                    damage_roll: response.damage_roll,
                })
                .await;
        }
        attempted
    }

    async fn refresh_reachable_after_move(&self, combat_id: &str, mover_id: &str) {
        match self
            .call_gateway(self.gateway.get_reachable_cells(combat_id, mover_id))
            .await
        {
            Ok(response) => self.state.set_reachable(response.reachable),
            Err(error) => {
                tracing::warn!(%error, "could not refresh reachable cells; clearing stale set");
                self.state.clear_reachable();
            }
        }
    }

    fn reinterpret_click(&self, target: Position, reason: IgnoreReason) -> MoveOutcome {
        if let Some(combatant_id) = self.state.occupant_at(target) {
            tracing::debug!(%target, ?reason, %combatant_id, "click reinterpreted as selection");
            self.channel.publish(&ClientEvent::CombatantSelected {
                combatant_id: combatant_id.clone(),
            });
            MoveOutcome::Selected { combatant_id }
        } else {
            tracing::debug!(%target, ?reason, "move request ignored");
            MoveOutcome::Ignored(reason)
        }
    }

    fn fail_move(&self, mover_id: &str, message: String) -> MoveOutcome {
        tracing::error!(combatant = %mover_id, %message, "move sequence aborted");
        self.state.push_log(LogKind::Error, message.clone());
        self.channel.publish(&ClientEvent::ErrorOccurred {
            message: message.clone(),
        });
        MoveOutcome::Failed { message }
    }

    fn report_error(&self, message: String) {
        tracing::error!(%message, "reaction resolution error");
        self.state.push_log(LogKind::Error, message.clone());
        self.channel
            .publish(&ClientEvent::ErrorOccurred { message });
    }

    fn display_name(&self, combatant_id: &str) -> String {
        self.state
            .combatant(combatant_id)
            .map(|c| c.name)
            .unwrap_or_else(|| combatant_id.to_string())
    }

    async fn call_gateway<T>(
        &self,
        request: impl Future<Output = Result<T, GatewayError>> + Send,
    ) -> Result<T, GatewayError> {
        match timeout(self.request_timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout {
                millis: self.request_timeout.as_millis() as u64,
            }),
        }
    }
}

/// Straight-line path from `from` to `to`: one monotonic king-move step per
/// cell, diagonal first, then straight. Excludes the start, includes the
/// target. Cosmetic only - the server owns cost and legality.
pub(crate) fn compute_path(from: Position, to: Position) -> Vec<Position> {
    let mut path = Vec::with_capacity(from.steps_to(to) as usize);
    let mut current = from;
    while current != to {
        current.x += (to.x - current.x).signum();
        current.y += (to.y - current.y).signum();
        path.push(current);
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::outbound::{topics, MockCombatGatewayPort, MockPresentationSink};
    use crate::state::Combatant;
    use async_trait::async_trait;
    use mockall::predicate::eq;
    use skirmish_protocol::{
        MoveResponse, ReachableCellsResponse, ReactionEntryData, ReactionKind, ReactionResponse,
    };
    use tokio::sync::Notify;

    fn combatant(id: &str, name: &str, position: Position) -> Combatant {
        Combatant {
            id: id.to_string(),
            name: name.to_string(),
            position,
            hp: 12,
            movement_remaining: 30,
        }
    }

    /// Combat session: pc-1 acting at (2,2), goblin-1 at (3,3), movement
    /// armed, (2,3) reachable.
    fn session_state() -> SharedCombatState {
        let state = SharedCombatState::new();
        state.set_combat_id(Some("combat-1".to_string()));
        state.upsert_combatant(combatant("pc-1", "Saria", Position::new(2, 2)));
        state.upsert_combatant(combatant("goblin-1", "Grik", Position::new(3, 3)));
        state.set_active_combatant(Some("pc-1".to_string()));
        state.set_player_turn(true);
        state.arm_movement_mode(true);
        state.set_reachable(vec![Position::new(2, 3)]);
        state
    }

    fn ok_move(distance: u32, attacks: Vec<ReactionEntryData>) -> MoveResponse {
        MoveResponse {
            success: true,
            distance: Some(distance),
            description: None,
            opportunity_attacks: attacks,
        }
    }

    fn ok_reaction(damage: i32) -> ReactionResponse {
        ReactionResponse {
            success: true,
            damage_dealt: Some(damage),
            description: None,
            attack_roll: None,
            damage_roll: None,
            combat_state: None,
        }
    }

    fn quiet_sink() -> MockPresentationSink {
        let mut sink = MockPresentationSink::new();
        sink.expect_move_animated().returning(|_| ());
        sink.expect_reaction_animated().returning(|_| ());
        sink
    }

    fn service(
        gateway: MockCombatGatewayPort,
        sink: MockPresentationSink,
        state: SharedCombatState,
        channel: EventChannel,
    ) -> MovementService {
        MovementService::new(Arc::new(gateway), state, channel, Arc::new(sink))
            .with_request_timeout(Duration::from_secs(5))
    }

    /// Record every pipeline event along with pc-1's position at delivery
    /// time, to pin down event/mutation ordering.
    fn record_events(
        channel: &EventChannel,
        state: &SharedCombatState,
    ) -> Arc<Mutex<Vec<(&'static str, Option<Position>)>>> {
        let recorded = Arc::new(Mutex::new(Vec::new()));
        for topic in [
            topics::MOVEMENT_STARTED,
            topics::MOVEMENT_COMPLETED,
            topics::OPPORTUNITY_ATTACK_RESOLVED,
            topics::ERROR_OCCURRED,
            topics::COMBATANT_SELECTED,
        ] {
            let recorded = Arc::clone(&recorded);
            let state = state.clone();
            let sub = channel.subscribe(topic, move |_| {
                recorded
                    .lock()
                    .expect("not poisoned")
                    .push((topic, state.position_of("pc-1")));
                Ok(())
            });
            std::mem::forget(sub);
        }
        recorded
    }

    #[tokio::test]
    async fn move_with_one_opportunity_attack_runs_the_full_sequence() {
        let state = session_state();
        let channel = EventChannel::new();
        let recorded = record_events(&channel, &state);

        let mut gateway = MockCombatGatewayPort::new();
        gateway
            .expect_move_combatant()
            .with(eq("combat-1"), eq("pc-1"), eq(2), eq(3))
            .times(1)
            .returning(|_, _, _, _| {
                Ok(ok_move(5, vec![ReactionEntryData::Id("goblin-1".to_string())]))
            });
        gateway
            .expect_use_reaction()
            .with(
                eq("combat-1"),
                eq("goblin-1"),
                eq(ReactionKind::OpportunityAttack),
                eq("pc-1"),
            )
            .times(1)
            .returning(|_, _, _, _| Ok(ok_reaction(5)));
        gateway
            .expect_get_reachable_cells()
            .with(eq("combat-1"), eq("pc-1"))
            .times(1)
            .returning(|_, _| {
                Ok(ReachableCellsResponse {
                    reachable: vec![Position::new(2, 4)],
                })
            });

        let service = service(gateway, quiet_sink(), state.clone(), channel);
        let outcome = service.request_move(Position::new(2, 3)).await;

        assert_eq!(
            outcome,
            MoveOutcome::Moved {
                from: Position::new(2, 2),
                to: Position::new(2, 3),
                reactions_attempted: 1,
            }
        );

        // Position committed, budget decremented by the server's distance.
        let pc = state.combatant("pc-1").expect("exists");
        assert_eq!(pc.position, Position::new(2, 3));
        assert_eq!(pc.movement_remaining, 25);

        // Events in pipeline order; movement:started saw the old position.
        let events = recorded.lock().expect("not poisoned").clone();
        assert_eq!(
            events,
            vec![
                (topics::MOVEMENT_STARTED, Some(Position::new(2, 2))),
                (topics::OPPORTUNITY_ATTACK_RESOLVED, Some(Position::new(2, 3))),
                (topics::MOVEMENT_COMPLETED, Some(Position::new(2, 3))),
            ]
        );

        // Reachable set refreshed for the new position, guard released.
        assert_eq!(state.reachable(), vec![Position::new(2, 4)]);
        assert!(!service.is_moving());
        assert!(state.path_preview().is_empty());
    }

    #[tokio::test]
    async fn transport_failure_aborts_without_mutation_or_reactions() {
        let state = session_state();
        let channel = EventChannel::new();
        let recorded = record_events(&channel, &state);

        let mut gateway = MockCombatGatewayPort::new();
        gateway
            .expect_move_combatant()
            .times(1)
            .returning(|_, _, _, _| Err(GatewayError::Transport("connection refused".to_string())));
        gateway.expect_use_reaction().times(0);
        gateway.expect_get_reachable_cells().times(0);

        let mut sink = MockPresentationSink::new();
        sink.expect_move_animated().times(0);
        sink.expect_reaction_animated().times(0);

        let service = service(gateway, sink, state.clone(), channel);
        let outcome = service.request_move(Position::new(2, 3)).await;

        assert!(matches!(outcome, MoveOutcome::Failed { .. }));
        assert_eq!(state.position_of("pc-1"), Some(Position::new(2, 2)));

        let events = recorded.lock().expect("not poisoned").clone();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, topics::ERROR_OCCURRED);

        assert!(!service.is_moving());
        let log = state.log();
        assert!(log.iter().any(|e| e.kind == LogKind::Error));
    }

    #[tokio::test]
    async fn server_rejection_uses_the_supplied_description() {
        let state = session_state();
        let channel = EventChannel::new();

        let mut gateway = MockCombatGatewayPort::new();
        gateway
            .expect_move_combatant()
            .times(1)
            .returning(|_, _, _, _| {
                Ok(MoveResponse {
                    success: false,
                    distance: None,
                    description: Some("not enough movement left".to_string()),
                    opportunity_attacks: Vec::new(),
                })
            });
        gateway.expect_use_reaction().times(0);
        gateway.expect_get_reachable_cells().times(0);

        let service = service(gateway, quiet_sink(), state.clone(), channel);
        let outcome = service.request_move(Position::new(2, 3)).await;

        match outcome {
            MoveOutcome::Failed { message } => {
                assert!(message.contains("not enough movement left"))
            }
            other => panic!("expected Failed, got {other:?}"),
        }
        assert_eq!(state.position_of("pc-1"), Some(Position::new(2, 2)));
        assert!(!service.is_moving());
    }

    /// Gateway that parks inside `move_combatant` until released, to hold a
    /// sequence in flight deterministically.
    struct BlockingGateway {
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl CombatGatewayPort for BlockingGateway {
        async fn get_reachable_cells(
            &self,
            _combat_id: &str,
            _combatant_id: &str,
        ) -> Result<ReachableCellsResponse, GatewayError> {
            Ok(ReachableCellsResponse::default())
        }

        async fn move_combatant(
            &self,
            _combat_id: &str,
            _combatant_id: &str,
            _x: i32,
            _y: i32,
        ) -> Result<MoveResponse, GatewayError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(ok_move(1, Vec::new()))
        }

        async fn use_reaction(
            &self,
            _combat_id: &str,
            _reactor_id: &str,
            _reaction: ReactionKind,
            _trigger_source_id: &str,
        ) -> Result<ReactionResponse, GatewayError> {
            Ok(ok_reaction(0))
        }
    }

    #[tokio::test]
    async fn second_request_while_in_flight_is_a_no_op() {
        let state = session_state();
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let gateway = BlockingGateway {
            entered: Arc::clone(&entered),
            release: Arc::clone(&release),
        };

        let service = Arc::new(
            MovementService::new(
                Arc::new(gateway),
                state.clone(),
                EventChannel::new(),
                Arc::new(quiet_sink()),
            )
            .with_request_timeout(Duration::from_secs(5)),
        );

        let first = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.request_move(Position::new(2, 3)).await })
        };
        entered.notified().await;
        assert!(service.is_moving());

        // The overlapping request must not start a second sequence.
        let second = service.request_move(Position::new(2, 3)).await;
        assert_eq!(second, MoveOutcome::Ignored(IgnoreReason::MoveInFlight));

        release.notify_one();
        let outcome = first.await.expect("task joins");
        assert!(matches!(outcome, MoveOutcome::Moved { .. }));
        assert!(!service.is_moving());
    }

    #[tokio::test]
    async fn failed_reaction_never_aborts_the_rest_of_the_batch() {
        let state = session_state();
        state.upsert_combatant(combatant("goblin-2", "Snag", Position::new(1, 3)));
        state.upsert_combatant(combatant("goblin-3", "Mordo", Position::new(3, 2)));
        let channel = EventChannel::new();
        let recorded = record_events(&channel, &state);

        let order = Arc::new(Mutex::new(Vec::new()));
        let mut gateway = MockCombatGatewayPort::new();
        gateway
            .expect_move_combatant()
            .times(1)
            .returning(|_, _, _, _| {
                Ok(ok_move(
                    5,
                    vec![
                        ReactionEntryData::Id("goblin-1".to_string()),
                        ReactionEntryData::Id("goblin-2".to_string()),
                        ReactionEntryData::Id("goblin-3".to_string()),
                    ],
                ))
            });
        let order_clone = Arc::clone(&order);
        gateway
            .expect_use_reaction()
            .times(3)
            .returning(move |_, reactor, _, _| {
                order_clone
                    .lock()
                    .expect("not poisoned")
                    .push(reactor.to_string());
                if reactor == "goblin-2" {
                    Err(GatewayError::Transport("boom".to_string()))
                } else {
                    Ok(ok_reaction(3))
                }
            });
        gateway
            .expect_get_reachable_cells()
            .returning(|_, _| Ok(ReachableCellsResponse::default()));

        let service = service(gateway, quiet_sink(), state.clone(), channel);
        let outcome = service.request_move(Position::new(2, 3)).await;

        assert_eq!(
            outcome,
            MoveOutcome::Moved {
                from: Position::new(2, 2),
                to: Position::new(2, 3),
                reactions_attempted: 3,
            }
        );
        // All three attempted, in server order, despite the middle failure.
        assert_eq!(
            *order.lock().expect("not poisoned"),
            vec!["goblin-1", "goblin-2", "goblin-3"]
        );

        let events = recorded.lock().expect("not poisoned").clone();
        let resolved = events
            .iter()
            .filter(|(t, _)| *t == topics::OPPORTUNITY_ATTACK_RESOLVED)
            .count();
        let errors = events
            .iter()
            .filter(|(t, _)| *t == topics::ERROR_OCCURRED)
            .count();
        assert_eq!(resolved, 2);
        assert_eq!(errors, 1);
    }

    #[tokio::test]
    async fn entries_without_attacker_id_are_skipped() {
        let state = session_state();
        let channel = EventChannel::new();

        let mut gateway = MockCombatGatewayPort::new();
        gateway
            .expect_move_combatant()
            .times(1)
            .returning(|_, _, _, _| {
                Ok(ok_move(
                    5,
                    vec![
                        ReactionEntryData::Id(String::new()),
                        ReactionEntryData::Entry {
                            attacker_id: None,
                            trigger_target_id: Some("pc-1".to_string()),
                            kind: ReactionKind::OpportunityAttack,
                        },
                        ReactionEntryData::Id("goblin-1".to_string()),
                    ],
                ))
            });
        gateway
            .expect_use_reaction()
            .with(
                eq("combat-1"),
                eq("goblin-1"),
                eq(ReactionKind::OpportunityAttack),
                eq("pc-1"),
            )
            .times(1)
            .returning(|_, _, _, _| Ok(ok_reaction(0)));
        gateway
            .expect_get_reachable_cells()
            .returning(|_, _| Ok(ReachableCellsResponse::default()));

        let service = service(gateway, quiet_sink(), state.clone(), channel);
        let outcome = service.request_move(Position::new(2, 3)).await;

        assert_eq!(
            outcome,
            MoveOutcome::Moved {
                from: Position::new(2, 2),
                to: Position::new(2, 3),
                reactions_attempted: 1,
            }
        );
    }

    #[tokio::test]
    async fn reactions_abort_without_a_combat_id() {
        let state = session_state();
        let channel = EventChannel::new();

        let mut gateway = MockCombatGatewayPort::new();
        gateway.expect_use_reaction().times(0);

        let service = service(gateway, quiet_sink(), state.clone(), channel);
        state.set_combat_id(None);

        let entries = vec![ReactionEntry {
            attacker_id: Some("goblin-1".to_string()),
            trigger_target_id: None,
            kind: ReactionKind::OpportunityAttack,
        }];
        let attempted = service.resolve_reactions("pc-1", &entries).await;

        assert_eq!(attempted, 0);
        assert!(state.log().iter().any(|e| e.kind == LogKind::Error));
    }

    #[tokio::test]
    async fn click_without_movement_mode_selects_the_occupant() {
        let state = session_state();
        state.arm_movement_mode(false);
        let channel = EventChannel::new();
        let recorded = record_events(&channel, &state);

        let gateway = MockCombatGatewayPort::new();
        let service = service(gateway, quiet_sink(), state.clone(), channel);

        let outcome = service.request_move(Position::new(3, 3)).await;
        assert_eq!(
            outcome,
            MoveOutcome::Selected {
                combatant_id: "goblin-1".to_string(),
            }
        );

        let events = recorded.lock().expect("not poisoned").clone();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, topics::COMBATANT_SELECTED);
        // Selection is never a move.
        assert_eq!(state.position_of("pc-1"), Some(Position::new(2, 2)));
        assert!(!service.is_moving());
    }

    #[tokio::test]
    async fn click_on_empty_cell_without_movement_mode_is_ignored() {
        let state = session_state();
        state.arm_movement_mode(false);
        let gateway = MockCombatGatewayPort::new();
        let service = service(gateway, quiet_sink(), state, EventChannel::new());

        let outcome = service.request_move(Position::new(7, 7)).await;
        assert_eq!(outcome, MoveOutcome::Ignored(IgnoreReason::MovementModeOff));
    }

    #[tokio::test]
    async fn unreachable_cell_is_ignored() {
        let state = session_state();
        let gateway = MockCombatGatewayPort::new();
        let service = service(gateway, quiet_sink(), state.clone(), EventChannel::new());

        let outcome = service.request_move(Position::new(9, 9)).await;
        assert_eq!(outcome, MoveOutcome::Ignored(IgnoreReason::Unreachable));
        assert!(!service.is_moving());
    }

    #[tokio::test]
    async fn off_turn_and_targeting_clicks_are_ignored() {
        let state = session_state();
        state.set_player_turn(false);
        let gateway = MockCombatGatewayPort::new();
        let service = service(gateway, quiet_sink(), state.clone(), EventChannel::new());
        assert_eq!(
            service.request_move(Position::new(2, 3)).await,
            MoveOutcome::Ignored(IgnoreReason::NotYourTurn)
        );

        state.set_player_turn(true);
        state.set_targeting_mode(true);
        assert_eq!(
            service.request_move(Position::new(2, 3)).await,
            MoveOutcome::Ignored(IgnoreReason::Targeting)
        );
    }

    #[tokio::test]
    async fn reachable_refresh_failure_clears_the_stale_set() {
        let state = session_state();
        let channel = EventChannel::new();
        let recorded = record_events(&channel, &state);

        let mut gateway = MockCombatGatewayPort::new();
        gateway
            .expect_move_combatant()
            .times(1)
            .returning(|_, _, _, _| Ok(ok_move(5, Vec::new())));
        gateway
            .expect_get_reachable_cells()
            .times(1)
            .returning(|_, _| Err(GatewayError::Transport("flaky".to_string())));

        let service = service(gateway, quiet_sink(), state.clone(), channel);
        let outcome = service.request_move(Position::new(2, 3)).await;

        assert!(matches!(outcome, MoveOutcome::Moved { .. }));
        assert!(state.reachable().is_empty());
        // Completion still fires; a failed refresh must not wedge the run.
        let events = recorded.lock().expect("not poisoned").clone();
        assert!(events
            .iter()
            .any(|(t, _)| *t == topics::MOVEMENT_COMPLETED));
        assert!(!service.is_moving());
    }

    #[tokio::test]
    async fn hover_preview_is_ignored_while_moving() {
        let state = session_state();
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let gateway = BlockingGateway {
            entered: Arc::clone(&entered),
            release: Arc::clone(&release),
        };
        let service = Arc::new(
            MovementService::new(
                Arc::new(gateway),
                state.clone(),
                EventChannel::new(),
                Arc::new(quiet_sink()),
            )
            .with_request_timeout(Duration::from_secs(5)),
        );

        let first = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.request_move(Position::new(2, 3)).await })
        };
        entered.notified().await;

        let in_flight_preview = state.path_preview();
        service.preview_path(Position::new(9, 9));
        assert_eq!(state.path_preview(), in_flight_preview);

        release.notify_one();
        first.await.expect("task joins");

        // Idle again: hover previews apply, from the committed position.
        service.preview_path(Position::new(4, 3));
        assert_eq!(
            state.path_preview(),
            vec![Position::new(3, 3), Position::new(4, 3)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn hung_gateway_times_out_and_releases_the_guard() {
        let state = session_state();
        let channel = EventChannel::new();

        struct HangingGateway;

        #[async_trait]
        impl CombatGatewayPort for HangingGateway {
            async fn get_reachable_cells(
                &self,
                _combat_id: &str,
                _combatant_id: &str,
            ) -> Result<ReachableCellsResponse, GatewayError> {
                std::future::pending().await
            }

            async fn move_combatant(
                &self,
                _combat_id: &str,
                _combatant_id: &str,
                _x: i32,
                _y: i32,
            ) -> Result<MoveResponse, GatewayError> {
                std::future::pending().await
            }

            async fn use_reaction(
                &self,
                _combat_id: &str,
                _reactor_id: &str,
                _reaction: ReactionKind,
                _trigger_source_id: &str,
            ) -> Result<ReactionResponse, GatewayError> {
                std::future::pending().await
            }
        }

        let service = MovementService::new(
            Arc::new(HangingGateway),
            state.clone(),
            channel,
            Arc::new(quiet_sink()),
        )
        .with_request_timeout(Duration::from_millis(50));

        let outcome = service.request_move(Position::new(2, 3)).await;
        match outcome {
            MoveOutcome::Failed { message } => assert!(message.contains("timed out")),
            other => panic!("expected Failed, got {other:?}"),
        }
        assert!(!service.is_moving());
        assert_eq!(state.position_of("pc-1"), Some(Position::new(2, 2)));
    }

    #[test]
    fn compute_path_steps_diagonally_then_straight() {
        assert_eq!(
            compute_path(Position::new(2, 2), Position::new(2, 3)),
            vec![Position::new(2, 3)]
        );
        assert_eq!(
            compute_path(Position::new(0, 0), Position::new(3, 1)),
            vec![
                Position::new(1, 1),
                Position::new(2, 1),
                Position::new(3, 1),
            ]
        );
        assert_eq!(
            compute_path(Position::new(5, 5), Position::new(2, 5)),
            vec![
                Position::new(4, 5),
                Position::new(3, 5),
                Position::new(2, 5),
            ]
        );
        assert!(compute_path(Position::new(1, 1), Position::new(1, 1)).is_empty());
    }
}
