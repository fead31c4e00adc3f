//! Roll Presenter - drives the "click to roll" dice animation
//!
//! A frame-based state machine that presents an attack roll (and optional
//! damage roll) before the pipeline continues. The tumble shows pseudo-random
//! faces at a fixed frame interval and snaps to the authoritative value on
//! the last frame; intermediate faces carry no meaning.
//!
//! The presenter owns all animation state. Rendering goes through the
//! [`RollSurface`] trait, one frame snapshot at a time, so the presenter
//! stays independent of any concrete UI.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use rand::Rng;
use thiserror::Error;
use tokio::sync::oneshot;

use skirmish_protocol::{AdvantageState, AttackRollData, DamageRollData};

use crate::application::config::AnimationTimings;

/// Lifecycle of one displayed die.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiePhase {
    Idle,
    AwaitingPlayerClick,
    Tumbling,
    Settled,
}

/// One die as currently displayed.
#[derive(Debug, Clone, PartialEq)]
pub struct DieView {
    pub phase: DiePhase,
    pub face: Option<i32>,
    pub sides: u32,
    /// Whether this die's value is the one that counted (advantage and
    /// disadvantage show both dice, marking only the used one).
    pub kept: bool,
}

/// Snapshot of the whole roll display, pushed to the surface every frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RollFrame {
    pub visible: bool,
    pub attack: Vec<DieView>,
    pub damage: Vec<DieView>,
    pub attack_total: Option<i32>,
    pub damage_total: Option<i32>,
    pub description: String,
}

/// Render target for roll frames.
pub trait RollSurface: Send + Sync {
    fn render(&self, frame: &RollFrame);
}

/// Roll data handed to the presenter. Anything missing degrades to default
/// display values; the presenter has no error-reporting channel of its own.
#[derive(Debug, Clone, Default)]
pub struct RollData {
    pub attack: Option<AttackRollData>,
    pub damage: Option<DamageRollData>,
    pub description: String,
}

/// Presentation options for one sequence.
#[derive(Debug, Clone, Copy, Default)]
pub struct RollOptions {
    /// Gate the tumble on an explicit player click.
    pub click_to_roll: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PresenterError {
    /// A sequence is already playing (possibly parked on its click-waiter);
    /// the new request is rejected rather than overwriting it.
    #[error("a roll sequence is already in progress")]
    SequenceInProgress,
}

const DEFAULT_ATTACK_SIDES: u32 = 20;
const DEFAULT_DAMAGE_SIDES: u32 = 6;

struct PresenterShared {
    busy: AtomicBool,
    pending_click: Mutex<Option<oneshot::Sender<()>>>,
}

/// Releases the busy flag (and any parked click-waiter) however the
/// sequence ends, including cancellation.
struct SequenceGuard {
    shared: Arc<PresenterShared>,
}

impl Drop for SequenceGuard {
    fn drop(&mut self) {
        self.shared
            .pending_click
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        self.shared.busy.store(false, Ordering::SeqCst);
    }
}

/// Drives the dice-roll presentation for resolved actions.
#[derive(Clone)]
pub struct RollPresenter {
    surface: Arc<dyn RollSurface>,
    timings: AnimationTimings,
    shared: Arc<PresenterShared>,
}

impl RollPresenter {
    pub fn new(surface: Arc<dyn RollSurface>, timings: AnimationTimings) -> Self {
        Self {
            surface,
            timings,
            shared: Arc::new(PresenterShared {
                busy: AtomicBool::new(false),
                pending_click: Mutex::new(None),
            }),
        }
    }

    /// Whether a sequence is parked waiting for the player's click.
    pub fn is_awaiting_click(&self) -> bool {
        self.shared
            .pending_click
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Deliver the player's click to a parked sequence.
    ///
    /// Returns false when nothing was waiting.
    pub fn notify_click(&self) -> bool {
        let waiter = self
            .shared
            .pending_click
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        match waiter {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }

    /// Play the full visual sequence for one resolved attack: the attack
    /// roll, then the damage roll if there is one, then the auto-hide delay.
    ///
    /// Returns once the display has been hidden again.
    pub async fn play_attack_sequence(
        &self,
        roll: RollData,
        options: RollOptions,
    ) -> Result<(), PresenterError> {
        if self.shared.busy.swap(true, Ordering::SeqCst) {
            return Err(PresenterError::SequenceInProgress);
        }
        let _guard = SequenceGuard {
            shared: Arc::clone(&self.shared),
        };

        let attack = roll.attack.unwrap_or_default();
        let mut frame = RollFrame {
            visible: true,
            attack: attack_dice(&attack),
            damage: Vec::new(),
            attack_total: None,
            damage_total: None,
            description: roll.description,
        };

        if options.click_to_roll {
            self.await_player_click(&mut frame).await;
        }

        // Attack die (or dice, under advantage/disadvantage).
        let attack_faces = attack_faces(&attack);
        self.tumble(&mut frame, DiceGroup::Attack, &attack_faces)
            .await;
        frame.attack_total = Some(attack.total);
        self.surface.render(&frame);

        // Damage dice follow as their own nested sequence.
        if let Some(damage) = roll.damage {
            let faces = damage_faces(&damage, attack.critical);
            frame.damage = faces
                .iter()
                .map(|_| DieView {
                    phase: DiePhase::Tumbling,
                    face: None,
                    sides: damage.die_size.unwrap_or(DEFAULT_DAMAGE_SIDES),
                    kept: true,
                })
                .collect();
            self.tumble(&mut frame, DiceGroup::Damage, &faces).await;
            frame.damage_total = Some(damage.total);
            self.surface.render(&frame);
        }

        tokio::time::sleep(self.timings.result_auto_hide).await;
        self.surface.render(&RollFrame::default());
        Ok(())
    }

    async fn await_player_click(&self, frame: &mut RollFrame) {
        for die in &mut frame.attack {
            die.phase = DiePhase::AwaitingPlayerClick;
        }
        self.surface.render(frame);

        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self
                .shared
                .pending_click
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            *pending = Some(tx);
        }
        // A dropped sender counts as a click; the sequence must not hang on
        // a surface that went away.
        let _ = rx.await;
    }

    /// Run the tumble animation for one dice group, snapping each die to its
    /// authoritative face on the last frame.
    async fn tumble(&self, frame: &mut RollFrame, group: DiceGroup, final_faces: &[i32]) {
        let interval = self.timings.dice_frame_interval;
        let frames = if interval.is_zero() {
            1
        } else {
            (self.timings.dice_tumble_total.as_millis() / interval.as_millis().max(1)).max(1) as u32
        };

        for _ in 0..frames {
            for die in group.dice_mut(frame) {
                die.phase = DiePhase::Tumbling;
                die.face = Some(rand::thread_rng().gen_range(1..=die.sides.max(1) as i32));
            }
            self.surface.render(frame);
            tokio::time::sleep(interval).await;
        }

        for (die, face) in group.dice_mut(frame).iter_mut().zip(final_faces) {
            die.phase = DiePhase::Settled;
            die.face = Some(*face);
        }
        self.surface.render(frame);
    }
}

enum DiceGroup {
    Attack,
    Damage,
}

impl DiceGroup {
    fn dice_mut<'a>(&self, frame: &'a mut RollFrame) -> &'a mut Vec<DieView> {
        match self {
            Self::Attack => &mut frame.attack,
            Self::Damage => &mut frame.damage,
        }
    }
}

/// Initial attack dice for the roll: one die normally, two under advantage
/// or disadvantage, with the used one marked.
fn attack_dice(attack: &AttackRollData) -> Vec<DieView> {
    let sides = attack.die_size.unwrap_or(DEFAULT_ATTACK_SIDES);
    let faces = attack_faces(attack);
    let kept_index = kept_index(attack, &faces);
    faces
        .iter()
        .enumerate()
        .map(|(i, _)| DieView {
            phase: DiePhase::Idle,
            face: None,
            sides,
            kept: i == kept_index,
        })
        .collect()
}

/// Authoritative final faces for the attack dice.
fn attack_faces(attack: &AttackRollData) -> Vec<i32> {
    let sides = attack.die_size.unwrap_or(DEFAULT_ATTACK_SIDES) as i32;
    let kept = attack
        .die
        .or_else(|| attack.modifier.map(|m| attack.total - m))
        .unwrap_or(attack.total)
        .clamp(1, sides);

    match attack.advantage {
        AdvantageState::Advantage | AdvantageState::Disadvantage => {
            if attack.rolls.len() >= 2 {
                vec![attack.rolls[0], attack.rolls[1]]
            } else {
                // Degraded display: show the kept value twice.
                vec![kept, kept]
            }
        }
        AdvantageState::Normal | AdvantageState::Unknown => vec![kept],
    }
}

fn kept_index(attack: &AttackRollData, faces: &[i32]) -> usize {
    if faces.len() < 2 {
        return 0;
    }
    let higher = if faces[0] >= faces[1] { 0 } else { 1 };
    match attack.advantage {
        AdvantageState::Disadvantage => 1 - higher,
        _ => higher,
    }
}

/// Damage faces to display; the count doubles on a critical hit (a cosmetic
/// reflection of the doubled-dice rule - the server's total already includes
/// it).
fn damage_faces(damage: &DamageRollData, critical: bool) -> Vec<i32> {
    let mut faces = if damage.dice.is_empty() {
        let sides = damage.die_size.unwrap_or(DEFAULT_DAMAGE_SIDES) as i32;
        let fallback = damage
            .modifier
            .map(|m| damage.total - m)
            .unwrap_or(damage.total)
            .clamp(1, sides);
        vec![fallback]
    } else {
        damage.dice.clone()
    };
    if critical {
        faces.extend(faces.clone());
    }
    faces
}
