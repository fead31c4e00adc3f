//! Default presentation sink: dice presenter plus configured delays.
//!
//! This is the concrete animation backend the pipeline is wired to in
//! production. Move animation is a pure suspension (the grid renderer
//! follows the `movement:started` event on its own); reaction animation
//! plays the dice sequence and then the inter-reaction pause.

use std::sync::Arc;

use async_trait::async_trait;

use crate::application::config::AnimationTimings;
use crate::ports::outbound::{MoveAnimation, PresentationSink, ReactionAnimation};
use crate::presentation::roll_presenter::{RollData, RollOptions, RollPresenter};

pub struct RollPresenterSink {
    presenter: RollPresenter,
    timings: AnimationTimings,
}

impl RollPresenterSink {
    pub fn new(presenter: RollPresenter, timings: AnimationTimings) -> Self {
        Self { presenter, timings }
    }
}

#[async_trait]
impl PresentationSink for RollPresenterSink {
    async fn move_animated(&self, animation: MoveAnimation) {
        let cells = animation.path.len() as u32;
        tokio::time::sleep(self.timings.move_per_cell * cells).await;
    }

    async fn reaction_animated(&self, animation: ReactionAnimation) {
        let roll = RollData {
            attack: animation.attack_roll,
            damage: animation.damage_roll,
            description: animation.description,
        };
        // Reactions are presented as they resolve, without the click gate.
        if let Err(error) = self
            .presenter
            .play_attack_sequence(roll, RollOptions::default())
            .await
        {
            tracing::warn!(
                attacker = %animation.attacker_id,
                %error,
                "skipping reaction roll presentation"
            );
        }
        tokio::time::sleep(self.timings.reaction_pause).await;
    }
}
