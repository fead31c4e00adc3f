//! Timing configuration for the pipeline's animation suspension points.
//!
//! Every deliberate delay in the pipeline is named here; nothing sleeps on a
//! hard-coded number. Defaults can be overridden per-variable from the
//! environment.

use std::time::Duration;

/// Named animation durations consumed by the pipeline and the presenter.
#[derive(Debug, Clone)]
pub struct AnimationTimings {
    /// Per-cell share of the move animation; total suspension is
    /// `path length x this`.
    pub move_per_cell: Duration,
    /// Fixed pause between consecutive reaction resolutions.
    pub reaction_pause: Duration,
    /// Interval between dice tumble frames.
    pub dice_frame_interval: Duration,
    /// Total duration of a dice tumble.
    pub dice_tumble_total: Duration,
    /// How long a settled roll result stays visible before auto-hiding.
    pub result_auto_hide: Duration,
}

impl Default for AnimationTimings {
    fn default() -> Self {
        Self {
            move_per_cell: env_ms("SKIRMISH_MOVE_MS_PER_CELL", 150),
            reaction_pause: env_ms("SKIRMISH_REACTION_PAUSE_MS", 600),
            dice_frame_interval: env_ms("SKIRMISH_DICE_FRAME_MS", 50),
            dice_tumble_total: env_ms("SKIRMISH_DICE_TUMBLE_MS", 900),
            result_auto_hide: env_ms("SKIRMISH_RESULT_AUTO_HIDE_MS", 1500),
        }
    }
}

impl AnimationTimings {
    /// All durations zero; animation points return immediately.
    pub fn immediate() -> Self {
        Self {
            move_per_cell: Duration::ZERO,
            reaction_pause: Duration::ZERO,
            dice_frame_interval: Duration::ZERO,
            dice_tumble_total: Duration::ZERO,
            result_auto_hide: Duration::ZERO,
        }
    }
}

fn env_ms(var: &str, default_ms: u64) -> Duration {
    let ms = std::env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default_ms);
    Duration::from_millis(ms)
}
