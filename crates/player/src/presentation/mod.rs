//! Presentation layer - UI-agnostic animation state machines

pub mod roll_presenter;
pub mod sink;

pub use roll_presenter::{
    DiePhase, DieView, PresenterError, RollData, RollFrame, RollOptions, RollPresenter,
    RollSurface,
};
pub use sink::RollPresenterSink;
