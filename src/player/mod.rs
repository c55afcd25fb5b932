// SPDX-License-Identifier: MPL-2.0
//! Playback coordination for Projectionist.
//!
//! This module turns raw engine status events into a consistent, observable
//! playback state and paces the work around it: change-driven state
//! broadcasts, an adaptive render loop, periodic timeline ticks and a
//! serialized command pipeline with phase gating and seek coalescing.

pub mod adapter;
pub mod core;
pub mod gate;
pub mod observers;
pub mod queue;
pub mod render;
pub mod scrub;
pub mod state;
pub mod timeline;

pub use self::core::Player;
pub use gate::{CommandScheduler, PlayerCommand};
pub use observers::ObserverId;
pub use queue::EnqueueStrategy;
pub use render::RenderScheduler;
pub use scrub::LastWriteWinsRunner;
pub use state::{PlaybackStateMachine, StateProjection};
pub use timeline::{TimelineBroadcaster, TimelineTick};

use std::sync::Arc;

use crate::application::port::{EngineEventReceiver, MediaEngine};
use crate::config::Config;

/// Creates a player over the given engine and its event stream.
pub fn create_player(
    engine: Arc<dyn MediaEngine>,
    events: EngineEventReceiver,
    config: Config,
) -> Player {
    Player::new(engine, events, config)
}
