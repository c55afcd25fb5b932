// SPDX-License-Identifier: MPL-2.0
//! Port definitions (traits) for dependency inversion.
//!
//! This module defines the abstract interfaces the playback core is handed
//! at construction. These traits use only domain types, keeping the core
//! independent of any concrete engine binding.
//!
//! # Available Ports
//!
//! - [`engine`]: The native media engine (playback commands, status
//!   snapshots, frame-rate reports)
//!
//! # Design Notes
//!
//! - All traits use domain types only (no engine-library handles)
//! - Dispatch methods are synchronous and non-blocking: they hand a command
//!   to the engine and return; playback effects are observed through status
//!   events, never through return values
//! - Methods return `Result` with the crate's engine error type

pub mod engine;

// Re-export main types for convenience
pub use engine::{
    engine_event_channel, EngineEvent, EngineEventReceiver, EngineEventSender, EngineStatus,
    MediaEngine,
};
