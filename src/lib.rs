// SPDX-License-Identifier: MPL-2.0
//! `projectionist` is the playback coordination core of a desktop media
//! player shell.
//!
//! It sits between a native media engine and the windowed UI process:
//! engine status events flow in, and consistent playback state, timeline
//! ticks and paced render requests flow out. The engine itself is reached
//! through the [`application::port::MediaEngine`] trait, so any binding
//! (libmpv, gstreamer, a test double) can drive the same core.
//!
//! The high-level entry point is [`player::Player`].

#![doc(html_root_url = "https://docs.rs/projectionist/0.3.0")]

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod player;

pub use error::{Error, Result};
pub use player::{create_player, Player};
