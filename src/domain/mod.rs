// SPDX-License-Identifier: MPL-2.0
//! Domain layer - playback truth with no scheduling or transport concerns.
//!
//! This module contains the immutable session model and its value objects.
//! Everything here is constructed wholesale and replaced, never mutated in
//! place, so any component holding a snapshot can trust it forever.
//!
//! # Modules
//!
//! - [`media`]: Media identity and locators ([`Media`](media::Media),
//!   [`MediaId`](media::MediaId), [`MediaMetadata`](media::MediaMetadata))
//! - [`newtypes`]: Value objects ([`Volume`](newtypes::Volume))
//! - [`playback`]: Session model ([`PlaybackSession`](playback::PlaybackSession),
//!   [`Phase`](playback::Phase), [`PlaybackProgress`](playback::PlaybackProgress),
//!   [`NetworkBufferingState`](playback::NetworkBufferingState))

pub mod media;
pub mod newtypes;
pub mod playback;

pub use media::{Media, MediaId, MediaMetadata};
pub use newtypes::Volume;
pub use playback::{NetworkBufferingState, Phase, PlaybackProgress, PlaybackSession};
