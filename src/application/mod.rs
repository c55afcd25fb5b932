// SPDX-License-Identifier: MPL-2.0
//! Application layer - seams between the core and its collaborators.
//!
//! This module contains the port traits the playback core is wired against:
//!
//! - [`port`]: Trait definitions (interfaces) for dependency inversion
//!
//! # Dependency Rule
//!
//! - The application layer depends on the domain layer (uses domain types)
//! - Engine bindings and the windowing host implement the port traits
//! - The player facade consumes ports; it never names a concrete binding
//!
//! # Example
//!
//! ```ignore
//! use projectionist::application::port::MediaEngine;
//!
//! // An engine binding implements the port trait
//! struct LibmpvEngine { /* ... */ }
//! impl MediaEngine for LibmpvEngine { /* ... */ }
//! ```

pub mod port;
