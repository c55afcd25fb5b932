// SPDX-License-Identifier: MPL-2.0
//! Media identity and locators.
//!
//! A [`Media`] value ties a generated identity to a URI plus whatever
//! metadata the shell happened to know at hand-off time. Instances are
//! immutable and cheap to clone; whichever session references one owns
//! that reference outright.

use std::sync::atomic::{AtomicU64, Ordering};

/// Process-local sequence so ids generated within the same millisecond
/// stay distinct.
static MEDIA_ID_SEQ: AtomicU64 = AtomicU64::new(0);

/// Opaque media identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaId(String);

impl MediaId {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generates a fresh id from the current time and a process-local
    /// counter.
    #[must_use]
    pub fn generate() -> Self {
        let millis = chrono::Utc::now().timestamp_millis();
        let seq = MEDIA_ID_SEQ.fetch_add(1, Ordering::Relaxed);
        Self(format!("media-{}-{}", millis, seq))
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.0
    }
}

/// Optional descriptive metadata for a media item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaMetadata {
    pub title: Option<String>,
    /// Duration in seconds, when known ahead of playback.
    pub duration: Option<f64>,
    pub format: Option<String>,
}

/// A playable media item: identity + locator + optional metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Media {
    id: MediaId,
    uri: String,
    metadata: MediaMetadata,
}

impl Media {
    /// Creates a media item from a URI with a generated id and empty
    /// metadata.
    #[must_use]
    pub fn from_uri(uri: impl Into<String>) -> Self {
        Self {
            id: MediaId::generate(),
            uri: uri.into(),
            metadata: MediaMetadata::default(),
        }
    }

    /// Replaces the metadata, consuming and returning the item.
    #[must_use]
    pub fn with_metadata(mut self, metadata: MediaMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    #[must_use]
    pub fn id(&self) -> &MediaId {
        &self.id
    }

    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    #[must_use]
    pub fn metadata(&self) -> &MediaMetadata {
        &self.metadata
    }

    /// Title when present, otherwise the last path segment of the URI.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if let Some(title) = self.metadata.title.as_deref() {
            if !title.is_empty() {
                return title;
            }
        }
        self.uri
            .rsplit(['/', '\\'])
            .next()
            .filter(|segment| !segment.is_empty())
            .unwrap_or(&self.uri)
    }

    /// True for `file://` URIs and bare paths without a scheme.
    #[must_use]
    pub fn is_local_file(&self) -> bool {
        self.uri.starts_with("file://") || !self.uri.contains("://")
    }

    /// True for `http(s)://` locators.
    #[must_use]
    pub fn is_network_stream(&self) -> bool {
        self.uri.starts_with("http://") || self.uri.starts_with("https://")
    }

    /// True for HLS playlists served over the network.
    #[must_use]
    pub fn is_hls_stream(&self) -> bool {
        self.is_network_stream() && self.uri.to_lowercase().contains(".m3u8")
    }
}
