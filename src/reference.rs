//! Display references handed to the presentation layer.
//!
//! A [`DisplayReference`] is a self-contained, renderable image: either a
//! captured frame or a placeholder tile. The payload is reference-counted so
//! result snapshots can be cloned cheaply after every mutation.

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use base64::{Engine, engine::general_purpose::STANDARD};

/// Media type of every payload produced by this crate.
pub const PNG_MEDIA_TYPE: &str = "image/png";

/// What a display reference depicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// A frame captured from the decoder.
    Frame,
    /// A seek that never settled; the grid entry was skipped.
    Skipped,
    /// A capture that failed (missing resource, render, encode, or
    /// permission failure).
    Error,
}

/// An opaque handle to a renderable image.
#[derive(Clone, PartialEq, Eq)]
pub struct DisplayReference {
    kind: ReferenceKind,
    label: Option<String>,
    width: u32,
    height: u32,
    media_type: &'static str,
    data: Arc<[u8]>,
}

impl Debug for DisplayReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("DisplayReference")
            .field("kind", &self.kind)
            .field("label", &self.label)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("media_type", &self.media_type)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl DisplayReference {
    /// Wrap an encoded frame.
    pub fn frame(width: u32, height: u32, png: Vec<u8>) -> Self {
        Self {
            kind: ReferenceKind::Frame,
            label: None,
            width,
            height,
            media_type: PNG_MEDIA_TYPE,
            data: png.into(),
        }
    }

    /// Wrap a placeholder image.
    ///
    /// Used by [`PlaceholderService`](crate::PlaceholderService)
    /// implementations.
    pub fn placeholder(
        kind: ReferenceKind,
        label: impl Into<String>,
        width: u32,
        height: u32,
        png: Vec<u8>,
    ) -> Self {
        Self {
            kind,
            label: Some(label.into()),
            width,
            height,
            media_type: PNG_MEDIA_TYPE,
            data: png.into(),
        }
    }

    pub fn kind(&self) -> ReferenceKind {
        self.kind
    }

    /// Placeholder label, e.g. `"Skipped 5s"` or `"Error"`.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn media_type(&self) -> &'static str {
        self.media_type
    }

    /// The encoded image bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns `true` for skipped and error tiles.
    pub fn is_placeholder(&self) -> bool {
        self.kind != ReferenceKind::Frame
    }

    /// Render as a `data:` URI suitable for direct embedding.
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.media_type, STANDARD.encode(&self.data))
    }
}
