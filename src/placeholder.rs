//! Placeholder tiles for grid entries that produced no frame.
//!
//! The capture unit asks a [`PlaceholderService`] for a grey tile when a seek
//! never settles and a red tile when a capture fails. The default
//! [`SolidColorPlaceholder`] renders a solid PNG of the requested colour and
//! carries the label alongside it.

use image::{Rgba, RgbaImage};

use crate::reference::{DisplayReference, ReferenceKind};
use crate::renderer::encode_png;

/// Colour of the tile emitted for a seek that never settled.
pub const SKIPPED_COLOR: &str = "#808080";
/// Colour of the tile emitted for a failed capture.
pub const ERROR_COLOR: &str = "#cc0000";
/// Label of the tile emitted for a failed capture.
pub const ERROR_LABEL: &str = "Error";

const FALLBACK_RGB: [u8; 3] = [0x80, 0x80, 0x80];

/// Produces display references for placeholder tiles.
pub trait PlaceholderService: Send + Sync {
    /// Build a `width`×`height` tile of colour `color_hex` labeled `label`.
    fn placeholder(
        &self,
        kind: ReferenceKind,
        width: u32,
        height: u32,
        color_hex: &str,
        label: &str,
    ) -> DisplayReference;
}

/// Renders placeholders as solid-colour PNG images.
#[derive(Debug, Clone, Copy, Default)]
pub struct SolidColorPlaceholder;

impl PlaceholderService for SolidColorPlaceholder {
    fn placeholder(
        &self,
        kind: ReferenceKind,
        width: u32,
        height: u32,
        color_hex: &str,
        label: &str,
    ) -> DisplayReference {
        let (width, height) = (width.max(1), height.max(1));
        let [red, green, blue] = parse_hex_color(color_hex).unwrap_or_else(|| {
            log::warn!("Invalid placeholder colour {color_hex:?}, using grey");
            FALLBACK_RGB
        });
        let tile = RgbaImage::from_pixel(width, height, Rgba([red, green, blue, 255]));
        let png = encode_png(&tile).unwrap_or_else(|error| {
            log::warn!("Failed to encode {width}x{height} placeholder: {error}");
            Vec::new()
        });
        DisplayReference::placeholder(kind, label, width, height, png)
    }
}

/// Parse `#rgb` or `#rrggbb` (leading `#` optional).
pub(crate) fn parse_hex_color(hex: &str) -> Option<[u8; 3]> {
    let digits = hex.trim().trim_start_matches('#');
    if !digits.is_ascii() {
        return None;
    }
    match digits.len() {
        3 => {
            let mut rgb = [0u8; 3];
            for (channel, digit) in rgb.iter_mut().zip(digits.chars()) {
                let value = digit.to_digit(16)? as u8;
                *channel = value * 17;
            }
            Some(rgb)
        }
        6 => {
            let mut rgb = [0u8; 3];
            for (index, channel) in rgb.iter_mut().enumerate() {
                *channel = u8::from_str_radix(&digits[index * 2..index * 2 + 2], 16).ok()?;
            }
            Some(rgb)
        }
        _ => None,
    }
}
