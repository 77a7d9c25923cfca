//! The frame renderer.
//!
//! [`FrameCanvas`] is the pixel buffer a capture draws the decoder's surface
//! into before serializing it as PNG. Drawing a surface that is not
//! origin-clean taints the canvas, and a tainted canvas refuses to be read
//! back for the rest of its life.

use image::{
    ExtendedColorType, ImageEncoder, RgbaImage, codecs::png::PngEncoder, imageops,
    imageops::FilterType,
};

use crate::decoder::VideoSurface;
use crate::error::ThumbstripError;

/// Pixel buffer for frame capture.
#[derive(Debug, Clone)]
pub struct FrameCanvas {
    buffer: RgbaImage,
    tainted: bool,
}

impl FrameCanvas {
    /// Create a transparent canvas of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            buffer: RgbaImage::new(width, height),
            tainted: false,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }

    /// A zero-area canvas cannot be drawn into or read back.
    pub fn is_available(&self) -> bool {
        self.buffer.width() > 0 && self.buffer.height() > 0
    }

    /// Whether cross-origin content has been drawn into this canvas.
    pub fn is_tainted(&self) -> bool {
        self.tainted
    }

    /// Resize to `width`×`height` if the size differs. Clears the pixels.
    ///
    /// Returns `true` if the canvas was resized.
    pub fn ensure_dimensions(&mut self, width: u32, height: u32) -> bool {
        if self.buffer.dimensions() == (width, height) {
            return false;
        }
        log::debug!(
            "Resizing canvas from {:?} to {width}x{height}",
            self.buffer.dimensions()
        );
        self.buffer = RgbaImage::new(width, height);
        true
    }

    /// Draw `surface` over the whole canvas, scaling if the sizes differ.
    ///
    /// # Errors
    ///
    /// [`ThumbstripError::MissingResource`] if the canvas has zero area,
    /// [`ThumbstripError::RenderError`] if the surface is empty.
    pub fn draw(&mut self, surface: &VideoSurface) -> Result<(), ThumbstripError> {
        if !self.is_available() {
            return Err(ThumbstripError::MissingResource("pixel surface"));
        }
        let (source_width, source_height) = surface.dimensions();
        if source_width == 0 || source_height == 0 {
            return Err(ThumbstripError::RenderError(
                "decoder surface has no pixels".to_string(),
            ));
        }

        if surface.dimensions() == self.buffer.dimensions() {
            self.buffer.copy_from_slice(surface.pixels.as_raw());
        } else {
            let (width, height) = self.buffer.dimensions();
            self.buffer = imageops::resize(&*surface.pixels, width, height, FilterType::Triangle);
        }

        if !surface.origin_clean {
            self.tainted = true;
        }
        Ok(())
    }

    /// Serialize the canvas as PNG.
    ///
    /// # Errors
    ///
    /// [`ThumbstripError::PermissionDenied`] if the canvas is tainted,
    /// [`ThumbstripError::MissingResource`] if it has zero area, or
    /// [`ThumbstripError::EncodeError`] if encoding fails.
    pub fn encode_png(&self) -> Result<Vec<u8>, ThumbstripError> {
        if self.tainted {
            return Err(ThumbstripError::PermissionDenied);
        }
        if !self.is_available() {
            return Err(ThumbstripError::MissingResource("pixel surface"));
        }
        encode_png(&self.buffer)
    }
}

/// Encode an RGBA image as PNG.
pub(crate) fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, ThumbstripError> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|error| ThumbstripError::EncodeError(error.to_string()))?;
    Ok(bytes)
}
