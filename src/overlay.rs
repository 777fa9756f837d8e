use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use anyhow::Context as _;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_text_mut;
use tracing::info;

use crate::error::{ReelError, ReelResult};

/// Left margin of every caption line, in pixels.
pub const MARGIN_X: i32 = 80;
/// Vertical position of the first line.
pub const BASE_Y: i32 = 80;
/// Distance between consecutive lines.
pub const LINE_PITCH: i32 = 75;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const DEFAULT_SCALE: f32 = 64.0;

/// Stamps caption lines onto rendered frames at fixed positions.
///
/// Lines are drawn white onto a zeroed mask buffer, and only strictly-white
/// mask pixels are copied onto the target. The threshold copy (rather than
/// drawing straight onto the frame) lets captions coexist with renderers
/// that repaint the full canvas.
pub struct TextOverlay {
    font: FontVec,
    scale: PxScale,
}

impl TextOverlay {
    pub fn new(font: FontVec) -> Self {
        Self {
            font,
            scale: PxScale::from(DEFAULT_SCALE),
        }
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = PxScale::from(scale);
        self
    }

    pub fn from_font_path(path: &Path) -> ReelResult<Self> {
        let data =
            std::fs::read(path).with_context(|| format!("read font '{}'", path.display()))?;
        let font = FontVec::try_from_vec(data).map_err(|_| {
            ReelError::validation(format!("'{}' is not a usable font", path.display()))
        })?;
        info!(path = %path.display(), "loaded caption font");
        Ok(Self::new(font))
    }

    /// Stamp `lines` onto `image`; line `i` sits at the fixed margin and
    /// `y = BASE_Y + LINE_PITCH * i`.
    pub fn apply(&self, image: &mut RgbImage, lines: &[String]) {
        if lines.is_empty() {
            return;
        }

        let mut mask = RgbImage::new(image.width(), image.height());
        for (i, line) in lines.iter().enumerate() {
            let y = BASE_Y + LINE_PITCH * i as i32;
            draw_text_mut(&mut mask, WHITE, MARGIN_X, y, self.scale, &self.font, line);
        }

        stamp_white_mask(image, &mask);
    }
}

/// Copy onto `target` exactly those mask pixels that are strictly white.
/// Antialiased glyph fringes stay on the mask; underlying content survives
/// everywhere outside the solid glyph body.
pub fn stamp_white_mask(target: &mut RgbImage, mask: &RgbImage) {
    debug_assert_eq!(target.dimensions(), mask.dimensions());
    for (dst, src) in target.pixels_mut().zip(mask.pixels()) {
        if src.0 == [255, 255, 255] {
            *dst = *src;
        }
    }
}
