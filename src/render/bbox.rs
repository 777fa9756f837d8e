use image::{Rgb, RgbImage};

use crate::{
    error::ReelResult,
    model::{BoundingBox, FrameRecord},
    render::Renderer,
};

/// Mint accent used for box outlines.
pub const ACCENT: Rgb<u8> = Rgb([62, 180, 137]);

/// Darkens the raw frame, then traces a 1-pixel outline around every
/// person's bounding box.
#[derive(Clone, Copy, Debug)]
pub struct BoundingBoxRenderer {
    /// Remaining brightness of the underlying frame, 0..=1.
    pub brightness: f32,
    pub accent: Rgb<u8>,
}

impl Default for BoundingBoxRenderer {
    fn default() -> Self {
        Self {
            brightness: 0.5,
            accent: ACCENT,
        }
    }
}

impl Renderer for BoundingBoxRenderer {
    fn render(&self, image: &RgbImage, record: &FrameRecord) -> ReelResult<RgbImage> {
        let mut out = image.clone();

        let b = self.brightness.clamp(0.0, 1.0);
        for px in out.pixels_mut() {
            for c in &mut px.0 {
                *c = (f32::from(*c) * b) as u8;
            }
        }

        for person in &record.people {
            draw_outline(&mut out, &person.bbox, self.accent);
        }

        Ok(out)
    }
}

/// Outline `[left,right] x [top,bottom]`, clamped to the image. Degenerate
/// or fully off-screen boxes are skipped; trace coordinates are not trusted.
fn draw_outline(img: &mut RgbImage, bbox: &BoundingBox, color: Rgb<u8>) {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return;
    }
    let (w, h) = (i64::from(w), i64::from(h));

    let BoundingBox {
        top,
        left,
        bottom,
        right,
    } = *bbox;

    if right <= left || bottom <= top {
        return;
    }
    if right < 0 || bottom < 0 || left >= w || top >= h {
        return;
    }

    let cl = left.clamp(0, w - 1);
    let cr = right.clamp(0, w - 1);
    let ct = top.clamp(0, h - 1);
    let cb = bottom.clamp(0, h - 1);

    for x in cl..=cr {
        if (0..h).contains(&top) {
            img.put_pixel(x as u32, top as u32, color);
        }
        if (0..h).contains(&bottom) {
            img.put_pixel(x as u32, bottom as u32, color);
        }
    }
    for y in ct..=cb {
        if (0..w).contains(&left) {
            img.put_pixel(left as u32, y as u32, color);
        }
        if (0..w).contains(&right) {
            img.put_pixel(right as u32, y as u32, color);
        }
    }
}
