use std::f32::consts::PI;

use image::{Rgb, RgbImage, imageops};

use crate::{
    error::{ReelError, ReelResult},
    model::FrameRecord,
    render::Renderer,
};

/// Tuning for the density heat map.
#[derive(Clone, Copy, Debug)]
pub struct DensityConfig {
    /// Working resolution of the scalar field, independent of the raw
    /// frame's own resolution.
    pub field_width: u32,
    pub field_height: u32,
    /// Fixed ratio taking capture coordinates into field cells.
    pub coord_scale: f64,
    /// Gaussian smoothing radius in field cells. A tunable, not derived
    /// from the data.
    pub sigma: f32,
}

impl Default for DensityConfig {
    fn default() -> Self {
        Self {
            field_width: 1920,
            field_height: 1080,
            coord_scale: 0.5,
            sigma: 10.0,
        }
    }
}

/// Builds a continuous crowd-density estimate from the discrete person
/// positions: unit impulses on a working-resolution field, Gaussian
/// smoothing, then a perceptual colormap, rescaled to the input frame's
/// dimensions entirely in memory.
#[derive(Clone, Copy, Debug, Default)]
pub struct DensityMapRenderer {
    pub cfg: DensityConfig,
}

impl DensityMapRenderer {
    pub fn new(cfg: DensityConfig) -> Self {
        Self { cfg }
    }
}

impl Renderer for DensityMapRenderer {
    fn render(&self, image: &RgbImage, record: &FrameRecord) -> ReelResult<RgbImage> {
        let (out_w, out_h) = image.dimensions();
        let (fw, fh) = (self.cfg.field_width, self.cfg.field_height);
        if fw == 0 || fh == 0 {
            return Err(ReelError::validation("density field must be non-empty"));
        }

        let field = accumulate_impulses(&self.cfg, record)?;
        let smoothed = if record.people.is_empty() {
            field
        } else {
            gaussian_blur_field(&field, fw as usize, fh as usize, self.cfg.sigma)
        };

        // Unnormalized intensity: a lone person's peak maps to full scale,
        // so brightness is comparable across frames (never rescaled to the
        // per-frame maximum).
        let gain = 2.0 * PI * self.cfg.sigma * self.cfg.sigma;

        let mut colored = RgbImage::new(fw, fh);
        for (value, px) in smoothed.iter().zip(colored.pixels_mut()) {
            *px = plasma((value * gain).clamp(0.0, 1.0));
        }

        if (fw, fh) == (out_w, out_h) {
            Ok(colored)
        } else {
            Ok(imageops::resize(
                &colored,
                out_w,
                out_h,
                imageops::FilterType::Triangle,
            ))
        }
    }
}

/// One unit impulse per person at the nearest field cell.
fn accumulate_impulses(cfg: &DensityConfig, record: &FrameRecord) -> ReelResult<Vec<f32>> {
    let (fw, fh) = (i64::from(cfg.field_width), i64::from(cfg.field_height));
    let mut field = vec![0f32; (fw * fh) as usize];

    for person in &record.people {
        let mut row = (person.y as f64 * cfg.coord_scale) as i64;
        let mut col = (person.x as f64 * cfg.coord_scale) as i64;

        if !(0..fh).contains(&row) || !(0..fw).contains(&col) {
            // Legacy boundary quirk: a point scaling exactly onto the edge
            // is shifted one cell inward on both axes instead of being
            // clamped per axis.
            row -= 1;
            col -= 1;
        }
        if !(0..fh).contains(&row) || !(0..fw).contains(&col) {
            // Dropping the point silently would change the density
            // integral with no signal.
            return Err(ReelError::render(format!(
                "person {} at ({}, {}) falls outside the {}x{} density field",
                person.id, person.x, person.y, fw, fh
            )));
        }

        field[(row * fw + col) as usize] += 1.0;
    }

    Ok(field)
}

/// Separable Gaussian over an f32 field with zero padding at the borders,
/// radius `ceil(4 sigma)`.
fn gaussian_blur_field(src: &[f32], width: usize, height: usize, sigma: f32) -> Vec<f32> {
    let kernel = gaussian_kernel(sigma);
    let radius = (kernel.len() / 2) as i64;

    let mut tmp = vec![0f32; src.len()];
    let mut out = vec![0f32; src.len()];
    let (w, h) = (width as i64, height as i64);

    for y in 0..h {
        for x in 0..w {
            let mut acc = 0f32;
            for (ki, &kw) in kernel.iter().enumerate() {
                let sx = x + ki as i64 - radius;
                if (0..w).contains(&sx) {
                    acc += kw * src[(y * w + sx) as usize];
                }
            }
            tmp[(y * w + x) as usize] = acc;
        }
    }

    for y in 0..h {
        for x in 0..w {
            let mut acc = 0f32;
            for (ki, &kw) in kernel.iter().enumerate() {
                let sy = y + ki as i64 - radius;
                if (0..h).contains(&sy) {
                    acc += kw * tmp[(sy * w + x) as usize];
                }
            }
            out[(y * w + x) as usize] = acc;
        }
    }

    out
}

fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let sigma = sigma.max(f32::EPSILON);
    let radius = (4.0 * sigma).ceil() as i64;
    let denom = 2.0 * sigma * sigma;

    let mut weights = Vec::with_capacity((2 * radius + 1) as usize);
    let mut sum = 0f32;
    for i in -radius..=radius {
        let x = i as f32;
        let w = (-x * x / denom).exp();
        weights.push(w);
        sum += w;
    }
    for w in &mut weights {
        *w /= sum;
    }
    weights
}

/// Plasma-style colormap: anchor colors with linear interpolation.
fn plasma(t: f32) -> Rgb<u8> {
    const ANCHORS: [[f32; 3]; 5] = [
        [13.0, 8.0, 135.0],
        [126.0, 3.0, 168.0],
        [204.0, 71.0, 120.0],
        [248.0, 149.0, 64.0],
        [240.0, 249.0, 33.0],
    ];

    let t = t.clamp(0.0, 1.0);
    let pos = t * (ANCHORS.len() - 1) as f32;
    let lo = (pos.floor() as usize).min(ANCHORS.len() - 2);
    let frac = pos - lo as f32;

    let mut rgb = [0u8; 3];
    for (c, v) in rgb.iter_mut().enumerate() {
        let a = ANCHORS[lo][c];
        let b = ANCHORS[lo + 1][c];
        *v = (a + (b - a) * frac).round() as u8;
    }
    Rgb(rgb)
}
