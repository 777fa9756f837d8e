mod bbox;
mod density;

use image::RgbImage;

pub use bbox::BoundingBoxRenderer;
pub use density::{DensityConfig, DensityMapRenderer};

use crate::{error::ReelResult, model::FrameRecord};

/// Turns a raw frame image plus its record into a visualization image of
/// the same resolution. Implementations are pure per frame and shared
/// across render workers.
pub trait Renderer: Send + Sync {
    fn render(&self, image: &RgbImage, record: &FrameRecord) -> ReelResult<RgbImage>;
}

/// The closed set of visualization variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RendererKind {
    Passthrough,
    BoundingBox,
    DensityMap,
}

/// Identity renderer, used when only captions are wanted on top of the raw
/// footage.
#[derive(Clone, Copy, Debug, Default)]
pub struct PassthroughRenderer;

impl Renderer for PassthroughRenderer {
    fn render(&self, image: &RgbImage, _record: &FrameRecord) -> ReelResult<RgbImage> {
        Ok(image.clone())
    }
}

pub fn create_renderer(kind: RendererKind) -> Box<dyn Renderer> {
    match kind {
        RendererKind::Passthrough => Box::new(PassthroughRenderer),
        RendererKind::BoundingBox => Box::new(BoundingBoxRenderer::default()),
        RendererKind::DensityMap => Box::new(DensityMapRenderer::default()),
    }
}
