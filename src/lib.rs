#![forbid(unsafe_code)]

pub mod assemble;
pub mod config;
pub mod error;
pub mod model;
pub mod overlay;
pub mod parse;
pub mod pipeline;
pub mod render;
pub mod store;

pub use assemble::{EncodeConfig, assemble, is_ffmpeg_on_path, plan_ticks};
pub use config::DatasetConfig;
pub use error::{ReelError, ReelResult};
pub use model::{BoundingBox, FrameRecord, PersonPosition, TraceDocument};
pub use overlay::TextOverlay;
pub use parse::parse_trace;
pub use pipeline::{
    DirFrameSource, FrameSource, RenderThreading, RenderedFrame, default_captions, render_all,
};
pub use render::{
    BoundingBoxRenderer, DensityConfig, DensityMapRenderer, PassthroughRenderer, Renderer,
    RendererKind, create_renderer,
};
pub use store::{load_document, save_document};
