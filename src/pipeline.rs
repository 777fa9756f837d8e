use image::RgbImage;
use rayon::prelude::*;
use tracing::info;

use crate::{
    config::DatasetConfig,
    error::{ReelError, ReelResult},
    model::{FrameRecord, TraceDocument},
    overlay::TextOverlay,
    render::Renderer,
};

/// One rendered frame plus how long it should stay on screen.
#[derive(Clone, Debug)]
pub struct RenderedFrame {
    pub frame_index: u64,
    pub image: RgbImage,
    pub duration_secs: f64,
}

/// Supplies the raw frame image for a frame index. External collaborator
/// boundary; tests substitute in-memory sources.
pub trait FrameSource: Send + Sync {
    fn load_frame(&self, frame_index: u64) -> ReelResult<RgbImage>;
}

/// Loads `Frame <n>.png` files from the dataset root.
#[derive(Clone, Debug)]
pub struct DirFrameSource {
    cfg: DatasetConfig,
}

impl DirFrameSource {
    pub fn new(cfg: DatasetConfig) -> Self {
        Self { cfg }
    }
}

impl FrameSource for DirFrameSource {
    fn load_frame(&self, frame_index: u64) -> ReelResult<RgbImage> {
        let path = self.cfg.frame_image_path(frame_index);
        if !path.exists() {
            return Err(ReelError::FrameNotFound(frame_index));
        }
        let img = image::open(&path)
            .map_err(|e| ReelError::render(format!("decode '{}': {e}", path.display())))?;
        Ok(img.to_rgb8())
    }
}

#[derive(Clone, Debug, Default)]
pub struct RenderThreading {
    pub parallel: bool,
    pub threads: Option<usize>,
}

/// The caption set the reference footage shipped with.
pub fn default_captions(record: &FrameRecord) -> Vec<String> {
    vec![
        format!("Number of people: {}", record.people_count),
        format!("Frame rate: {}", record.frame_rate),
        "Project link: https://github.com/darinchau/crowd_counting".to_string(),
        "Project link: https://github.com/darinchau/urop-crowd-generator".to_string(),
    ]
}

/// Render every requested frame: load the raw image, apply the renderer,
/// stamp captions, pair with its display duration.
///
/// Each frame is a pure function of its own inputs, so the batch fans out
/// over a rayon pool when asked to. Workers may finish out of order; the
/// result is re-sorted by frame index before returning, since video order
/// encodes time order. A missing image or record fails the whole batch,
/// because a gapped video cannot be recovered downstream.
pub fn render_all<F>(
    frame_indices: &[u64],
    doc: &TraceDocument,
    renderer: &dyn Renderer,
    overlay: Option<&TextOverlay>,
    captions: F,
    source: &dyn FrameSource,
    threading: &RenderThreading,
) -> ReelResult<Vec<RenderedFrame>>
where
    F: Fn(&FrameRecord) -> Vec<String> + Sync,
{
    if frame_indices.is_empty() {
        return Err(ReelError::validation("render batch must be non-empty"));
    }

    info!(
        frames = frame_indices.len(),
        parallel = threading.parallel,
        "rendering frames"
    );

    let render_one = |&frame_index: &u64| -> ReelResult<RenderedFrame> {
        let record = doc
            .get(frame_index)
            .ok_or(ReelError::FrameNotFound(frame_index))?;
        let raw = source.load_frame(frame_index)?;
        let mut image = renderer.render(&raw, record)?;
        if let Some(overlay) = overlay {
            overlay.apply(&mut image, &captions(record));
        }
        Ok(RenderedFrame {
            frame_index,
            image,
            duration_secs: record.display_duration_secs(),
        })
    };

    let mut frames = if threading.parallel {
        let pool = build_thread_pool(threading.threads)?;
        pool.install(|| {
            frame_indices
                .par_iter()
                .map(render_one)
                .collect::<ReelResult<Vec<_>>>()
        })?
    } else {
        frame_indices
            .iter()
            .map(render_one)
            .collect::<ReelResult<Vec<_>>>()?
    };

    frames.sort_by_key(|f| f.frame_index);
    Ok(frames)
}

fn build_thread_pool(threads: Option<usize>) -> ReelResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(ReelError::validation(
            "render threading 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| ReelError::render(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::render::PassthroughRenderer;

    struct SolidSource;

    impl FrameSource for SolidSource {
        fn load_frame(&self, frame_index: u64) -> ReelResult<RgbImage> {
            if frame_index > 100 {
                return Err(ReelError::FrameNotFound(frame_index));
            }
            Ok(RgbImage::from_pixel(
                8,
                6,
                image::Rgb([frame_index as u8, 0, 0]),
            ))
        }
    }

    fn doc_with(rates: &[(u64, f64)]) -> TraceDocument {
        let mut frames = BTreeMap::new();
        for &(idx, rate) in rates {
            frames.insert(
                idx,
                FrameRecord {
                    people_count: 0,
                    frame_rate: rate,
                    people: vec![],
                },
            );
        }
        TraceDocument::new(frames)
    }

    #[test]
    fn renders_in_frame_index_order_with_durations() {
        let doc = doc_with(&[(1, 24.0), (2, 12.0), (3, 24.0)]);
        let frames = render_all(
            &[3, 1, 2],
            &doc,
            &PassthroughRenderer,
            None,
            default_captions,
            &SolidSource,
            &RenderThreading::default(),
        )
        .unwrap();

        let order: Vec<u64> = frames.iter().map(|f| f.frame_index).collect();
        assert_eq!(order, vec![1, 2, 3]);
        assert!((frames[1].duration_secs - 1.0 / 12.0).abs() < 1e-12);
    }

    #[test]
    fn parallel_results_are_sorted_by_frame_index() {
        let entries: Vec<(u64, f64)> = (1..=32).map(|i| (i, 24.0)).collect();
        let doc = doc_with(&entries);
        let mut indices: Vec<u64> = (1..=32).rev().collect();
        indices.rotate_left(7);

        let frames = render_all(
            &indices,
            &doc,
            &PassthroughRenderer,
            None,
            default_captions,
            &SolidSource,
            &RenderThreading {
                parallel: true,
                threads: Some(4),
            },
        )
        .unwrap();

        let order: Vec<u64> = frames.iter().map(|f| f.frame_index).collect();
        assert_eq!(order, (1..=32).collect::<Vec<_>>());
    }

    #[test]
    fn missing_record_fails_the_batch() {
        let doc = doc_with(&[(1, 24.0)]);
        let err = render_all(
            &[1, 2],
            &doc,
            &PassthroughRenderer,
            None,
            default_captions,
            &SolidSource,
            &RenderThreading::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ReelError::FrameNotFound(2)));
    }

    #[test]
    fn missing_image_fails_the_batch() {
        let doc = doc_with(&[(500, 24.0)]);
        let err = render_all(
            &[500],
            &doc,
            &PassthroughRenderer,
            None,
            default_captions,
            &SolidSource,
            &RenderThreading::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ReelError::FrameNotFound(500)));
    }

    #[test]
    fn empty_batch_is_rejected() {
        let doc = doc_with(&[(1, 24.0)]);
        assert!(
            render_all(
                &[],
                &doc,
                &PassthroughRenderer,
                None,
                default_captions,
                &SolidSource,
                &RenderThreading::default(),
            )
            .is_err()
        );
    }

    #[test]
    fn zero_threads_is_rejected() {
        let doc = doc_with(&[(1, 24.0)]);
        let err = render_all(
            &[1],
            &doc,
            &PassthroughRenderer,
            None,
            default_captions,
            &SolidSource,
            &RenderThreading {
                parallel: true,
                threads: Some(0),
            },
        )
        .unwrap_err();
        assert!(matches!(err, ReelError::Validation(_)));
    }

    #[test]
    fn default_captions_lead_with_people_count() {
        let record = FrameRecord {
            people_count: 7,
            frame_rate: 24.0,
            people: vec![],
        };
        let lines = default_captions(&record);
        assert_eq!(lines[0], "Number of people: 7");
        assert_eq!(lines[1], "Frame rate: 24");
    }
}
