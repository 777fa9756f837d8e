use std::path::{Path, PathBuf};

/// Locations of one dataset on disk.
///
/// The dataset root is explicit configuration threaded through every entry
/// point; nothing in the crate reads an ambient path.
#[derive(Clone, Debug)]
pub struct DatasetConfig {
    /// Directory holding `data.txt`, `position.json` and the frame images.
    pub root: PathBuf,
    /// TTF/OTF font used for caption overlays, when captions are wanted.
    pub font_path: Option<PathBuf>,
}

impl DatasetConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            font_path: None,
        }
    }

    pub fn with_font_path(mut self, font_path: impl Into<PathBuf>) -> Self {
        self.font_path = Some(font_path.into());
        self
    }

    /// The raw trace text.
    pub fn trace_path(&self) -> PathBuf {
        self.root.join("data.txt")
    }

    /// The structured record store.
    pub fn record_store_path(&self) -> PathBuf {
        self.root.join("position.json")
    }

    /// Raw frame images follow the capture tool's `Frame <n>.png` naming.
    pub fn frame_image_path(&self, frame_index: u64) -> PathBuf {
        self.root.join(format!("Frame {frame_index}.png"))
    }
}

impl AsRef<Path> for DatasetConfig {
    fn as_ref(&self) -> &Path {
        &self.root
    }
}
