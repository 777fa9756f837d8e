use std::{
    fs::File,
    io::{BufReader, BufWriter, Write as _},
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use tracing::info;

use crate::{
    error::{ReelError, ReelResult},
    model::TraceDocument,
};

/// Persist a [`TraceDocument`] as pretty JSON at `path`.
///
/// The document is written to a sibling temporary file and renamed into
/// place only after a successful flush, so a failed save never leaves a
/// half-written store behind.
pub fn save_document(doc: &TraceDocument, path: &Path) -> ReelResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create store directory '{}'", parent.display()))?;
    }

    let tmp = staging_path(path);
    let result = write_pretty_json(doc, &tmp).and_then(|()| {
        std::fs::rename(&tmp, path)
            .with_context(|| format!("finalize record store '{}'", path.display()))
            .map_err(ReelError::from)
    });

    if result.is_err() {
        let _ = std::fs::remove_file(&tmp);
    } else {
        info!(frames = doc.len(), path = %path.display(), "saved record store");
    }
    result
}

/// Load a [`TraceDocument`] previously written by [`save_document`].
pub fn load_document(path: &Path) -> ReelResult<TraceDocument> {
    let f = File::open(path).with_context(|| format!("open record store '{}'", path.display()))?;
    let doc: TraceDocument = serde_json::from_reader(BufReader::new(f))
        .map_err(|e| ReelError::serde(format!("parse record store '{}': {e}", path.display())))?;
    Ok(doc)
}

fn write_pretty_json(doc: &TraceDocument, path: &Path) -> ReelResult<()> {
    let f =
        File::create(path).with_context(|| format!("create record store '{}'", path.display()))?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer_pretty(&mut w, doc)
        .map_err(|e| ReelError::serde(format!("encode record store: {e}")))?;
    w.flush()
        .with_context(|| format!("flush record store '{}'", path.display()))?;
    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
