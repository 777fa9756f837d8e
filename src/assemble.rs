use std::{
    path::{Path, PathBuf},
    process::{Child, ChildStdin, Command, Stdio},
};

use anyhow::Context as _;
use tracing::info;

use crate::{
    error::{ReelError, ReelResult},
    pipeline::RenderedFrame,
};

#[derive(Clone, Debug)]
pub struct EncodeConfig {
    pub width: u32,
    pub height: u32,
    /// Encoding tick rate. Display durations are realized by repeating
    /// frames across ticks, not by changing this rate.
    pub fps: u32,
    pub out_path: PathBuf,
    pub overwrite: bool,
}

impl EncodeConfig {
    pub fn validate(&self) -> ReelResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ReelError::validation(
                "encode width/height must be non-zero",
            ));
        }
        if self.fps == 0 {
            return Err(ReelError::validation("encode fps must be non-zero"));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            // With the default settings we target yuv420p output for maximum compatibility.
            return Err(ReelError::validation(
                "encode width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        Ok(())
    }
}

pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn ensure_parent_dir(path: &Path) -> ReelResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// How many encoder ticks each frame occupies at `rate` ticks per second.
///
/// Each frame gets at least one tick, and the cumulative tick count tracks
/// the cumulative duration target, so per-frame rounding error never
/// accumulates: the total equals `round(sum(durations) * rate)` and the
/// output duration is preserved independent of the tick rate.
pub fn plan_ticks(durations: &[f64], rate: u32) -> ReelResult<Vec<u64>> {
    if rate == 0 {
        return Err(ReelError::assembly("encoding rate must be non-zero"));
    }

    let mut ticks = Vec::with_capacity(durations.len());
    let mut target_secs = 0f64;
    let mut emitted = 0u64;
    for (i, &d) in durations.iter().enumerate() {
        if !d.is_finite() || d <= 0.0 {
            return Err(ReelError::assembly(format!(
                "frame at position {i} has non-positive display duration {d}"
            )));
        }
        target_secs += d;
        let want = (target_secs * f64::from(rate)).round() as u64;
        let repeat = want.saturating_sub(emitted).max(1);
        ticks.push(repeat);
        emitted += repeat;
    }
    Ok(ticks)
}

/// Concatenate rendered frames into a single video, holding each frame on
/// screen for its display duration.
///
/// The encoder writes to a sibling `.part` path and renames into place only
/// after ffmpeg exits cleanly; a failed assembly never leaves a half-written
/// output file.
pub fn assemble(
    frames: &[RenderedFrame],
    out_path: impl Into<PathBuf>,
    encoding_rate: u32,
) -> ReelResult<()> {
    let out_path = out_path.into();

    let Some(first) = frames.first() else {
        return Err(ReelError::assembly("no frames to assemble"));
    };
    let (width, height) = first.image.dimensions();
    for f in frames {
        if f.image.dimensions() != (width, height) {
            return Err(ReelError::assembly(format!(
                "frame {} is {}x{}, expected {}x{}",
                f.frame_index,
                f.image.width(),
                f.image.height(),
                width,
                height
            )));
        }
    }

    let durations: Vec<f64> = frames.iter().map(|f| f.duration_secs).collect();
    let ticks = plan_ticks(&durations, encoding_rate)?;

    let cfg = EncodeConfig {
        width,
        height,
        fps: encoding_rate,
        out_path: out_path.clone(),
        overwrite: true,
    };

    let staging = staging_path(&out_path);
    let mut sink = FfmpegSink::spawn(&cfg, &staging)?;
    let mut guard = StagingGuard(Some(staging.clone()));

    for (frame, &repeat) in frames.iter().zip(&ticks) {
        for _ in 0..repeat {
            sink.write_frame(frame.image.as_raw())?;
        }
    }
    sink.finish()?;

    std::fs::rename(&staging, &out_path)
        .with_context(|| format!("finalize video '{}'", out_path.display()))?;
    guard.0 = None;

    let total_ticks: u64 = ticks.iter().sum();
    info!(
        frames = frames.len(),
        ticks = total_ticks,
        seconds = total_ticks as f64 / f64::from(encoding_rate),
        path = %out_path.display(),
        "encoded video"
    );
    Ok(())
}

/// Streams raw rgb24 frames into a spawned `ffmpeg` process.
///
/// We intentionally drive the system `ffmpeg` binary rather than linking
/// native FFmpeg, which would drag in dev header/lib requirements.
struct FfmpegSink {
    frame_len: usize,
    child: Child,
    stdin: Option<ChildStdin>,
}

impl FfmpegSink {
    fn spawn(cfg: &EncodeConfig, staging: &Path) -> ReelResult<Self> {
        cfg.validate()?;
        ensure_parent_dir(&cfg.out_path)?;

        if !cfg.overwrite && cfg.out_path.exists() {
            return Err(ReelError::validation(format!(
                "output file '{}' already exists",
                cfg.out_path.display()
            )));
        }

        if !is_ffmpeg_on_path() {
            return Err(ReelError::assembly(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        cmd.args([
            "-y",
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
            "-r",
            &cfg.fps.to_string(),
            "-i",
            "pipe:0",
            "-an",
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
            "-f",
            "mp4",
        ])
        .arg(staging);

        let mut child = cmd.spawn().map_err(|e| {
            ReelError::assembly(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ReelError::assembly("failed to open ffmpeg stdin (unexpected)"))?;

        Ok(Self {
            frame_len: (cfg.width as usize) * (cfg.height as usize) * 3,
            child,
            stdin: Some(stdin),
        })
    }

    fn write_frame(&mut self, rgb: &[u8]) -> ReelResult<()> {
        if rgb.len() != self.frame_len {
            return Err(ReelError::assembly(
                "frame buffer size mismatch with width*height*3",
            ));
        }

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(ReelError::assembly("ffmpeg encoder is already finalized"));
        };

        use std::io::Write as _;
        stdin
            .write_all(rgb)
            .map_err(|e| ReelError::assembly(format!("failed to write frame to ffmpeg: {e}")))?;
        Ok(())
    }

    fn finish(mut self) -> ReelResult<()> {
        drop(self.stdin.take());

        let output = self
            .child
            .wait_with_output()
            .map_err(|e| ReelError::assembly(format!("failed to wait for ffmpeg: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ReelError::assembly(format!(
                "ffmpeg exited with status {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(())
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

struct StagingGuard(Option<PathBuf>);

impl Drop for StagingGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}
