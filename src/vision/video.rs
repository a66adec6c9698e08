// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Video frame decoding and sampled detection statistics

use std::ffi::OsString;
use std::io::{self, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::detection::{DetectionError, FRAME_SAMPLE_INTERVAL};
use super::detector::ObjectDetector;
use super::frame::{Frame, PixelLayout};

/// Sequential source of decoded frames
pub trait FrameReader: Send {
    /// Next frame, or `None` once the stream is exhausted
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Advance past one frame without handing it out; `false` at end of stream
    fn skip_frame(&mut self) -> Result<bool> {
        Ok(self.next_frame()?.is_some())
    }
}

/// Opens a video file for sequential decoding
pub trait VideoDecoder: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameReader>>;
}

/// Aggregate statistics for one processed video
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoSummary {
    pub total_frames: u64,
    pub processed_frames: u64,
    pub total_detections: u64,
    pub avg_processing_time: f64,
    pub fps: f64,
}

/// Walk every frame, running the detector on each sampled one
///
/// Detections are counted without any confidence filter.
pub fn summarize_video(
    detector: &dyn ObjectDetector,
    frames: &mut dyn FrameReader,
) -> Result<VideoSummary, DetectionError> {
    let mut total_frames: u64 = 0;
    let mut processed_frames: u64 = 0;
    let mut total_detections: u64 = 0;
    let mut total_time = 0.0_f64;

    loop {
        if (total_frames + 1) % FRAME_SAMPLE_INTERVAL != 0 {
            if !frames.skip_frame().map_err(DetectionError::Video)? {
                break;
            }
            total_frames += 1;
            continue;
        }

        let Some(frame) = frames.next_frame().map_err(DetectionError::Video)? else {
            break;
        };
        total_frames += 1;

        let start = Instant::now();
        let boxes = detector.detect(&frame).map_err(DetectionError::Inference)?;
        total_time += start.elapsed().as_secs_f64();

        processed_frames += 1;
        total_detections += boxes.len() as u64;
    }

    let avg_processing_time = if processed_frames > 0 {
        total_time / processed_frames as f64
    } else {
        0.0
    };
    let fps = if avg_processing_time > 0.0 {
        1.0 / avg_processing_time
    } else {
        0.0
    };

    debug!(
        "Video summary: {} frames, {} processed, {} detections",
        total_frames, processed_frames, total_detections
    );

    Ok(VideoSummary {
        total_frames,
        processed_frames,
        total_detections,
        avg_processing_time,
        fps,
    })
}

/// Open `path` with `decoder` and summarize it; the decoder is released before returning
pub fn detect_video(
    detector: &dyn ObjectDetector,
    decoder: &dyn VideoDecoder,
    path: &Path,
) -> Result<VideoSummary, DetectionError> {
    let mut frames = decoder.open(path).map_err(DetectionError::Video)?;
    let summary = summarize_video(detector, frames.as_mut());
    drop(frames);
    summary
}

/// Decoder backed by the `ffprobe`/`ffmpeg` binaries
#[derive(Debug, Clone)]
pub struct FfmpegDecoder {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl Default for FfmpegDecoder {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

impl FfmpegDecoder {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    fn probe_dimensions(&self, path: &Path) -> Result<(u32, u32)> {
        let output = Command::new(&self.ffprobe)
            .arg("-v")
            .arg("error")
            .arg("-select_streams")
            .arg("v:0")
            .arg("-show_entries")
            .arg("stream=width,height")
            .arg("-of")
            .arg("csv=s=x:p=0")
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("Failed to run {}", self.ffprobe.display()))?;

        if !output.status.success() {
            return Err(anyhow!(
                "ffprobe exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        parse_dimensions(&String::from_utf8_lossy(&output.stdout))
    }
}

impl VideoDecoder for FfmpegDecoder {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameReader>> {
        let (width, height) = self.probe_dimensions(path)?;
        check_frame_size(width, height)?;

        let mut command = Command::new(&self.ffmpeg);
        command.args(ffmpeg_args(path, width, height));

        debug!("ffmpeg decoding {} at {}x{}", path.display(), width, height);

        let reader = FfmpegFrameReader::spawn(command, width, height)
            .with_context(|| format!("Failed to spawn {}", self.ffmpeg.display()))?;
        Ok(Box::new(reader))
    }
}

/// Largest decoded frame accepted, in pixels (8K UHD)
pub const MAX_FRAME_PIXELS: u64 = 7680 * 4320;

/// Bytes of ffmpeg stderr kept for diagnostics
const STDERR_LIMIT: u64 = 16 * 1024;

fn check_frame_size(width: u32, height: u32) -> Result<()> {
    if width as u64 * height as u64 > MAX_FRAME_PIXELS {
        return Err(anyhow!(
            "video stream {}x{} exceeds the {} pixel frame limit",
            width,
            height,
            MAX_FRAME_PIXELS
        ));
    }
    Ok(())
}

/// Arguments decoding the first video stream of `path` to raw BGR frames of `width`x`height`
///
/// The stream is pinned to `0:v:0`, the one ffprobe measured, and scaled to the
/// probed size so every frame on the pipe has the same byte length.
fn ffmpeg_args(path: &Path, width: u32, height: u32) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-hide_banner", "-loglevel", "error", "-noautorotate", "-i"]
        .into_iter()
        .map(OsString::from)
        .collect();
    args.push(path.as_os_str().to_os_string());
    args.extend(
        [
            "-map".to_string(),
            "0:v:0".to_string(),
            "-an".to_string(),
            "-vf".to_string(),
            format!("scale={}:{}", width, height),
            "-f".to_string(),
            "rawvideo".to_string(),
            "-pix_fmt".to_string(),
            "bgr24".to_string(),
            "-".to_string(),
        ]
        .into_iter()
        .map(OsString::from),
    );
    args
}

/// Parse `WIDTHxHEIGHT` as printed by ffprobe
fn parse_dimensions(text: &str) -> Result<(u32, u32)> {
    let line = text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or_else(|| anyhow!("no video stream found"))?;

    let mut parts = line.split('x').filter(|p| !p.is_empty());
    let width: u32 = parts
        .next()
        .ok_or_else(|| anyhow!("missing width in {:?}", line))?
        .parse()
        .with_context(|| format!("invalid width in {:?}", line))?;
    let height: u32 = parts
        .next()
        .ok_or_else(|| anyhow!("missing height in {:?}", line))?
        .parse()
        .with_context(|| format!("invalid height in {:?}", line))?;

    if width == 0 || height == 0 {
        return Err(anyhow!("video stream has zero size"));
    }
    Ok((width, height))
}

struct FfmpegFrameReader {
    child: Child,
    stdout: ChildStdout,
    stderr: Option<JoinHandle<String>>,
    width: u32,
    height: u32,
    buffer: Vec<u8>,
    exit_status: Option<ExitStatus>,
}

impl FfmpegFrameReader {
    /// Spawn `command` writing raw BGR frames of `width`x`height` to stdout
    fn spawn(mut command: Command, width: u32, height: u32) -> Result<Self> {
        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(anyhow!("failed to capture ffmpeg stdout"));
            }
        };

        // Drained off-thread; only the first STDERR_LIMIT bytes are kept
        let stderr = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || {
                let mut captured = Vec::new();
                let _ = (&mut stderr).take(STDERR_LIMIT).read_to_end(&mut captured);
                let _ = io::copy(&mut stderr, &mut io::sink());
                String::from_utf8_lossy(&captured).trim().to_string()
            })
        });

        Ok(Self {
            child,
            stdout,
            stderr,
            width,
            height,
            buffer: vec![0u8; width as usize * height as usize * PixelLayout::Bgr8.channels()],
            exit_status: None,
        })
    }

    /// Fill the frame buffer; `false` at end of stream
    fn read_into_buffer(&mut self) -> Result<bool> {
        if self.exit_status.is_some() {
            return Ok(false);
        }
        match self.stdout.read_exact(&mut self.buffer) {
            Ok(()) => Ok(true),
            // A trailing partial frame is treated as end of stream
            Err(err) if err.kind() == ErrorKind::UnexpectedEof => {
                self.finish()?;
                Ok(false)
            }
            Err(err) => Err(err).context("failed to read frame from ffmpeg"),
        }
    }

    /// Reap the exited decoder, logging a failed exit with its stderr
    fn finish(&mut self) -> Result<()> {
        let status = self.child.wait().context("failed to wait for ffmpeg")?;
        self.exit_status = Some(status);

        let stderr = self
            .stderr
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if !status.success() {
            warn!(
                "⚠️ ffmpeg exited with {} before the end of the video: {}",
                status, stderr
            );
        } else if !stderr.is_empty() {
            debug!("ffmpeg stderr: {}", stderr);
        }
        Ok(())
    }
}

impl FrameReader for FfmpegFrameReader {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if !self.read_into_buffer()? {
            return Ok(None);
        }
        Ok(Frame::from_raw(
            self.width,
            self.height,
            PixelLayout::Bgr8,
            self.buffer.clone(),
        ))
    }

    fn skip_frame(&mut self) -> Result<bool> {
        self.read_into_buffer()
    }
}

impl Drop for FfmpegFrameReader {
    fn drop(&mut self) {
        if self.exit_status.is_some() {
            return;
        }
        if let Err(e) = self.child.kill() {
            // Already exited
            if e.kind() != ErrorKind::InvalidInput {
                warn!("Failed to kill ffmpeg: {}", e);
            }
        }
        let _ = self.child.wait();
        if let Some(handle) = self.stderr.take() {
            let _ = handle.join();
        }
    }
}
