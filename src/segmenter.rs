// vortexstore - Data compression resistant video generator.
// Copyright 2025 0verv0ltage
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Writes painted frames out as H.264 segment files: rotating
//! `content_partNNNN.mp4` files for `DataContent` every
//! `frames_per_content_part_file` logical frames, and single dedicated
//! `metadata.mp4`/`pre_metadata.mp4` files for the other two content types.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use image::RgbImage;

use crate::config::Config;
use crate::constants::{COLOR_RANGE, COLORSPACE, H264_CRF};
use crate::content_type::ContentType;
use crate::error::VortexError;
use crate::filesys;

/// One segment written to disk, tagged with the content type it carries.
#[derive(Debug, Clone)]
pub struct Segment {
    /// Path of the encoded segment file.
    pub path: PathBuf,
    /// Which content type this segment belongs to.
    pub content_type: ContentType,
    /// Total raw video frames written to this segment (logical frames times
    /// their repetition count), used to estimate its playback duration.
    pub raw_frame_count: u64,
}

/// Every segment produced by a completed encode run, in write order.
#[derive(Debug, Clone, Default)]
pub struct SegmentManifest {
    /// Segments in the order they were closed.
    pub segments: Vec<Segment>,
}

/// Owns the currently open ffmpeg child process (if any) and rotates
/// segments as content type changes or a part file fills up.
pub struct Segmenter<'a> {
    cfg: &'a Config,
    work_dir: PathBuf,
    extension: &'static str,
    current: Option<OpenSegment>,
    next_part_index: usize,
    manifest: SegmentManifest,
}

struct OpenSegment {
    child: Child,
    path: PathBuf,
    content_type: ContentType,
    frames_written: usize,
    raw_frame_count: u64,
}

impl<'a> Segmenter<'a> {
    /// Create a segmenter writing segment files under `work_dir`.
    pub fn new(cfg: &'a Config, work_dir: &Path) -> Result<Self, VortexError> {
        std::fs::create_dir_all(work_dir)?;
        Ok(Self {
            cfg,
            work_dir: work_dir.to_path_buf(),
            extension: "mp4",
            current: None,
            next_part_index: 1,
            manifest: SegmentManifest::default(),
        })
    }

    /// Write `frame` as `repetitions` successive identical frames of
    /// `content_type`, opening or rotating segment files as needed.
    pub fn write_frame(&mut self, content_type: ContentType, frame: &RgbImage, repetitions: u32) -> Result<(), VortexError> {
        self.ensure_segment_for(content_type)?;
        let raw = to_bgr24(frame);

        let segment = self.current.as_mut().expect("segment opened by ensure_segment_for");
        let stdin = segment.child.stdin.as_mut().expect("piped stdin");
        for _ in 0..repetitions.max(1) {
            stdin
                .write_all(&raw)
                .map_err(|err| VortexError::Io(format!("writing frame to ffmpeg stdin: {err}")))?;
        }
        segment.frames_written += 1;
        segment.raw_frame_count += repetitions.max(1) as u64;

        if content_type == ContentType::DataContent && segment.frames_written >= self.cfg.frames_per_content_part_file {
            self.close_current()?;
        }
        Ok(())
    }

    /// Close any still-open segment and return the manifest of every
    /// segment produced.
    pub fn finish(mut self) -> Result<SegmentManifest, VortexError> {
        self.close_current()?;
        Ok(self.manifest)
    }

    fn ensure_segment_for(&mut self, content_type: ContentType) -> Result<(), VortexError> {
        let needs_new = match &self.current {
            None => true,
            Some(segment) => segment.content_type != content_type,
        };
        if needs_new {
            self.close_current()?;
            self.current = Some(self.open_segment(content_type)?);
        }
        Ok(())
    }

    fn open_segment(&mut self, content_type: ContentType) -> Result<OpenSegment, VortexError> {
        let name = match content_type {
            ContentType::DataContent => {
                let name = filesys::content_part_name(self.next_part_index, self.extension);
                self.next_part_index += 1;
                name
            }
            ContentType::Metadata => filesys::metadata_name(self.extension),
            ContentType::PreMetadata => filesys::pre_metadata_name(self.extension),
        };
        let path = self.work_dir.join(name);

        let child = Command::new(&self.cfg.ffmpeg_path)
            .args(["-hide_banner", "-loglevel", "error"])
            .args(["-f", "rawvideo", "-pix_fmt", "bgr24"])
            .arg("-s")
            .arg(format!("{}x{}", self.cfg.frame_width, self.cfg.frame_height))
            .arg("-r")
            .arg(self.cfg.output_fps.to_string())
            .args(["-i", "-"])
            .args(["-an", "-c:v", "libx264", "-preset", self.cfg.encoder_preset()])
            .arg("-crf")
            .arg(H264_CRF.to_string())
            .args(["-profile:v", "high"])
            .args(["-colorspace:v", COLORSPACE, "-color_primaries:v", COLORSPACE, "-color_trc:v", COLORSPACE])
            .args(["-color_range:v", COLOR_RANGE, "-pix_fmt", "yuv420p", "-y"])
            .arg(&path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| VortexError::Io(format!("spawning ffmpeg segment writer: {err}")))?;

        Ok(OpenSegment { child, path, content_type, frames_written: 0, raw_frame_count: 0 })
    }

    fn close_current(&mut self) -> Result<(), VortexError> {
        let Some(mut segment) = self.current.take() else {
            return Ok(());
        };
        // Dropping stdin signals EOF; ffmpeg flushes and exits on its own.
        segment.child.stdin.take();
        let status = segment
            .child
            .wait()
            .map_err(|err| VortexError::Io(format!("waiting for ffmpeg segment writer: {err}")))?;
        if !status.success() {
            return Err(VortexError::Io(format!(
                "ffmpeg exited with {status} writing segment {}",
                segment.path.display()
            )));
        }
        self.manifest.segments.push(Segment {
            path: segment.path,
            content_type: segment.content_type,
            raw_frame_count: segment.raw_frame_count,
        });
        Ok(())
    }
}

/// Convert an `image`-native RGB buffer to the BGR24 byte layout ffmpeg's
/// `rawvideo` demuxer expects on stdin.
fn to_bgr24(frame: &RgbImage) -> Vec<u8> {
    let mut raw = frame.as_raw().clone();
    for px in raw.chunks_exact_mut(3) {
        px.swap(0, 2);
    }
    raw
}
