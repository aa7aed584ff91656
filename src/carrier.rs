// vortexstore - Data compression resistant video generator.
// Copyright 2025 0verv0ltage
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Carrier video probing: pixel dimensions and frame count, obtained once
//! via an external `ffprobe` invocation. Only this much is consumed from
//! the carrier; codec and bitrate choices are the external tool's concern.

use std::path::Path;
use std::process::Command;

use serde::Deserialize;

use crate::error::VortexError;

/// Pixel dimensions and frame count of a probed carrier video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CarrierProbe {
    /// Carrier frame width in pixels.
    pub width: u32,
    /// Carrier frame height in pixels.
    pub height: u32,
    /// Total number of frames in the carrier stream.
    pub frame_count: u64,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    width: u32,
    height: u32,
    #[serde(default)]
    nb_read_frames: Option<String>,
}

/// Probe `video_path` for its pixel dimensions and total frame count.
pub fn probe(ffprobe_path: &Path, video_path: &Path) -> Result<CarrierProbe, VortexError> {
    let output = Command::new(ffprobe_path)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-count_frames",
            "-show_entries",
            "stream=width,height,nb_read_frames",
            "-of",
            "json",
        ])
        .arg(video_path)
        .output()
        .map_err(|err| VortexError::Io(format!("spawning ffprobe: {err}")))?;

    if !output.status.success() {
        return Err(VortexError::Io(format!(
            "ffprobe exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    let parsed: FfprobeOutput = serde_json::from_slice(&output.stdout)
        .map_err(|err| VortexError::Io(format!("parsing ffprobe output: {err}")))?;
    let stream = parsed
        .streams
        .first()
        .ok_or_else(|| VortexError::Io("ffprobe reported no video stream".to_string()))?;
    let frame_count = stream
        .nb_read_frames
        .as_deref()
        .unwrap_or("0")
        .parse()
        .map_err(|err| VortexError::Io(format!("parsing ffprobe frame count: {err}")))?;

    Ok(CarrierProbe {
        width: stream.width,
        height: stream.height,
        frame_count,
    })
}
