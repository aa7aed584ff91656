// vortexstore - Data compression resistant video generator.
// Copyright 2025 0verv0ltage
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Configuration: a TOML document carrying every tunable of the frame
//! codec, stream protocol, and pipeline, plus the derived geometry computed
//! once at load time.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::content_type::ContentType;
use crate::error::VortexError;

/// `[frame]` section: pixel geometry and output cadence.
#[derive(Debug, Clone, Deserialize)]
struct RawFrame {
    frame_width: u32,
    frame_height: u32,
    margin: u32,
    padding: u32,
    output_fps: u32,
    encoding_speed: u32,
    use_same_bgr_frame_for_repetetion: bool,
}

/// `[content]` section: per-content-type geometry and repetition, indexed
/// in `ContentType::ALL` order (`[PREMETADATA, METADATA, DATACONTENT]`).
#[derive(Debug, Clone, Deserialize)]
struct RawContent {
    data_box_size_step: [u32; 3],
    pick_frame_to_read: [u32; 3],
    total_frames_repetition: [u32; 3],
}

/// `[encoding]` section: the color alphabet and its tolerance.
#[derive(Debug, Clone, Deserialize)]
struct RawEncoding {
    encoding_map_path: PathBuf,
    color_threshold_percent: f64,
    allow_byte_to_be_split_between_frames: bool,
}

/// `[protocol]` section: the metadata/pre-metadata wire-format constants.
#[derive(Debug, Clone, Deserialize)]
struct RawProtocol {
    premetadata_metadata_main_delimiter: String,
    premetadata_metadata_sub_delimiter: String,
    length_of_digits_to_represent_size: usize,
}

/// `[io]` section: segmenting, output location, and backpressure bounds.
#[derive(Debug, Clone, Deserialize)]
struct RawIo {
    frames_per_content_part_file: usize,
    data_folder_decoded: PathBuf,
    ram_threshold_trigger_percent: f64,
    ram_threshold_resume_percent: f64,
    ffmpeg_path: PathBuf,
    #[serde(default = "default_ffprobe_path")]
    ffprobe_path: PathBuf,
}

fn default_ffprobe_path() -> PathBuf {
    PathBuf::from("/bin/ffprobe")
}

#[derive(Debug, Clone, Deserialize)]
struct RawConfig {
    frame: RawFrame,
    content: RawContent,
    encoding: RawEncoding,
    protocol: RawProtocol,
    io: RawIo,
}

/// Per-content-type geometry derived from `[content]` and `[frame]` at load
/// time: box size, the data region it tiles, its frame capacity, and its
/// replica sampling policy.
#[derive(Debug, Clone, Copy)]
pub struct ContentGeometry {
    /// Side length, in pixels, of one data box for this content type.
    pub box_step: u32,
    /// Width of the data region, in pixels (`frame_width - 2*(margin+padding)`).
    pub usable_w: u32,
    /// Height of the data region, in pixels.
    pub usable_h: u32,
    /// Symbols one painted frame of this content type can carry.
    pub usable_databoxes_per_frame: usize,
    /// Which replica within each group of `total_frames_repetition` the
    /// decoder samples (1-indexed).
    pub pick_frame_to_read: u32,
    /// How many successive identical frames each logical frame is repeated as.
    pub total_frames_repetition: u32,
}

/// A fully loaded and validated configuration, with derived geometry.
#[derive(Debug, Clone)]
pub struct Config {
    /// Output frame width in pixels.
    pub frame_width: u32,
    /// Output frame height in pixels.
    pub frame_height: u32,
    /// Outer, unwritten border preserving the carrier frame's own pixels.
    pub margin: u32,
    /// Inner, always-white border between the margin and the data region.
    pub padding: u32,
    /// Framerate of the output video container.
    pub output_fps: u32,
    /// 1..9 knob mapped to an external encoder speed preset.
    pub encoding_speed: u32,
    /// Whether a repeated frame is painted once and cloned, or repainted
    /// independently each time. Pixel-level no-op either way.
    pub use_same_bgr_frame_for_repetetion: bool,
    content: [ContentGeometry; 3],
    /// Path to the encoding map JSON file.
    pub encoding_map_path: PathBuf,
    /// Percent used to derive each color's per-channel tolerance band.
    pub color_threshold_percent: f64,
    /// Whether a data byte's symbols may be split across a frame boundary.
    pub allow_byte_to_be_split_between_frames: bool,
    /// Outer protocol delimiter (`|::-::|` by default).
    pub premetadata_metadata_main_delimiter: String,
    /// Inner protocol delimiter (`|:-:|` by default).
    pub premetadata_metadata_sub_delimiter: String,
    /// Zero-padded digit width of the pre-metadata length field.
    pub length_of_digits_to_represent_size: usize,
    /// How many logical data-content frames a content-part segment holds
    /// before the writer rotates to a new segment file.
    pub frames_per_content_part_file: usize,
    /// Output directory for decoded files.
    pub data_folder_decoded: PathBuf,
    /// Free-RAM percent below which symbol production pauses.
    pub ram_threshold_trigger_percent: f64,
    /// Free-RAM percent above which symbol production resumes.
    pub ram_threshold_resume_percent: f64,
    /// Path to the external video encoder/decoder binary.
    pub ffmpeg_path: PathBuf,
    /// Path to the external video probing binary.
    pub ffprobe_path: PathBuf,
}

impl Config {
    /// Load and validate a configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, VortexError> {
        let raw_text = std::fs::read_to_string(path)
            .map_err(|err| VortexError::Config(format!("reading config {}: {err}", path.display())))?;
        let raw: RawConfig = toml::from_str(&raw_text)
            .map_err(|err| VortexError::Config(format!("parsing config {}: {err}", path.display())))?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, VortexError> {
        let RawConfig { frame, content, encoding, protocol, io } = raw;

        if frame.encoding_speed == 0 || frame.encoding_speed > 9 {
            return Err(VortexError::Config(format!(
                "encoding_speed must be in 1..=9, got {}",
                frame.encoding_speed
            )));
        }
        if !(0.0..=100.0).contains(&encoding.color_threshold_percent) {
            return Err(VortexError::Config(format!(
                "color_threshold_percent must be in 0..=100, got {}",
                encoding.color_threshold_percent
            )));
        }
        if protocol.length_of_digits_to_represent_size == 0 {
            return Err(VortexError::Config(
                "length_of_digits_to_represent_size must be at least 1".to_string(),
            ));
        }
        if protocol.premetadata_metadata_main_delimiter.is_empty()
            || protocol.premetadata_metadata_sub_delimiter.is_empty()
        {
            return Err(VortexError::Config(
                "protocol delimiters must not be empty".to_string(),
            ));
        }
        if protocol.premetadata_metadata_main_delimiter == protocol.premetadata_metadata_sub_delimiter {
            return Err(VortexError::Config(
                "main and sub delimiters must be distinct".to_string(),
            ));
        }
        if io.ram_threshold_resume_percent < io.ram_threshold_trigger_percent {
            return Err(VortexError::Config(format!(
                "ram_threshold_resume_percent ({}) must be >= ram_threshold_trigger_percent ({})",
                io.ram_threshold_resume_percent, io.ram_threshold_trigger_percent
            )));
        }

        let border = frame.margin + frame.padding;
        if frame.frame_width <= 2 * border || frame.frame_height <= 2 * border {
            return Err(VortexError::Config(format!(
                "frame {}x{} is too small for margin+padding {border} on every side",
                frame.frame_width, frame.frame_height
            )));
        }
        let usable_w = frame.frame_width - 2 * border;
        let usable_h = frame.frame_height - 2 * border;

        let mut geometries = Vec::with_capacity(3);
        for ct in ContentType::ALL {
            let idx = ct.index();
            let box_step = content.data_box_size_step[idx];
            if !(1..=50).contains(&box_step) {
                return Err(VortexError::Config(format!(
                    "{ct} data_box_size_step must be in 1..=50, got {box_step}"
                )));
            }
            let repeat = content.total_frames_repetition[idx];
            if repeat == 0 {
                return Err(VortexError::Config(format!(
                    "{ct} total_frames_repetition must be at least 1"
                )));
            }
            let pick = content.pick_frame_to_read[idx];
            if pick == 0 || pick > repeat {
                return Err(VortexError::Config(format!(
                    "{ct} pick_frame_to_read ({pick}) must be in 1..={repeat}"
                )));
            }

            let mut capacity = (usable_w / box_step) as usize * (usable_h / box_step) as usize;
            if !encoding.allow_byte_to_be_split_between_frames {
                capacity -= capacity % 8;
            }
            if capacity == 0 {
                return Err(VortexError::Config(format!(
                    "{ct} has zero data-box capacity per frame at this geometry"
                )));
            }

            geometries.push(ContentGeometry {
                box_step,
                usable_w,
                usable_h,
                usable_databoxes_per_frame: capacity,
                pick_frame_to_read: pick,
                total_frames_repetition: repeat,
            });
        }

        Ok(Self {
            frame_width: frame.frame_width,
            frame_height: frame.frame_height,
            margin: frame.margin,
            padding: frame.padding,
            output_fps: frame.output_fps,
            encoding_speed: frame.encoding_speed,
            use_same_bgr_frame_for_repetetion: frame.use_same_bgr_frame_for_repetetion,
            content: geometries.try_into().expect("exactly 3 content types"),
            encoding_map_path: encoding.encoding_map_path,
            color_threshold_percent: encoding.color_threshold_percent,
            allow_byte_to_be_split_between_frames: encoding.allow_byte_to_be_split_between_frames,
            premetadata_metadata_main_delimiter: protocol.premetadata_metadata_main_delimiter,
            premetadata_metadata_sub_delimiter: protocol.premetadata_metadata_sub_delimiter,
            length_of_digits_to_represent_size: protocol.length_of_digits_to_represent_size,
            frames_per_content_part_file: io.frames_per_content_part_file,
            data_folder_decoded: io.data_folder_decoded,
            ram_threshold_trigger_percent: io.ram_threshold_trigger_percent,
            ram_threshold_resume_percent: io.ram_threshold_resume_percent,
            ffmpeg_path: io.ffmpeg_path,
            ffprobe_path: io.ffprobe_path,
        })
    }

    /// Derived geometry for a given content type.
    pub fn geometry(&self, content_type: ContentType) -> &ContentGeometry {
        &self.content[content_type.index()]
    }

    /// Pixel offset of the top-left corner of the data region.
    pub const fn data_region_start(&self) -> u32 {
        self.margin + self.padding
    }

    /// The external encoder preset name for `encoding_speed` (1=fastest,
    /// 9=smallest output), matching the `ultrafast`..`veryslow` x264 ladder.
    pub fn encoder_preset(&self) -> &'static str {
        const PRESETS: [&str; 9] = [
            "ultrafast", "superfast", "veryfast", "faster", "fast", "medium", "slow", "slower",
            "veryslow",
        ];
        PRESETS[(self.encoding_speed - 1) as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_TOML: &str = r#"
        [frame]
        frame_width = 640
        frame_height = 480
        margin = 10
        padding = 5
        output_fps = 30
        encoding_speed = 3
        use_same_bgr_frame_for_repetetion = true

        [content]
        data_box_size_step = [20, 16, 8]
        pick_frame_to_read = [1, 1, 1]
        total_frames_repetition = [1, 1, 1]

        [encoding]
        encoding_map_path = "em.json"
        color_threshold_percent = 10.0
        allow_byte_to_be_split_between_frames = true

        [protocol]
        premetadata_metadata_main_delimiter = "|::-::|"
        premetadata_metadata_sub_delimiter = "|:-:|"
        length_of_digits_to_represent_size = 8

        [io]
        frames_per_content_part_file = 1000
        data_folder_decoded = "decoded"
        ram_threshold_trigger_percent = 10.0
        ram_threshold_resume_percent = 20.0
        ffmpeg_path = "/bin/ffmpeg"
    "#;

    #[test]
    fn loads_and_derives_geometry() {
        let raw: RawConfig = toml::from_str(VALID_TOML).unwrap();
        let cfg = Config::from_raw(raw).unwrap();
        assert_eq!(cfg.geometry(ContentType::DataContent).usable_w, 600);
        assert_eq!(cfg.geometry(ContentType::DataContent).usable_h, 440);
        assert_eq!(
            cfg.geometry(ContentType::DataContent).usable_databoxes_per_frame,
            (600 / 8) * (440 / 8)
        );
        assert_eq!(cfg.encoder_preset(), "veryfast");
    }

    #[test]
    fn rejects_pick_greater_than_repeat() {
        let mut raw: RawConfig = toml::from_str(VALID_TOML).unwrap();
        raw.content.pick_frame_to_read[2] = 2;
        raw.content.total_frames_repetition[2] = 1;
        assert!(Config::from_raw(raw).is_err());
    }

    #[test]
    fn rejects_zero_repetition() {
        let mut raw: RawConfig = toml::from_str(VALID_TOML).unwrap();
        raw.content.total_frames_repetition[0] = 0;
        assert!(Config::from_raw(raw).is_err());
    }

    #[test]
    fn floors_capacity_to_multiple_of_8_when_split_disallowed() {
        let mut raw: RawConfig = toml::from_str(VALID_TOML).unwrap();
        raw.encoding.allow_byte_to_be_split_between_frames = false;
        let cfg = Config::from_raw(raw).unwrap();
        assert_eq!(cfg.geometry(ContentType::DataContent).usable_databoxes_per_frame % 8, 0);
    }

    #[test]
    fn rejects_frame_too_small_for_border() {
        let mut raw: RawConfig = toml::from_str(VALID_TOML).unwrap();
        raw.frame.margin = 400;
        assert!(Config::from_raw(raw).is_err());
    }
}
