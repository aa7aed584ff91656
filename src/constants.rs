// vortexstore - data-as-video encoder/decoder.
// Copyright 2025 0verv0ltage
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Global constants.

// === Configuration Constants ===
#[allow(clippy::doc_markdown)]
/// Folder where individually-addressable decode-side frames are stored
/// before being read back in.
/// This folder is created in the temp directory
/// determined using `env::temp_dir()`.
/// Default: "vortexstore_framebuffer"
pub const FRAME_DIR: &str = "vortexstore_framebuffer";

#[allow(clippy::doc_markdown)]
/// Folder where encode-side segment files
/// (`content_partNNNN.mp4`, `metadata.mp4`, `pre_metadata.mp4`) are written
/// before being merged into the final container.
/// This folder is created in the temp directory
/// determined using `env::temp_dir()`.
/// Default: "vortexstore_segments"
pub const SEGMENT_DIR: &str = "vortexstore_segments";

#[allow(clippy::doc_markdown)]
/// H.264 ConstantRateFactor
/// Allowed values: 0-51
/// 0 -> Lossless, 23 -> ffmpeg default, 51 -> worst possible
/// Subjectively sane range is 17–28
/// Default: 20
pub const H264_CRF: u32 = 20;

/// What colorspace to encode video as.
/// bt709 is reccomended for Youtube.  
/// Default: "bt709"
pub const COLORSPACE: &str = "bt709";

/// Video encoding color range.
/// Default: "tv"
pub const COLOR_RANGE: &str = "tv";
