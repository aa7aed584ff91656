// vortexstore - Data compression resistant video generator.
// Copyright 2025 0verv0ltage
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! File system access: segment naming for the encode-side container layout,
//! the decode-side individually-addressable frame workspace, and the output
//! filename collision policy.

use std::{env, fs, path::PathBuf};

use crate::constants::{FRAME_DIR, SEGMENT_DIR};
use crate::error::VortexError;

/// Name of the Nth content-part segment file, e.g. `content_part0001.mp4`.
pub fn content_part_name(index: usize, extension: &str) -> String {
    format!("content_part{index:04}.{extension}")
}

/// Name of the metadata segment file.
pub fn metadata_name(extension: &str) -> String {
    format!("metadata.{extension}")
}

/// Name of the pre-metadata segment file.
pub fn pre_metadata_name(extension: &str) -> String {
    format!("pre_metadata.{extension}")
}

/// Gets the directory used to hold individually-addressable frames split out
/// of a carrier/merged video, creating it if it doesn't exist.
pub fn get_framebuffer_folder() -> Result<PathBuf, VortexError> {
    let frame_dir = env::temp_dir().join(FRAME_DIR);
    fs::create_dir_all(&frame_dir)?;
    Ok(frame_dir)
}

/// Clears the framebuffer folder by deleting and recreating it.
pub fn clear_framebuffer_folder() -> Result<(), VortexError> {
    let frame_dir = get_framebuffer_folder()?;
    fs::remove_dir_all(&frame_dir)?;
    fs::create_dir_all(&frame_dir)?;
    Ok(())
}

/// Path of the `index`-th split frame (1-indexed, matching ffmpeg's `-f
/// image2` `%09d` numbering).
pub fn split_frame_path(index: u64) -> Result<PathBuf, VortexError> {
    Ok(get_framebuffer_folder()?.join(format!("frame{index:09}.png")))
}

/// Gets the directory used to hold encode-side segment files, creating and
/// clearing it so a prior run's leftovers never bleed into a new one.
pub fn get_segment_work_dir() -> Result<PathBuf, VortexError> {
    let dir = env::temp_dir().join(SEGMENT_DIR);
    if dir.exists() {
        fs::remove_dir_all(&dir)?;
    }
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Find an available output path for `name` under `dir`, following the
/// `decoded_<name>`, `decoded(01)_<name>`, `decoded(02)_<name>`, ...
/// collision policy.
pub fn available_decoded_path(dir: &std::path::Path, name: &str) -> PathBuf {
    let plain = dir.join(format!("decoded_{name}"));
    if !plain.exists() {
        return plain;
    }
    let mut attempt = 1u32;
    loop {
        let candidate = dir.join(format!("decoded({attempt:02})_{name}"));
        if !candidate.exists() {
            return candidate;
        }
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_part_names_are_zero_padded() {
        assert_eq!(content_part_name(1, "mp4"), "content_part0001.mp4");
        assert_eq!(content_part_name(42, "mp4"), "content_part0042.mp4");
    }

    #[test]
    fn available_decoded_path_skips_existing_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let name = "report.pdf";

        let first = available_decoded_path(dir.path(), name);
        assert_eq!(first, dir.path().join("decoded_report.pdf"));
        fs::write(&first, b"x").unwrap();

        let second = available_decoded_path(dir.path(), name);
        assert_eq!(second, dir.path().join("decoded(01)_report.pdf"));
        fs::write(&second, b"x").unwrap();

        let third = available_decoded_path(dir.path(), name);
        assert_eq!(third, dir.path().join("decoded(02)_report.pdf"));
    }
}
