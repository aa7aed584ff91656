// vortexstore - Data compression resistant video generator.
// Copyright 2025 0verv0ltage
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Samples an observed frame's data boxes back into a symbol string.
//!
//! Sampling depends on `box_step`: a single pixel for `box_step == 1`, the
//! geometric center pixel for an odd step, or the channel-wise average of
//! the 2x2 central pixels for an even step. Lossy video codecs smear block
//! boundaries but leave centers intact, so this tolerates recompression.

use image::{GenericImageView, RgbImage};

use crate::config::Config;
use crate::content_type::ContentType;
use crate::encoding_map::EncodingMap;

/// Read up to `limit` data boxes from `frame`'s data region for
/// `content_type`, in row-major order, classifying each through `em`.
pub fn read_frame(frame: &RgbImage, cfg: &Config, em: &EncodingMap, content_type: ContentType, limit: usize) -> String {
    let geometry = cfg.geometry(content_type);
    let box_step = geometry.box_step;
    let n_x = geometry.usable_w / box_step;
    let n_y = geometry.usable_h / box_step;
    let start = cfg.data_region_start();

    let total = (n_x as usize * n_y as usize).min(limit);
    let mut symbols = String::with_capacity(total);

    for index in 0..total {
        let index = index as u32;
        let (bx, by) = (index % n_x, index / n_x);
        let origin_x = start + bx * box_step;
        let origin_y = start + by * box_step;
        let (r, g, b) = sample_block(frame, origin_x, origin_y, box_step);
        symbols.push(em.classify(r, g, b));
    }
    symbols
}

/// Sample one `box_step x box_step` block starting at `(origin_x, origin_y)`.
fn sample_block(frame: &RgbImage, origin_x: u32, origin_y: u32, box_step: u32) -> (u8, u8, u8) {
    if box_step == 1 {
        return pixel(frame, origin_x, origin_y);
    }
    if box_step % 2 == 1 {
        let center = box_step / 2;
        return pixel(frame, origin_x + center, origin_y + center);
    }

    // Even step: average the 2x2 central pixels.
    let lo = box_step / 2 - 1;
    let hi = box_step / 2;
    let mut sum = (0u32, 0u32, 0u32);
    for dy in [lo, hi] {
        for dx in [lo, hi] {
            let (r, g, b) = pixel(frame, origin_x + dx, origin_y + dy);
            sum.0 += r as u32;
            sum.1 += g as u32;
            sum.2 += b as u32;
        }
    }
    ((sum.0 / 4) as u8, (sum.1 / 4) as u8, (sum.2 / 4) as u8)
}

fn pixel(frame: &RgbImage, x: u32, y: u32) -> (u8, u8, u8) {
    let p = frame.get_pixel(x, y);
    (p[0], p[1], p[2])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::painter::paint_frame;
    use image::{ImageBuffer, Rgb};
    use std::io::Write;

    fn test_config(box_step: u32) -> Config {
        let toml_text = format!(
            r#"
            [frame]
            frame_width = 120
            frame_height = 90
            margin = 5
            padding = 5
            output_fps = 30
            encoding_speed = 3
            use_same_bgr_frame_for_repetetion = true

            [content]
            data_box_size_step = [{box_step}, {box_step}, {box_step}]
            pick_frame_to_read = [1, 1, 1]
            total_frames_repetition = [1, 1, 1]

            [encoding]
            encoding_map_path = "em.json"
            color_threshold_percent = 5.0
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
        "#
        );
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, toml_text).unwrap();
        let cfg = Config::load(&path).unwrap();
        std::mem::forget(dir);
        cfg
    }

    fn test_em() -> (tempfile::NamedTempFile, EncodingMap) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"0": "#000000", "1": "#FFFFFF", "2": "#FF0000", "3": "#00FF00"}"#).unwrap();
        let em = EncodingMap::load(file.path(), 5.0).unwrap();
        (file, em)
    }

    #[test]
    fn round_trips_through_painting_for_odd_and_even_box_steps() {
        for box_step in [9u32, 10u32] {
            let cfg = test_config(box_step);
            let (_file, em) = test_em();
            let carrier: RgbImage = ImageBuffer::from_pixel(cfg.frame_width, cfg.frame_height, Rgb([255, 255, 255]));
            let symbols = "0123012301";
            let painted = paint_frame(&carrier, &cfg, &em, ContentType::DataContent, symbols);
            let read = read_frame(&painted, &cfg, &em, ContentType::DataContent, symbols.len());
            assert_eq!(read, symbols, "box_step {box_step} should round-trip cleanly on a clean render");
        }
    }

    #[test]
    fn limit_truncates_the_read_symbol_count() {
        let cfg = test_config(10);
        let (_file, em) = test_em();
        let carrier: RgbImage = ImageBuffer::from_pixel(cfg.frame_width, cfg.frame_height, Rgb([255, 255, 255]));
        let painted = paint_frame(&carrier, &cfg, &em, ContentType::DataContent, "0123");
        let read = read_frame(&painted, &cfg, &em, ContentType::DataContent, 2);
        assert_eq!(read.chars().count(), 2);
    }
}
