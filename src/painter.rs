// vortexstore - Data compression resistant video generator.
// Copyright 2025 0verv0ltage
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Draws one encoded frame: carrier margin preserved, white padding, and a
//! data region tiled with solid-color data boxes, one per symbol.

use image::{GenericImage, GenericImageView, ImageBuffer, Rgb, RgbImage, imageops::FilterType};

use crate::config::Config;
use crate::content_type::ContentType;
use crate::encoding_map::EncodingMap;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Paint `symbols` (at most `geometry.usable_databoxes_per_frame` of them)
/// onto a copy of `carrier`, preserving the margin, forcing the padding
/// ring white, and nearest-neighbor upscaling a small per-box grid into the
/// data region.
pub fn paint_frame(carrier: &RgbImage, cfg: &Config, em: &EncodingMap, content_type: ContentType, symbols: &str) -> RgbImage {
    let geometry = cfg.geometry(content_type);
    let mut frame = carrier.clone();

    let margin = cfg.margin;
    let start = cfg.data_region_start();
    let end_x = start + geometry.usable_w;
    let end_y = start + geometry.usable_h;

    for y in margin..(cfg.frame_height - margin) {
        for x in margin..(cfg.frame_width - margin) {
            if x < start || x >= end_x || y < start || y >= end_y {
                frame.put_pixel(x, y, WHITE);
            }
        }
    }

    let box_step = geometry.box_step;
    let n_x = geometry.usable_w / box_step;
    let n_y = geometry.usable_h / box_step;
    if n_x == 0 || n_y == 0 {
        return frame;
    }

    let mut grid: RgbImage = ImageBuffer::from_pixel(n_x, n_y, WHITE);
    for (index, symbol) in symbols.chars().enumerate() {
        if index as u32 >= n_x * n_y {
            break;
        }
        let (gx, gy) = (index as u32 % n_x, index as u32 / n_x);
        let color = em
            .color_for(symbol)
            .unwrap_or_else(|| panic!("unknown symbol {symbol:?} while painting a {content_type} frame"));
        grid.put_pixel(gx, gy, Rgb([color.0, color.1, color.2]));
    }

    let upscaled = image::imageops::resize(&grid, geometry.usable_w, geometry.usable_h, FilterType::Nearest);
    frame
        .copy_from(&upscaled, start, start)
        .expect("upscaled data region fits inside frame bounds");
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
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
    fn preserves_margin_and_whites_out_padding() {
        let cfg = test_config(10);
        let (_file, em) = test_em();
        let carrier: RgbImage = ImageBuffer::from_pixel(cfg.frame_width, cfg.frame_height, Rgb([7, 8, 9]));
        let painted = paint_frame(&carrier, &cfg, &em, ContentType::DataContent, "0123");

        assert_eq!(painted.get_pixel(0, 0), &Rgb([7, 8, 9]), "margin pixel must be untouched");
        assert_eq!(painted.get_pixel(cfg.margin, cfg.margin), &Rgb([255, 255, 255]), "padding must be white");
    }

    #[test]
    fn paints_first_symbol_as_its_mapped_color() {
        let cfg = test_config(10);
        let (_file, em) = test_em();
        let carrier: RgbImage = ImageBuffer::from_pixel(cfg.frame_width, cfg.frame_height, Rgb([255, 255, 255]));
        let painted = paint_frame(&carrier, &cfg, &em, ContentType::DataContent, "2");

        let start = cfg.data_region_start();
        assert_eq!(painted.get_pixel(start, start), &Rgb([255, 0, 0]));
    }
}
