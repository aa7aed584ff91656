// vortexstore - data-as-video encoder/decoder.
// Copyright 2025 0verv0ltage
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! vortexstore - data-as-video encoder/decoder.
//! Encodes arbitrary data as a video whose frames carry colored data boxes,
//! and decodes such a video back into the original file.
//! NOTE: No effort has been undertaken to make this work on Windows. Probably wont. 🤷

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    clippy::missing_docs_in_private_items,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::pedantic,
    clippy::redundant_clone,
    clippy::needless_pass_by_value
)]
#![allow(clippy::cast_lossless, dead_code)]

use std::fs;
use std::time;

use anyhow::{Context, Result, bail};
use clap::Parser;

use cli::{Args, Command};
use config::Config;
use encoding_map::EncodingMap;
use error::VortexError;
use utils::format_duration;

mod backpressure;
mod basen;
mod carrier;
mod cli;
mod config;
mod constants;
mod content_type;
mod encoding_map;
mod error;
mod filesys;
mod frame_reader;
mod gf256;
mod merger;
mod metadata;
mod painter;
mod pipeline;
mod producer;
mod rot;
mod rs;
mod segmenter;
mod utils;
mod zfec;

/// Times the execution of `code` and
/// prints out the measured time.
macro_rules! timed_block {
    ($name:expr, $code:block) => {
        println!("Starting {}", $name);
        let start = std::time::Instant::now();
        $code
        println!("Finished {} after: {:?}", $name, start.elapsed());
    };
}

/// Encode `input_file` against `carrier_path`'s frame cadence, writing the
/// merged result to `output_video`.
fn run_encode(
    config_path: &std::path::Path,
    carrier_path: &std::path::Path,
    input_file: &std::path::Path,
    output_video: &std::path::Path,
    overwrite: bool,
) -> Result<()> {
    let cfg = Config::load(config_path).context("loading configuration")?;
    let em = EncodingMap::load(&cfg.encoding_map_path, cfg.color_threshold_percent).context("loading encoding map")?;

    if !input_file.exists() {
        bail!("input file {:?} does not exist", input_file);
    }
    if !carrier_path.exists() {
        bail!("carrier video {:?} does not exist", carrier_path);
    }

    let data = fs::read(input_file).with_context(|| format!("reading input file {input_file:?}"))?;
    let file_name = input_file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| VortexError::Config(format!("input file {input_file:?} has no file name")))?;

    let plan;
    timed_block!("encode plan construction", {
        plan = producer::build_plan(&cfg, em.base(), &file_name, &data)?;
    });

    let probe = carrier::probe(&cfg.ffprobe_path, carrier_path).context("probing carrier video")?;
    if probe.width != cfg.frame_width || probe.height != cfg.frame_height {
        bail!(
            "carrier video is {}x{}, but configuration expects {}x{}",
            probe.width,
            probe.height,
            cfg.frame_width,
            cfg.frame_height
        );
    }
    if probe.frame_count < plan.chunks.len() as u64 {
        bail!(
            "carrier video has only {} frames, but encoding {:?} needs {}",
            probe.frame_count,
            input_file,
            plan.chunks.len()
        );
    }

    let work_dir = filesys::get_segment_work_dir()?;
    let mut segmenter = segmenter::Segmenter::new(&cfg, &work_dir)?;
    timed_block!("frame painting", {
        pipeline::encode::run(&cfg, &em, carrier_path, plan.chunks, &mut segmenter)?;
    });
    let manifest = segmenter.finish()?;

    timed_block!("segment merge", {
        merger::merge(&cfg, &manifest, output_video, overwrite)?;
    });

    println!("encoded: {}, {} bytes, sha1 {}", output_video.display(), plan.record.size, plan.record.sha1_hex);
    Ok(())
}

/// Decode `input_video`, writing the recovered file into `output_dir`
/// (falling back to `cfg.data_folder_decoded`) under the collision policy.
fn run_decode(config_path: &std::path::Path, input_video: &std::path::Path, output_dir: Option<&std::path::Path>, debug: bool) -> Result<()> {
    let cfg = Config::load(config_path).context("loading configuration")?;
    let em = EncodingMap::load(&cfg.encoding_map_path, cfg.color_threshold_percent).context("loading encoding map")?;
    let base = em.base();

    if !input_video.exists() {
        bail!("input video {:?} does not exist", input_video);
    }

    let output: pipeline::decode::DecodeOutput;
    timed_block!("video decoding", {
        output = pipeline::decode::run(&cfg, &em, base, input_video)?;
    });

    let target_dir = output_dir.unwrap_or(&cfg.data_folder_decoded);
    fs::create_dir_all(target_dir).with_context(|| format!("creating output directory {target_dir:?}"))?;
    let destination = filesys::available_decoded_path(target_dir, &output.record.name);
    fs::write(&destination, &output.data).with_context(|| format!("writing decoded file {destination:?}"))?;

    if output.sha1_matches {
        println!("decoded: {}, sha1 matched", destination.display());
        Ok(())
    } else {
        let err = VortexError::Integrity { expected: output.record.sha1_hex.clone(), actual: hex_digest(&output.data) };
        if debug {
            println!("decoded: {}, {err} (kept because --debug)", destination.display());
            Ok(())
        } else {
            fs::remove_file(&destination).with_context(|| format!("removing mismatched output {destination:?}"))?;
            bail!(err);
        }
    }
}

/// SHA1 hex digest, used only to report the mismatch actually observed
/// (the pipeline already computed and discarded its own copy).
fn hex_digest(bytes: &[u8]) -> String {
    use sha1::{Digest, Sha1};
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    let mut out = String::with_capacity(40);
    for byte in hasher.finalize() {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Read in command line args and execute program function as requested.
fn execute_args() -> Result<()> {
    let args = Args::parse();
    match args.command {
        Command::Encode { config, carrier, input_file, output_video, overwrite, debug: _ } => {
            run_encode(&config, &carrier, &input_file, &output_video, overwrite)
        }
        Command::Decode { config, input_video, output_dir, overwrite: _, debug } => run_decode(&config, &input_video, output_dir.as_deref(), debug),
    }
}

fn main() -> Result<()> {
    let main_start = time::Instant::now();
    execute_args()?;
    println!("Total execution time: {}", format_duration(main_start.elapsed()));
    Ok(())
}
