// vortexstore - data-as-video encoder/decoder.
// Copyright 2025 0verv0ltage
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Command line interface: `encode` and `decode` subcommands over a shared
//! `--config`/`--overwrite`/`--debug` surface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level command line arguments.
#[derive(Parser, Debug)]
#[command(name = "vortexstore", version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    /// Which operation to perform.
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode a file into a video.
    Encode {
        /// Path to the TOML configuration file.
        #[arg(long, short = 'c')]
        config: PathBuf,
        /// Carrier video to paint frames onto (only its dimensions and
        /// frame cadence are consumed).
        #[arg(long)]
        carrier: PathBuf,
        /// File to encode.
        input_file: PathBuf,
        /// Path of the merged output video.
        output_video: PathBuf,
        /// Overwrite the output video if it already exists.
        #[arg(short = 'y', long)]
        overwrite: bool,
        /// Keep the decoded output even on integrity failure (decode only;
        /// accepted here for a uniform flag set and ignored by encode).
        #[arg(long)]
        debug: bool,
    },
    /// Decode a file from a video.
    Decode {
        /// Path to the TOML configuration file.
        #[arg(long, short = 'c')]
        config: PathBuf,
        /// Video to decode.
        input_video: PathBuf,
        /// Directory to write the decoded file into. Defaults to the
        /// config's `data_folder_decoded`.
        output_dir: Option<PathBuf>,
        /// Overwrite collision handling is skipped; accepted for symmetry
        /// with `encode` but decode always applies the filename collision
        /// policy instead.
        #[arg(short = 'y', long)]
        overwrite: bool,
        /// Keep the decoded output file even if its SHA1 does not match.
        #[arg(long)]
        debug: bool,
    },
}
