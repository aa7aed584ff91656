// vortexstore - Data compression resistant video generator.
// Copyright 2025 0verv0ltage
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Error taxonomy shared across the encode/decode pipeline.

use std::fmt;
use std::io;

/// The five error kinds the encode/decode pipeline can surface.
#[derive(Debug)]
pub enum VortexError {
    /// Invalid encoding map, overlapping color bands, bad config list
    /// lengths, out-of-range box sizes, `pick > repeat`, bad delimiters.
    Config(String),
    /// Carrier video missing/short, container unreadable, disk full,
    /// external encoder/decoder process failure.
    Io(String),
    /// Pre-metadata length not found, premature EOF mid-section, all
    /// metadata encodings failed validation.
    Protocol(String),
    /// SHA1 mismatch after full decode.
    Integrity {
        /// SHA1 hex digest recorded in the metadata record.
        expected: String,
        /// SHA1 hex digest computed over the decoded bytes.
        actual: String,
    },
    /// Worker produced out-of-order indices beyond heap bound, or another
    /// condition that should be unreachable given correct pipeline logic.
    Internal(String),
}

impl fmt::Display for VortexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(detail) => write!(f, "config error: {detail}"),
            Self::Io(detail) => write!(f, "io error: {detail}"),
            Self::Protocol(detail) => write!(f, "protocol error: {detail}"),
            Self::Integrity { expected, actual } => {
                write!(f, "integrity error: expected sha1 {expected}, got {actual}")
            }
            Self::Internal(detail) => write!(f, "internal error: {detail}"),
        }
    }
}

impl std::error::Error for VortexError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

impl From<io::Error> for VortexError {
    fn from(value: io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

/// Shorthand result type used throughout the pipeline.
pub type Result<T> = std::result::Result<T, VortexError>;
