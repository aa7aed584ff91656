// vortexstore - Data compression resistant video generator.
// Copyright 2025 0verv0ltage
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The three disjoint content types carried by the video stream.

/// One of the three sections of the video, in the temporal order they are
/// written: data, then metadata, then pre-metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// Raw file bytes, baseN encoded.
    DataContent,
    /// The metadata record and its five redundant encodings.
    Metadata,
    /// The fixed-leader pre-metadata record.
    PreMetadata,
}

impl ContentType {
    /// All content types, in on-disk geometry array order:
    /// `[PREMETADATA, METADATA, DATACONTENT]`.
    pub const ALL: [ContentType; 3] = [Self::PreMetadata, Self::Metadata, Self::DataContent];

    /// Index into per-content-type config arrays
    /// (`data_box_size_step`, `pick_frame_to_read`, `total_frames_repetition`, ...).
    pub const fn index(self) -> usize {
        match self {
            Self::PreMetadata => 0,
            Self::Metadata => 1,
            Self::DataContent => 2,
        }
    }

    /// Content type that temporally follows this one in the encoder's state
    /// machine, or `None` once `PreMetadata` has been emitted.
    pub const fn next(self) -> Option<ContentType> {
        match self {
            Self::DataContent => Some(Self::Metadata),
            Self::Metadata => Some(Self::PreMetadata),
            Self::PreMetadata => None,
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::DataContent => "DATACONTENT",
            Self::Metadata => "METADATA",
            Self::PreMetadata => "PREMETADATA",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_machine_transitions_in_protocol_order() {
        assert_eq!(ContentType::DataContent.next(), Some(ContentType::Metadata));
        assert_eq!(ContentType::Metadata.next(), Some(ContentType::PreMetadata));
        assert_eq!(ContentType::PreMetadata.next(), None);
    }

    #[test]
    fn indices_match_array_order() {
        assert_eq!(ContentType::PreMetadata.index(), 0);
        assert_eq!(ContentType::Metadata.index(), 1);
        assert_eq!(ContentType::DataContent.index(), 2);
    }
}
