// vortexstore - Data compression resistant video generator.
// Copyright 2025 0verv0ltage
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Builds the full encode-side symbol plan: the DATACONTENT -> METADATA ->
//! PREMETADATA state machine of spec.md §4.2/§4.6, resolved up front rather
//! than as a true streaming coroutine (this codebase's starting point
//! already loads the whole source file into memory -- see the `deconstruct_file`
//! comment kept in `DESIGN.md` -- so the encode plan is built the same way).

use sha1::{Digest, Sha1};

use crate::basen::Base;
use crate::config::Config;
use crate::content_type::ContentType;
use crate::error::VortexError;
use crate::metadata::{self, MetadataRecord, PreMetadataFields};

/// One painted frame's worth of work: which content type it belongs to and
/// the symbol chunk it carries (`<= usable_databoxes_per_frame[content_type]`).
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Which of the three video sections this chunk belongs to.
    pub content_type: ContentType,
    /// The symbols to paint onto this logical frame.
    pub symbols: String,
}

/// The complete, ordered sequence of chunks to paint, plus the metadata
/// record they describe.
#[derive(Debug, Clone)]
pub struct EncodePlan {
    /// Chunks in on-video order: all DATACONTENT, then all METADATA, then
    /// all PREMETADATA.
    pub chunks: Vec<Chunk>,
    /// The metadata record sealed once the data section's size/sha1/length
    /// are known.
    pub record: MetadataRecord,
}

/// Split `symbols` into `capacity`-sized pieces, in order; the final piece
/// may be shorter.
fn chunk_symbols(symbols: &str, capacity: usize) -> Vec<String> {
    if symbols.is_empty() {
        return Vec::new();
    }
    let chars: Vec<char> = symbols.chars().collect();
    chars.chunks(capacity.max(1)).map(|slice| slice.iter().collect()).collect()
}

/// Build the full encode plan for `file_name`/`data` against `cfg` and the
/// base implied by the loaded encoding map.
pub fn build_plan(cfg: &Config, base: Base, file_name: &str, data: &[u8]) -> Result<EncodePlan, VortexError> {
    let sha1_hex = {
        let mut hasher = Sha1::new();
        hasher.update(data);
        hex_digest(hasher.finalize().as_slice())
    };

    let data_symbols = base.encode_bytes(data);
    let total_basen_length = data_symbols.chars().count() as u64;
    let data_capacity = cfg.geometry(ContentType::DataContent).usable_databoxes_per_frame;
    let data_chunks = chunk_symbols(&data_symbols, data_capacity);

    let record = MetadataRecord { name: file_name.to_string(), size: data.len() as u64, total_basen_length, sha1_hex };
    let sealed = record.sealed(&cfg.premetadata_metadata_main_delimiter, &cfg.premetadata_metadata_sub_delimiter);
    let encodings = metadata::build_encodings(&sealed);

    // Each textual encoding is itself baseN-encoded into EM-alphabet symbols
    // before it can be painted; `PreMetadataFields`' `D*` lengths count those
    // symbols, not raw text bytes.
    let normal_symbols = base.encode_bytes(encodings.normal.as_bytes());
    let base64_symbols = base.encode_bytes(encodings.base64.as_bytes());
    let rot13_symbols = base.encode_bytes(encodings.rot13.as_bytes());
    let rs_symbols = base.encode_bytes(encodings.reed_solomon.as_bytes());
    let zfec_symbols = base.encode_bytes(encodings.zfec.as_bytes());

    let metadata_capacity = cfg.geometry(ContentType::Metadata).usable_databoxes_per_frame;
    let normal_chunks = chunk_symbols(&normal_symbols, metadata_capacity);
    let base64_chunks = chunk_symbols(&base64_symbols, metadata_capacity);
    let rot13_chunks = chunk_symbols(&rot13_symbols, metadata_capacity);
    let rs_chunks = chunk_symbols(&rs_symbols, metadata_capacity);
    let zfec_chunks = chunk_symbols(&zfec_symbols, metadata_capacity);

    let fields = PreMetadataFields {
        normal: (normal_chunks.len() as u32, normal_symbols.chars().count() as u32),
        base64: (base64_chunks.len() as u32, base64_symbols.chars().count() as u32),
        rot13: (rot13_chunks.len() as u32, rot13_symbols.chars().count() as u32),
        reed_solomon: (rs_chunks.len() as u32, encodings.krs as u32, rs_symbols.chars().count() as u32),
        zfec: (zfec_chunks.len() as u32, zfec_symbols.chars().count() as u32),
    };
    let pre_metadata_text = metadata::build_pre_metadata(cfg, base, &fields)?;
    let pre_metadata_symbols = base.encode_bytes(pre_metadata_text.as_bytes());
    let pre_metadata_capacity = cfg.geometry(ContentType::PreMetadata).usable_databoxes_per_frame;
    let pre_metadata_chunks = chunk_symbols(&pre_metadata_symbols, pre_metadata_capacity);

    let mut chunks = Vec::with_capacity(
        data_chunks.len() + normal_chunks.len() + base64_chunks.len() + rot13_chunks.len() + rs_chunks.len() + zfec_chunks.len() + pre_metadata_chunks.len(),
    );
    chunks.extend(data_chunks.into_iter().map(|symbols| Chunk { content_type: ContentType::DataContent, symbols }));
    for encoding_chunks in [normal_chunks, base64_chunks, rot13_chunks, rs_chunks, zfec_chunks] {
        chunks.extend(encoding_chunks.into_iter().map(|symbols| Chunk { content_type: ContentType::Metadata, symbols }));
    }
    chunks.extend(pre_metadata_chunks.into_iter().map(|symbols| Chunk { content_type: ContentType::PreMetadata, symbols }));

    Ok(EncodePlan { chunks, record })
}

fn hex_digest(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        let toml_text = r#"
            [frame]
            frame_width = 200
            frame_height = 150
            margin = 5
            padding = 5
            output_fps = 30
            encoding_speed = 3
            use_same_bgr_frame_for_repetetion = true

            [content]
            data_box_size_step = [20, 16, 4]
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
        "#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, toml_text).unwrap();
        let cfg = Config::load(&path).unwrap();
        std::mem::forget(dir);
        cfg
    }

    #[test]
    fn empty_input_produces_zero_data_chunks_and_a_sealed_record() {
        let cfg = test_config();
        let plan = build_plan(&cfg, Base::B16, "empty.bin", &[]).unwrap();
        assert!(plan.chunks.iter().all(|c| c.content_type != ContentType::DataContent));
        assert_eq!(plan.record.size, 0);
        assert_eq!(plan.record.sha1_hex, "da39a3ee5e6b4b0d3255bfef95601890afd80709");
    }

    #[test]
    fn tiny_round_trip_matches_seed_suite_sha1() {
        let cfg = test_config();
        let data: Vec<u8> = (0u8..=0x0f).collect();
        let plan = build_plan(&cfg, Base::B2, "tiny.bin", &data).unwrap();
        assert_eq!(plan.record.sha1_hex, "b7e23ec29af22b0b4e41da31e868d57226121c84");
        assert!(plan.chunks.iter().any(|c| c.content_type == ContentType::DataContent));
        assert!(plan.chunks.iter().any(|c| c.content_type == ContentType::Metadata));
        assert!(plan.chunks.iter().any(|c| c.content_type == ContentType::PreMetadata));
    }

    #[test]
    fn chunks_never_exceed_their_content_types_capacity() {
        let cfg = test_config();
        let data = vec![0xAAu8; 5000];
        let plan = build_plan(&cfg, Base::B16, "f.bin", &data).unwrap();
        for chunk in &plan.chunks {
            let capacity = cfg.geometry(chunk.content_type).usable_databoxes_per_frame;
            assert!(chunk.symbols.chars().count() <= capacity);
        }
    }
}
