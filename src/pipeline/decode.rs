// vortexstore - Data compression resistant video generator.
// Copyright 2025 0verv0ltage
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Decode-side scheduling: split the merged video into addressable frames,
//! locate the self-describing pre-metadata section by growing a window
//! backward from the tail, read the five metadata candidates it points at,
//! validate the cascade, then sweep the data section with a dedicated
//! reader thread (loads frames off disk) feeding a bounded queue of raw
//! frames to a CPU-only worker pool (classifies boxes to symbols), the same
//! reader/worker split `pipeline::encode` uses on the write side.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam_channel::bounded;
use image::RgbImage;
use sha1::{Digest, Sha1};

use crate::basen::Base;
use crate::config::{Config, ContentGeometry};
use crate::content_type::ContentType;
use crate::encoding_map::EncodingMap;
use crate::error::VortexError;
use crate::filesys;
use crate::frame_reader;
use crate::metadata::{self, MetadataCandidates, MetadataRecord, PreMetadataFields};

use super::{Indexed, ReorderBuffer};

/// A fully recovered file: its sealed metadata record and the raw bytes it describes.
#[derive(Debug)]
pub struct DecodeOutput {
    /// The validated metadata record.
    pub record: MetadataRecord,
    /// The recovered file bytes.
    pub data: Vec<u8>,
    /// Whether `data`'s SHA1 matches `record.sha1_hex`. Whether to keep or
    /// delete a mismatching file is a caller policy (debug mode), not this
    /// module's concern.
    pub sha1_matches: bool,
}

fn split_into_frames(cfg: &Config, video_path: &Path) -> Result<u64, VortexError> {
    filesys::clear_framebuffer_folder()?;
    let pattern = filesys::get_framebuffer_folder()?.join("frame%09d.png");
    let status = Command::new(&cfg.ffmpeg_path)
        .args(["-hide_banner", "-loglevel", "error", "-i"])
        .arg(video_path)
        .arg(&pattern)
        .status()
        .map_err(|err| VortexError::Io(format!("spawning ffmpeg frame splitter: {err}")))?;
    if !status.success() {
        return Err(VortexError::Io(format!("ffmpeg exited with {status} splitting {}", video_path.display())));
    }

    let mut count = 0u64;
    while filesys::split_frame_path(count + 1)?.exists() {
        count += 1;
    }
    if count == 0 {
        return Err(VortexError::Protocol("merged video produced no addressable frames".to_string()));
    }
    Ok(count)
}

fn load_frame(index: u64) -> Result<RgbImage, VortexError> {
    let path = filesys::split_frame_path(index)?;
    let image = image::open(&path).map_err(|err| VortexError::Io(format!("opening frame {}: {err}", path.display())))?;
    Ok(image.to_rgb8())
}

/// Raw frame index (1-based) of the `logical`-th frame within a section
/// that starts at `section_raw_start`, honoring that section's repetition
/// and pick-frame-to-read policy.
fn raw_index_for(section_raw_start: u64, geometry: &ContentGeometry, logical: u64) -> u64 {
    section_raw_start + logical * geometry.total_frames_repetition as u64 + (geometry.pick_frame_to_read as u64 - 1)
}

fn read_section_symbols(cfg: &Config, em: &EncodingMap, content_type: ContentType, section_raw_start: u64, logical_count: u64) -> Result<String, VortexError> {
    let geometry = cfg.geometry(content_type);
    let capacity = geometry.usable_databoxes_per_frame;
    let mut symbols = String::with_capacity(capacity * logical_count as usize);
    for logical in 0..logical_count {
        let frame = load_frame(raw_index_for(section_raw_start, geometry, logical))?;
        symbols.push_str(&frame_reader::read_frame(&frame, cfg, em, content_type, capacity));
    }
    Ok(symbols)
}

/// Locate the pre-metadata section by trying progressively larger windows
/// of logical frames counted back from the tail of the stream, re-reading
/// the whole window each time. The section is small in practice so the
/// quadratic re-read cost this leaves on the table doesn't matter; only
/// worth revisiting if pre-metadata capacity ever shrinks enough to need
/// hundreds of frames.
fn recover_pre_metadata(cfg: &Config, em: &EncodingMap, base: Base, total_frames: u64) -> Result<(PreMetadataFields, u64), VortexError> {
    let geometry = cfg.geometry(ContentType::PreMetadata);
    let rep = geometry.total_frames_repetition as u64;
    let max_window = total_frames / rep.max(1);

    let mut window = 1u64;
    while window <= max_window {
        let section_raw_start = total_frames - window * rep + 1;
        let symbols = read_section_symbols(cfg, em, ContentType::PreMetadata, section_raw_start, window)?;

        let usable_len = (symbols.chars().count() / base.chunk_size()) * base.chunk_size();
        let truncated: String = symbols.chars().take(usable_len).collect();

        if let Ok(bytes) = base.decode_symbols(&truncated) {
            if let Ok(text) = String::from_utf8(bytes) {
                if let Some(declared_len) = metadata::discover_pre_metadata_length(cfg, &text) {
                    if text.chars().count() >= declared_len {
                        let exact: String = text.chars().take(declared_len).collect();
                        if let Ok(fields) = metadata::parse_pre_metadata(cfg, &exact) {
                            return Ok((fields, window));
                        }
                    }
                }
            }
        }
        window += 1;
    }

    Err(VortexError::Protocol("could not locate a valid pre-metadata section within the carrier".to_string()))
}

fn decode_candidate(base: Base, raw_symbols: &str, symbol_len: usize) -> String {
    let truncated: String = raw_symbols.chars().take(symbol_len).collect();
    base.decode_symbols(&truncated)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_default()
}

fn recover_metadata_record(cfg: &Config, em: &EncodingMap, base: Base, fields: &PreMetadataFields, metadata_raw_start: u64) -> Result<MetadataRecord, VortexError> {
    let geometry = cfg.geometry(ContentType::Metadata);
    let rep = geometry.total_frames_repetition as u64;

    let mut cursor = metadata_raw_start;
    let normal_raw = read_section_symbols(cfg, em, ContentType::Metadata, cursor, fields.normal.0 as u64)?;
    cursor += fields.normal.0 as u64 * rep;
    let base64_raw = read_section_symbols(cfg, em, ContentType::Metadata, cursor, fields.base64.0 as u64)?;
    cursor += fields.base64.0 as u64 * rep;
    let rot13_raw = read_section_symbols(cfg, em, ContentType::Metadata, cursor, fields.rot13.0 as u64)?;
    cursor += fields.rot13.0 as u64 * rep;
    let rs_raw = read_section_symbols(cfg, em, ContentType::Metadata, cursor, fields.reed_solomon.0 as u64)?;
    cursor += fields.reed_solomon.0 as u64 * rep;
    let zfec_raw = read_section_symbols(cfg, em, ContentType::Metadata, cursor, fields.zfec.0 as u64)?;

    let candidates = MetadataCandidates {
        normal: decode_candidate(base, &normal_raw, fields.normal.1 as usize),
        base64: decode_candidate(base, &base64_raw, fields.base64.1 as usize),
        rot13: decode_candidate(base, &rot13_raw, fields.rot13.1 as usize),
        reed_solomon: decode_candidate(base, &rs_raw, fields.reed_solomon.2 as usize),
        krs: fields.reed_solomon.1 as usize,
        zfec: decode_candidate(base, &zfec_raw, fields.zfec.1 as usize),
    };
    metadata::validate_cascade(cfg, &candidates)
}

/// Sweep the data section with a dedicated reader thread feeding a bounded
/// queue of loaded frames, and a CPU-only worker pool classifying them —
/// mirroring `pipeline::encode`'s reader/worker split (spec.md §5: "Workers
/// do not perform I/O; the reader does not do CPU work beyond frame demux").
fn decode_data_section(cfg: &Config, em: &EncodingMap, logical_count: u64, raw_start: u64) -> Result<String, VortexError> {
    if logical_count == 0 {
        return Ok(String::new());
    }
    let geometry = *cfg.geometry(ContentType::DataContent);
    let capacity = geometry.usable_databoxes_per_frame;

    let worker_count = std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
        .min(logical_count as usize)
        .max(1);
    let (frame_tx, frame_rx) = bounded::<Indexed<RgbImage>>(worker_count * 4);
    let (result_tx, result_rx) = bounded::<Indexed<String>>(worker_count * 4);
    let stop = Arc::new(AtomicBool::new(false));
    let failure: Arc<Mutex<Option<VortexError>>> = Arc::new(Mutex::new(None));

    let reader_stop = Arc::clone(&stop);
    let reader_failure = Arc::clone(&failure);
    let reader_handle = std::thread::Builder::new()
        .name("vortex-decode-reader".into())
        .spawn(move || {
            for index in 0..logical_count {
                if reader_stop.load(Ordering::Relaxed) {
                    return;
                }
                let raw_index = raw_index_for(raw_start, &geometry, index);
                match load_frame(raw_index) {
                    Ok(frame) => {
                        if frame_tx.send(Indexed { index, value: frame }).is_err() {
                            return;
                        }
                    }
                    Err(err) => {
                        *reader_failure.lock().expect("failure mutex poisoned") = Some(err);
                        reader_stop.store(true, Ordering::Relaxed);
                        return;
                    }
                }
            }
        })
        .expect("spawning decode reader thread");

    let mut worker_handles = Vec::with_capacity(worker_count);
    for _ in 0..worker_count {
        let frame_rx = frame_rx.clone();
        let result_tx = result_tx.clone();
        let cfg = cfg.clone();
        let em = em.clone();
        let stop = Arc::clone(&stop);
        worker_handles.push(
            std::thread::Builder::new()
                .name("vortex-decode-worker".into())
                .spawn(move || {
                    while let Ok(job) = frame_rx.recv() {
                        if stop.load(Ordering::Relaxed) {
                            break;
                        }
                        let symbols = frame_reader::read_frame(&job.value, &cfg, &em, ContentType::DataContent, capacity);
                        if result_tx.send(Indexed { index: job.index, value: symbols }).is_err() {
                            break;
                        }
                    }
                })
                .expect("spawning decode worker thread"),
        );
    }
    drop(frame_rx);
    drop(result_tx);

    let mut reorder = ReorderBuffer::new();
    let mut ordered = Vec::with_capacity(logical_count as usize);
    while let Ok(item) = result_rx.recv() {
        ordered.extend(reorder.push(item));
    }
    reader_handle.join().expect("decode reader thread panicked");
    for handle in worker_handles {
        handle.join().expect("decode worker thread panicked");
    }
    if let Some(err) = failure.lock().expect("failure mutex poisoned").take() {
        return Err(err);
    }
    if ordered.len() as u64 != logical_count {
        return Err(VortexError::Internal("decode worker pool produced fewer frames than logical frames expected".to_string()));
    }
    Ok(ordered.join(""))
}

fn hex_digest_sha1(bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    let mut out = String::with_capacity(40);
    for byte in hasher.finalize() {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Recover the original file from a merged vortexstore video.
pub fn run(cfg: &Config, em: &EncodingMap, base: Base, merged_video_path: &Path) -> Result<DecodeOutput, VortexError> {
    let total_frames = split_into_frames(cfg, merged_video_path)?;

    let (fields, premeta_window) = recover_pre_metadata(cfg, em, base, total_frames)?;
    let premeta_geometry = cfg.geometry(ContentType::PreMetadata);
    let premeta_raw_start = total_frames - premeta_window * premeta_geometry.total_frames_repetition as u64 + 1;

    let metadata_geometry = cfg.geometry(ContentType::Metadata);
    let metadata_logical_total =
        fields.normal.0 as u64 + fields.base64.0 as u64 + fields.rot13.0 as u64 + fields.reed_solomon.0 as u64 + fields.zfec.0 as u64;
    let metadata_raw_span = metadata_logical_total * metadata_geometry.total_frames_repetition as u64;
    let metadata_raw_start = premeta_raw_start
        .checked_sub(metadata_raw_span)
        .ok_or_else(|| VortexError::Protocol("metadata section does not fit before the pre-metadata section".to_string()))?;

    let record = recover_metadata_record(cfg, em, base, &fields, metadata_raw_start)?;

    let data_geometry = cfg.geometry(ContentType::DataContent);
    let data_capacity = data_geometry.usable_databoxes_per_frame;
    let data_logical_count = if record.total_basen_length == 0 {
        0
    } else {
        (record.total_basen_length as usize + data_capacity - 1) / data_capacity
    };
    let data_raw_span = data_logical_count as u64 * data_geometry.total_frames_repetition as u64;
    if data_raw_span != metadata_raw_start - 1 {
        return Err(VortexError::Protocol(format!(
            "data section span ({data_raw_span} frames) does not align with where the metadata section starts (frame {metadata_raw_start})"
        )));
    }

    let data_symbols = decode_data_section(cfg, em, data_logical_count, 1)?;
    let truncated: String = data_symbols.chars().take(record.total_basen_length as usize).collect();
    let data = base.decode_symbols(&truncated)?;

    let actual_sha1 = hex_digest_sha1(&data);
    let sha1_matches = actual_sha1 == record.sha1_hex;

    Ok(DecodeOutput { record, data, sha1_matches })
}
