// vortexstore - Data compression resistant video generator.
// Copyright 2025 0verv0ltage
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Pre-metadata and metadata record construction, the five redundant
//! metadata encodings, and the cascade that validates them on decode.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::basen::Base;
use crate::config::Config;
use crate::error::VortexError;
use crate::rot::rot13_rot5;
use crate::{rs, zfec};

/// `(k, m)` erasure-code parameters used for the zfec metadata encoding.
const ZFEC_K: usize = 3;
const ZFEC_M: usize = 5;

/// The decoded and validated contents of a metadata record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRecord {
    /// Original file name.
    pub name: String,
    /// Original file size in bytes.
    pub size: u64,
    /// Total count of data-content baseN symbols produced from the input.
    pub total_basen_length: u64,
    /// Lowercase hex SHA1 digest of the raw input bytes.
    pub sha1_hex: String,
}

impl MetadataRecord {
    fn inner_form(&self, main: &str, sub: &str) -> String {
        format!(
            "{main}METADATA{sub}{}{sub}{}{sub}{}{sub}{}{main}",
            self.name, self.size, self.total_basen_length, self.sha1_hex
        )
    }

    /// Build the checksum-sealed wire form:
    /// `<inner>|CHECKSUM:<c>|`, `c = sum(ord(char in inner)) mod 256`.
    pub fn sealed(&self, main: &str, sub: &str) -> String {
        let inner = self.inner_form(main, sub);
        let checksum = checksum_of(&inner);
        format!("{inner}|CHECKSUM:{checksum}|")
    }

    /// Parse and checksum-validate a sealed metadata record.
    fn parse_sealed(sealed: &str, main: &str, sub: &str) -> Option<Self> {
        let (inner, tail) = sealed.split_once("|CHECKSUM:")?;
        let checksum_str = tail.strip_suffix('|')?;
        let expected: u8 = checksum_str.parse().ok()?;
        if checksum_of(inner) != expected {
            return None;
        }

        let body = inner.strip_prefix(main)?.strip_suffix(main)?;
        let mut parts = body.split(sub);
        if parts.next()? != "METADATA" {
            return None;
        }
        let name = parts.next()?.to_string();
        let size: u64 = parts.next()?.parse().ok()?;
        let total_basen_length: u64 = parts.next()?.parse().ok()?;
        let sha1_hex = parts.next()?.to_string();
        if parts.next().is_some() {
            return None;
        }

        Some(Self { name, size, total_basen_length, sha1_hex })
    }
}

fn checksum_of(inner: &str) -> u8 {
    inner.bytes().fold(0u32, |acc, byte| acc + byte as u32) as u8
}

/// The pre-metadata's per-encoding frame/length accounting:
/// `(frame_count, symbol_length)` for normal/base64/rot13/zfec, and
/// `(frame_count, nsym, symbol_length)` for reed_solomon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreMetadataFields {
    /// `(Fn, Dn)` for the `normal` encoding.
    pub normal: (u32, u32),
    /// `(Fb, Db)` for the `base64` encoding.
    pub base64: (u32, u32),
    /// `(Fr, Dr)` for the `rot13`/`rot5` encoding.
    pub rot13: (u32, u32),
    /// `(Frs, Krs, Drs)` for the `reed_solomon` encoding.
    pub reed_solomon: (u32, u32, u32),
    /// `(Fz, Dz)` for the `zfec` encoding.
    pub zfec: (u32, u32),
}

/// Build the fixed-leader pre-metadata text (length prefix + body), ready
/// to be baseN-encoded and painted onto PREMETADATA frames.
pub fn build_pre_metadata(cfg: &Config, base: Base, fields: &PreMetadataFields) -> Result<String, VortexError> {
    let main = cfg.premetadata_metadata_main_delimiter.as_str();
    let sub = cfg.premetadata_metadata_sub_delimiter.as_str();
    let body = format!(
        "PREMETADATA{sub}normal{sub}{}{sub}{}{sub}base64{sub}{}{sub}{}{sub}rot13{sub}{}{sub}{}{sub}reed_solomon{sub}{}{sub}{}{sub}{}{sub}zfec{sub}{}{sub}{}",
        fields.normal.0,
        fields.normal.1,
        fields.base64.0,
        fields.base64.1,
        fields.rot13.0,
        fields.rot13.1,
        fields.reed_solomon.0,
        fields.reed_solomon.1,
        fields.reed_solomon.2,
        fields.zfec.0,
        fields.zfec.1,
    );

    let digit_width = cfg.length_of_digits_to_represent_size;
    let placeholder = "0".repeat(digit_width);
    let probe_text = format!("{main}{placeholder}{main}{body}{main}");
    let symbol_count = base.encode_bytes(probe_text.as_bytes()).chars().count();
    let length_field = format!("{symbol_count:0>digit_width$}");
    if length_field.len() != digit_width {
        return Err(VortexError::Config(format!(
            "pre-metadata length {symbol_count} does not fit in {digit_width} digits"
        )));
    }

    Ok(format!("{main}{length_field}{main}{body}{main}"))
}

/// Try to locate the pre-metadata's total symbol length from a prefix of
/// already-decoded pre-metadata text. Returns `None` until enough text has
/// accumulated to read past the second main delimiter.
pub fn discover_pre_metadata_length(cfg: &Config, text: &str) -> Option<usize> {
    let main = cfg.premetadata_metadata_main_delimiter.as_str();
    let digit_width = cfg.length_of_digits_to_represent_size;

    let rest = text.strip_prefix(main)?;
    if rest.len() < digit_width {
        return None;
    }
    let (length_field, rest) = rest.split_at(digit_width);
    if !length_field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    rest.strip_prefix(main)?;
    length_field.parse().ok()
}

/// Parse the fully-accumulated pre-metadata text into its per-encoding
/// frame/length fields.
pub fn parse_pre_metadata(cfg: &Config, text: &str) -> Result<PreMetadataFields, VortexError> {
    let main = cfg.premetadata_metadata_main_delimiter.as_str();
    let sub = cfg.premetadata_metadata_sub_delimiter.as_str();
    let digit_width = cfg.length_of_digits_to_represent_size;

    let protocol_err = |msg: &str| VortexError::Protocol(format!("malformed pre-metadata: {msg}"));

    let rest = text.strip_prefix(main).ok_or_else(|| protocol_err("missing leading delimiter"))?;
    if rest.len() < digit_width {
        return Err(protocol_err("truncated length field"));
    }
    let (_length_field, rest) = rest.split_at(digit_width);
    let rest = rest.strip_prefix(main).ok_or_else(|| protocol_err("missing second delimiter"))?;
    let body = rest.strip_suffix(main).ok_or_else(|| protocol_err("missing trailing delimiter"))?;

    let parts: Vec<&str> = body.split(sub).collect();
    if parts.len() != 17 || parts[0] != "PREMETADATA" {
        return Err(protocol_err("unexpected field layout"));
    }
    let parse_u32 = |s: &str| -> Result<u32, VortexError> {
        s.parse().map_err(|_| protocol_err(&format!("invalid numeric field {s:?}")))
    };

    Ok(PreMetadataFields {
        normal: (parse_u32(parts[2])?, parse_u32(parts[3])?),
        base64: (parse_u32(parts[5])?, parse_u32(parts[6])?),
        rot13: (parse_u32(parts[8])?, parse_u32(parts[9])?),
        reed_solomon: (parse_u32(parts[11])?, parse_u32(parts[12])?, parse_u32(parts[13])?),
        zfec: (parse_u32(parts[15])?, parse_u32(parts[16])?),
    })
}

/// The five redundant metadata encodings, as base-N symbol strings ready to
/// be painted onto METADATA frames, in fixed cascade order.
#[derive(Debug, Clone)]
pub struct MetadataEncodings {
    /// `normal` = three literal copies of the sealed record concatenated.
    pub normal: String,
    /// `base64` of one copy.
    pub base64: String,
    /// `rot13`/`rot5` of one copy.
    pub rot13: String,
    /// Reed-Solomon codeword over one copy, base64-wrapped.
    pub reed_solomon: String,
    /// Reed-Solomon `nsym` parameter used above.
    pub krs: usize,
    /// zfec `(3, 5)` shares, hex-encoded and concatenated.
    pub zfec: String,
}

/// Build the five redundant textual encodings of a sealed metadata record.
pub fn build_encodings(sealed: &str) -> MetadataEncodings {
    let normal = format!("{sealed}{sealed}{sealed}");
    let base64 = BASE64.encode(sealed.as_bytes());
    let rot13 = rot13_rot5(sealed);

    // `nsym = min(len, 255)` per the protocol, but a single GF(2^8) codeword
    // cannot exceed 255 bytes total, so for sealed records at or beyond the
    // 128-byte halfway point `nsym` is further bounded by `255 - len` (see
    // SPEC_FULL.md §4.5 for why this single-block ceiling is accepted
    // rather than splitting the record across multiple RS blocks).
    let nsym = sealed.len().min(255usize.saturating_sub(sealed.len()));
    let rs_codeword = rs::encode(sealed.as_bytes(), nsym);
    let reed_solomon = BASE64.encode(&rs_codeword);

    let shares = zfec::encode(sealed.as_bytes(), ZFEC_K, ZFEC_M);
    let zfec_hex = shares.iter().map(|share| hex_encode(share)).collect::<String>();

    MetadataEncodings { normal, base64, rot13, reed_solomon, krs: nsym, zfec: zfec_hex }
}

/// The five metadata candidates as decoded back from their symbol chunks
/// (baseN-decoded to bytes, then interpreted as UTF-8 text), ready for
/// cascade validation.
#[derive(Debug, Clone)]
pub struct MetadataCandidates {
    /// Text recovered from the `normal` symbol chunk.
    pub normal: String,
    /// Text recovered from the `base64` symbol chunk.
    pub base64: String,
    /// Text recovered from the `rot13` symbol chunk.
    pub rot13: String,
    /// Text recovered from the `reed_solomon` symbol chunk.
    pub reed_solomon: String,
    /// `Krs` as read from pre-metadata.
    pub krs: usize,
    /// Text recovered from the `zfec` symbol chunk.
    pub zfec: String,
}

/// Validate the cascade in fixed order {normal, base64, rot13,
/// reed_solomon, zfec}, returning the first candidate whose checksum
/// passes. Fatal (`VortexError::Protocol`) if every candidate fails.
pub fn validate_cascade(cfg: &Config, candidates: &MetadataCandidates) -> Result<MetadataRecord, VortexError> {
    let main = cfg.premetadata_metadata_main_delimiter.as_str();
    let sub = cfg.premetadata_metadata_sub_delimiter.as_str();

    if let Some(record) = try_normal(&candidates.normal, main, sub) {
        return Ok(record);
    }
    if let Some(record) = try_base64(&candidates.base64, main, sub) {
        return Ok(record);
    }
    if let Some(record) = try_rot13(&candidates.rot13, main, sub) {
        return Ok(record);
    }
    if let Some(record) = try_reed_solomon(&candidates.reed_solomon, candidates.krs, main, sub) {
        return Ok(record);
    }
    if let Some(record) = try_zfec(&candidates.zfec, main, sub) {
        return Ok(record);
    }

    Err(VortexError::Protocol(
        "all five metadata encodings failed checksum validation".to_string(),
    ))
}

fn try_normal(normal: &str, main: &str, sub: &str) -> Option<MetadataRecord> {
    if normal.is_empty() || normal.len() % 3 != 0 {
        return None;
    }
    let third = normal.len() / 3;
    let bytes = normal.as_bytes();
    let (a, rest) = bytes.split_at(third);
    let (b, c) = rest.split_at(third);
    let majority: Vec<u8> = (0..third).map(|i| (a[i] & b[i]) | (a[i] & c[i]) | (b[i] & c[i])).collect();
    let text = String::from_utf8(majority).ok()?;
    MetadataRecord::parse_sealed(&text, main, sub)
}

fn try_base64(encoded: &str, main: &str, sub: &str) -> Option<MetadataRecord> {
    let decoded = BASE64.decode(encoded).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    MetadataRecord::parse_sealed(&text, main, sub)
}

fn try_rot13(encoded: &str, main: &str, sub: &str) -> Option<MetadataRecord> {
    let text = rot13_rot5(encoded);
    MetadataRecord::parse_sealed(&text, main, sub)
}

fn try_reed_solomon(encoded: &str, krs: usize, main: &str, sub: &str) -> Option<MetadataRecord> {
    let codeword = BASE64.decode(encoded).ok()?;
    if krs == 0 || krs > codeword.len() {
        return None;
    }
    let decoded = rs::decode(&codeword, krs).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    MetadataRecord::parse_sealed(&text, main, sub)
}

fn try_zfec(encoded_hex: &str, main: &str, sub: &str) -> Option<MetadataRecord> {
    let bytes = hex_decode(encoded_hex).ok()?;
    if bytes.is_empty() || bytes.len() % ZFEC_M != 0 {
        return None;
    }
    let share_len = bytes.len() / ZFEC_M;
    let shares: Vec<(usize, Vec<u8>)> =
        bytes.chunks(share_len).enumerate().map(|(idx, chunk)| (idx, chunk.to_vec())).collect();
    let decoded = zfec::decode(ZFEC_K, ZFEC_M, &shares[..ZFEC_K]).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    MetadataRecord::parse_sealed(text.trim_end_matches(' '), main, sub)
}

fn hex_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    for byte in data {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

fn hex_decode(text: &str) -> Result<Vec<u8>, VortexError> {
    if text.len() % 2 != 0 {
        return Err(VortexError::Protocol("hex-encoded zfec shares have odd length".to_string()));
    }
    text.as_bytes()
        .chunks(2)
        .map(|pair| {
            let digits = std::str::from_utf8(pair)
                .map_err(|_| VortexError::Protocol("non-UTF8 hex byte".to_string()))?;
            u8::from_str_radix(digits, 16)
                .map_err(|err| VortexError::Protocol(format!("invalid hex byte {digits:?}: {err}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        let toml_text = r#"
            [frame]
            frame_width = 640
            frame_height = 480
            margin = 10
            padding = 5
            output_fps = 30
            encoding_speed = 3
            use_same_bgr_frame_for_repetetion = true

            [content]
            data_box_size_step = [20, 16, 8]
            pick_frame_to_read = [1, 1, 1]
            total_frames_repetition = [1, 1, 1]

            [encoding]
            encoding_map_path = "em.json"
            color_threshold_percent = 10.0
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
    fn sealed_record_round_trips_through_checksum() {
        let record = MetadataRecord {
            name: "file.bin".to_string(),
            size: 1024,
            total_basen_length: 2048,
            sha1_hex: "da39a3ee5e6b4b0d3255bfef95601890afd80709".to_string(),
        };
        let sealed = record.sealed("|::-::|", "|:-:|");
        let parsed = MetadataRecord::parse_sealed(&sealed, "|::-::|", "|:-:|").unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn checksum_mismatch_is_rejected() {
        let record = MetadataRecord {
            name: "a".to_string(),
            size: 1,
            total_basen_length: 1,
            sha1_hex: "x".to_string(),
        };
        let sealed = record.sealed("|::-::|", "|:-:|");
        let tampered = sealed.replace("|CHECKSUM:", "|CHECKSUM:99");
        assert!(MetadataRecord::parse_sealed(&tampered, "|::-::|", "|:-:|").is_none());
    }

    #[test]
    fn pre_metadata_round_trips() {
        let cfg = test_config();
        let fields = PreMetadataFields {
            normal: (2, 300),
            base64: (1, 100),
            rot13: (1, 100),
            reed_solomon: (1, 150, 150),
            zfec: (2, 250),
        };
        let text = build_pre_metadata(&cfg, Base::B16, &fields).unwrap();
        let length = discover_pre_metadata_length(&cfg, &text).unwrap();
        assert_eq!(length, text.chars().count());
        let parsed = parse_pre_metadata(&cfg, &text).unwrap();
        assert_eq!(parsed, fields);
    }

    #[test]
    fn cascade_recovers_from_normal_encoding() {
        let record = MetadataRecord {
            name: "f.bin".to_string(),
            size: 16,
            total_basen_length: 128,
            sha1_hex: "b7e23ec29af22b0b4e41da31e868d57226121c84".to_string(),
        };
        let sealed = record.sealed("|::-::|", "|:-:|");
        let encodings = build_encodings(&sealed);
        let candidates = MetadataCandidates {
            normal: encodings.normal,
            base64: encodings.base64,
            rot13: encodings.rot13,
            reed_solomon: encodings.reed_solomon,
            krs: encodings.krs,
            zfec: encodings.zfec,
        };
        let cfg = test_config();
        let recovered = validate_cascade(&cfg, &candidates).unwrap();
        assert_eq!(recovered, record);
    }

    #[test]
    fn cascade_recovers_when_normal_is_corrupted() {
        let record = MetadataRecord {
            name: "f.bin".to_string(),
            size: 16,
            total_basen_length: 128,
            sha1_hex: "b7e23ec29af22b0b4e41da31e868d57226121c84".to_string(),
        };
        let sealed = record.sealed("|::-::|", "|:-:|");
        let encodings = build_encodings(&sealed);
        let mut normal_bytes = encodings.normal.into_bytes();
        for byte in normal_bytes.iter_mut().take(10) {
            *byte ^= 0xFF;
        }
        let candidates = MetadataCandidates {
            normal: String::from_utf8_lossy(&normal_bytes).into_owned(),
            base64: encodings.base64,
            rot13: encodings.rot13,
            reed_solomon: encodings.reed_solomon,
            krs: encodings.krs,
            zfec: encodings.zfec,
        };
        let cfg = test_config();
        let recovered = validate_cascade(&cfg, &candidates).unwrap();
        assert_eq!(recovered, record);
    }

    #[test]
    fn cascade_fails_when_every_encoding_is_corrupted() {
        let candidates = MetadataCandidates {
            normal: "garbage".to_string(),
            base64: "garbage".to_string(),
            rot13: "garbage".to_string(),
            reed_solomon: "garbage".to_string(),
            krs: 10,
            zfec: "00".repeat(30),
        };
        let cfg = test_config();
        assert!(validate_cascade(&cfg, &candidates).is_err());
    }
}
