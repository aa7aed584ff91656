// vortexstore - Data compression resistant video generator.
// Copyright 2025 0verv0ltage
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The Encoding Map: a bijection between baseN symbols and RGB colors, with
//! per-channel tolerance bands for lossy-codec-resistant classification.

use std::collections::BTreeMap;
use std::path::Path;

use crate::basen::Base;
use crate::error::VortexError;

/// One symbol's color and its per-channel tolerance band.
#[derive(Debug, Clone, Copy)]
struct EmEntry {
    symbol: char,
    rgb: (u8, u8, u8),
    lower: (u8, u8, u8),
    upper: (u8, u8, u8),
}

/// A loaded, validated encoding map plus its derived base.
#[derive(Debug, Clone)]
pub struct EncodingMap {
    entries: Vec<EmEntry>,
    base: Base,
}

impl EncodingMap {
    /// Load an encoding map JSON file (`{"<symbol>": "#RRGGBB", ...}`),
    /// derive per-channel bands from `color_threshold_percent`, and reject
    /// any map whose bands overlap on all three channels for two symbols.
    pub fn load(path: &Path, color_threshold_percent: f64) -> Result<Self, VortexError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|err| VortexError::Config(format!("reading encoding map {}: {err}", path.display())))?;
        let map: BTreeMap<String, String> = serde_json::from_str(&raw)
            .map_err(|err| VortexError::Config(format!("parsing encoding map {}: {err}", path.display())))?;

        let base = Base::from_symbol_count(map.len())?;
        let threshold = (color_threshold_percent / 100.0 * 255.0).ceil() as i32;

        let mut entries = Vec::with_capacity(map.len());
        for (key, color_code) in &map {
            let mut chars = key.chars();
            let symbol = match (chars.next(), chars.next()) {
                (Some(c), None) => c,
                _ => {
                    return Err(VortexError::Config(format!(
                        "invalid symbol {key:?} in encoding map: must be exactly one character"
                    )));
                }
            };
            let rgb = parse_hex_color(color_code)?;
            let lower = band_edge(rgb, -threshold);
            let upper = band_edge(rgb, threshold);
            entries.push(EmEntry { symbol, rgb, lower, upper });
        }

        for i in 0..entries.len() {
            for j in (i + 1)..entries.len() {
                if bands_overlap(&entries[i], &entries[j]) {
                    return Err(VortexError::Config(format!(
                        "color band conflict between symbols {:?} and {:?}",
                        entries[i].symbol, entries[j].symbol
                    )));
                }
            }
        }

        Ok(Self { entries, base })
    }

    /// The base this encoding map carries (determined by its symbol count).
    pub const fn base(&self) -> Base {
        self.base
    }

    /// Color assigned to `symbol`.
    pub fn color_for(&self, symbol: char) -> Option<(u8, u8, u8)> {
        self.entries.iter().find(|e| e.symbol == symbol).map(|e| e.rgb)
    }

    /// Classify a sampled `(r, g, b)` pixel back to a symbol: a fast
    /// in-band lookup first, falling back to nearest color by squared
    /// Euclidean distance.
    pub fn classify(&self, r: u8, g: u8, b: u8) -> char {
        for entry in &self.entries {
            if in_band(entry.lower.0, entry.upper.0, r)
                && in_band(entry.lower.1, entry.upper.1, g)
                && in_band(entry.lower.2, entry.upper.2, b)
            {
                return entry.symbol;
            }
        }

        let mut best = self.entries[0];
        let mut best_dist = squared_distance(best.rgb, (r, g, b));
        for entry in &self.entries[1..] {
            let dist = squared_distance(entry.rgb, (r, g, b));
            if dist < best_dist {
                best_dist = dist;
                best = *entry;
            }
        }
        best.symbol
    }
}

fn in_band(lower: u8, upper: u8, value: u8) -> bool {
    lower <= value && value <= upper
}

fn squared_distance(a: (u8, u8, u8), b: (u8, u8, u8)) -> i32 {
    let dr = a.0 as i32 - b.0 as i32;
    let dg = a.1 as i32 - b.1 as i32;
    let db = a.2 as i32 - b.2 as i32;
    dr * dr + dg * dg + db * db
}

fn band_edge(rgb: (u8, u8, u8), delta: i32) -> (u8, u8, u8) {
    (
        clamp_channel(rgb.0 as i32 + delta),
        clamp_channel(rgb.1 as i32 + delta),
        clamp_channel(rgb.2 as i32 + delta),
    )
}

fn clamp_channel(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}

fn bands_overlap(a: &EmEntry, b: &EmEntry) -> bool {
    let r = a.lower.0 <= b.upper.0 && b.lower.0 <= a.upper.0;
    let g = a.lower.1 <= b.upper.1 && b.lower.1 <= a.upper.1;
    let bl = a.lower.2 <= b.upper.2 && b.lower.2 <= a.upper.2;
    r && g && bl
}

fn parse_hex_color(code: &str) -> Result<(u8, u8, u8), VortexError> {
    let bad = || VortexError::Config(format!("invalid color code {code:?} in encoding map: must be #RRGGBB"));
    if code.len() != 7 || !code.starts_with('#') {
        return Err(bad());
    }
    let r = u8::from_str_radix(&code[1..3], 16).map_err(|_| bad())?;
    let g = u8::from_str_radix(&code[3..5], 16).map_err(|_| bad())?;
    let b = u8::from_str_radix(&code[5..7], 16).map_err(|_| bad())?;
    Ok((r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_em(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_valid_binary_map() {
        let file = write_em(r#"{"0": "#000000", "1": "#FFFFFF"}"#);
        let em = EncodingMap::load(file.path(), 5.0).unwrap();
        assert!(matches!(em.base(), Base::B2));
        assert_eq!(em.color_for('0'), Some((0, 0, 0)));
    }

    #[test]
    fn rejects_overlapping_bands() {
        let file = write_em(r#"{"0": "#101010", "1": "#101011"}"#);
        let err = EncodingMap::load(file.path(), 50.0).unwrap_err();
        assert!(matches!(err, VortexError::Config(_)));
    }

    #[test]
    fn rejects_unsupported_symbol_count() {
        let file = write_em(r#"{"0": "#000000", "1": "#FFFFFF", "2": "#FF0000"}"#);
        assert!(EncodingMap::load(file.path(), 5.0).is_err());
    }

    #[test]
    fn rejects_malformed_color_code() {
        let file = write_em(r#"{"0": "#000000", "1": "not-a-color"}"#);
        assert!(EncodingMap::load(file.path(), 5.0).is_err());
    }

    #[test]
    fn classify_exact_colors_round_trips() {
        let file = write_em(r#"{"0": "#000000", "1": "#FFFFFF", "2": "#FF0000", "3": "#00FF00"}"#);
        let em = EncodingMap::load(file.path(), 2.0).unwrap();
        assert_eq!(em.classify(0, 0, 0), '0');
        assert_eq!(em.classify(255, 255, 255), '1');
        assert_eq!(em.classify(255, 0, 0), '2');
    }

    #[test]
    fn classify_falls_back_to_nearest_color() {
        let file = write_em(r#"{"0": "#000000", "1": "#FFFFFF"}"#);
        let em = EncodingMap::load(file.path(), 1.0).unwrap();
        assert_eq!(em.classify(10, 10, 10), '0');
        assert_eq!(em.classify(240, 240, 240), '1');
    }
}
