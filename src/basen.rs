// vortexstore - Data compression resistant video generator.
// Copyright 2025 0verv0ltage
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Fixed-width byte <-> symbol-string conversion for each supported
//! encoding map size.
//!
//! `Base::chunk_size` is how many symbols of that base jointly represent one
//! "unit": one byte for `{2,4,8,10,16}`, or a 3-byte/4-symbol block for `64`.
//! The streaming frame producer (`producer.rs`) buffers partial units across
//! frame boundaries; this module only ever sees whole units.

use crate::error::VortexError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

/// One of the six encoding-map sizes a loaded EM may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Base {
    /// Binary digits, 8 symbols per byte.
    B2,
    /// Quaternary digits, 4 symbols per byte.
    B4,
    /// Octal digits, 3 symbols per byte.
    B8,
    /// Decimal digits, 3 symbols per byte.
    B10,
    /// Hex digits, 2 symbols per byte (preserves leading zeros, `data.hex()`).
    B16,
    /// Standard Base64 alphabet, 4 symbols per 3 bytes.
    B64,
}

impl Base {
    /// Map an encoding map's symbol count to its base, or reject unsupported sizes.
    pub fn from_symbol_count(count: usize) -> Result<Self, VortexError> {
        match count {
            2 => Ok(Self::B2),
            4 => Ok(Self::B4),
            8 => Ok(Self::B8),
            10 => Ok(Self::B10),
            16 => Ok(Self::B16),
            64 => Ok(Self::B64),
            other => Err(VortexError::Config(format!(
                "encoding map has {other} symbols; must be one of 2, 4, 8, 10, 16, 64"
            ))),
        }
    }

    /// Numeric radix this variant uses (not meaningful for `B64`, which is
    /// handled as whole base64 blocks rather than per-digit arithmetic).
    const fn radix(self) -> u32 {
        match self {
            Self::B2 => 2,
            Self::B4 => 4,
            Self::B8 => 8,
            Self::B10 => 10,
            Self::B16 => 16,
            Self::B64 => 64,
        }
    }

    /// Number of symbols that jointly represent one unit: one input byte for
    /// every base except `B64`, whose unit is a 3-byte/4-symbol block.
    pub const fn chunk_size(self) -> usize {
        match self {
            Self::B2 => 8,
            Self::B4 => 4,
            Self::B8 => 3,
            Self::B10 => 3,
            Self::B16 => 2,
            Self::B64 => 4,
        }
    }

    /// Number of input bytes one `chunk_size`-symbol unit represents.
    pub const fn bytes_per_unit(self) -> usize {
        match self {
            Self::B64 => 3,
            _ => 1,
        }
    }

    /// Encode the whole byte slice to a symbol string. For `B64` the final
    /// block may be shorter than 3 bytes and is `=`-padded as usual.
    pub fn encode_bytes(self, data: &[u8]) -> String {
        match self {
            Self::B64 => BASE64.encode(data),
            Self::B16 => hex_encode(data),
            _ => {
                let width = self.chunk_size();
                let mut out = String::with_capacity(data.len() * width);
                for &byte in data {
                    push_digits(&mut out, byte as u32, self.radix(), width);
                }
                out
            }
        }
    }

    /// Decode a symbol string whose length is a whole multiple of
    /// `chunk_size` back into bytes.
    pub fn decode_symbols(self, symbols: &str) -> Result<Vec<u8>, VortexError> {
        if symbols.len() % self.chunk_size() != 0 {
            return Err(VortexError::Protocol(format!(
                "symbol chunk length {} is not a multiple of chunk_size {}",
                symbols.len(),
                self.chunk_size()
            )));
        }
        match self {
            Self::B64 => BASE64
                .decode(symbols)
                .map_err(|err| VortexError::Protocol(format!("invalid base64 chunk: {err}"))),
            Self::B16 => hex_decode(symbols),
            _ => {
                let width = self.chunk_size();
                let mut out = Vec::with_capacity(symbols.len() / width);
                for group in symbols.as_bytes().chunks(width) {
                    let digits = std::str::from_utf8(group)
                        .map_err(|_| VortexError::Protocol("non-UTF8 symbol chunk".to_string()))?;
                    let value = u32::from_str_radix(digits, self.radix()).map_err(|err| {
                        VortexError::Protocol(format!("invalid base-{} digit group {digits:?}: {err}", self.radix()))
                    })?;
                    if value > 0xFF {
                        return Err(VortexError::Protocol(format!(
                            "digit group {digits:?} decodes to {value}, out of byte range"
                        )));
                    }
                    out.push(value as u8);
                }
                Ok(out)
            }
        }
    }
}

fn push_digits(out: &mut String, mut value: u32, radix: u32, width: usize) {
    let mut digits = [0u8; 8];
    let mut i = width;
    while i > 0 {
        i -= 1;
        let digit = (value % radix) as u8;
        digits[i] = if digit < 10 { b'0' + digit } else { b'a' + digit - 10 };
        value /= radix;
    }
    out.push_str(std::str::from_utf8(&digits[..width]).unwrap());
}

fn hex_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    for byte in data {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

fn hex_decode(symbols: &str) -> Result<Vec<u8>, VortexError> {
    if symbols.len() % 2 != 0 {
        return Err(VortexError::Protocol("hex chunk has odd length".to_string()));
    }
    symbols
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            let digits = std::str::from_utf8(pair).map_err(|_| VortexError::Protocol("non-UTF8 hex chunk".to_string()))?;
            u8::from_str_radix(digits, 16).map_err(|err| VortexError::Protocol(format!("invalid hex byte {digits:?}: {err}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trips(base: Base, data: &[u8]) {
        let symbols = base.encode_bytes(data);
        let decoded = base.decode_symbols(&symbols).expect("decode should succeed");
        assert_eq!(decoded, data, "round trip failed for {base:?}");
    }

    #[test]
    fn every_base_round_trips() {
        let data = b"The quick brown fox jumps over the lazy dog. 0123456789";
        for base in [Base::B2, Base::B4, Base::B8, Base::B10, Base::B16, Base::B64] {
            round_trips(base, data);
        }
    }

    #[test]
    fn base4_width_matches_byte_range() {
        assert_eq!(Base::B4.encode_bytes(&[255]), "3333");
        assert_eq!(Base::B4.encode_bytes(&[0]), "0000");
    }

    #[test]
    fn base8_preserves_full_byte_range() {
        assert_eq!(Base::B8.encode_bytes(&[255]), "377");
        assert_eq!(Base::B8.decode_symbols("377").unwrap(), vec![255]);
    }

    #[test]
    fn base16_preserves_leading_zeros() {
        assert_eq!(Base::B16.encode_bytes(&[0x0A, 0x00]), "0a00");
    }

    #[test]
    fn from_symbol_count_rejects_unsupported_sizes() {
        assert!(Base::from_symbol_count(3).is_err());
        assert!(Base::from_symbol_count(64).is_ok());
    }

    #[test]
    fn decode_rejects_misaligned_chunk_length() {
        assert!(Base::B16.decode_symbols("abc").is_err());
    }
}
