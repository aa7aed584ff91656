// vortexstore - Data compression resistant video generator.
// Copyright 2025 0verv0ltage
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Systematic Reed-Solomon `RS(n, n - nsym)` over `GF(2^8)`.
//!
//! One of the five redundant encodings in the metadata validation cascade;
//! corrects up to `nsym / 2` corrupted bytes per codeword, the same budget
//! Hamming(31,26) gives the data stream in `error_correction.rs`, but spread
//! over a whole metadata record instead of a 31-bit chunk.

use crate::gf256;

/// A codeword could not be decoded: too many errors for the parity budget,
/// or the error locator disagreed with the Chien search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RsDecodeError;

impl std::fmt::Display for RsDecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "reed-solomon codeword has more errors than nsym can correct")
    }
}

impl std::error::Error for RsDecodeError {}

/// Append `nsym` parity bytes to `data`, systematic (message bytes unchanged).
///
/// `data.len() + nsym` must not exceed 255, the field's codeword limit.
pub fn encode(data: &[u8], nsym: usize) -> Vec<u8> {
    let generator = gf256::rs_generator_poly(nsym);
    let mut padded = data.to_vec();
    padded.resize(data.len() + nsym, 0);
    for i in 0..data.len() {
        let coef = padded[i];
        if coef == 0 {
            continue;
        }
        for (j, &gcoeff) in generator.iter().enumerate() {
            padded[i + j] = gf256::add(padded[i + j], gf256::mul(gcoeff, coef));
        }
    }
    let mut out = data.to_vec();
    out.extend_from_slice(&padded[data.len()..]);
    out
}

fn calc_syndromes(msg: &[u8], nsym: usize) -> Vec<u8> {
    let mut synd = vec![0u8];
    for i in 0..nsym {
        synd.push(gf256::poly_eval(msg, gf256::pow(2, i)));
    }
    synd
}

fn find_error_locator(synd: &[u8], nsym: usize) -> Vec<u8> {
    let mut err_loc = vec![1u8];
    let mut old_loc = vec![1u8];
    for i in 0..nsym {
        let k = i + 1;
        let mut delta = synd[k];
        for (j, &loc) in err_loc.iter().rev().enumerate().skip(1) {
            delta = gf256::add(delta, gf256::mul(loc, synd[k - j]));
        }
        old_loc.push(0);
        if delta != 0 {
            if old_loc.len() > err_loc.len() {
                let new_loc = gf256::poly_scale(&old_loc, delta);
                old_loc = gf256::poly_scale(&err_loc, gf256::inv(delta));
                err_loc = new_loc;
            }
            err_loc = gf256::poly_add(&err_loc, &gf256::poly_scale(&old_loc, delta));
        }
    }
    while err_loc.first() == Some(&0) && err_loc.len() > 1 {
        err_loc.remove(0);
    }
    err_loc
}

fn find_errors(err_loc: &[u8], nmess: usize) -> Option<Vec<usize>> {
    let errs = err_loc.len() - 1;
    let mut err_pos = Vec::new();
    let reversed: Vec<u8> = err_loc.iter().rev().copied().collect();
    for i in 0..nmess {
        if gf256::poly_eval(&reversed, gf256::pow(2, i)) == 0 {
            err_pos.push(nmess - 1 - i);
        }
    }
    if err_pos.len() != errs {
        return None;
    }
    Some(err_pos)
}

fn find_error_evaluator(synd: &[u8], err_loc: &[u8], nsym: usize) -> Vec<u8> {
    let product = gf256::poly_mul(synd, err_loc);
    let mut truncator = vec![0u8; nsym + 2];
    truncator[0] = 1;
    let (_, remainder) = gf256::poly_div(&product, &truncator);
    remainder
}

fn correct_errata(msg_in: &[u8], synd: &[u8], err_pos: &[usize]) -> Result<Vec<u8>, RsDecodeError> {
    let coef_pos: Vec<usize> = err_pos.iter().map(|&p| msg_in.len() - 1 - p).collect();
    let mut err_loc = vec![1u8];
    for &i in &coef_pos {
        err_loc = gf256::poly_mul(&err_loc, &[gf256::pow(2, i), 1]);
    }
    let synd_rev: Vec<u8> = synd.iter().rev().copied().collect();
    let mut err_eval = find_error_evaluator(&synd_rev, &err_loc, err_loc.len() - 1);
    err_eval.reverse();

    // l = 255 - cp; gf_pow(2, -l mod 255) reduces to gf_pow(2, cp) since
    // -l ≡ cp (mod 255) for 0 <= cp < 255.
    let x: Vec<u8> = coef_pos.iter().map(|&cp| gf256::pow(2, cp)).collect();

    let mut e = vec![0u8; msg_in.len()];
    for (i, &xi) in x.iter().enumerate() {
        let xi_inv = gf256::inv(xi);
        let mut err_loc_prime = 1u8;
        for (j, &xj) in x.iter().enumerate() {
            if j != i {
                err_loc_prime = gf256::mul(err_loc_prime, gf256::add(1, gf256::mul(xi_inv, xj)));
            }
        }
        if err_loc_prime == 0 {
            return Err(RsDecodeError);
        }
        let reversed_eval: Vec<u8> = err_eval.iter().rev().copied().collect();
        let y = gf256::mul(xi, gf256::poly_eval(&reversed_eval, xi_inv));
        let magnitude = gf256::div(y, err_loc_prime);
        e[err_pos[i]] = magnitude;
    }
    Ok(gf256::poly_add(msg_in, &e))
}

/// Decode a codeword produced by [`encode`], correcting up to `nsym / 2`
/// byte errors. Returns the original message (without the parity tail).
pub fn decode(codeword: &[u8], nsym: usize) -> Result<Vec<u8>, RsDecodeError> {
    let synd = calc_syndromes(codeword, nsym);
    if synd.iter().all(|&s| s == 0) {
        return Ok(codeword[..codeword.len() - nsym].to_vec());
    }
    let err_loc = find_error_locator(&synd, nsym);
    let errs = err_loc.len() - 1;
    if errs * 2 > nsym {
        return Err(RsDecodeError);
    }
    let err_pos = find_errors(&err_loc, codeword.len()).ok_or(RsDecodeError)?;
    let corrected = correct_errata(codeword, &synd, &err_pos)?;
    let verify = calc_syndromes(&corrected, nsym);
    if !verify.iter().all(|&s| s == 0) {
        return Err(RsDecodeError);
    }
    Ok(corrected[..corrected.len() - nsym].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_is_systematic() {
        let data = b"hello world";
        let codeword = encode(data, 10);
        assert_eq!(&codeword[..data.len()], data);
        assert_eq!(codeword.len(), data.len() + 10);
    }

    #[test]
    fn decode_clean_codeword_round_trips() {
        let data = b"vortexstore metadata record payload";
        let nsym = 12;
        let codeword = encode(data, nsym);
        let decoded = decode(&codeword, nsym).expect("clean codeword decodes");
        assert_eq!(decoded, data);
    }

    #[test]
    fn decode_corrects_errors_within_budget() {
        let data = b"0123456789abcdefghijklmnopqrstuvwxyz";
        let nsym = 10;
        let mut codeword = encode(data, nsym);
        codeword[2] ^= 0xFF;
        codeword[14] ^= 0x01;
        codeword[30] ^= 0x7F;
        codeword[35] ^= 0x80;
        let decoded = decode(&codeword, nsym).expect("4 errors within nsym/2=5 budget");
        assert_eq!(decoded, data);
    }

    #[test]
    fn decode_rejects_too_many_errors() {
        let data = b"too many corrupted bytes for this parity budget!!";
        let nsym = 6;
        let mut codeword = encode(data, nsym);
        for byte in codeword.iter_mut().take(10) {
            *byte ^= 0xAA;
        }
        assert!(decode(&codeword, nsym).is_err());
    }
}
