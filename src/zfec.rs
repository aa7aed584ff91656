// vortexstore - Data compression resistant video generator.
// Copyright 2025 0verv0ltage
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! `(k, m)` systematic erasure coding over `GF(2^8)`, built from a Cauchy
//! matrix made systematic by Gauss-Jordan reduction.
//!
//! The fourth of the five redundant encodings in the metadata validation
//! cascade: split the record into `k` blocks, emit `m` shares, and recover
//! the record from any `k` of the `m` shares (`k = 3`, `m = 5` in practice).
//! Shares beyond the systematic prefix share `gf256`'s field tables with the
//! Reed-Solomon codec in `rs.rs`.

use crate::gf256;

/// A share set could not be decoded: fewer than `k` shares supplied, or an
/// index collision left the coefficient matrix singular.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZfecError;

impl std::fmt::Display for ZfecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "not enough distinct shares to reconstruct the record")
    }
}

impl std::error::Error for ZfecError {}

/// Padding byte used to bring the final block up to `block_size`, matching
/// the space-padding scheme of the system this codec mirrors.
pub const PAD_BYTE: u8 = b' ';

fn matrix_mul(a: &[Vec<u8>], b: &[Vec<u8>]) -> Vec<Vec<u8>> {
    let rows = a.len();
    let inner = b.len();
    let cols = b[0].len();
    let mut out = vec![vec![0u8; cols]; rows];
    for i in 0..rows {
        for (t, a_row_t) in a[i].iter().enumerate().take(inner) {
            if *a_row_t == 0 {
                continue;
            }
            for j in 0..cols {
                out[i][j] = gf256::add(out[i][j], gf256::mul(*a_row_t, b[t][j]));
            }
        }
    }
    out
}

/// Gauss-Jordan inversion of a square matrix over `GF(2^8)`.
fn matrix_invert(matrix: &[Vec<u8>]) -> Option<Vec<Vec<u8>>> {
    let n = matrix.len();
    let mut aug: Vec<Vec<u8>> = matrix
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut full = row.clone();
            full.resize(2 * n, 0);
            full[n + i] = 1;
            full
        })
        .collect();

    for col in 0..n {
        let pivot_row = (col..n).find(|&r| aug[r][col] != 0)?;
        aug.swap(col, pivot_row);
        let inv_pivot = gf256::inv(aug[col][col]);
        for value in &mut aug[col] {
            *value = gf256::mul(*value, inv_pivot);
        }
        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = aug[row][col];
            if factor == 0 {
                continue;
            }
            for c in 0..2 * n {
                aug[row][c] = gf256::add(aug[row][c], gf256::mul(factor, aug[col][c]));
            }
        }
    }

    Some(aug.into_iter().map(|row| row[n..].to_vec()).collect())
}

/// Build the `m x k` systematic encoding matrix: a Cauchy matrix normalized
/// so its first `k` rows form the identity (i.e. shares `0..k` are the raw
/// data blocks, shares `k..m` are parity).
fn build_matrix(k: usize, m: usize) -> Vec<Vec<u8>> {
    assert!(k + m <= 256, "k + m must fit distinct GF(2^8) elements");
    let x: Vec<u8> = (0..m).map(|i| (k + i) as u8).collect();
    let y: Vec<u8> = (0..k).map(|j| j as u8).collect();
    let cauchy: Vec<Vec<u8>> = x
        .iter()
        .map(|&xi| y.iter().map(|&yj| gf256::inv(gf256::add(xi, yj))).collect())
        .collect();
    let top: Vec<Vec<u8>> = cauchy[..k].to_vec();
    let top_inv = matrix_invert(&top).expect("cauchy submatrix is always invertible");
    matrix_mul(&cauchy, &top_inv)
}

/// Split `data` into `k` space-padded blocks and emit `m` shares, the first
/// `k` of which equal the blocks themselves.
pub fn encode(data: &[u8], k: usize, m: usize) -> Vec<Vec<u8>> {
    let block_size = data.len().div_ceil(k).max(1);
    let mut blocks = Vec::with_capacity(k);
    for i in 0..k {
        let start = i * block_size;
        let mut block = if start < data.len() {
            data[start..data.len().min(start + block_size)].to_vec()
        } else {
            Vec::new()
        };
        block.resize(block_size, PAD_BYTE);
        blocks.push(block);
    }

    let matrix = build_matrix(k, m);
    (0..m)
        .map(|share_index| {
            let mut share = vec![0u8; block_size];
            for (byte_pos, out_byte) in share.iter_mut().enumerate() {
                let mut acc = 0u8;
                for block_index in 0..k {
                    acc = gf256::add(
                        acc,
                        gf256::mul(matrix[share_index][block_index], blocks[block_index][byte_pos]),
                    );
                }
                *out_byte = acc;
            }
            share
        })
        .collect()
}

/// Reconstruct the original (padded, `k * block_size` byte) record from any
/// `k` distinct `(share_index, share_bytes)` pairs.
pub fn decode(k: usize, m: usize, shares: &[(usize, Vec<u8>)]) -> Result<Vec<u8>, ZfecError> {
    if shares.len() < k {
        return Err(ZfecError);
    }
    let chosen = &shares[..k];
    let block_size = chosen[0].1.len();
    if chosen.iter().any(|(_, bytes)| bytes.len() != block_size) {
        return Err(ZfecError);
    }

    let matrix = build_matrix(k, m);
    let sub: Vec<Vec<u8>> = chosen.iter().map(|&(idx, _)| matrix[idx].clone()).collect();
    let sub_inv = matrix_invert(&sub).ok_or(ZfecError)?;

    let mut blocks = vec![vec![0u8; block_size]; k];
    for byte_pos in 0..block_size {
        for (block_index, block_row) in sub_inv.iter().enumerate() {
            let mut acc = 0u8;
            for (share_slot, coeff) in block_row.iter().enumerate() {
                acc = gf256::add(acc, gf256::mul(*coeff, chosen[share_slot].1[byte_pos]));
            }
            blocks[block_index][byte_pos] = acc;
        }
    }

    Ok(blocks.concat())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn systematic_shares_equal_padded_blocks() {
        let data = b"vortexstore";
        let shares = encode(data, 3, 5);
        let block_size = data.len().div_ceil(3);
        assert_eq!(shares[0].len(), block_size);
        assert_eq!(shares.len(), 5);
    }

    #[test]
    fn decode_from_systematic_shares_recovers_data() {
        let data = b"a short metadata record";
        let shares = encode(data, 3, 5);
        let indexed: Vec<(usize, Vec<u8>)> = shares.iter().cloned().enumerate().collect();
        let recovered = decode(3, 5, &indexed[..3]).unwrap();
        assert_eq!(&recovered[..data.len()], &data[..]);
    }

    #[test]
    fn decode_from_parity_only_shares_recovers_data() {
        let data = b"erasure coded payload, no systematic shares survive";
        let shares = encode(data, 3, 5);
        let indexed: Vec<(usize, Vec<u8>)> = shares.iter().cloned().enumerate().collect();
        let parity_only = &indexed[2..5];
        let recovered = decode(3, 5, parity_only).unwrap();
        assert_eq!(&recovered[..data.len()], &data[..]);
    }

    #[test]
    fn decode_rejects_too_few_shares() {
        let data = b"payload";
        let shares = encode(data, 3, 5);
        let indexed: Vec<(usize, Vec<u8>)> = shares.iter().cloned().enumerate().collect();
        assert!(decode(3, 5, &indexed[..2]).is_err());
    }
}
