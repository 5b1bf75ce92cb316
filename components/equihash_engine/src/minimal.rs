//! The minimal encoding of Equihash solutions.
//!
//! Each of the `2^k` leaf indices of a solution is written as a
//! `(n / (k + 1)) + 1`-bit big-endian field, and the fields are concatenated
//! without padding.

use std::fmt;
use std::mem::size_of;

use crate::params::Params;

/// A solution could not be converted to or from its minimal encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodecError {
    /// The encoded solution does not have the length implied by the parameters.
    WrongByteLength { expected: usize, actual: usize },
    /// The solution does not contain exactly `2^k` indices.
    WrongIndexCount { expected: usize, actual: usize },
    /// An index does not fit in `bit_len` bits.
    IndexOutOfRange { index: u32, bit_len: usize },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::WrongByteLength { expected, actual } => write!(
                f,
                "minimal solution is {} bytes, expected {}",
                actual, expected
            ),
            CodecError::WrongIndexCount { expected, actual } => {
                write!(f, "solution has {} indices, expected {}", actual, expected)
            }
            CodecError::IndexOutOfRange { index, bit_len } => {
                write!(f, "index {} does not fit in {} bits", index, bit_len)
            }
        }
    }
}

impl std::error::Error for CodecError {}

pub(crate) fn expand_array(vin: &[u8], bit_len: usize, byte_pad: usize) -> Vec<u8> {
    assert!(bit_len >= 8);
    assert!(u32::BITS as usize >= 7 + bit_len);

    let out_width = (bit_len + 7) / 8 + byte_pad;
    let out_len = 8 * out_width * vin.len() / bit_len;

    // Shortcut for parameters where expansion is a no-op
    if out_len == vin.len() {
        return vin.to_vec();
    }

    let mut vout: Vec<u8> = vec![0; out_len];
    let bit_len_mask: u32 = (1 << bit_len) - 1;

    // The acc_bits least-significant bits of acc_value represent a bit sequence
    // in big-endian order.
    let mut acc_bits = 0;
    let mut acc_value: u32 = 0;

    let mut j = 0;
    for b in vin {
        acc_value = (acc_value << 8) | u32::from(*b);
        acc_bits += 8;

        // When we have bit_len or more bits in the accumulator, write the next
        // output element.
        if acc_bits >= bit_len {
            acc_bits -= bit_len;
            for x in byte_pad..out_width {
                vout[j + x] = ((
                    // Big-endian
                    acc_value >> (acc_bits + (8 * (out_width - x - 1)))
                ) & (
                    // Apply bit_len_mask across byte boundaries
                    (bit_len_mask >> (8 * (out_width - x - 1))) & 0xFF
                )) as u8;
            }
            j += out_width;
        }
    }

    vout
}

/// The inverse of [`expand_array`]: packs `out_len` bytes worth of `bit_len`-bit
/// elements, each stored big-endian in `(bit_len + 7) / 8 + byte_pad` bytes.
pub(crate) fn compress_array(vin: &[u8], out_len: usize, bit_len: usize, byte_pad: usize) -> Vec<u8> {
    assert!(bit_len >= 8);
    assert!(u32::BITS as usize >= 7 + bit_len);

    let in_width = (bit_len + 7) / 8 + byte_pad;
    assert_eq!(out_len, bit_len * vin.len() / (8 * in_width));

    let mut vout: Vec<u8> = vec![0; out_len];
    let bit_len_mask: u32 = (1 << bit_len) - 1;

    // The acc_bits least-significant bits of acc_value represent a bit sequence
    // in big-endian order.
    let mut acc_bits = 0;
    let mut acc_value: u32 = 0;

    let mut j = 0;
    for out in vout.iter_mut() {
        // When we have fewer than 8 bits left in the accumulator, read the
        // next input element.
        if acc_bits < 8 {
            acc_value <<= bit_len;
            for x in byte_pad..in_width {
                acc_value |= (
                    // Apply bit_len_mask across byte boundaries
                    u32::from(vin[j + x]) & ((bit_len_mask >> (8 * (in_width - x - 1))) & 0xFF)
                ) << (8 * (in_width - x - 1)); // Big-endian
            }
            j += in_width;
            acc_bits += bit_len;
        }

        acc_bits -= 8;
        *out = (acc_value >> acc_bits) as u8;
    }

    vout
}

/// Decodes a minimally-encoded solution into its leaf indices.
pub fn indices_from_minimal(p: Params, minimal: &[u8]) -> Result<Vec<u32>, CodecError> {
    let c_bit_len = p.collision_bit_length();
    if minimal.len() != p.minimal_len() {
        return Err(CodecError::WrongByteLength {
            expected: p.minimal_len(),
            actual: minimal.len(),
        });
    }

    let byte_pad = size_of::<u32>() - ((c_bit_len + 1) + 7) / 8;
    let expanded = expand_array(minimal, c_bit_len + 1, byte_pad);

    // Big-endian so that lexicographic array comparison is equivalent to integer
    // comparison
    Ok(expanded
        .chunks_exact(size_of::<u32>())
        .map(|chunk| u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Encodes the leaf indices of a solution in their minimal form.
pub fn minimal_from_indices(p: Params, indices: &[u32]) -> Result<Vec<u8>, CodecError> {
    let c_bit_len = p.collision_bit_length();
    if indices.len() != p.solution_len() {
        return Err(CodecError::WrongIndexCount {
            expected: p.solution_len(),
            actual: indices.len(),
        });
    }
    if let Some(&index) = indices.iter().find(|&&i| i >= p.leaf_count()) {
        return Err(CodecError::IndexOutOfRange {
            index,
            bit_len: c_bit_len + 1,
        });
    }

    let byte_pad = size_of::<u32>() - ((c_bit_len + 1) + 7) / 8;

    // Rewrite the indices as big-endian byte slices.
    let indices: Vec<u8> = indices
        .iter()
        .flat_map(|index| index.to_be_bytes())
        .collect();

    Ok(compress_array(&indices, p.minimal_len(), c_bit_len + 1, byte_pad))
}
