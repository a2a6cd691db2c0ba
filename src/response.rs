//! Response encoding.
//!
//! Bipolar responses are normalized to bits (`> 0` becomes `1`, everything
//! else, including an exactly balanced `0`, becomes `0`) and packed most
//! significant bit first, in response order, with the trailing pad bits of
//! the last byte cleared.  Key derivation hashes these bytes, so the layout is
//! fixed.

use std::fmt;

use crate::challenge::{pack_bits, Challenge};
use crate::error::PufError;
use crate::puf::ArbiterPuf;

/// Packed binary response vector.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ResponseBytes {
    bytes: Vec<u8>,
    bit_len: usize,
}

impl fmt::Debug for ResponseBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseBytes")
            .field("bit_len", &self.bit_len)
            .field("hex", &self.to_hex())
            .finish()
    }
}

impl ResponseBytes {
    /// Wraps already-packed bytes holding `bit_len` response bits.
    ///
    /// Returns `None` when the byte count does not equal `ceil(bit_len / 8)`
    /// or when any pad bit of the last byte is set.
    pub fn from_packed(bytes: Vec<u8>, bit_len: usize) -> Option<Self> {
        if bytes.len() != bit_len.div_ceil(8) {
            return None;
        }
        let used = bit_len % 8;
        if used != 0 {
            let pad_mask = (1u8 << (8 - used)) - 1;
            if bytes.last().is_some_and(|&last| last & pad_mask != 0) {
                return None;
            }
        }
        Some(Self { bytes, bit_len })
    }

    /// Decodes a hex string, treating every byte as eight response bits.
    pub fn from_hex(input: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(input.trim())?;
        let bit_len = bytes.len() * 8;
        Ok(Self { bytes, bit_len })
    }

    /// Packed bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of meaningful bits.
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Lowercase hex encoding of the packed bytes.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// Unpacked response bits in order.
    pub fn bits(&self) -> Vec<bool> {
        (0..self.bit_len)
            .map(|i| (self.bytes[i / 8] >> (7 - i % 8)) & 1 == 1)
            .collect()
    }

    /// Number of differing response bits, or `None` if the widths differ.
    pub fn hamming_distance(&self, other: &ResponseBytes) -> Option<u32> {
        if self.bit_len != other.bit_len {
            return None;
        }
        Some(
            self.bytes
                .iter()
                .zip(other.bytes.iter())
                .map(|(a, b)| (a ^ b).count_ones())
                .sum(),
        )
    }
}

impl AsRef<[u8]> for ResponseBytes {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Normalizes bipolar responses to bits and packs them.
pub fn encode(responses: &[i8]) -> ResponseBytes {
    let bits: Vec<bool> = responses.iter().map(|&r| r > 0).collect();
    ResponseBytes {
        bytes: pack_bits(&bits),
        bit_len: bits.len(),
    }
}

/// Produces the packed response vector of `puf` for a root challenge.
///
/// The root is expanded into `stage_count` challenges, so the result always
/// holds `ceil(stage_count / 8)` bytes.
pub fn respond(puf: &ArbiterPuf, challenge: &Challenge) -> Result<ResponseBytes, PufError> {
    let batch = challenge.expand(puf.stage_count());
    let responses = puf.evaluate(&batch)?;
    let encoded = encode(&responses);
    tracing::debug!(
        bits = encoded.bit_len(),
        ones = encoded.bits().iter().filter(|&&b| b).count(),
        "encoded PUF response"
    );
    Ok(encoded)
}
