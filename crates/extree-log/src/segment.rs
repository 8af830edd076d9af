//! Log segment framing.
//!
//! Each commit appends one segment:
//! [ magic: u32 ][ version: u16 ][ codec: u8 ][ reserved: u8 ]
//! [ uncompressed_len: u64 ][ compressed_len: u64 ]
//! [ payload bytes … ][ blake3(header || payload): 32 bytes ]

use serde::{Deserialize, Serialize};

use super::codec::Codec;
use crate::error::{Error, Result};

pub const MAGIC: u32 = 0x4C54_5845; // "EXTL" little-endian
pub const VERSION: u16 = 1;
pub const HEADER_LEN: usize = 4 + 2 + 1 + 1 + 8 + 8;
pub const CHECKSUM_LEN: usize = 32;

/// Upper bound for a single segment payload; guards reads of corrupt headers.
pub const MAX_PAYLOAD: u64 = 256 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentHeader {
    pub magic: u32,
    pub version: u16,
    pub codec: Codec,
    pub uncompressed_len: u64,
    pub compressed_len: u64,
}

impl SegmentHeader {
    pub fn new(codec: Codec, uncompressed_len: u64, compressed_len: u64) -> Self {
        Self {
            magic: MAGIC,
            version: VERSION,
            codec,
            uncompressed_len,
            compressed_len,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN);
        out.extend_from_slice(&self.magic.to_le_bytes());
        out.extend_from_slice(&self.version.to_le_bytes());
        out.push(self.codec as u8);
        out.push(0u8); // reserved
        out.extend_from_slice(&self.uncompressed_len.to_le_bytes());
        out.extend_from_slice(&self.compressed_len.to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::Corrupt("short segment header".into()));
        }
        let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        let codec = Codec::from_u8(bytes[6])?;
        // bytes[7] reserved
        let uncompressed_len = read_u64(&bytes[8..16]);
        let compressed_len = read_u64(&bytes[16..24]);

        if magic != MAGIC || version != VERSION {
            return Err(Error::Corrupt("bad magic/version".into()));
        }

        Ok(Self {
            magic,
            version,
            codec,
            uncompressed_len,
            compressed_len,
        })
    }

    /// Reject sizes no writer would have produced.
    pub fn validate_sizes(&self, max_payload: u64) -> Result<()> {
        if self.uncompressed_len > max_payload || self.compressed_len > max_payload {
            return Err(Error::Corrupt(format!(
                "segment payload {}/{} exceeds max {}",
                self.compressed_len, self.uncompressed_len, max_payload
            )));
        }
        if self.codec == Codec::None && self.compressed_len != self.uncompressed_len {
            return Err(Error::Corrupt(
                "uncompressed segment with differing lengths".into(),
            ));
        }
        Ok(())
    }
}

fn read_u64(b: &[u8]) -> u64 {
    let mut a = [0u8; 8];
    a.copy_from_slice(&b[..8]);
    u64::from_le_bytes(a)
}

/// Build a complete frame for `payload` (already compressed with `codec`).
pub fn encode_frame(codec: Codec, uncompressed_len: u64, payload: &[u8]) -> Vec<u8> {
    let header = SegmentHeader::new(codec, uncompressed_len, payload.len() as u64);
    let header_bytes = header.to_bytes();

    let mut hasher = blake3::Hasher::new();
    hasher.update(&header_bytes);
    hasher.update(payload);
    let checksum: [u8; 32] = hasher.finalize().into();

    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len() + CHECKSUM_LEN);
    frame.extend_from_slice(&header_bytes);
    frame.extend_from_slice(payload);
    frame.extend_from_slice(&checksum);
    frame
}

/// Check `checksum` against `header_bytes || payload`.
pub fn verify_checksum(header_bytes: &[u8], payload: &[u8], checksum: &[u8]) -> bool {
    let mut hasher = blake3::Hasher::new();
    hasher.update(header_bytes);
    hasher.update(payload);
    let computed: [u8; 32] = hasher.finalize().into();
    computed[..] == checksum[..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_bytes_have_fixed_length() {
        let h = SegmentHeader::new(Codec::None, 10, 10);
        let bytes = h.to_bytes();
        assert_eq!(bytes.len(), HEADER_LEN);
        let back = SegmentHeader::from_bytes(&bytes).unwrap();
        assert_eq!(back.uncompressed_len, 10);
        assert_eq!(back.codec, Codec::None);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut bytes = SegmentHeader::new(Codec::None, 1, 1).to_bytes();
        bytes[0] ^= 0xff;
        assert!(SegmentHeader::from_bytes(&bytes).is_err());
    }

    #[test]
    fn frame_checksum_detects_payload_flip() {
        let frame = encode_frame(Codec::None, 3, b"abc");
        let (header, rest) = frame.split_at(HEADER_LEN);
        let (payload, checksum) = rest.split_at(3);
        assert!(verify_checksum(header, payload, checksum));
        assert!(!verify_checksum(header, b"abd", checksum));
    }

    #[test]
    fn oversized_header_fails_validation() {
        let h = SegmentHeader::new(Codec::None, MAX_PAYLOAD + 1, MAX_PAYLOAD + 1);
        assert!(h.validate_sizes(MAX_PAYLOAD).is_err());
    }
}
