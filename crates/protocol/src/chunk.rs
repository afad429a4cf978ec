//! Notification chunking
//!
//! BLE writes and notifications are limited to the negotiated MTU, so the
//! list characteristics split their encrypted response into chunks.
//!
//! # Wire Format
//!
//! ```text
//! [is_first (1B)][total (4B, little-endian)][payload]
//! ```
//!
//! `total` is the byte length of the complete logical message and repeats in
//! every chunk. A transfer is complete once the accumulated payload length
//! equals `total`; there is no explicit end marker and no sequence number, so
//! the transport must deliver chunks in send order.

use crate::binary::{invalid_data, read_u32_le, read_u8, write_u32_le, write_u8};
use crate::binary::{BinaryRead, BinaryWrite};
use crate::error::ProtocolError;
use std::io::{self, Read, Write};
use tracing::{debug, warn};

/// Bytes taken by the `is_first` flag and `total` length
pub const CHUNK_HEADER_LENGTH: usize = 5;

/// One fragment of a larger logical message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Set on the first chunk of a transfer
    pub is_first: bool,
    /// Length of the complete, unsplit message
    pub total: u32,
    pub bytes: Vec<u8>,
}

impl Chunk {
    /// Split `data` into chunks whose encoding fits in `max_chunk_size` bytes
    ///
    /// Empty data produces a single empty first chunk so the receiver still
    /// observes a complete transfer.
    pub fn split(data: &[u8], max_chunk_size: usize) -> Result<Vec<Chunk>, ProtocolError> {
        if max_chunk_size <= CHUNK_HEADER_LENGTH {
            return Err(ProtocolError::InvalidChunkSize(max_chunk_size));
        }
        let total = u32::try_from(data.len())
            .map_err(|_| ProtocolError::MessageTooLarge(data.len()))?;
        let payload_size = max_chunk_size - CHUNK_HEADER_LENGTH;

        if data.is_empty() {
            return Ok(vec![Chunk {
                is_first: true,
                total,
                bytes: Vec::new(),
            }]);
        }

        Ok(data
            .chunks(payload_size)
            .enumerate()
            .map(|(index, piece)| Chunk {
                is_first: index == 0,
                total,
                bytes: piece.to_vec(),
            })
            .collect())
    }

    /// Concatenate chunk payloads in arrival order
    pub fn reassemble(chunks: &[Chunk]) -> Vec<u8> {
        let length = chunks.iter().map(|c| c.bytes.len()).sum();
        let mut data = Vec::with_capacity(length);
        for chunk in chunks {
            data.extend_from_slice(&chunk.bytes);
        }
        data
    }

    /// Whether the accumulated payload length equals the last chunk's total
    pub fn is_complete(chunks: &[Chunk]) -> bool {
        match chunks.last() {
            Some(last) => {
                let length: usize = chunks.iter().map(|c| c.bytes.len()).sum();
                length == last.total as usize
            }
            None => false,
        }
    }
}

impl BinaryRead for Chunk {
    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let is_first = match read_u8(reader)? {
            0x00 => false,
            0x01 => true,
            other => return Err(invalid_data(format!("invalid chunk flag: {}", other))),
        };
        let total = read_u32_le(reader)?;
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        if bytes.len() > total as usize {
            return Err(invalid_data(format!(
                "chunk carries {} bytes of a {} byte message",
                bytes.len(),
                total
            )));
        }
        Ok(Chunk {
            is_first,
            total,
            bytes,
        })
    }
}

impl BinaryWrite for Chunk {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write_u8(writer, u8::from(self.is_first))?;
        write_u32_le(writer, self.total)?;
        writer.write_all(&self.bytes)
    }

    fn serialized_size(&self) -> usize {
        CHUNK_HEADER_LENGTH + self.bytes.len()
    }
}

/// Reassembly buffer for one notification subscription
///
/// Each subscription owns its own reassembler; it is never shared between
/// clients. Call [`ChunkReassembler::reset`] on disconnect, re-read or
/// timeout so a partial transfer is never merged with a later one.
#[derive(Debug, Default)]
pub struct ChunkReassembler {
    total: Option<u32>,
    buffer: Vec<u8>,
}

impl ChunkReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept the next chunk, returning the message once it is complete
    pub fn push(&mut self, chunk: Chunk) -> Result<Option<Vec<u8>>, ProtocolError> {
        if chunk.is_first {
            if self.total.is_some() {
                warn!(
                    received = self.buffer.len(),
                    "discarding partial transfer on new first chunk"
                );
            }
            self.buffer.clear();
            self.total = Some(chunk.total);
        }

        let total = match self.total {
            Some(total) => total,
            None => return Err(ProtocolError::UnexpectedChunk),
        };
        if chunk.total != total {
            self.reset();
            return Err(ProtocolError::ChunkMismatch {
                expected: total,
                got: chunk.total,
            });
        }

        let received = self.buffer.len() + chunk.bytes.len();
        if received > total as usize {
            self.reset();
            return Err(ProtocolError::ChunkOverflow { total, received });
        }
        self.buffer.extend_from_slice(&chunk.bytes);

        if self.buffer.len() == total as usize {
            debug!(total, "chunked transfer complete");
            self.total = None;
            return Ok(Some(std::mem::take(&mut self.buffer)));
        }
        Ok(None)
    }

    /// Decode and accept one notification frame
    pub fn push_bytes(&mut self, frame: &[u8]) -> Result<Option<Vec<u8>>, ProtocolError> {
        let chunk = Chunk::from_bytes(frame)?;
        self.push(chunk)
    }

    /// Drop any partial transfer
    pub fn reset(&mut self) {
        self.total = None;
        self.buffer.clear();
    }

    /// Whether a transfer has started but not completed
    pub fn is_in_progress(&self) -> bool {
        self.total.is_some()
    }

    /// Payload bytes buffered for the current transfer
    pub fn received(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_split_sizes() {
        let data = sample(50);
        let chunks = Chunk::split(&data, 20).unwrap();
        assert_eq!(chunks.len(), 4);
        assert!(chunks[0].is_first);
        assert!(chunks[1..].iter().all(|c| !c.is_first));
        assert!(chunks.iter().all(|c| c.total == 50));
        assert!(chunks.iter().all(|c| c.serialized_size() <= 20));
        assert_eq!(chunks[3].bytes.len(), 5);
    }

    #[test]
    fn test_split_rejects_header_sized_mtu() {
        assert_eq!(
            Chunk::split(b"abc", CHUNK_HEADER_LENGTH),
            Err(ProtocolError::InvalidChunkSize(CHUNK_HEADER_LENGTH))
        );
    }

    #[test]
    fn test_reassemble_for_many_sizes() {
        for len in [0usize, 1, 14, 15, 16, 100, 257] {
            let data = sample(len);
            for max in [6usize, 7, 20, 23, 185, 512] {
                let chunks = Chunk::split(&data, max).unwrap();
                assert!(Chunk::is_complete(&chunks));
                assert_eq!(Chunk::reassemble(&chunks), data);
            }
        }
    }

    #[test]
    fn test_prefix_is_incomplete() {
        let data = sample(73);
        let chunks = Chunk::split(&data, 12).unwrap();
        for end in 0..chunks.len() {
            assert!(!Chunk::is_complete(&chunks[..end]));
        }
        assert!(Chunk::is_complete(&chunks));
    }

    #[test]
    fn test_empty_message() {
        let chunks = Chunk::split(&[], 20).unwrap();
        assert_eq!(chunks.len(), 1);
        assert!(Chunk::is_complete(&chunks));

        let mut reassembler = ChunkReassembler::new();
        let message = reassembler.push(chunks[0].clone()).unwrap();
        assert_eq!(message, Some(Vec::new()));
    }

    #[test]
    fn test_frame_layout() {
        let chunk = Chunk {
            is_first: true,
            total: 0x0102,
            bytes: vec![0xAA],
        };
        let bytes = chunk.to_bytes().unwrap();
        assert_eq!(bytes, vec![0x01, 0x02, 0x01, 0x00, 0x00, 0xAA]);
        assert_eq!(Chunk::from_bytes(&bytes).unwrap(), chunk);
    }

    #[test]
    fn test_frame_validation() {
        assert!(Chunk::from_bytes(&[0x01, 0x00, 0x00]).is_err());
        assert!(Chunk::from_bytes(&[0x02, 0x00, 0x00, 0x00, 0x00]).is_err());
        // payload longer than the announced total
        assert!(Chunk::from_bytes(&[0x01, 0x01, 0x00, 0x00, 0x00, 0xAA, 0xBB]).is_err());
    }

    #[test]
    fn test_reassembler_streams_frames() {
        let data = sample(64);
        let chunks = Chunk::split(&data, 20).unwrap();
        let mut reassembler = ChunkReassembler::new();
        let last = chunks.len() - 1;
        for (index, chunk) in chunks.iter().enumerate() {
            let frame = chunk.to_bytes().unwrap();
            let result = reassembler.push_bytes(&frame).unwrap();
            if index == last {
                assert_eq!(result, Some(data.clone()));
            } else {
                assert_eq!(result, None);
                assert!(reassembler.is_in_progress());
            }
        }
        assert!(!reassembler.is_in_progress());
    }

    #[test]
    fn test_reassembler_rejects_orphan_chunk() {
        let chunks = Chunk::split(&sample(30), 10).unwrap();
        let mut reassembler = ChunkReassembler::new();
        assert_eq!(
            reassembler.push(chunks[1].clone()),
            Err(ProtocolError::UnexpectedChunk)
        );
    }

    #[test]
    fn test_reassembler_rejects_total_mismatch() {
        let first = Chunk::split(&sample(30), 10).unwrap();
        let other = Chunk::split(&sample(31), 10).unwrap();
        let mut reassembler = ChunkReassembler::new();
        assert_eq!(reassembler.push(first[0].clone()), Ok(None));
        assert_eq!(
            reassembler.push(other[1].clone()),
            Err(ProtocolError::ChunkMismatch {
                expected: 30,
                got: 31
            })
        );
        assert!(!reassembler.is_in_progress());
    }

    #[test]
    fn test_reassembler_rejects_overflow() {
        let mut reassembler = ChunkReassembler::new();
        let first = Chunk {
            is_first: true,
            total: 4,
            bytes: vec![1, 2, 3],
        };
        let extra = Chunk {
            is_first: false,
            total: 4,
            bytes: vec![4, 5],
        };
        assert_eq!(reassembler.push(first), Ok(None));
        assert_eq!(
            reassembler.push(extra),
            Err(ProtocolError::ChunkOverflow {
                total: 4,
                received: 5
            })
        );
    }

    #[test]
    fn test_reset_discards_partial_transfer() {
        let data = sample(40);
        let chunks = Chunk::split(&data, 15).unwrap();
        let mut reassembler = ChunkReassembler::new();
        reassembler.push(chunks[0].clone()).unwrap();
        reassembler.reset();
        assert_eq!(reassembler.received(), 0);

        // Continuation of the dropped transfer must not be accepted even though
        // its total matches a later transfer of the same length.
        assert_eq!(
            reassembler.push(chunks[1].clone()),
            Err(ProtocolError::UnexpectedChunk)
        );
    }

    #[test]
    fn test_new_first_chunk_restarts_transfer() {
        let stale = Chunk::split(&sample(40), 15).unwrap();
        let fresh_data: Vec<u8> = sample(40).into_iter().rev().collect();
        let fresh = Chunk::split(&fresh_data, 15).unwrap();

        let mut reassembler = ChunkReassembler::new();
        reassembler.push(stale[0].clone()).unwrap();
        let mut result = None;
        for chunk in fresh {
            result = reassembler.push(chunk).unwrap();
        }
        assert_eq!(result, Some(fresh_data));
    }
}
