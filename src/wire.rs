// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Count-prefixed wire format: a 4-byte native-endian element count followed
// by `count` native-endian i32 values, no padding. The codec only defines
// the shape and the capacity bound; moving bytes is xfer's job.

use crate::error::ExchangeError;

/// Bytes occupied by the leading element count.
pub const HEADER_BYTES: usize = 4;

/// Bytes per payload element.
pub const ELEM_BYTES: usize = std::mem::size_of::<i32>();

/// The one message a session exchanges: a non-empty array of integers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    payload: Vec<i32>,
}

impl Message {
    pub fn new(payload: Vec<i32>) -> Self {
        Self { payload }
    }

    /// Element count. Zero only for a message that the codec will reject.
    pub fn count(&self) -> u32 {
        self.payload.len() as u32
    }

    pub fn payload(&self) -> &[i32] {
        &self.payload
    }
}

impl From<Vec<i32>> for Message {
    fn from(payload: Vec<i32>) -> Self {
        Self::new(payload)
    }
}

/// Encoder/decoder bound to a transport's buffer geometry.
///
/// The capacity invariant lives here and nowhere else:
/// `1 <= count <= buffer_bytes / 4 - reserved_header_slots`.
/// Stream transports reserve no slots; shared memory reserves one for the
/// header, since header and payload share the fixed region.
#[derive(Debug, Clone, Copy)]
pub struct WireCodec {
    limit: u32,
}

impl WireCodec {
    /// Build a codec for a region of `buffer_bytes` with `reserved_header_slots`
    /// element slots set aside.
    pub fn for_region(buffer_bytes: usize, reserved_header_slots: usize) -> Self {
        let slots = buffer_bytes / ELEM_BYTES;
        let limit = slots.saturating_sub(reserved_header_slots);
        Self {
            limit: limit.min(u32::MAX as usize) as u32,
        }
    }

    /// Largest element count this codec accepts.
    pub fn capacity_limit(&self) -> u32 {
        self.limit
    }

    /// Check the capacity invariant without touching any data.
    pub fn validate(&self, count: u32) -> Result<(), ExchangeError> {
        if count == 0 || count > self.limit {
            return Err(ExchangeError::MalformedLength {
                count,
                limit: self.limit,
            });
        }
        Ok(())
    }

    /// Serialize a message. Rejects an out-of-bounds count before producing
    /// a single byte, so an invalid message never reaches a transport.
    pub fn encode(&self, message: &Message) -> Result<Vec<u8>, ExchangeError> {
        let count = message.count();
        self.validate(count)?;

        let mut out = Vec::with_capacity(HEADER_BYTES + message.payload().len() * ELEM_BYTES);
        out.extend_from_slice(&count.to_ne_bytes());
        for v in message.payload() {
            out.extend_from_slice(&v.to_ne_bytes());
        }
        Ok(out)
    }

    /// Decode and validate the leading element count.
    pub fn decode_count(&self, header: [u8; HEADER_BYTES]) -> Result<u32, ExchangeError> {
        let count = u32::from_ne_bytes(header);
        self.validate(count)?;
        Ok(count)
    }

    /// Bytes the payload of a validated count occupies on the wire.
    pub fn payload_bytes(count: u32) -> usize {
        count as usize * ELEM_BYTES
    }

    /// Reassemble payload elements from their wire bytes.
    /// `bytes.len()` must be a multiple of the element width.
    pub fn decode_payload(bytes: &[u8]) -> Vec<i32> {
        bytes
            .chunks_exact(ELEM_BYTES)
            .map(|c| i32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }
}
