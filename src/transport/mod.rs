// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// The transport capability contract shared by the three variants.
// Each variant yields one write-capable and one read-capable endpoint
// connecting two processes, and knows how its name (if any) is torn down.

use crate::error::ExchangeError;
use crate::xfer::{ByteSink, ByteSource};

pub mod fifo;
pub mod pipe;
pub mod shm;

pub use fifo::NamedFifo;
pub use pipe::AnonymousPipe;
pub use shm::SharedMemorySegment;

/// Logical buffer size shared by all transports unless overridden.
/// Bounds the message capacity, matching the fixed shared-memory region.
pub const DEFAULT_BUFFER_BYTES: usize = 1024;

/// Default permission bits for named resources (world read/write).
pub const DEFAULT_PERMISSIONS: u32 = 0o666;

/// How a consumer learns that the producer's data is ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rendezvous {
    /// Blocking reads provide ordering for free: data cannot be read before
    /// it was written (pipe, FIFO).
    Stream,
    /// The transport carries no readiness signal of its own; the consumer
    /// must wait for producer process exit before reading (shared memory).
    JoinPeer,
}

/// A two-party transport: produces the endpoints a session needs and owns
/// the teardown of its named resource, if it has one.
pub trait Transport {
    type Sink: ByteSink;
    type Source: ByteSource;

    /// Buffer geometry the capacity invariant is derived from.
    fn buffer_bytes(&self) -> usize;

    /// Element slots the wire header occupies inside the buffer. Zero for
    /// stream transports; one for shared memory, where header and payload
    /// share the fixed region.
    fn reserved_header_slots(&self) -> usize {
        0
    }

    fn rendezvous(&self) -> Rendezvous {
        Rendezvous::Stream
    }

    /// The producer's write-capable endpoint. For handle-pair transports
    /// this also releases the unused read end in this process.
    fn producer_end(&mut self) -> Result<Self::Sink, ExchangeError>;

    /// The consumer's read-capable endpoint. May block until the producer
    /// side exists (FIFO first-open rendezvous).
    fn consumer_end(&mut self) -> Result<Self::Source, ExchangeError>;

    /// Whether this instance created its named resource. Unlink duty only
    /// ever falls on the creator.
    fn created_name(&self) -> bool {
        false
    }

    /// Remove the named resource. Idempotent and best-effort; already-open
    /// handles stay valid. No-op for transports without a name.
    fn unlink(&mut self) {}
}
