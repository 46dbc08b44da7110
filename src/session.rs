// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Session orchestration: one producer, one consumer, one transport, one
// message. The session owns role ordering, the join barrier for flat
// shared memory, and exactly-once teardown of named resources.

use std::io;

use crate::error::{ExchangeError, SessionError, Stage};
use crate::process::{self, ProcessHandle};
use crate::transport::{Rendezvous, Transport};
use crate::wire::{Message, WireCodec, HEADER_BYTES};
use crate::xfer;

/// Who is responsible for removing the transport's named resource.
///
/// Exactly one side of a session is the owner — by construction the side
/// that created the name. The peer opens, never creates, and never unlinks,
/// on every path including failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    Owner,
    Peer,
}

/// One side of a producer/consumer exchange over a transport.
///
/// A process constructs a `Session` around its copy of the transport and
/// then drives exactly one role: [`produce`](Session::produce) or
/// [`consume`](Session::consume). Teardown runs exactly once, on `finish`
/// or on drop, whichever comes first — error paths included. Unlink of the
/// named resource is gated on being the [`Ownership::Owner`] *and* on the
/// transport having actually created the name in this session.
pub struct Session<T: Transport> {
    transport: T,
    ownership: Ownership,
    stage: Stage,
    torn_down: bool,
}

impl<T: Transport> Session<T> {
    /// Wrap an established transport. The transport setup already happened
    /// in the transport constructor, so the session starts transport-ready.
    pub fn new(transport: T, ownership: Ownership) -> Self {
        Self {
            transport,
            ownership,
            stage: Stage::TransportReady,
            torn_down: false,
        }
    }

    /// The codec matching this transport's buffer geometry.
    pub fn codec(&self) -> WireCodec {
        WireCodec::for_region(
            self.transport.buffer_bytes(),
            self.transport.reserved_header_slots(),
        )
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run the producer role: validate, encode, transfer the whole message,
    /// then release the write side. For pipes and FIFOs releasing the sink
    /// closes the write end, which is what lets the consumer see
    /// end-of-stream; for shared memory it is a plain cursor drop and the
    /// peer synchronizes on process exit instead.
    pub fn produce(&mut self, message: &Message) -> Result<(), SessionError> {
        self.stage = Stage::ProducerActive;
        let bytes = self.codec().encode(message).map_err(|k| k.at(self.stage))?;

        let mut sink = self
            .transport
            .producer_end()
            .map_err(|k| k.at(self.stage))?;
        xfer::write_exact(&mut sink, &bytes).map_err(|k| k.at(self.stage))?;
        drop(sink);

        self.stage = Stage::HandoffPending;
        tracing::debug!(count = message.count(), "producer handoff complete");
        Ok(())
    }

    /// Run the consumer role and return the decoded message.
    ///
    /// For stream transports the blocking read is the rendezvous: data
    /// cannot be observed before the producer wrote it. For join-peer
    /// transports (shared memory) the region carries no readiness signal,
    /// so the consumer must first wait for producer exit — reading without
    /// `peer` is refused rather than raced.
    pub fn consume(&mut self, peer: Option<&ProcessHandle>) -> Result<Message, SessionError> {
        if self.transport.rendezvous() == Rendezvous::JoinPeer {
            self.stage = Stage::HandoffPending;
            self.join_producer(peer)?;
        }

        self.stage = Stage::ConsumerActive;
        let codec = self.codec();
        let mut source = self
            .transport
            .consumer_end()
            .map_err(|k| k.at(self.stage))?;

        let mut header = [0u8; HEADER_BYTES];
        xfer::read_exact(&mut source, &mut header).map_err(|k| k.at(self.stage))?;
        let count = codec.decode_count(header).map_err(|k| k.at(self.stage))?;

        let mut payload = vec![0u8; WireCodec::payload_bytes(count)];
        xfer::read_exact(&mut source, &mut payload).map_err(|k| k.at(self.stage))?;
        drop(source);

        self.stage = Stage::Completed;
        tracing::debug!(count, "consumer received message");
        Ok(Message::new(WireCodec::decode_payload(&payload)))
    }

    fn join_producer(&mut self, peer: Option<&ProcessHandle>) -> Result<(), SessionError> {
        let handle = peer.ok_or_else(|| {
            ExchangeError::SynchronizationFailed(io::Error::new(
                io::ErrorKind::NotConnected,
                "join-peer transport read without a peer to join",
            ))
            .at(self.stage)
        })?;

        let wait = process::wait_for_exit(handle)
            .map_err(|e| ExchangeError::SynchronizationFailed(e).at(self.stage))?;
        if !wait.clean() {
            return Err(ExchangeError::SynchronizationFailed(io::Error::new(
                io::ErrorKind::Other,
                format!(
                    "producer exited uncleanly (code {}, signal {})",
                    wait.exit_code, wait.signal
                ),
            ))
            .at(self.stage));
        }
        tracing::debug!(pid = handle.pid(), "producer joined");
        Ok(())
    }

    /// Explicit teardown. Equivalent to dropping the session; provided so a
    /// caller can sequence teardown before, say, re-checking the namespace.
    pub fn finish(self) {}

    fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        // Handles and mappings are released by the transport's own drop;
        // the name is removed only by its owner, and only if this session
        // created it.
        if self.ownership == Ownership::Owner && self.transport.created_name() {
            tracing::debug!(stage = %self.stage, "owner unlinking named resource");
            self.transport.unlink();
        }
    }
}

impl<T: Transport> Drop for Session<T> {
    fn drop(&mut self) {
        self.teardown();
    }
}
