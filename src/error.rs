// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Failure taxonomy and session outcome types.
// Every error is terminal to the session; the only tolerated condition is
// a named resource that already exists at creation time, which the
// transports swallow (see transport::fifo / transport::shm).

use std::io;

use thiserror::Error;

/// Failure kinds surfaced by codec, transports and session orchestration.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// A kernel resource (pipe pair, FIFO path, shm object, endpoint handle)
    /// could not be created or opened.
    #[error("failed to create {what}: {source}")]
    ResourceCreationFailed {
        what: &'static str,
        #[source]
        source: io::Error,
    },

    /// A named resource already exists. Tolerated while creating (the
    /// transports downgrade it to "opened, not created"); fatal anywhere else.
    #[error("{what} already exists")]
    ResourceExists { what: &'static str },

    /// Sizing the shared region failed (ftruncate).
    #[error("failed to size shared region: {0}")]
    CapacityExceeded(#[source] io::Error),

    /// Mapping the shared region into the address space failed (mmap).
    #[error("failed to map shared region: {0}")]
    MappingFailed(#[source] io::Error),

    /// An endpoint handle was already taken, closed, or never existed.
    #[error("endpoint handle already taken or closed")]
    HandleInvalid,

    /// The element count is zero or exceeds the transport capacity bound.
    /// Raised before any byte leaves the process.
    #[error("malformed element count {count}, valid range is 1..={limit}")]
    MalformedLength { count: u32, limit: u32 },

    /// The peer closed the stream (or the region ran out) mid-message.
    /// The partial transfer is discarded, never delivered.
    #[error("transfer broken after {done} of {want} bytes")]
    IoBroken { done: usize, want: usize },

    /// Waiting for the peer process failed, or a join-peer transport was
    /// read without a peer handle to join on.
    #[error("peer synchronization failed: {0}")]
    SynchronizationFailed(#[source] io::Error),
}

impl ExchangeError {
    /// Attach the session stage at which this failure occurred.
    pub(crate) fn at(self, stage: Stage) -> SessionError {
        SessionError { stage, kind: self }
    }
}

/// Where a session currently is. Linear on the happy path; a failure keeps
/// the stage it happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    TransportReady,
    ProducerActive,
    HandoffPending,
    ConsumerActive,
    Completed,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::TransportReady => "transport-ready",
            Stage::ProducerActive => "producer-active",
            Stage::HandoffPending => "handoff-pending",
            Stage::ConsumerActive => "consumer-active",
            Stage::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// A session failure: the stage it happened in plus the failure kind,
/// enough to tell "transport setup failed" from "transfer failed" from
/// "peer synchronization failed".
#[derive(Debug, Error)]
#[error("session failed during {stage}: {kind}")]
pub struct SessionError {
    pub stage: Stage,
    #[source]
    pub kind: ExchangeError,
}

/// Terminal outcome of a session, for the caller's reporting.
#[derive(Debug)]
pub enum Outcome {
    Completed,
    Failed(SessionError),
}

impl From<Result<(), SessionError>> for Outcome {
    fn from(r: Result<(), SessionError>) -> Self {
        match r {
            Ok(()) => Outcome::Completed,
            Err(e) => Outcome::Failed(e),
        }
    }
}
