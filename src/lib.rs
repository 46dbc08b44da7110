// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// One-shot producer/consumer message exchange between two cooperating
// processes over interchangeable POSIX transports: anonymous pipe, named
// FIFO, and shared memory. One count-prefixed integer array per session,
// reliable transfer despite partial reads/writes, and exactly-once teardown
// of kernel-persistent names.

#![cfg(unix)]

pub mod error;
pub use error::{ExchangeError, Outcome, SessionError, Stage};

pub mod wire;
pub use wire::{Message, WireCodec};

pub mod xfer;
pub use xfer::{read_exact, write_exact, ByteSink, ByteSource};

mod fd;
pub use fd::Fd;

pub mod transport;
pub use transport::{AnonymousPipe, NamedFifo, Rendezvous, SharedMemorySegment, Transport};

pub mod session;
pub use session::{Ownership, Session};

pub mod process;
