// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Anonymous pipe transport. The pair must be created before the role split
// (fork): it has no name and is only reachable through inherited handles.
// After the split each side keeps its own end and closes the other — the
// reader's end-of-stream only fires once every write handle is closed.

use std::io;

use crate::error::ExchangeError;
use crate::fd::Fd;
use crate::transport::{Transport, DEFAULT_BUFFER_BYTES};

/// A linked read/write descriptor pair from pipe(2).
#[derive(Debug)]
pub struct AnonymousPipe {
    read: Option<Fd>,
    write: Option<Fd>,
    buffer_bytes: usize,
}

impl AnonymousPipe {
    /// Create a pipe pair with the default capacity bound.
    pub fn create() -> Result<Self, ExchangeError> {
        Self::with_buffer_bytes(DEFAULT_BUFFER_BYTES)
    }

    /// Create a pipe pair with an explicit capacity bound for the codec.
    /// The bound is a protocol limit, not the kernel pipe buffer size.
    pub fn with_buffer_bytes(buffer_bytes: usize) -> Result<Self, ExchangeError> {
        let mut fds = [0 as libc::c_int; 2];
        let ret = unsafe { libc::pipe(fds.as_mut_ptr()) };
        if ret == -1 {
            return Err(ExchangeError::ResourceCreationFailed {
                what: "pipe pair",
                source: io::Error::last_os_error(),
            });
        }
        Ok(Self {
            read: Some(Fd::new(fds[0])),
            write: Some(Fd::new(fds[1])),
            buffer_bytes,
        })
    }

    /// Dissolve into raw (reader, writer) ends for same-process use, e.g.
    /// two threads exercising the stream directly. Fails if either end was
    /// already taken by a role split.
    pub fn split(mut self) -> Result<(Fd, Fd), ExchangeError> {
        match (self.read.take(), self.write.take()) {
            (Some(r), Some(w)) => Ok((r, w)),
            _ => Err(ExchangeError::HandleInvalid),
        }
    }
}

impl Transport for AnonymousPipe {
    type Sink = Fd;
    type Source = Fd;

    fn buffer_bytes(&self) -> usize {
        self.buffer_bytes
    }

    fn producer_end(&mut self) -> Result<Fd, ExchangeError> {
        // This process is the writer: its read end is unused from here on.
        // Holding it open would keep the channel alive and mask peer exit.
        self.read = None;
        self.write.take().ok_or(ExchangeError::HandleInvalid)
    }

    fn consumer_end(&mut self) -> Result<Fd, ExchangeError> {
        self.write = None;
        self.read.take().ok_or(ExchangeError::HandleInvalid)
    }
}
