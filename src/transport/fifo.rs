// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Named FIFO transport. The filesystem entry and the open descriptors have
// independent lifecycles: the name persists until unlinked, and unlinking
// never invalidates descriptors already opened on it. Opening one end
// blocks until a peer opens the complementary end (first-open rendezvous).

use std::ffi::CString;
use std::io;

use crate::error::ExchangeError;
use crate::fd::Fd;
use crate::transport::{Transport, DEFAULT_BUFFER_BYTES, DEFAULT_PERMISSIONS};

/// Default filesystem path for the FIFO entry.
pub const DEFAULT_FIFO_PATH: &str = "/tmp/handoff_fifo";

/// A named pipe reachable through a filesystem path.
#[derive(Debug)]
pub struct NamedFifo {
    path: CString,
    created: bool,
    unlinked: bool,
    buffer_bytes: usize,
}

impl NamedFifo {
    /// Create the FIFO entry at `path` with the given permission bits.
    /// An entry that already exists is tolerated: the instance behaves as
    /// an opener (`created_name()` is false) and must not unlink it.
    pub fn create(path: &str, permissions: u32) -> Result<Self, ExchangeError> {
        let c_path = c_path(path)?;
        let ret = unsafe { libc::mkfifo(c_path.as_ptr(), permissions as libc::mode_t) };
        let created = if ret == -1 {
            let e = io::Error::last_os_error();
            if e.raw_os_error() != Some(libc::EEXIST) {
                return Err(ExchangeError::ResourceCreationFailed {
                    what: "fifo path",
                    source: e,
                });
            }
            false
        } else {
            true
        };
        Ok(Self {
            path: c_path,
            created,
            unlinked: false,
            buffer_bytes: DEFAULT_BUFFER_BYTES,
        })
    }

    /// Create at the default path with default permissions.
    pub fn create_default() -> Result<Self, ExchangeError> {
        Self::create(DEFAULT_FIFO_PATH, DEFAULT_PERMISSIONS)
    }

    /// Attach to an existing FIFO entry without creating it. The peer side
    /// of a session: it opens, never creates, and never unlinks.
    pub fn open(path: &str) -> Result<Self, ExchangeError> {
        Ok(Self {
            path: c_path(path)?,
            created: false,
            unlinked: false,
            buffer_bytes: DEFAULT_BUFFER_BYTES,
        })
    }

    /// The filesystem path of the entry.
    pub fn path(&self) -> &str {
        // Constructed from &str, so always valid UTF-8.
        self.path.to_str().unwrap_or("")
    }

    fn open_end(&self, flags: libc::c_int, what: &'static str) -> Result<Fd, ExchangeError> {
        let fd = unsafe { libc::open(self.path.as_ptr(), flags) };
        if fd == -1 {
            return Err(ExchangeError::ResourceCreationFailed {
                what,
                source: io::Error::last_os_error(),
            });
        }
        Ok(Fd::new(fd))
    }
}

fn c_path(path: &str) -> Result<CString, ExchangeError> {
    CString::new(path).map_err(|_| ExchangeError::ResourceCreationFailed {
        what: "fifo path",
        source: io::Error::new(io::ErrorKind::InvalidInput, "path contains NUL"),
    })
}

impl Transport for NamedFifo {
    type Sink = Fd;
    type Source = Fd;

    fn buffer_bytes(&self) -> usize {
        self.buffer_bytes
    }

    /// Blocks until a reader opens the same path.
    fn producer_end(&mut self) -> Result<Fd, ExchangeError> {
        self.open_end(libc::O_WRONLY, "fifo write end")
    }

    /// Blocks until a writer opens the same path.
    fn consumer_end(&mut self) -> Result<Fd, ExchangeError> {
        self.open_end(libc::O_RDONLY, "fifo read end")
    }

    fn created_name(&self) -> bool {
        self.created
    }

    fn unlink(&mut self) {
        if self.unlinked {
            return;
        }
        self.unlinked = true;
        let ret = unsafe { libc::unlink(self.path.as_ptr()) };
        if ret == -1 {
            tracing::warn!(
                path = self.path(),
                error = %io::Error::last_os_error(),
                "fifo unlink failed"
            );
        }
    }
}
