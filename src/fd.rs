// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Owned POSIX file descriptor, closed exactly once on drop.
// The byte-endpoint traits are implemented with raw read(2)/write(2) so
// partial transfers surface unchanged to the xfer loops.

use std::io;

use crate::xfer::{ByteSink, ByteSource};

/// An owned file descriptor. Closing happens in `Drop`; double-close is
/// impossible because ownership is never duplicated.
#[derive(Debug)]
pub struct Fd {
    raw: libc::c_int,
}

impl Fd {
    pub(crate) fn new(raw: libc::c_int) -> Self {
        debug_assert!(raw >= 0);
        Self { raw }
    }
}

impl Drop for Fd {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.raw);
        }
    }
}

impl ByteSink for Fd {
    fn write_some(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = unsafe { libc::write(self.raw, buf.as_ptr() as *const libc::c_void, buf.len()) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(n as usize)
    }
}

impl ByteSource for Fd {
    fn read_some(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = unsafe { libc::read(self.raw, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(n as usize)
    }
}
