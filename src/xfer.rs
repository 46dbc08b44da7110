// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Reliable transfer over raw byte endpoints. Pipes and FIFOs may move fewer
// bytes than requested per call, so both directions loop over the unfilled
// remainder. A zero (or errored) single-call result is a broken stream,
// terminal to the session; a positive partial result just accumulates.

use std::io;

use crate::error::ExchangeError;

/// A write-capable raw endpoint. A single call may consume fewer bytes than
/// offered; returning `Ok(0)` means the stream can take no more, ever.
pub trait ByteSink {
    fn write_some(&mut self, buf: &[u8]) -> io::Result<usize>;
}

/// A read-capable raw endpoint. `Ok(0)` is end-of-stream.
pub trait ByteSource {
    fn read_some(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Drive `sink` until all of `buf` has been written.
pub fn write_exact<S: ByteSink + ?Sized>(sink: &mut S, buf: &[u8]) -> Result<(), ExchangeError> {
    let want = buf.len();
    let mut done = 0;
    while done < want {
        match sink.write_some(&buf[done..]) {
            Ok(0) => return Err(ExchangeError::IoBroken { done, want }),
            Ok(n) => done += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(_) => return Err(ExchangeError::IoBroken { done, want }),
        }
    }
    Ok(())
}

/// Drive `source` until all of `buf` has been filled.
pub fn read_exact<S: ByteSource + ?Sized>(
    source: &mut S,
    buf: &mut [u8],
) -> Result<(), ExchangeError> {
    let want = buf.len();
    let mut done = 0;
    while done < want {
        match source.read_some(&mut buf[done..]) {
            Ok(0) => return Err(ExchangeError::IoBroken { done, want }),
            Ok(n) => done += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(_) => return Err(ExchangeError::IoBroken { done, want }),
        }
    }
    Ok(())
}
