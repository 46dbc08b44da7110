// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// POSIX shared memory transport. A named segment is created, sized and
// mapped by the creator; the peer reaches the same pages through the
// inherited mapping (fork) or by opening the same name. The region is a
// flat buffer with no stream cursor of its own and no readiness signal —
// ordering comes entirely from the session's join barrier.

use std::ffi::CString;
use std::io;
use std::ptr;
use std::sync::Arc;

use crate::error::ExchangeError;
use crate::transport::{Rendezvous, Transport, DEFAULT_BUFFER_BYTES, DEFAULT_PERMISSIONS};
use crate::xfer::{ByteSink, ByteSource};

/// Default name in the shared-memory namespace.
pub const DEFAULT_SHM_NAME: &str = "/handoff_shm";

/// The mapped pages. Shared between the segment and every cursor taken
/// from it, so a live cursor keeps the mapping valid; the last holder
/// unmaps.
#[derive(Debug)]
struct Mapping {
    mem: *mut u8,
    size: usize,
}

// The region is process-shared by design; the session's phase separation
// is what makes access safe, not these markers.
unsafe impl Send for Mapping {}
unsafe impl Sync for Mapping {}

impl Drop for Mapping {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.mem as *mut libc::c_void, self.size);
        }
    }
}

/// A named, mapped shared memory region of fixed size.
#[derive(Debug)]
pub struct SharedMemorySegment {
    map: Arc<Mapping>,
    name: CString,
    created: bool,
    unlinked: bool,
}

impl SharedMemorySegment {
    /// Create (or, if it already exists, open) the named segment and map it.
    ///
    /// Exclusive create is tried first so ftruncate only runs on a segment
    /// we actually own; sizing an existing object can clobber its contents.
    pub fn create(name: &str, bytes: usize) -> Result<Self, ExchangeError> {
        let c_name = posix_name(name)?;
        let flags = libc::O_RDWR | libc::O_CREAT | libc::O_EXCL;
        let perms = DEFAULT_PERMISSIONS as libc::mode_t;
        let fd = unsafe { libc::shm_open(c_name.as_ptr(), flags, perms) };
        let (fd, created) = if fd != -1 {
            (fd, true)
        } else {
            let e = io::Error::last_os_error();
            if e.raw_os_error() != Some(libc::EEXIST) {
                return Err(ExchangeError::ResourceCreationFailed {
                    what: "shm segment",
                    source: e,
                });
            }
            // Tolerated: fall back to opening the existing object. This
            // instance is then not the owner of the name.
            let fd2 = unsafe { libc::shm_open(c_name.as_ptr(), libc::O_RDWR, perms) };
            if fd2 == -1 {
                return Err(ExchangeError::ResourceCreationFailed {
                    what: "shm segment",
                    source: io::Error::last_os_error(),
                });
            }
            if let Err(err) = check_size(fd2, bytes) {
                unsafe { libc::close(fd2) };
                return Err(err);
            }
            (fd2, false)
        };

        if created {
            let ret = unsafe { libc::ftruncate(fd, bytes as libc::off_t) };
            if ret != 0 {
                let err = io::Error::last_os_error();
                unsafe {
                    libc::close(fd);
                    libc::shm_unlink(c_name.as_ptr());
                }
                return Err(ExchangeError::CapacityExceeded(err));
            }
        }

        Self::map(fd, bytes, c_name, created)
    }

    /// Create with the default name and region size.
    pub fn create_default() -> Result<Self, ExchangeError> {
        Self::create(DEFAULT_SHM_NAME, DEFAULT_BUFFER_BYTES)
    }

    /// Create the segment, failing if the name is already taken. For
    /// callers that cannot tolerate a leftover segment from an earlier run.
    pub fn create_exclusive(name: &str, bytes: usize) -> Result<Self, ExchangeError> {
        let c_name = posix_name(name)?;
        let flags = libc::O_RDWR | libc::O_CREAT | libc::O_EXCL;
        let perms = DEFAULT_PERMISSIONS as libc::mode_t;
        let fd = unsafe { libc::shm_open(c_name.as_ptr(), flags, perms) };
        if fd == -1 {
            let e = io::Error::last_os_error();
            if e.raw_os_error() == Some(libc::EEXIST) {
                return Err(ExchangeError::ResourceExists { what: "shm segment" });
            }
            return Err(ExchangeError::ResourceCreationFailed {
                what: "shm segment",
                source: e,
            });
        }

        let ret = unsafe { libc::ftruncate(fd, bytes as libc::off_t) };
        if ret != 0 {
            let err = io::Error::last_os_error();
            unsafe {
                libc::close(fd);
                libc::shm_unlink(c_name.as_ptr());
            }
            return Err(ExchangeError::CapacityExceeded(err));
        }

        Self::map(fd, bytes, c_name, true)
    }

    /// Open an existing segment without creating it. The peer side: it maps
    /// its own view and never unlinks the name.
    pub fn open(name: &str, bytes: usize) -> Result<Self, ExchangeError> {
        let c_name = posix_name(name)?;
        let fd = unsafe {
            libc::shm_open(
                c_name.as_ptr(),
                libc::O_RDWR,
                DEFAULT_PERMISSIONS as libc::mode_t,
            )
        };
        if fd == -1 {
            return Err(ExchangeError::ResourceCreationFailed {
                what: "shm segment",
                source: io::Error::last_os_error(),
            });
        }
        if let Err(err) = check_size(fd, bytes) {
            unsafe { libc::close(fd) };
            return Err(err);
        }
        Self::map(fd, bytes, c_name, false)
    }

    fn map(fd: libc::c_int, size: usize, name: CString, created: bool) -> Result<Self, ExchangeError> {
        let mem = unsafe {
            libc::mmap(
                ptr::null_mut(),
                size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                0,
            )
        };
        // The mapping keeps the object alive; the descriptor is not needed
        // past this point on either path.
        unsafe { libc::close(fd) };

        if mem == libc::MAP_FAILED {
            let err = io::Error::last_os_error();
            if created {
                // We own the name and never handed it to anyone: remove it.
                unsafe { libc::shm_unlink(name.as_ptr()) };
            }
            return Err(ExchangeError::MappingFailed(err));
        }

        Ok(Self {
            map: Arc::new(Mapping {
                mem: mem as *mut u8,
                size,
            }),
            name,
            created,
            unlinked: false,
        })
    }

    /// The POSIX name (with leading '/').
    pub fn name(&self) -> &str {
        self.name.to_str().unwrap_or("")
    }

    /// Region size in bytes.
    pub fn len(&self) -> usize {
        self.map.size
    }
}

/// An existing object must be at least the size the caller will map;
/// mapping past the object's end turns first access into SIGBUS.
fn check_size(fd: libc::c_int, bytes: usize) -> Result<(), ExchangeError> {
    let mut st: libc::stat = unsafe { std::mem::zeroed() };
    let ret = unsafe { libc::fstat(fd, &mut st) };
    if ret != 0 {
        return Err(ExchangeError::ResourceCreationFailed {
            what: "shm segment",
            source: io::Error::last_os_error(),
        });
    }
    if (st.st_size as u64) < bytes as u64 {
        return Err(ExchangeError::CapacityExceeded(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("existing segment is {} bytes, need {bytes}", st.st_size),
        )));
    }
    Ok(())
}

fn posix_name(name: &str) -> Result<CString, ExchangeError> {
    let normalized = if name.starts_with('/') {
        name.to_string()
    } else {
        format!("/{name}")
    };
    CString::new(normalized).map_err(|_| ExchangeError::ResourceCreationFailed {
        what: "shm name",
        source: io::Error::new(io::ErrorKind::InvalidInput, "name contains NUL"),
    })
}

impl Transport for SharedMemorySegment {
    type Sink = ShmCursor;
    type Source = ShmCursor;

    fn buffer_bytes(&self) -> usize {
        self.map.size
    }

    /// Header and payload share the fixed region, so one element slot is
    /// reserved for the header.
    fn reserved_header_slots(&self) -> usize {
        1
    }

    fn rendezvous(&self) -> Rendezvous {
        Rendezvous::JoinPeer
    }

    fn producer_end(&mut self) -> Result<ShmCursor, ExchangeError> {
        Ok(ShmCursor::new(Arc::clone(&self.map)))
    }

    fn consumer_end(&mut self) -> Result<ShmCursor, ExchangeError> {
        Ok(ShmCursor::new(Arc::clone(&self.map)))
    }

    fn created_name(&self) -> bool {
        self.created
    }

    fn unlink(&mut self) {
        if self.unlinked {
            return;
        }
        self.unlinked = true;
        let ret = unsafe { libc::shm_unlink(self.name.as_ptr()) };
        if ret == -1 {
            tracing::warn!(
                name = self.name(),
                error = %io::Error::last_os_error(),
                "shm unlink failed"
            );
        }
    }
}

/// An addressed cursor over the mapped region. Flat memory has no stream
/// position, so exact transfers complete in a single step; running past the
/// end of the region reads as end-of-stream, which the xfer loops turn into
/// a broken transfer.
///
/// The cursor holds a reference to the mapping, so the pages stay valid
/// even if the segment is dropped first.
pub struct ShmCursor {
    map: Arc<Mapping>,
    pos: usize,
}

impl ShmCursor {
    fn new(map: Arc<Mapping>) -> Self {
        Self { map, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.map.size - self.pos
    }
}

impl ByteSink for ShmCursor {
    fn write_some(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = buf.len().min(self.remaining());
        if n == 0 {
            return Ok(0);
        }
        unsafe {
            ptr::copy_nonoverlapping(buf.as_ptr(), self.map.mem.add(self.pos), n);
        }
        self.pos += n;
        Ok(n)
    }
}

impl ByteSource for ShmCursor {
    fn read_some(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.remaining());
        if n == 0 {
            return Ok(0);
        }
        unsafe {
            ptr::copy_nonoverlapping(self.map.mem.add(self.pos), buf.as_mut_ptr(), n);
        }
        self.pos += n;
        Ok(n)
    }
}
