// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Process lifecycle boundary: split into two execution contexts that share
// transport handles (fork), and wait for a peer to terminate (waitpid).
// The wait is the join barrier shared memory relies on for data readiness.

use std::io;

/// Handle to a peer process.
#[derive(Debug, Clone, Copy)]
pub struct ProcessHandle {
    pid: libc::pid_t,
}

impl ProcessHandle {
    pub fn pid(&self) -> i32 {
        self.pid
    }

    pub fn valid(&self) -> bool {
        self.pid > 0
    }
}

/// Which side of the split this process ended up on.
#[derive(Debug)]
pub enum ForkOutcome {
    /// The original process; holds the child's handle for the join barrier.
    Parent(ProcessHandle),
    Child,
}

/// Split into two execution contexts. Both inherit every transport handle
/// created so far, which is the only way an anonymous pipe pair or an
/// existing mapping can reach the peer.
pub fn fork_split() -> io::Result<ForkOutcome> {
    let pid = unsafe { libc::fork() };
    if pid < 0 {
        return Err(io::Error::last_os_error());
    }
    if pid == 0 {
        return Ok(ForkOutcome::Child);
    }
    Ok(ForkOutcome::Parent(ProcessHandle { pid }))
}

/// How a waited-on process ended.
#[derive(Debug, Default, Clone, Copy)]
pub struct WaitResult {
    pub exited: bool,
    pub exit_code: i32,
    pub signaled: bool,
    pub signal: i32,
}

impl WaitResult {
    /// True only for a clean zero-status exit.
    pub fn clean(&self) -> bool {
        self.exited && self.exit_code == 0 && !self.signaled
    }
}

/// Block until the peer terminates. Retries on EINTR; there is no timeout,
/// matching the blocking model of the rest of the crate.
pub fn wait_for_exit(h: &ProcessHandle) -> io::Result<WaitResult> {
    if !h.valid() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "invalid process handle",
        ));
    }
    loop {
        let mut status: libc::c_int = 0;
        let ret = unsafe { libc::waitpid(h.pid, &mut status, 0) };
        if ret == -1 {
            let e = io::Error::last_os_error();
            if e.raw_os_error() == Some(libc::EINTR) {
                continue;
            }
            return Err(e);
        }

        let mut r = WaitResult::default();
        if libc::WIFEXITED(status) {
            r.exited = true;
            r.exit_code = libc::WEXITSTATUS(status);
        }
        if libc::WIFSIGNALED(status) {
            r.signaled = true;
            r.signal = libc::WTERMSIG(status);
        }
        return Ok(r);
    }
}
