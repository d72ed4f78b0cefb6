//! Serialized positioned I/O on shared descriptors.
//!
//! `read` and `write` are a seek followed by a transfer on a descriptor the
//! kernel may hand to several callers at once. The pair is not atomic, so
//! one lock covers both steps for every descriptor. Structural operations
//! do not go through here.

use nix::unistd::{lseek, read, write, Whence};
use parking_lot::Mutex;
use std::os::unix::io::RawFd;

/// The single lock around seek-then-transfer sequences.
#[derive(Debug, Default)]
pub struct DescriptorGuard {
    lock: Mutex<()>,
}

impl DescriptorGuard {
    /// Creates an unlocked guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads up to `size` bytes at `offset`.
    pub fn read_at(&self, fd: RawFd, offset: i64, size: usize) -> nix::Result<Vec<u8>> {
        let _held = self.lock.lock();
        lseek(fd, offset as libc::off_t, Whence::SeekSet)?;
        let mut buf = vec![0u8; size];
        let n = read(fd, &mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }

    /// Writes `data` at `offset`, running `before` inside the same critical
    /// section first.
    pub fn write_at<F>(&self, fd: RawFd, offset: i64, data: &[u8], before: F) -> nix::Result<usize>
    where
        F: FnOnce(),
    {
        let _held = self.lock.lock();
        before();
        lseek(fd, offset as libc::off_t, Whence::SeekSet)?;
        write(fd, data)
    }
}
