// buffer.rs — fixed-capacity save/restore working buffer
// Converted from: hlsdk-original/game/server/saverestore/CSave.cpp
// (BufferData) and the read-side half of CSaveRestoreBuffer.

use crate::error::SaveError;

/// Append-only byte region with a hard capacity bound. One buffer is owned
/// exclusively by one save or restore operation and never grows; overflow
/// truncates and latches a flag instead of reallocating or panicking, so a
/// long field walk can run to completion and the caller decides afterwards
/// that the save failed.
#[derive(Debug)]
pub struct SaveBuffer {
    data: Vec<u8>,
    used: usize,
    read_ofs: usize,
    overflowed: bool,
}

impl SaveBuffer {
    /// A zeroed region of exactly `capacity` bytes for writing.
    pub fn new(capacity: usize) -> Self {
        SaveBuffer {
            data: vec![0; capacity],
            used: 0,
            read_ofs: 0,
            overflowed: false,
        }
    }

    /// Wrap an existing blob for restore; the whole vec counts as used.
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        let used = bytes.len();
        SaveBuffer {
            data: bytes,
            used,
            read_ofs: 0,
            overflowed: false,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    /// The bytes written so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.used]
    }

    /// Copy `bytes` at the write cursor. On overflow the chunk is dropped,
    /// `used` is pinned to the capacity and an error is logged once; every
    /// later write is silently dropped. No data recoverable past this point.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        if self.overflowed {
            return;
        }
        if self.used + bytes.len() > self.data.len() {
            log::error!(
                "save/restore buffer overflow ({} + {} > {})",
                self.used,
                bytes.len(),
                self.data.len()
            );
            self.used = self.data.len();
            self.overflowed = true;
            return;
        }
        self.data[self.used..self.used + bytes.len()].copy_from_slice(bytes);
        self.used += bytes.len();
    }

    /// Borrow `count` bytes at the read cursor and advance past them.
    pub fn read_bytes(&mut self, count: usize) -> Result<&[u8], SaveError> {
        if self.read_ofs + count > self.used {
            return Err(SaveError::Underflow);
        }
        let bytes = &self.data[self.read_ofs..self.read_ofs + count];
        self.read_ofs += count;
        Ok(bytes)
    }

    /// Advance the read cursor without looking at the bytes.
    pub fn skip(&mut self, count: usize) -> Result<(), SaveError> {
        if self.read_ofs + count > self.used {
            return Err(SaveError::Underflow);
        }
        self.read_ofs += count;
        Ok(())
    }

    /// Back the read cursor up, e.g. to re-see a header that belongs to a
    /// different object.
    pub fn rewind(&mut self, count: usize) {
        self.read_ofs = self.read_ofs.saturating_sub(count);
    }

    /// Finish the write side: the written bytes, or the overflow error if
    /// truncation occurred (the blob is corrupt and must not be kept).
    pub fn finish(self) -> Result<Vec<u8>, SaveError> {
        if self.overflowed {
            return Err(SaveError::Overflow {
                used: self.used,
                capacity: self.data.len(),
            });
        }
        let mut data = self.data;
        data.truncate(self.used);
        Ok(data)
    }
}
