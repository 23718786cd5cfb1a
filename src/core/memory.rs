use std::ptr;

use region::Protection;

use super::Error;

const USIZE_SIZE: usize = std::mem::size_of::<usize>();

/// Read-only view over machine code.
pub trait CodeMemory {
    /// Returns up to `max_len` bytes starting at `addr`, or `None` if `addr` is not readable.
    /// The returned slice may be shorter than requested when the readable range ends early.
    fn read(&self, addr: usize, max_len: usize) -> Option<&[u8]>;

    fn read_usize(&self, addr: usize) -> Option<usize> {
        let bytes: [u8; USIZE_SIZE] = self.read(addr, USIZE_SIZE)?.try_into().ok()?;
        Some(usize::from_ne_bytes(bytes))
    }
}

/// Memory of the current process. Reads are clamped to the end of the mapping that
/// contains the start address.
#[derive(Default, Clone, Copy)]
pub struct ProcessMemory;

impl CodeMemory for ProcessMemory {
    fn read(&self, addr: usize, max_len: usize) -> Option<&[u8]> {
        if addr == 0 || max_len == 0 {
            return None;
        }

        let region = region::query(addr as *const u8).ok()?;
        if !region.is_readable() {
            return None;
        }

        let len = max_len.min(region.as_range().end.saturating_sub(addr));
        if len == 0 {
            return None;
        }

        Some(unsafe { std::slice::from_raw_parts(addr as *const u8, len) })
    }
}

/// Bytes written over executable code, with the displaced bytes kept for restoring them.
pub struct ExecutableMemoryPatch {
    addr: usize,
    original: Vec<u8>
}

impl ExecutableMemoryPatch {
    /// Overwrites `bytes.len()` bytes at `addr`. Nothing is written if write access to the
    /// page cannot be obtained; page protection is restored before returning either way.
    ///
    /// # Safety
    /// The range must be mapped code that no thread is executing while it is rewritten.
    pub unsafe fn apply(addr: usize, bytes: &[u8]) -> Result<ExecutableMemoryPatch, Error> {
        if addr == 0 || bytes.is_empty() {
            return Err(Error::InvalidAddress(addr));
        }

        let original = write_code(addr, bytes)?;
        Ok(ExecutableMemoryPatch {
            addr,
            original
        })
    }

    pub fn addr(&self) -> usize {
        self.addr
    }

    pub fn len(&self) -> usize {
        self.original.len()
    }

    pub fn original_bytes(&self) -> &[u8] {
        &self.original
    }

    /// Writes the displaced bytes back.
    ///
    /// # Safety
    /// Same contract as [`ExecutableMemoryPatch::apply`].
    pub unsafe fn revert(&self) -> Result<(), Error> {
        write_code(self.addr, &self.original)?;
        Ok(())
    }
}

unsafe fn write_code(addr: usize, bytes: &[u8]) -> Result<Vec<u8>, Error> {
    // Guard restores the previous protection when dropped
    let _guard = region::protect_with_handle(addr as *const u8, bytes.len(), Protection::READ_WRITE_EXECUTE)?;

    let original = std::slice::from_raw_parts(addr as *const u8, bytes.len()).to_vec();
    ptr::copy_nonoverlapping(bytes.as_ptr(), addr as *mut u8, bytes.len());

    Ok(original)
}
