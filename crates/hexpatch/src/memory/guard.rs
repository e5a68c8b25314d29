use std::ptr;

use region::Protection;
use tracing::debug;

use crate::error::PatchFault;

/// A byte range of the current process made accessible for the lifetime
/// of the value.
///
/// The previous page protection is restored when the region is dropped,
/// including on early returns and unwinding.
pub struct ProtectedRegion {
    ptr: *mut u8,
    len: usize,
    _guard: Option<region::ProtectGuard>,
}

impl ProtectedRegion {
    /// Change the protection of `ptr..ptr + len` until drop.
    ///
    /// # Safety
    ///
    /// The range must lie inside memory mapped by a module of the current
    /// process, and nothing else may reprotect it while the region lives.
    pub unsafe fn open(ptr: *mut u8, len: usize, protection: Protection) -> Result<Self, PatchFault> {
        if len == 0 {
            return Ok(Self {
                ptr,
                len,
                _guard: None,
            });
        }

        // SAFETY: upheld by the caller.
        let guard = unsafe { region::protect_with_handle(ptr as *const u8, len, protection) }
            .map_err(|e| {
                debug!("Failed to change protection at {:p}: {}", ptr, e);
                PatchFault::BadAddress
            })?;

        Ok(Self {
            ptr,
            len,
            _guard: Some(guard),
        })
    }

    pub fn read(&self) -> Vec<u8> {
        let mut buffer = vec![0u8; self.len];
        // SAFETY: the range is mapped and readable while self is alive.
        unsafe { ptr::copy_nonoverlapping(self.ptr as *const u8, buffer.as_mut_ptr(), self.len) };
        buffer
    }

    pub fn write(&mut self, bytes: &[u8]) {
        let len = bytes.len().min(self.len);
        // SAFETY: the range is mapped and writable while self is alive, and
        // len never exceeds it.
        unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), self.ptr, len) };
    }
}
