// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! RegisterHandle - physical memory window wrapper.
//!
//! Owns the open memory device and at most one mapped 4KiB window. The
//! window is reused while successive accesses stay on the same page and is
//! remapped when they move to another one.

use std::fs::{File, OpenOptions};
use std::num::NonZeroUsize;
use std::os::fd::IntoRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::ptr::NonNull;

use nix::sys::mman::{mmap, munmap, MapFlags, ProtFlags};

use crate::error::RegisterError;
use crate::mmio::{apply_bit, PinDriver};
use crate::types::{PinIndex, RegisterAddress, PAGE_SIZE};

/// One mapped page of the physical memory device.
struct MappedWindow {
    /// Physical address of the first byte of the page.
    base: u64,
    /// Start of the mapping in our address space.
    ptr: NonNull<libc::c_void>,
}

/// Open handle to a physical memory device plus its current register window.
///
/// Created by [`RegisterHandle::open`], released by [`RegisterHandle::close`]
/// (or on drop). Exactly one handle should own a given window at a time.
pub struct RegisterHandle {
    /// Path of the memory device, kept for error reporting.
    device: String,
    /// Device descriptor; `None` once closed or if never opened.
    file: Option<File>,
    /// Currently mapped page, if any.
    window: Option<MappedWindow>,
}

// SAFETY: the mapping is owned exclusively by this handle and only touched
// through `&mut self`.
unsafe impl Send for RegisterHandle {}

impl RegisterHandle {
    /// Open a physical memory device for synchronous read/write.
    ///
    /// # Errors
    /// Returns `RegisterError::ResourceUnavailable` if the device is missing
    /// or access is denied.
    pub fn open(device: impl AsRef<Path>) -> Result<Self, RegisterError> {
        let path = device.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open(path)
            .map_err(|e| RegisterError::ResourceUnavailable {
                resource: path.display().to_string(),
                reason: e.to_string(),
            })?;

        tracing::debug!(device = %path.display(), "Opened memory device");

        Ok(Self {
            device: path.display().to_string(),
            file: Some(file),
            window: None,
        })
    }

    /// A handle that never acquired a device. Closing it reports
    /// `ResourceUnavailable`.
    pub fn detached(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            file: None,
            window: None,
        }
    }

    /// Get the device path this handle was opened on.
    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Physical base address of the currently mapped page.
    pub fn mapped_page(&self) -> Option<u64> {
        self.window.as_ref().map(|w| w.base)
    }

    /// Read the current value of a register.
    pub fn read_register(&mut self, address: RegisterAddress) -> Result<u32, RegisterError> {
        let reg = self.register_ptr(address)?;
        // SAFETY: reg points inside the mapped page and is 4-byte aligned.
        Ok(unsafe { std::ptr::read_volatile(reg.as_ptr()) })
    }

    /// Unmap the window and close the device.
    ///
    /// The handle is unusable afterward even if the release fails. Closing a
    /// handle that is not open reports `ResourceUnavailable` and releases
    /// nothing.
    pub fn close(&mut self) -> Result<(), RegisterError> {
        self.unmap_window();

        let file = self
            .file
            .take()
            .ok_or_else(|| RegisterError::ResourceUnavailable {
                resource: self.device.clone(),
                reason: "Handle is not open".to_string(),
            })?;

        nix::unistd::close(file.into_raw_fd()).map_err(|e| {
            RegisterError::ResourceUnavailable {
                resource: self.device.clone(),
                reason: format!("close failed: {}", e),
            }
        })?;

        tracing::debug!(device = %self.device, "Closed memory device");
        Ok(())
    }

    /// Pointer to the register, mapping its page first if needed.
    fn register_ptr(&mut self, address: RegisterAddress) -> Result<NonNull<u32>, RegisterError> {
        let base = address.page_base();

        let reuse = matches!(&self.window, Some(w) if w.base == base);
        if !reuse {
            self.unmap_window();
            let ptr = self.map_page(address)?;
            self.window = Some(MappedWindow { base, ptr });
        }

        let window = self
            .window
            .as_ref()
            .ok_or_else(|| RegisterError::MappingFailed {
                address,
                reason: "No window mapped".to_string(),
            })?;

        // SAFETY: page_offset() < PAGE_SIZE, so the result stays inside the mapping.
        let reg = unsafe { window.ptr.as_ptr().cast::<u8>().add(address.page_offset()) };
        NonNull::new(reg.cast::<u32>()).ok_or_else(|| RegisterError::MappingFailed {
            address,
            reason: "Register pointer is null".to_string(),
        })
    }

    fn map_page(&self, address: RegisterAddress) -> Result<NonNull<libc::c_void>, RegisterError> {
        let file = self
            .file
            .as_ref()
            .ok_or_else(|| RegisterError::MappingFailed {
                address,
                reason: format!("{} is not open", self.device),
            })?;

        let offset = libc::off_t::try_from(address.page_base()).map_err(|_| {
            RegisterError::MappingFailed {
                address,
                reason: "Page offset does not fit off_t".to_string(),
            }
        })?;

        let length = NonZeroUsize::new(PAGE_SIZE as usize).ok_or_else(|| {
            RegisterError::MappingFailed {
                address,
                reason: "Zero-length window".to_string(),
            }
        })?;

        // SAFETY: file is an open descriptor, offset is page aligned and the
        // mapping is released in unmap_window before the descriptor closes.
        let ptr = unsafe {
            mmap(
                None,
                length,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_SHARED,
                file,
                offset,
            )
        }
        .map_err(|e| RegisterError::MappingFailed {
            address,
            reason: format!("mmap failed: {}", e),
        })?;

        tracing::debug!(
            device = %self.device,
            page = %format!("{:#x}", address.page_base()),
            "Mapped register window"
        );

        Ok(ptr)
    }

    fn unmap_window(&mut self) {
        if let Some(window) = self.window.take() {
            // SAFETY: ptr/length are exactly what mmap returned.
            if let Err(e) = unsafe { munmap(window.ptr, PAGE_SIZE as usize) } {
                tracing::error!(
                    device = %self.device,
                    page = %format!("{:#x}", window.base),
                    error = %e,
                    "Failed to unmap register window"
                );
            }
        }
    }
}

impl PinDriver for RegisterHandle {
    fn set_bit(
        &mut self,
        address: RegisterAddress,
        pin: PinIndex,
        value: bool,
    ) -> Result<(), RegisterError> {
        if self.file.is_none() {
            return Err(RegisterError::WriteFailed {
                address,
                pin,
                reason: format!("{} is not open", self.device),
            });
        }

        let reg = self.register_ptr(address)?;
        // SAFETY: reg is valid, aligned and exclusively owned for this run.
        unsafe {
            let word = std::ptr::read_volatile(reg.as_ptr());
            std::ptr::write_volatile(reg.as_ptr(), apply_bit(word, pin, value));
        }
        Ok(())
    }
}

impl Drop for RegisterHandle {
    fn drop(&mut self) {
        if self.file.is_some() {
            if let Err(e) = self.close() {
                tracing::error!(error = %e, "Failed to release register handle");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn backing_file(pages: usize) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&vec![0u8; pages * PAGE_SIZE as usize]).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_open_missing_device() {
        let err = RegisterHandle::open("/nonexistent/irqlat-mem").err().unwrap();
        assert!(matches!(err, RegisterError::ResourceUnavailable { .. }));
    }

    #[test]
    fn test_window_reused_then_remapped() {
        let backing = backing_file(2);
        let mut handle = RegisterHandle::open(backing.path()).unwrap();
        let pin = PinIndex::new(1).unwrap();

        handle
            .set_bit(RegisterAddress::new(0x10).unwrap(), pin, true)
            .unwrap();
        assert_eq!(handle.mapped_page(), Some(0));
        let first = handle.window.as_ref().map(|w| w.ptr);

        // Same page: the existing mapping is kept.
        handle
            .set_bit(RegisterAddress::new(0x20).unwrap(), pin, true)
            .unwrap();
        assert_eq!(handle.window.as_ref().map(|w| w.ptr), first);
        assert_eq!(
            handle.read_register(RegisterAddress::new(0x10).unwrap()).unwrap(),
            0b10
        );

        handle
            .set_bit(RegisterAddress::new(0x1010).unwrap(), pin, true)
            .unwrap();
        assert_eq!(handle.mapped_page(), Some(0x1000));
        handle.close().unwrap();
    }

    #[test]
    fn test_close_detached_handle() {
        let mut handle = RegisterHandle::detached("/dev/mem");
        let err = handle.close().err().unwrap();
        assert!(matches!(err, RegisterError::ResourceUnavailable { .. }));
    }

    #[test]
    fn test_set_bit_after_close_fails() {
        let backing = backing_file(1);
        let mut handle = RegisterHandle::open(backing.path()).unwrap();
        handle.close().unwrap();

        let err = handle
            .set_bit(RegisterAddress::new(0).unwrap(), PinIndex::new(0).unwrap(), true)
            .err()
            .unwrap();
        assert!(matches!(err, RegisterError::WriteFailed { .. }));
        assert!(handle.close().is_err());
    }
}
