// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Interrupt-capable character device opened in signal-driven mode.

use std::fs::{File, OpenOptions};
use std::os::fd::AsRawFd;
use std::path::Path;

use nix::fcntl::{fcntl, FcntlArg, OFlag};
use nix::unistd::getpid;

use crate::error::NotifyError;

/// Open handle to the interrupt device (e.g. `/dev/gpio_int`).
///
/// After [`AsyncDevice::enable_async`] the driver delivers SIGIO to this
/// process on every edge it reports.
#[derive(Debug)]
pub struct AsyncDevice {
    path: String,
    file: File,
}

impl AsyncDevice {
    /// Open the device read/write.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, NotifyError> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| NotifyError::ResourceUnavailable {
                resource: path.display().to_string(),
                reason: e.to_string(),
            })?;

        tracing::debug!(device = %path.display(), "Opened interrupt device");

        Ok(Self {
            path: path.display().to_string(),
            file,
        })
    }

    /// Claim ownership for this process and turn on O_ASYNC.
    ///
    /// # Errors
    /// `NotifyError::ConfigurationFailed` naming the failed step.
    pub fn enable_async(&self) -> Result<(), NotifyError> {
        let fd = self.file.as_raw_fd();
        let pid = getpid();

        // nix has no F_SETOWN wrapper.
        // SAFETY: fd is an open descriptor owned by self.file.
        let rc = unsafe { libc::fcntl(fd, libc::F_SETOWN, pid.as_raw()) };
        if rc < 0 {
            return Err(NotifyError::ConfigurationFailed {
                step: "F_SETOWN",
                reason: std::io::Error::last_os_error().to_string(),
            });
        }
        tracing::debug!(device = %self.path, pid = pid.as_raw(), "F_SETOWN configured");

        let flags = fcntl(fd, FcntlArg::F_GETFL).map_err(|e| NotifyError::ConfigurationFailed {
            step: "F_GETFL",
            reason: e.to_string(),
        })?;
        let flags = OFlag::from_bits_truncate(flags) | OFlag::O_ASYNC;

        fcntl(fd, FcntlArg::F_SETFL(flags)).map_err(|e| NotifyError::ConfigurationFailed {
            step: "F_SETFL",
            reason: e.to_string(),
        })?;
        tracing::debug!(device = %self.path, "O_ASYNC enabled");

        Ok(())
    }

    /// Process currently receiving SIGIO for this device.
    pub fn owner(&self) -> Result<i32, NotifyError> {
        // SAFETY: fd is an open descriptor owned by self.file.
        let rc = unsafe { libc::fcntl(self.file.as_raw_fd(), libc::F_GETOWN) };
        if rc < 0 {
            return Err(NotifyError::ConfigurationFailed {
                step: "F_GETOWN",
                reason: std::io::Error::last_os_error().to_string(),
            });
        }
        Ok(rc)
    }

    pub fn is_async(&self) -> bool {
        fcntl(self.file.as_raw_fd(), FcntlArg::F_GETFL)
            .map(|flags| OFlag::from_bits_truncate(flags).contains(OFlag::O_ASYNC))
            .unwrap_or(false)
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}
