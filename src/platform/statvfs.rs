//! statvfs-based filesystem usage for the Linux backend.

use std::ffi::CString;
use std::mem;

use super::PlatformError;
use crate::metrics::Usage;

/// Used and total bytes of the filesystem containing `path`.
///
/// Used is total minus the space available to unprivileged users, matching
/// what `df` reports.
pub(crate) fn statvfs_usage(path: &str) -> Result<Usage, PlatformError> {
    let c_path = CString::new(path).map_err(|e| PlatformError::parse("mount path", e.to_string()))?;

    let stat = unsafe {
        let mut stat: libc::statvfs = mem::zeroed();
        if libc::statvfs(c_path.as_ptr(), &mut stat) != 0 {
            return Err(PlatformError::last_os_error("statvfs"));
        }
        stat
    };

    let block_size = stat.f_frsize as u64;
    let total = (stat.f_blocks as u64).saturating_mul(block_size);
    let available = (stat.f_bavail as u64).saturating_mul(block_size);

    Ok(Usage {
        used: total.saturating_sub(available),
        total,
    })
}
