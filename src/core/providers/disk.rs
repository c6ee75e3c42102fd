//! Disk utilization for a configured mount point via `statvfs(2)`.
//!
//! Utilization is the used share of the space an unprivileged process can
//! see: `used / (used + available)`, where `available` excludes the blocks
//! reserved for root. That matches what `df` reports for `Use%`.

use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use super::error::{ProviderError, ProviderResult};
use super::round1;

/// Filesystem utilization in percent for the given path.
pub async fn usage_percent(path: &Path) -> ProviderResult<f64> {
    let c_path =
        CString::new(path.as_os_str().as_bytes()).map_err(|_| ProviderError::InvalidFormat {
            location: path.display().to_string(),
            reason: "path contains an interior NUL byte".to_string(),
        })?;

    // statvfs is a cheap metadata call; no need to move it off the runtime.
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
    if rc != 0 {
        return Err(ProviderError::SystemCall {
            syscall: "statvfs",
            reason: format!(
                "{} ({})",
                std::io::Error::last_os_error(),
                path.display()
            ),
        });
    }

    Ok(usage_from_blocks(
        stat.f_blocks as u64,
        stat.f_bfree as u64,
        stat.f_bavail as u64,
    ))
}

/// Used share of the non-reserved space, in percent.
pub(crate) fn usage_from_blocks(blocks: u64, bfree: u64, bavail: u64) -> f64 {
    let used = blocks.saturating_sub(bfree);
    let visible = used + bavail;
    if visible == 0 {
        return 0.0;
    }

    round1(used as f64 / visible as f64 * 100.0)
}
