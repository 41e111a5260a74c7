//! Moving raw runtime logs into the run directory.

use log::debug;
use std::fs;
use std::io;
use std::path::Path;

/// Move `from` to `to`, copying when a plain rename is not possible
///
/// **Public** - the trace log is written in the working directory, which may
/// live on a different filesystem than the log directory.
pub fn relocate_file(from: &Path, to: &Path) -> io::Result<()> {
    debug!("Moving {} -> {}", from.display(), to.display());

    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if from.is_file() && is_cross_device(&e) => {
            debug!("Rename crossed filesystems, copying instead");
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn is_cross_device(e: &io::Error) -> bool {
    e.raw_os_error() == Some(libc::EXDEV)
}

// ERROR_NOT_SAME_DEVICE
#[cfg(not(unix))]
fn is_cross_device(e: &io::Error) -> bool {
    e.raw_os_error() == Some(17)
}
