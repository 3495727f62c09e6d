//! Process memory locking.

/// Lock every current and future page of the process into RAM.
#[cfg(unix)]
pub fn lock_memory() -> std::io::Result<()> {
    // SAFETY: mlockall takes no pointers and only changes paging behavior.
    if unsafe { libc::mlockall(libc::MCL_CURRENT | libc::MCL_FUTURE) } == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
pub fn lock_memory() -> std::io::Result<()> {
    Err(std::io::Error::from(std::io::ErrorKind::Unsupported))
}
