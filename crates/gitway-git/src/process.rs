//! Process-group cleanup for git subprocesses.
//!
//! Subprocesses are started in their own process group so that they and any
//! helpers they spawn (`pack-objects`, hooks, ...) can be signalled as a unit.
//! [`ProcessGroup`] owns that group for the lifetime of a request: unless it
//! has been disarmed after a normal exit, dropping it sends `SIGTERM` to the
//! whole group.

use std::io;

/// Guard over the process group of a spawned git subprocess.
#[derive(Debug)]
pub struct ProcessGroup {
    pgid: Option<u32>,
    armed: bool,
}

impl ProcessGroup {
    /// Wraps the group led by `pid`, as returned by `Child::id`.
    ///
    /// The child must have been spawned as a group leader
    /// (`process_group(0)`), which [`crate::ProcessGateway::command`] does.
    pub fn new(pid: Option<u32>) -> Self {
        Self {
            pgid: pid,
            armed: pid.is_some(),
        }
    }

    /// Process group id, if the child was still running when wrapped.
    pub fn id(&self) -> Option<u32> {
        self.pgid
    }

    /// Returns true if dropping the guard would signal the group.
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Marks the group as finished so that drop leaves it alone.
    pub fn disarm(&mut self) {
        self.armed = false;
    }

    /// Sends `SIGTERM` to every process in the group and disarms the guard.
    ///
    /// A group that no longer exists is not an error.
    pub fn terminate(&mut self) -> io::Result<()> {
        if !self.armed {
            return Ok(());
        }
        self.armed = false;
        match self.pgid {
            Some(pgid) => signal_group(pgid),
            None => Ok(()),
        }
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        if self.armed {
            let pgid = self.pgid;
            if let Err(e) = self.terminate() {
                tracing::warn!(?pgid, error = %e, "failed to terminate git process group");
            } else {
                tracing::debug!(?pgid, "terminated abandoned git process group");
            }
        }
    }
}

#[cfg(unix)]
fn signal_group(pgid: u32) -> io::Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let pgid = i32::try_from(pgid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pgid out of range"))?;
    match killpg(Pid::from_raw(pgid), Signal::SIGTERM) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(io::Error::from_raw_os_error(e as i32)),
    }
}

#[cfg(not(unix))]
fn signal_group(_pgid: u32) -> io::Result<()> {
    Ok(())
}
