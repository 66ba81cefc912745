use rama::telemetry::tracing;

pub use libc::rlim_t;

/// Raise the soft `RLIMIT_NOFILE` of this process towards `target`,
/// capped by the hard limit, and return the soft limit now in effect.
///
/// Sockets closed by a `CLOSE` sweep linger in `TIME_WAIT` while new ones
/// keep being opened, which exhausts the usual default of 1024 quickly.
pub fn raise_nofile(target: rlim_t) -> std::io::Result<rlim_t> {
    use std::{io, mem};

    // SAFETY: `lim` is a plain C struct fully written by getrlimit before it is read.
    unsafe {
        let mut lim: libc::rlimit = mem::zeroed();
        if libc::getrlimit(libc::RLIMIT_NOFILE, &mut lim) != 0 {
            return Err(io::Error::last_os_error());
        }

        let new_soft = target.min(lim.rlim_max);
        if lim.rlim_cur >= new_soft {
            tracing::debug!(
                "ulimit: current soft limit ({}) already covers {new_soft}",
                lim.rlim_cur,
            );
            return Ok(lim.rlim_cur);
        }

        let previous = lim.rlim_cur;
        lim.rlim_cur = new_soft;
        if libc::setrlimit(libc::RLIMIT_NOFILE, &lim) != 0 {
            return Err(io::Error::last_os_error());
        }
        tracing::info!("ulimit: raised soft limit from {previous} to {new_soft}");

        Ok(new_soft)
    }
}
