//! Socket options std does not expose.

use std::net::TcpListener;
use std::time::Duration;

/// Bound the time a blocking `accept` waits (`SO_RCVTIMEO` on the listener).
#[cfg(unix)]
pub(crate) fn set_accept_timeout(listener: &TcpListener, timeout: Duration) -> std::io::Result<()> {
    use std::os::fd::AsRawFd;

    let tv = libc::timeval {
        tv_sec: timeout.as_secs() as libc::time_t,
        tv_usec: timeout.subsec_micros() as libc::suseconds_t,
    };

    // SAFETY: `tv` is a valid, initialized timeval that outlives the call,
    // the length matches its size, and the descriptor is owned by `listener`.
    let rc = unsafe {
        libc::setsockopt(
            listener.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_RCVTIMEO,
            (&tv as *const libc::timeval).cast::<libc::c_void>(),
            std::mem::size_of::<libc::timeval>() as libc::socklen_t,
        )
    };

    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
pub(crate) fn set_accept_timeout(_listener: &TcpListener, _timeout: Duration) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "accept timeouts require a unix platform",
    ))
}

/// Put the socket in the listening state with an explicit backlog.
///
/// std already listens after bind; calling again only adjusts the backlog.
#[cfg(unix)]
pub(crate) fn listen(listener: &TcpListener, backlog: i32) -> std::io::Result<()> {
    use std::os::fd::AsRawFd;

    // SAFETY: the descriptor is a bound stream socket owned by `listener`.
    let rc = unsafe { libc::listen(listener.as_raw_fd(), backlog) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
pub(crate) fn listen(_listener: &TcpListener, _backlog: i32) -> std::io::Result<()> {
    Ok(())
}

/// True when the OS could not create a socket of the requested family.
#[cfg(unix)]
pub(crate) fn is_family_unsupported(err: &std::io::Error) -> bool {
    matches!(
        err.raw_os_error(),
        Some(libc::EAFNOSUPPORT) | Some(libc::EPROTONOSUPPORT)
    )
}

#[cfg(not(unix))]
pub(crate) fn is_family_unsupported(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::Unsupported
}
