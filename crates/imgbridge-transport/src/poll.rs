//! Readiness checks on raw socket descriptors.
//!
//! These checks are non-consuming: they never read from the socket, so a
//! decoder positioned mid-stream is unaffected.

use std::io;
use std::os::fd::RawFd;
use std::time::{Duration, Instant};

/// Number of bytes that can be read from `fd` without blocking.
pub fn bytes_available(fd: RawFd) -> io::Result<usize> {
    let mut pending: libc::c_int = 0;

    // SAFETY: `pending` is a valid writable c_int and `fd` is an open socket
    // descriptor owned by the caller for the duration of the call.
    let rc = unsafe { libc::ioctl(fd, libc::FIONREAD, &mut pending as *mut libc::c_int) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(pending.max(0) as usize)
}

/// Wait up to `timeout` for `fd` to report `events`.
///
/// Returns `true` when the descriptor became ready, including hang-up and
/// error conditions, which the next read will surface.
pub fn wait_for(fd: RawFd, events: libc::c_short, timeout: Duration) -> io::Result<bool> {
    let millis = timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;
    let mut pfd = libc::pollfd {
        fd,
        events,
        revents: 0,
    };

    loop {
        // SAFETY: `pfd` points to exactly one initialized pollfd entry.
        let rc = unsafe { libc::poll(&mut pfd, 1, millis) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }

        let ready = events | libc::POLLHUP | libc::POLLERR;
        return Ok(rc > 0 && (pfd.revents & ready) != 0);
    }
}

/// Wait up to `timeout` for `fd` to become readable.
pub fn wait_readable(fd: RawFd, timeout: Duration) -> io::Result<bool> {
    wait_for(fd, libc::POLLIN, timeout)
}

/// Wait up to `timeout` for `fd` to accept more outbound bytes.
pub fn wait_writable(fd: RawFd, timeout: Duration) -> io::Result<bool> {
    wait_for(fd, libc::POLLOUT, timeout)
}

/// Run `accept` against the non-blocking listener `fd` until it yields a
/// connection or `timeout` elapses.
///
/// A readable listener can still have nothing to accept (the peer reset
/// between poll and accept), so would-block and aborted connections go
/// back to waiting for whatever time remains.
pub(crate) fn accept_until<T>(
    fd: RawFd,
    timeout: Duration,
    mut accept: impl FnMut() -> io::Result<T>,
) -> io::Result<Option<T>> {
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if !wait_readable(fd, remaining)? {
            return Ok(None);
        }
        match accept() {
            Ok(accepted) => return Ok(Some(accepted)),
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::WouldBlock
                        | io::ErrorKind::Interrupted
                        | io::ErrorKind::ConnectionAborted
                ) =>
            {
                if remaining.is_zero() {
                    return Ok(None);
                }
            }
            Err(err) => return Err(err),
        }
    }
}
