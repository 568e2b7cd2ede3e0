//! Unix-specific process utilities

use std::io;
use std::os::fd::OwnedFd;

use nix::sys::signal::killpg;
pub use nix::sys::signal::Signal;
use nix::unistd::Pid;

/// Signal the process group led by `leader_pid`.
///
/// The child is spawned with `process_group(0)`, so its pid is also its
/// group id and the signal reaches any helpers it started.
pub fn signal_group(leader_pid: u32, signal: Signal) -> nix::Result<()> {
    let pgid = i32::try_from(leader_pid).map_err(|_| nix::errno::Errno::EINVAL)?;
    killpg(Pid::from_raw(pgid), signal)
}

/// Create a close-on-exec pipe as `(read, write)`.
///
/// The write end is handed to the child as both stdout and stderr, so
/// everything it prints arrives on one stream in the order it was written.
/// Close-on-exec keeps concurrently spawned processes from inheriting the
/// write end and holding the stream open.
#[cfg(any(target_os = "linux", target_os = "android"))]
pub fn output_pipe() -> io::Result<(OwnedFd, OwnedFd)> {
    use nix::fcntl::OFlag;

    Ok(nix::unistd::pipe2(OFlag::O_CLOEXEC)?)
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub fn output_pipe() -> io::Result<(OwnedFd, OwnedFd)> {
    use nix::fcntl::{fcntl, FcntlArg, FdFlag};

    let (read, write) = nix::unistd::pipe()?;
    for fd in [&read, &write] {
        fcntl(fd, FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))?;
    }
    Ok((read, write))
}
