//! Process-table introspection.
//!
//! Answers "who is this pid" questions without the cooperation of the
//! process being inspected. Ownership and executable lookups go through
//! `/proc`, so they only succeed on Linux.

use std::fs;
use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::PathBuf;

/// Returns `true` when a process with this pid currently exists.
///
/// A process we are not allowed to signal still counts as alive. Zombies
/// count as alive until they are reaped.
pub fn pid_is_alive(pid: u32) -> bool {
	let Ok(raw) = libc::pid_t::try_from(pid) else {
		return false;
	};
	// pid 0 addresses our own process group.
	if raw <= 0 {
		return false;
	}
	if unsafe { libc::kill(raw, 0) } == 0 {
		return true;
	}
	io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

/// Real uid of the calling process.
pub fn current_uid() -> u32 {
	unsafe { libc::getuid() }
}

fn proc_dir(pid: u32) -> PathBuf {
	PathBuf::from(format!("/proc/{pid}"))
}

/// Uid owning the process, taken from its `/proc` entry.
pub fn process_owner(pid: u32) -> io::Result<u32> {
	Ok(fs::metadata(proc_dir(pid))?.uid())
}

/// Resolved path of the image the process is executing.
pub fn process_executable(pid: u32) -> io::Result<PathBuf> {
	fs::read_link(proc_dir(pid).join("exe"))
}
