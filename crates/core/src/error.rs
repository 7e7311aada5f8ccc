//! Error types for session discovery and launch.

use std::io;

use thiserror::Error;

use crate::display::DisplayId;

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by [`SessionManager`](crate::SessionManager).
///
/// None of these are retried automatically. Stale pid files are not errors;
/// they are pruned during discovery.
#[derive(Debug, Error)]
pub enum Error {
	/// An external tool could not be located or started.
	#[error(transparent)]
	Launch(#[from] vncctrl_runtime::Error),

	/// The launcher ran but exited nonzero.
	#[error("launching vncserver failed.\nstatus {status}\nstdout: {stdout}\nstderr: {stderr}")]
	LaunchFailure { status: i32, stdout: String, stderr: String },

	/// The launcher succeeded but never announced which display it started.
	#[error("apparently launched vncserver but could not determine display name")]
	AnnouncementMissing { stderr: String },

	/// A freshly launched display failed its own liveness probe.
	#[error("display just started on {display} is not responding")]
	StartupUnresponsive { display: DisplayId },

	/// The operation is deliberately unsupported.
	#[error("{0} is not implemented")]
	NotImplemented(&'static str),

	/// The hostname tool failed or printed nothing.
	#[error("could not determine hostname: {0}")]
	Hostname(String),

	/// The password tool failed to produce a credential file.
	#[error("vncpasswd failed with status {status}: {stderr}")]
	PasswordTool { status: i32, stderr: String },

	#[error("invalid pid file pattern: {0}")]
	Pattern(#[from] glob::PatternError),

	#[error("I/O error: {0}")]
	Io(#[from] io::Error),
}

impl Error {
	/// Returns true if an external tool never started.
	pub fn is_launch_error(&self) -> bool {
		matches!(self, Error::Launch(err) if err.is_launch_error())
	}
}
