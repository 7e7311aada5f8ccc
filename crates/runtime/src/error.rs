//! Error types for command execution.

use std::io;

use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while starting or driving a child process.
///
/// A child that runs and exits nonzero is not an error; that is reported
/// through [`CommandResult::exit_status`](crate::CommandResult::exit_status).
#[derive(Debug, Error)]
pub enum Error {
	/// The command line had no program to run.
	#[error("command args are empty")]
	EmptyCommand,

	/// The program could not be located or started.
	#[error("failed to launch `{program}`: {source}")]
	Launch {
		/// Program as given in `command[0]`.
		program: String,
		#[source]
		source: io::Error,
	},

	/// I/O error while waiting on the child.
	#[error("I/O error: {0}")]
	Io(#[from] io::Error),
}

impl Error {
	/// Returns true if the child never started.
	pub fn is_launch_error(&self) -> bool {
		matches!(self, Error::EmptyCommand | Error::Launch { .. })
	}
}
