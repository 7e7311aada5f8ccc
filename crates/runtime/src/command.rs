//! Shell-free command execution with full stdio capture.
//!
//! [`CommandRunner::execute`] runs `command[0]` with the remaining elements as
//! argv, feeds it an input buffer and collects both output streams. Writing
//! and reading are multiplexed in a single `select!` loop so a child that
//! produces output before it has consumed its input (or the other way round)
//! never deadlocks against us, whatever the data volume.
//!
//! Two termination policies are available, see [`WaitPolicy`].

use std::ffi::OsStr;
use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use futures_util::FutureExt;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::Command;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};

/// Default number of bytes requested per read from an output pipe.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 2048;

/// Default interval between direct-child exit checks under [`WaitPolicy::DirectChild`].
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

// conventional shell: 128 + signal
const EXIT_CODE_SIGNAL_BASE: i32 = 128;

/// When [`CommandRunner::execute`] considers a command finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitPolicy {
	/// Keep going until both output pipes are closed by every process holding
	/// them, including descendants the child left running.
	#[default]
	Descendants,
	/// Return shortly after the direct child exits, even if descendants still
	/// hold the output pipes. Output those descendants write later is lost.
	///
	/// Meant for launchers that double-fork a daemon and exit.
	DirectChild,
}

impl WaitPolicy {
	/// Maps the classic `wait_for_descendants` flag onto a policy.
	pub fn from_wait_for_descendants(wait: bool) -> Self {
		if wait { WaitPolicy::Descendants } else { WaitPolicy::DirectChild }
	}
}

/// Fully buffered outcome of one command execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandResult {
	/// Exit code of the direct child; `128 + signal` if it was killed by a signal.
	pub exit_status: i32,
	/// Everything read from the child's stdout, in arrival order.
	pub stdout: Vec<u8>,
	/// Everything read from the child's stderr, in arrival order.
	pub stderr: Vec<u8>,
}

impl CommandResult {
	/// Returns true if the command exited with status 0.
	pub fn success(&self) -> bool {
		self.exit_status == 0
	}

	/// Stdout decoded as UTF-8, replacing invalid sequences.
	pub fn stdout_lossy(&self) -> String {
		String::from_utf8_lossy(&self.stdout).into_owned()
	}

	/// Stderr decoded as UTF-8, replacing invalid sequences.
	pub fn stderr_lossy(&self) -> String {
		String::from_utf8_lossy(&self.stderr).into_owned()
	}
}

/// Runs external programs directly (no shell) and buffers their output.
#[derive(Debug, Clone)]
pub struct CommandRunner {
	chunk_size: usize,
	poll_interval: Duration,
}

impl Default for CommandRunner {
	fn default() -> Self {
		Self {
			chunk_size: DEFAULT_READ_CHUNK_SIZE,
			poll_interval: DEFAULT_POLL_INTERVAL,
		}
	}
}

impl CommandRunner {
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the per-read chunk size. Zero is bumped to one byte.
	pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
		self.chunk_size = chunk_size.max(1);
		self
	}

	/// Sets how often the direct child is checked under [`WaitPolicy::DirectChild`].
	/// Clamped to at least one millisecond.
	pub fn with_poll_interval(mut self, interval: Duration) -> Self {
		self.poll_interval = interval.max(Duration::from_millis(1));
		self
	}

	pub fn poll_interval(&self) -> Duration {
		self.poll_interval
	}

	/// Runs `command`, writing `input` to its stdin and collecting stdout and stderr.
	///
	/// Arguments are passed exactly as given. A nonzero exit is reported in
	/// [`CommandResult::exit_status`], never as an error.
	///
	/// # Errors
	///
	/// Returns [`Error::EmptyCommand`] if `command` is empty and
	/// [`Error::Launch`] if the program cannot be located or started.
	pub async fn execute<S: AsRef<OsStr>>(&self, command: &[S], input: &[u8], policy: WaitPolicy) -> Result<CommandResult> {
		let (program, args) = command.split_first().ok_or(Error::EmptyCommand)?;
		let program_name = program.as_ref().to_string_lossy().into_owned();

		let mut child = Command::new(program)
			.args(args)
			.stdin(Stdio::piped())
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.spawn()
			.map_err(|source| Error::Launch {
				program: program_name.clone(),
				source,
			})?;

		debug!(
			target: "vncctrl.exec",
			program = %program_name,
			pid = child.id(),
			input_len = input.len(),
			?policy,
			"spawned command"
		);

		let mut stdin = child.stdin.take().filter(|_| !input.is_empty());
		let mut stdout = child.stdout.take();
		let mut stderr = child.stderr.take();

		let mut result = CommandResult::default();
		let mut out_buf = vec![0u8; self.chunk_size];
		let mut err_buf = vec![0u8; self.chunk_size];
		let mut written = 0usize;
		let mut status: Option<ExitStatus> = None;

		let poll_child = policy == WaitPolicy::DirectChild;
		let mut ticker = tokio::time::interval(self.poll_interval);
		ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

		while status.is_none() && (stdin.is_some() || stdout.is_some() || stderr.is_some()) {
			tokio::select! {
				read = read_chunk(&mut stdout, &mut out_buf), if stdout.is_some() => {
					absorb(read, &mut stdout, &out_buf, &mut result.stdout, "stdout");
				}
				read = read_chunk(&mut stderr, &mut err_buf), if stderr.is_some() => {
					absorb(read, &mut stderr, &err_buf, &mut result.stderr, "stderr");
				}
				wrote = write_chunk(&mut stdin, &input[written..]), if stdin.is_some() => {
					match wrote {
						Ok(n) => {
							written += n;
							if written >= input.len() {
								// Dropping the handle closes the child's stdin.
								stdin = None;
							}
						}
						Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
						Err(err) => {
							debug!(
								target: "vncctrl.exec",
								error = %err,
								written,
								remaining = input.len() - written,
								"child stopped accepting input"
							);
							stdin = None;
						}
					}
				}
				_ = ticker.tick(), if poll_child => {
					if let Some(exit) = child.try_wait()? {
						trace!(target: "vncctrl.exec", ?exit, "direct child exited");
						status = Some(exit);
					}
				}
			}
		}

		if status.is_some() {
			// The child is gone but descendants may still hold the pipes. Take
			// whatever is already buffered, then stop listening.
			drop(stdin);
			tokio::task::yield_now().await;
			drain_ready(&mut stdout, &mut out_buf, &mut result.stdout, "stdout");
			drain_ready(&mut stderr, &mut err_buf, &mut result.stderr, "stderr");
		}

		let exit = match status {
			Some(exit) => exit,
			None => child.wait().await?,
		};
		result.exit_status = exit_code(exit);

		debug!(
			target: "vncctrl.exec",
			program = %program_name,
			exit_status = result.exit_status,
			stdout_len = result.stdout.len(),
			stderr_len = result.stderr.len(),
			"command finished"
		);
		Ok(result)
	}
}

/// Convenience wrapper around a default [`CommandRunner`].
pub async fn run_command<S: AsRef<OsStr>>(command: &[S], input: &[u8], policy: WaitPolicy) -> Result<CommandResult> {
	CommandRunner::default().execute(command, input, policy).await
}

async fn read_chunk<R: AsyncRead + Unpin>(reader: &mut Option<R>, buf: &mut [u8]) -> io::Result<usize> {
	match reader {
		Some(reader) => reader.read(buf).await,
		None => std::future::pending().await,
	}
}

async fn write_chunk<W: AsyncWrite + Unpin>(writer: &mut Option<W>, data: &[u8]) -> io::Result<usize> {
	match writer {
		Some(writer) => writer.write(data).await,
		None => std::future::pending().await,
	}
}

/// Appends a completed read to `sink`, closing the pipe on EOF or a hard error.
fn absorb<R>(read: io::Result<usize>, reader: &mut Option<R>, buf: &[u8], sink: &mut Vec<u8>, stream: &'static str) {
	match read {
		Ok(0) => {
			trace!(target: "vncctrl.exec", stream, "pipe closed");
			*reader = None;
		}
		Ok(n) => sink.extend_from_slice(&buf[..n]),
		Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
		Err(err) => {
			warn!(target: "vncctrl.exec", stream, error = %err, "read failed; closing pipe");
			*reader = None;
		}
	}
}

/// Reads from `reader` only while a read completes without waiting, then closes it.
fn drain_ready<R: AsyncRead + Unpin>(reader: &mut Option<R>, buf: &mut [u8], sink: &mut Vec<u8>, stream: &'static str) {
	while reader.is_some() {
		let Some(read) = read_chunk(reader, buf).now_or_never() else {
			break;
		};
		absorb(read, reader, buf, sink, stream);
	}
	*reader = None;
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
	use std::os::unix::process::ExitStatusExt;

	status
		.code()
		.or_else(|| status.signal().map(|signal| EXIT_CODE_SIGNAL_BASE + signal))
		.unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
	status.code().unwrap_or(-1)
}
