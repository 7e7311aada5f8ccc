//! Find a working display for the invoking user, or start one.
//!
//! Acquisition walks these phases:
//!
//! ```text
//! Discovering -> Probing -> Found -------------------------> Acquired
//!                        \-> Launching -> Probing (new one) -> Acquired | Failed
//! ```
//!
//! Pid files are the only record of earlier sessions. Every discovery pass
//! validates them against the process table and removes the stale ones.
//!
//! There is no locking around the user directory. Two managers racing on the
//! same directory may both launch a server; that is accepted.

use std::ffi::OsString;
use std::fmt;
use std::path::Path;

use tracing::{debug, info};
use vncctrl_runtime::process::{current_uid, pid_is_alive, process_executable, process_owner};
use vncctrl_runtime::{CommandRunner, WaitPolicy};

use crate::announce::parse_announcement;
use crate::config::SessionConfig;
use crate::display::DisplayId;
use crate::environment::{SessionEnvironment, SessionSource};
use crate::error::{Error, Result};
use crate::password::ensure_password_file;
use crate::pid_record::PidRecord;
use crate::probe::{ProbeOutcome, probe_display};

/// Progress narration: `info` when the config is verbose, `debug` otherwise.
macro_rules! narrate {
	($manager:expr, $($arg:tt)+) => {
		if $manager.config.verbose() {
			info!(target: "vncctrl.session", $($arg)+);
		} else {
			debug!(target: "vncctrl.session", $($arg)+);
		}
	};
}

/// Phases of [`SessionManager::acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
	Discovering,
	Probing,
	Found,
	Launching,
	Acquired,
	Failed,
}

impl fmt::Display for SessionPhase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			SessionPhase::Discovering => "discovering",
			SessionPhase::Probing => "probing",
			SessionPhase::Found => "found",
			SessionPhase::Launching => "launching",
			SessionPhase::Acquired => "acquired",
			SessionPhase::Failed => "failed",
		})
	}
}

/// Discovers, health-checks and launches per-user VNC displays.
#[derive(Debug)]
pub struct SessionManager {
	config: SessionConfig,
	runner: CommandRunner,
}

impl SessionManager {
	pub fn new(config: SessionConfig) -> Self {
		let runner = CommandRunner::new().with_poll_interval(config.poll_interval());
		Self { config, runner }
	}

	pub fn config(&self) -> &SessionConfig {
		&self.config
	}

	fn enter(&self, phase: SessionPhase) {
		narrate!(self, %phase, "session phase");
	}

	/// Returns a responsive display together with the authority file for it.
	pub async fn init_display(&self) -> Result<SessionEnvironment> {
		let (display, source) = self.acquire_with_source().await?;
		let env = SessionEnvironment {
			display,
			xauthority: self.config.xauthority(),
			source,
		};
		narrate!(self, display = %env.display, xauthority = %env.xauthority.display(), "display ready");
		Ok(env)
	}

	/// Returns the first existing display that answers a probe, or launches a new one.
	///
	/// When several existing displays respond, which one wins depends on
	/// discovery order and is not otherwise defined.
	pub async fn acquire(&self) -> Result<DisplayId> {
		self.acquire_with_source().await.map(|(display, _)| display)
	}

	async fn acquire_with_source(&self) -> Result<(DisplayId, SessionSource)> {
		let acquired = self.find_or_launch().await;
		match &acquired {
			Ok(_) => self.enter(SessionPhase::Acquired),
			Err(_) => self.enter(SessionPhase::Failed),
		}
		acquired
	}

	async fn find_or_launch(&self) -> Result<(DisplayId, SessionSource)> {
		for candidate in self.list_displays().await? {
			if self.probe(&candidate).await.is_reachable() {
				self.enter(SessionPhase::Found);
				narrate!(self, display = %candidate, "got an existing working display");
				return Ok((candidate, SessionSource::Existing));
			}
		}
		narrate!(self, "no existing working display found");

		let launched = self.start_server().await?;
		Ok((launched, SessionSource::Launched))
	}

	/// Displays that *may* have a live server: their pid file names a process
	/// that exists, belongs to us and runs the server image.
	///
	/// Pid files failing that check are deleted. Nothing is probed here.
	pub async fn list_displays(&self) -> Result<Vec<DisplayId>> {
		self.enter(SessionPhase::Discovering);
		let hostname = self.hostname().await?;
		let records = PidRecord::scan(self.config.user_dir(), &hostname)?;

		let mut displays = Vec::new();
		for record in records {
			let display = record.display();
			let live = record.pid().is_some_and(|pid| self.pid_is_my_server(pid));
			match display {
				Some(display) if live => displays.push(display),
				_ => {
					debug!(
						target: "vncctrl.session",
						path = %record.path().display(),
						pid = record.pid(),
						"removing stale pid file"
					);
					record.discard()?;
				}
			}
		}

		narrate!(self, count = displays.len(), ?displays, "existing displays");
		Ok(displays)
	}

	/// Checks whether `target` accepts a connection within the probe schedule.
	pub async fn probe(&self, target: &DisplayId) -> ProbeOutcome {
		self.enter(SessionPhase::Probing);
		narrate!(self, display = %target, "testing display");
		let outcome = probe_display(
			&self.config.tools().probe,
			target,
			&self.config.xauthority(),
			self.config.probe_schedule(),
		)
		.await;
		narrate!(self, display = %target, %outcome, "probe finished");
		outcome
	}

	/// Starts a new server unconditionally and returns its display once it responds.
	///
	/// # Errors
	///
	/// [`Error::LaunchFailure`] if the launcher exits nonzero,
	/// [`Error::AnnouncementMissing`] if it does not name the display, and
	/// [`Error::StartupUnresponsive`] if the new display fails its probe.
	pub async fn start_server(&self) -> Result<DisplayId> {
		self.enter(SessionPhase::Launching);
		ensure_password_file(&self.config, &self.runner).await?;

		let command = self.launch_command();
		debug!(target: "vncctrl.session", ?command, "launching vncserver");
		// vncserver daemonizes Xvnc, which keeps our pipes open; only wait for the wrapper.
		let result = self.runner.execute(&command, b"", WaitPolicy::DirectChild).await?;

		if !result.success() {
			return Err(Error::LaunchFailure {
				status: result.exit_status,
				stdout: result.stdout_lossy(),
				stderr: result.stderr_lossy(),
			});
		}

		let stderr = result.stderr_lossy();
		let announced = parse_announcement(&stderr).ok_or(Error::AnnouncementMissing { stderr })?;
		narrate!(self, display = %announced, "started server");

		if self.probe(&announced).await.is_reachable() {
			Ok(announced)
		} else {
			Err(Error::StartupUnresponsive { display: announced })
		}
	}

	/// Stopping a display is not supported.
	pub async fn kill_server(&self, _display: &DisplayId) -> Result<()> {
		Err(Error::NotImplemented("kill_server"))
	}

	/// Host name as used in pid file names.
	pub async fn hostname(&self) -> Result<String> {
		let result = self
			.runner
			.execute(&[self.config.tools().hostname.as_os_str()], b"", WaitPolicy::Descendants)
			.await?;
		if !result.success() {
			return Err(Error::Hostname(format!(
				"{} exited with status {}: {}",
				self.config.tools().hostname.display(),
				result.exit_status,
				result.stderr_lossy().trim()
			)));
		}
		let hostname = result.stdout_lossy().replace('\n', "");
		if hostname.is_empty() {
			return Err(Error::Hostname("hostname tool printed nothing".to_string()));
		}
		Ok(hostname)
	}

	fn launch_command(&self) -> Vec<OsString> {
		let tools = self.config.tools();
		let mut command: Vec<OsString> = Vec::new();
		if let Some(interpreter) = &tools.launcher_interpreter {
			command.push(interpreter.clone().into_os_string());
		}
		command.push(tools.launcher.clone().into_os_string());
		command.push("-localhost".into());
		command.push("-userdir".into());
		command.push(self.config.user_dir().as_os_str().to_owned());
		command.push("-xauthority".into());
		command.push(self.config.xauthority().into_os_string());
		command.push("-socat".into());
		command.extend(self.config.extra_args().iter().map(OsString::from));
		command
	}

	/// True if `pid` is alive, owned by us and executing the server image.
	fn pid_is_my_server(&self, pid: u32) -> bool {
		self.pid_is_server_of(pid, current_uid())
	}

	fn pid_is_server_of(&self, pid: u32, uid: u32) -> bool {
		if !pid_is_alive(pid) {
			return false;
		}
		match process_owner(pid) {
			Ok(owner) if owner == uid => {}
			_ => return false,
		}
		match process_executable(pid) {
			Ok(exe) => is_same_image(&exe, &self.config.tools().server),
			Err(_) => false,
		}
	}
}

/// `/proc/<pid>/exe` is fully resolved; the configured path may not be.
fn is_same_image(exe: &Path, expected: &Path) -> bool {
	exe == expected || expected.canonicalize().is_ok_and(|resolved| resolved == exe)
}
