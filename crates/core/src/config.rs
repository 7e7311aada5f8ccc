//! Session manager configuration.
//!
//! The external tools are a fixed contract (Xvnc, xhost, vncpasswd, the
//! vncserver wrapper and hostname). Their locations default to the usual
//! system paths and can be overridden through `VNCCTRL_*` environment
//! variables, mainly so tests and unusual installs can substitute them.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use vncctrl_runtime::command::DEFAULT_POLL_INTERVAL;

/// Overrides the default user directory.
pub const USER_DIR_ENV: &str = "VNCCTRL_USER_DIR";

/// Directory under `$HOME` used when no user directory is given. This
/// deliberately differs from the one the stock vncserver script uses.
pub const DEFAULT_USER_DIR_NAME: &str = ".vncctrl";

/// Waits between liveness checks of a probe helper; roughly one second in total.
pub const DEFAULT_PROBE_SCHEDULE: [Duration; 4] = [
	Duration::from_millis(10),
	Duration::from_millis(50),
	Duration::from_millis(100),
	Duration::from_millis(900),
];

const PASSWD_FILE_NAME: &str = "passwd";
const XAUTHORITY_FILE_NAME: &str = "Xauthority";

/// Locations of the external executables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
	/// X server image a live display's pid must be executing.
	pub server: PathBuf,
	/// Connectivity check; exits zero iff `$DISPLAY` accepts a connection.
	pub probe: PathBuf,
	/// Password tool (`-f` filter mode, or interactive with a file argument).
	pub passwd: PathBuf,
	/// Interpreter for the launcher script, if it must not be executed directly.
	pub launcher_interpreter: Option<PathBuf>,
	/// Session launcher announcing `desktop is <display>` on stderr.
	pub launcher: PathBuf,
	/// Prints the host name used in pid file names.
	pub hostname: PathBuf,
}

impl Default for ToolPaths {
	fn default() -> Self {
		Self {
			server: PathBuf::from("/usr/bin/Xvnc"),
			probe: PathBuf::from("/usr/bin/xhost"),
			passwd: PathBuf::from("/usr/bin/vncpasswd"),
			// The launcher may ship without its executable bit.
			launcher_interpreter: Some(PathBuf::from("/usr/bin/perl")),
			launcher: PathBuf::from("/usr/bin/vncserver"),
			hostname: PathBuf::from("/bin/hostname"),
		}
	}
}

impl ToolPaths {
	/// Defaults overridden by `VNCCTRL_XVNC`, `VNCCTRL_XHOST`, `VNCCTRL_VNCPASSWD`,
	/// `VNCCTRL_PERL`, `VNCCTRL_VNCSERVER` and `VNCCTRL_HOSTNAME`.
	///
	/// An empty `VNCCTRL_PERL` runs the launcher directly.
	pub fn from_env() -> Self {
		let mut tools = Self::default();
		if let Some(path) = env_path("VNCCTRL_XVNC") {
			tools.server = path;
		}
		if let Some(path) = env_path("VNCCTRL_XHOST") {
			tools.probe = path;
		}
		if let Some(path) = env_path("VNCCTRL_VNCPASSWD") {
			tools.passwd = path;
		}
		if let Some(value) = env::var_os("VNCCTRL_PERL") {
			tools.launcher_interpreter = if value.is_empty() { None } else { Some(PathBuf::from(value)) };
		}
		if let Some(path) = env_path("VNCCTRL_VNCSERVER") {
			tools.launcher = path;
		}
		if let Some(path) = env_path("VNCCTRL_HOSTNAME") {
			tools.hostname = path;
		}
		tools
	}
}

fn env_path(name: &str) -> Option<PathBuf> {
	env::var_os(name).filter(|value| !value.is_empty()).map(PathBuf::from)
}

/// `$HOME/.vncctrl`, if a home directory can be determined.
pub fn default_user_dir() -> Option<PathBuf> {
	dirs::home_dir().map(|home| home.join(DEFAULT_USER_DIR_NAME))
}

/// Immutable settings for one [`SessionManager`](crate::SessionManager).
#[derive(Debug, Clone)]
pub struct SessionConfig {
	user_dir: PathBuf,
	verbose: bool,
	prompt_password: bool,
	extra_args: Vec<String>,
	tools: ToolPaths,
	probe_schedule: Vec<Duration>,
	poll_interval: Duration,
}

impl SessionConfig {
	/// Configuration rooted at `user_dir` with default tools.
	pub fn new(user_dir: impl Into<PathBuf>) -> Self {
		Self {
			user_dir: user_dir.into(),
			verbose: false,
			prompt_password: false,
			extra_args: Vec::new(),
			tools: ToolPaths::default(),
			probe_schedule: DEFAULT_PROBE_SCHEDULE.to_vec(),
			poll_interval: DEFAULT_POLL_INTERVAL,
		}
	}

	/// Configuration from `VNCCTRL_USER_DIR` (or `$HOME/.vncctrl`) and
	/// [`ToolPaths::from_env`]. Falls back to `./.vncctrl` without a home directory.
	pub fn from_env() -> Self {
		let user_dir = env_path(USER_DIR_ENV)
			.or_else(default_user_dir)
			.unwrap_or_else(|| PathBuf::from(DEFAULT_USER_DIR_NAME));
		Self::new(user_dir).with_tools(ToolPaths::from_env())
	}

	pub fn with_user_dir(mut self, user_dir: impl Into<PathBuf>) -> Self {
		self.user_dir = user_dir.into();
		self
	}

	/// Narrate every step at `info` level instead of `debug`.
	pub fn with_verbose(mut self, verbose: bool) -> Self {
		self.verbose = verbose;
		self
	}

	/// Ask for a password interactively when the credential file is missing,
	/// instead of generating a random one (which locks out viewers).
	pub fn with_prompt_password(mut self, prompt: bool) -> Self {
		self.prompt_password = prompt;
		self
	}

	/// Extra launcher arguments. They do not stop an existing display started
	/// with different arguments from being reused.
	pub fn with_extra_args<I, S>(mut self, args: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.extra_args = args.into_iter().map(Into::into).collect();
		self
	}

	pub fn with_tools(mut self, tools: ToolPaths) -> Self {
		self.tools = tools;
		self
	}

	/// Waits between probe helper checks. Should be increasing.
	pub fn with_probe_schedule(mut self, schedule: impl Into<Vec<Duration>>) -> Self {
		self.probe_schedule = schedule.into();
		self
	}

	/// How often the launcher is checked for exit.
	pub fn with_poll_interval(mut self, interval: Duration) -> Self {
		self.poll_interval = interval;
		self
	}

	pub fn user_dir(&self) -> &Path {
		&self.user_dir
	}

	pub fn verbose(&self) -> bool {
		self.verbose
	}

	pub fn prompt_password(&self) -> bool {
		self.prompt_password
	}

	pub fn extra_args(&self) -> &[String] {
		&self.extra_args
	}

	pub fn tools(&self) -> &ToolPaths {
		&self.tools
	}

	pub fn probe_schedule(&self) -> &[Duration] {
		&self.probe_schedule
	}

	pub fn poll_interval(&self) -> Duration {
		self.poll_interval
	}

	/// Credential file handed to the server.
	pub fn passwd_file(&self) -> PathBuf {
		self.user_dir.join(PASSWD_FILE_NAME)
	}

	/// X authority file handed to clients.
	pub fn xauthority(&self) -> PathBuf {
		self.user_dir.join(XAUTHORITY_FILE_NAME)
	}
}
