//! Handing a display to X clients.
//!
//! The session manager returns a [`SessionEnvironment`] instead of touching
//! the process environment itself. Callers decide whether to inject it into
//! a child command, print it for a shell, or publish it process-wide.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;

use serde::Serialize;

use crate::display::DisplayId;

pub const DISPLAY_VAR: &str = "DISPLAY";
pub const XAUTHORITY_VAR: &str = "XAUTHORITY";

/// Where an acquired display came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionSource {
	/// A display that was already running and answered the probe.
	Existing,
	/// A display started by this call.
	Launched,
}

/// Display plus the authority file X clients need to reach it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionEnvironment {
	pub display: DisplayId,
	pub xauthority: PathBuf,
	pub source: SessionSource,
}

impl SessionEnvironment {
	/// `DISPLAY` and `XAUTHORITY` name/value pairs.
	pub fn vars(&self) -> [(&'static str, OsString); 2] {
		[
			(DISPLAY_VAR, OsString::from(self.display.as_str())),
			(XAUTHORITY_VAR, self.xauthority.clone().into_os_string()),
		]
	}

	/// Injects the variables into `command` without touching our own environment.
	pub fn apply_to<'a>(&self, command: &'a mut Command) -> &'a mut Command {
		command.envs(self.vars())
	}

	/// `export NAME='value'` lines suitable for `eval` in a POSIX shell.
	pub fn shell_exports(&self) -> String {
		self.vars()
			.iter()
			.map(|(name, value)| format!("export {name}={}\n", shell_quote(&value.to_string_lossy())))
			.collect()
	}

	/// Sets `DISPLAY` and `XAUTHORITY` in the current process.
	///
	/// # Safety
	///
	/// Mutating the environment races with any other thread reading or
	/// writing it. Only call this while no other threads are running.
	pub unsafe fn publish(&self) {
		for (name, value) in self.vars() {
			unsafe { std::env::set_var(name, value) };
		}
	}
}

fn shell_quote(value: &str) -> String {
	format!("'{}'", value.replace('\'', r"'\''"))
}
