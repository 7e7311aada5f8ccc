//! Structured output for CLI commands.
//!
//! Text output is meant for people and for `eval`. JSON output wraps every
//! result in an envelope:
//!
//! ```json
//! { "ok": true, "command": "init", "data": { "display": "host:1", ... } }
//! { "ok": false, "command": "init", "error": { "code": "LAUNCH_FAILURE", "message": "..." } }
//! ```

use std::fmt;
use std::io::{self, Write};

use serde::Serialize;
use vncctrl::{DisplayId, ProbeOutcome, SessionEnvironment};

/// Output format for CLI results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text; `init` prints shell exports
	#[default]
	Text,
	/// JSON envelope
	Json,
}

impl fmt::Display for OutputFormat {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			OutputFormat::Text => write!(f, "text"),
			OutputFormat::Json => write!(f, "json"),
		}
	}
}

/// The result envelope for JSON output.
#[derive(Debug, Serialize)]
pub struct CommandResult<T: Serialize> {
	pub ok: bool,
	pub command: &'static str,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<CommandError>,
}

impl<T: Serialize> CommandResult<T> {
	pub fn success(command: &'static str, data: T) -> Self {
		Self {
			ok: true,
			command,
			data: Some(data),
			error: None,
		}
	}
}

impl CommandResult<()> {
	pub fn failure(command: &'static str, error: CommandError) -> Self {
		Self {
			ok: false,
			command,
			data: None,
			error: Some(error),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	LaunchError,
	LaunchFailure,
	AnnouncementMissing,
	StartupUnresponsive,
	NotImplemented,
	HostnameFailed,
	PasswordFailed,
	InvalidInput,
	IoError,
	InternalError,
}

impl fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let json = serde_json::to_value(self).map_err(|_| fmt::Error)?;
		f.write_str(json.as_str().unwrap_or("INTERNAL_ERROR"))
	}
}

#[derive(Debug, Clone, Serialize)]
pub struct CommandError {
	pub code: ErrorCode,
	pub message: String,
}

impl CommandError {
	/// Classifies an error from a command, looking through anyhow context.
	pub fn from_anyhow(err: &anyhow::Error) -> Self {
		let code = match err.downcast_ref::<vncctrl::Error>() {
			Some(err) if err.is_launch_error() => ErrorCode::LaunchError,
			Some(vncctrl::Error::LaunchFailure { .. }) => ErrorCode::LaunchFailure,
			Some(vncctrl::Error::AnnouncementMissing { .. }) => ErrorCode::AnnouncementMissing,
			Some(vncctrl::Error::StartupUnresponsive { .. }) => ErrorCode::StartupUnresponsive,
			Some(vncctrl::Error::NotImplemented(_)) => ErrorCode::NotImplemented,
			Some(vncctrl::Error::Hostname(_)) => ErrorCode::HostnameFailed,
			Some(vncctrl::Error::PasswordTool { .. }) => ErrorCode::PasswordFailed,
			Some(vncctrl::Error::Io(_)) => ErrorCode::IoError,
			Some(_) => ErrorCode::InternalError,
			None if err.downcast_ref::<InvalidDisplay>().is_some() => ErrorCode::InvalidInput,
			None => ErrorCode::InternalError,
		};
		Self {
			code,
			message: format!("{err:#}"),
		}
	}
}

/// A display argument that is not of the form `host:display`.
#[derive(Debug)]
pub struct InvalidDisplay(pub String);

impl fmt::Display for InvalidDisplay {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "invalid display name {:?}, expected <host>:<display>", self.0)
	}
}

impl std::error::Error for InvalidDisplay {}

/// Text rendering of a command's data.
pub trait TextOutput {
	fn render_text(&self) -> String;
}

impl TextOutput for SessionEnvironment {
	fn render_text(&self) -> String {
		self.shell_exports()
	}
}

#[derive(Debug, Serialize)]
pub struct DisplayList {
	pub displays: Vec<DisplayId>,
}

impl TextOutput for DisplayList {
	fn render_text(&self) -> String {
		self.displays.iter().map(|display| format!("{display}\n")).collect()
	}
}

#[derive(Debug, Serialize)]
pub struct ProbeReport {
	pub display: DisplayId,
	pub outcome: ProbeOutcome,
	pub reachable: bool,
}

impl TextOutput for ProbeReport {
	fn render_text(&self) -> String {
		format!("{}: {}\n", self.display, self.outcome)
	}
}

#[derive(Debug, Serialize)]
pub struct StartReport {
	pub display: DisplayId,
}

impl TextOutput for StartReport {
	fn render_text(&self) -> String {
		format!("{}\n", self.display)
	}
}

/// Prints a successful result to stdout.
pub fn print_success<T: Serialize + TextOutput>(command: &'static str, data: T, format: OutputFormat) {
	let mut stdout = io::stdout().lock();
	match format {
		OutputFormat::Text => {
			let _ = stdout.write_all(data.render_text().as_bytes());
		}
		OutputFormat::Json => {
			if let Ok(json) = serde_json::to_string_pretty(&CommandResult::success(command, data)) {
				let _ = writeln!(stdout, "{json}");
			}
		}
	}
}

/// Prints a failure: always to stderr, and as an envelope on stdout for JSON.
pub fn print_failure(command: &'static str, error: CommandError, format: OutputFormat) {
	eprintln!("Error [{}]: {}", error.code, error.message);
	if format == OutputFormat::Json {
		if let Ok(json) = serde_json::to_string_pretty(&CommandResult::failure(command, error)) {
			println!("{json}");
		}
	}
}

#[cfg(test)]
mod tests {
	use std::path::PathBuf;

	use serde_json::json;
	use vncctrl::SessionSource;

	use super::*;

	#[test]
	fn success_envelope_omits_error() {
		let data = StartReport {
			display: DisplayId::parse("h:3").unwrap(),
		};
		let value = serde_json::to_value(CommandResult::success("start", data)).unwrap();
		assert_eq!(value, json!({ "ok": true, "command": "start", "data": { "display": "h:3" } }));
	}

	#[test]
	fn not_implemented_is_classified() {
		let err = anyhow::Error::new(vncctrl::Error::NotImplemented("kill_server"));
		let error = CommandError::from_anyhow(&err);
		assert_eq!(error.code, ErrorCode::NotImplemented);
		assert_eq!(error.code.to_string(), "NOT_IMPLEMENTED");
		assert_eq!(error.message, "kill_server is not implemented");
	}

	#[test]
	fn invalid_display_is_invalid_input() {
		let err = anyhow::Error::new(InvalidDisplay("nocolon".into()));
		assert_eq!(CommandError::from_anyhow(&err).code, ErrorCode::InvalidInput);
	}

	#[test]
	fn text_renderings() {
		let env = SessionEnvironment {
			display: DisplayId::parse("h:1").unwrap(),
			xauthority: PathBuf::from("/x/Xauthority"),
			source: SessionSource::Existing,
		};
		assert_eq!(env.render_text(), "export DISPLAY='h:1'\nexport XAUTHORITY='/x/Xauthority'\n");

		let report = ProbeReport {
			display: DisplayId::parse("h:1").unwrap(),
			outcome: ProbeOutcome::Unresponsive,
			reachable: false,
		};
		assert_eq!(report.render_text(), "h:1: no response\n");

		let list = DisplayList {
			displays: vec![DisplayId::parse("h:1").unwrap(), DisplayId::parse("h:2").unwrap()],
		};
		assert_eq!(list.render_text(), "h:1\nh:2\n");
	}
}
