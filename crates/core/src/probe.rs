//! Bounded-time liveness check of a display.
//!
//! The check runs the probe tool (normally `xhost` with no arguments) against
//! the display and waits for it on an escalating schedule. A helper that is
//! still running when the schedule runs out is killed and reaped, so a wedged
//! server can never hang the caller.

use std::fmt;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use serde::Serialize;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::display::DisplayId;

/// What a probe found out about a display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeOutcome {
	/// The helper connected and exited zero.
	Accepted,
	/// The helper exited nonzero or could not be started.
	Refused,
	/// The helper did not finish in time and was killed.
	Unresponsive,
}

impl ProbeOutcome {
	pub fn is_reachable(self) -> bool {
		self == ProbeOutcome::Accepted
	}
}

impl fmt::Display for ProbeOutcome {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			ProbeOutcome::Accepted => "allowed connection",
			ProbeOutcome::Refused => "refused connection",
			ProbeOutcome::Unresponsive => "no response",
		})
	}
}

/// Runs `tool` with `DISPLAY`/`XAUTHORITY` pointing at `display` and waits
/// for it according to `schedule`.
///
/// Output of the helper is discarded.
pub async fn probe_display(tool: &Path, display: &DisplayId, xauthority: &Path, schedule: &[Duration]) -> ProbeOutcome {
	let target = display.local_target();
	let spawned = Command::new(tool)
		.env("DISPLAY", &target)
		.env("XAUTHORITY", xauthority)
		.stdin(Stdio::null())
		.stdout(Stdio::null())
		.stderr(Stdio::null())
		.spawn();

	let mut child = match spawned {
		Ok(child) => child,
		Err(err) => {
			// Counts as a refusal.
			debug!(target: "vncctrl.probe", tool = %tool.display(), error = %err, "could not start probe helper");
			return ProbeOutcome::Refused;
		}
	};

	for wait in schedule {
		tokio::time::sleep(*wait).await;
		match child.try_wait() {
			Ok(Some(status)) => {
				debug!(target: "vncctrl.probe", display = %target, ?status, "probe helper exited");
				return if status.success() { ProbeOutcome::Accepted } else { ProbeOutcome::Refused };
			}
			Ok(None) => {}
			Err(err) => {
				warn!(target: "vncctrl.probe", error = %err, "could not poll probe helper");
				break;
			}
		}
	}

	// SIGKILL, then wait so no zombie is left behind.
	if let Err(err) = child.kill().await {
		warn!(target: "vncctrl.probe", error = %err, "could not kill probe helper");
	}
	debug!(target: "vncctrl.probe", display = %target, "probe helper timed out");
	ProbeOutcome::Unresponsive
}
