//! Subcommand handlers.

use std::process::ExitCode;

use anyhow::Context;
use tracing::debug;
use vncctrl::{DisplayId, SessionManager};

use crate::cli::{Cli, Commands};
use crate::output::{self, DisplayList, InvalidDisplay, OutputFormat, ProbeReport, StartReport};

impl Commands {
	pub fn name(&self) -> &'static str {
		match self {
			Commands::Init(_) => "init",
			Commands::List => "list",
			Commands::Probe { .. } => "probe",
			Commands::Start(_) => "start",
			Commands::Kill { .. } => "kill",
		}
	}
}

/// Runs the selected subcommand and prints its result.
///
/// Returns a failing exit code, without an error, when `probe` finds the
/// display unreachable.
pub async fn dispatch(cli: &Cli, command: Commands, format: OutputFormat) -> anyhow::Result<ExitCode> {
	let extra_args: &[String] = match &command {
		Commands::Init(args) | Commands::Start(args) => args.extra_args.as_slice(),
		_ => &[],
	};
	let config = cli.session_config(extra_args);
	debug!(target: "vncctrl.cli", user_dir = %config.user_dir().display(), command = command.name(), "dispatching");
	let manager = SessionManager::new(config);

	match command {
		Commands::Init(_) => {
			let env = manager.init_display().await.context("could not get a display")?;
			output::print_success("init", env, format);
		}
		Commands::List => {
			let displays = manager.list_displays().await?;
			output::print_success("list", DisplayList { displays }, format);
		}
		Commands::Probe { display } => {
			let display = parse_display(&display)?;
			let outcome = manager.probe(&display).await;
			let reachable = outcome.is_reachable();
			output::print_success(
				"probe",
				ProbeReport {
					display,
					outcome,
					reachable,
				},
				format,
			);
			if !reachable {
				return Ok(ExitCode::FAILURE);
			}
		}
		Commands::Start(_) => {
			let display = manager.start_server().await?;
			output::print_success("start", StartReport { display }, format);
		}
		Commands::Kill { display } => {
			let display = parse_display(&display)?;
			manager.kill_server(&display).await?;
		}
	}
	Ok(ExitCode::SUCCESS)
}

fn parse_display(raw: &str) -> anyhow::Result<DisplayId> {
	DisplayId::parse(raw).ok_or_else(|| InvalidDisplay(raw.to_string()).into())
}
