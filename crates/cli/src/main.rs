use std::process::ExitCode;

use clap::Parser;
use vncctrl_cli::cli::Cli;
use vncctrl_cli::output::{self, CommandError};
use vncctrl_cli::{commands, logging};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let format = cli.format;
	let command = cli.command();
	let name = command.name();

	match commands::dispatch(&cli, command, format).await {
		Ok(code) => code,
		Err(err) => {
			output::print_failure(name, CommandError::from_anyhow(&err), format);
			ExitCode::FAILURE
		}
	}
}
