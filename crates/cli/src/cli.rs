use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use vncctrl::SessionConfig;

use crate::output::OutputFormat;

/// Root CLI for vncctrl.
#[derive(Parser, Debug)]
#[command(name = "vncctrl")]
#[command(about = "Find, health-check, or launch a per-user VNC display")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v narrates each step, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Directory holding pid files, passwd and Xauthority [default: $VNCCTRL_USER_DIR or ~/.vncctrl]
	#[arg(long, global = true, value_name = "DIR")]
	pub user_dir: Option<PathBuf>,

	/// Ask for a VNC password instead of generating a random one
	#[arg(long, global = true)]
	pub prompt_password: bool,

	/// Output format
	#[arg(short = 'f', long, global = true, value_enum, default_value = "text")]
	pub format: OutputFormat,

	/// Defaults to `init`
	#[command(subcommand)]
	pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
	/// Reuse a responsive display or launch one, and print its environment.
	Init(LaunchArgs),
	/// List displays whose pid file names a live server.
	List,
	/// Check whether a display accepts connections.
	Probe {
		#[arg(value_name = "DISPLAY")]
		display: String,
	},
	/// Launch a new display unconditionally.
	Start(LaunchArgs),
	/// Stop a display (not supported).
	Kill {
		#[arg(value_name = "DISPLAY")]
		display: String,
	},
}

#[derive(Args, Debug, Clone, Default)]
pub struct LaunchArgs {
	/// Extra arguments passed through to vncserver, after `--`.
	#[arg(last = true, value_name = "EXTRA_ARGS")]
	pub extra_args: Vec<String>,
}

impl Cli {
	/// The subcommand to run, `init` if none was given.
	pub fn command(&self) -> Commands {
		self.command.clone().unwrap_or(Commands::Init(LaunchArgs::default()))
	}

	/// Environment-derived configuration with the command-line flags applied.
	pub fn session_config(&self, extra_args: &[String]) -> SessionConfig {
		let mut config = SessionConfig::from_env()
			.with_verbose(self.verbose > 0)
			.with_prompt_password(self.prompt_password)
			.with_extra_args(extra_args.iter().cloned());
		if let Some(dir) = &self.user_dir {
			config = config.with_user_dir(dir);
		}
		config
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn no_subcommand_means_init() {
		let cli = Cli::try_parse_from(["vncctrl"]).unwrap();
		assert!(matches!(cli.command(), Commands::Init(args) if args.extra_args.is_empty()));
		assert_eq!(cli.format, OutputFormat::Text);
	}

	#[test]
	fn extra_args_follow_double_dash() {
		let cli = Cli::try_parse_from(["vncctrl", "init", "--", "-geometry", "800x800"]).unwrap();
		let Commands::Init(args) = cli.command() else {
			panic!("expected init");
		};
		assert_eq!(args.extra_args, ["-geometry", "800x800"]);
	}

	#[test]
	fn global_flags_apply_to_config() {
		let cli =
			Cli::try_parse_from(["vncctrl", "-vv", "--user-dir", "/tmp/vnc", "--prompt-password", "list"]).unwrap();
		assert_eq!(cli.verbose, 2);
		let config = cli.session_config(&["-depth".to_string(), "24".to_string()]);
		assert!(config.verbose());
		assert!(config.prompt_password());
		assert_eq!(config.user_dir(), std::path::Path::new("/tmp/vnc"));
		assert_eq!(config.extra_args(), ["-depth", "24"]);
	}

	#[test]
	fn probe_requires_a_display() {
		assert!(Cli::try_parse_from(["vncctrl", "probe"]).is_err());
		let cli = Cli::try_parse_from(["vncctrl", "--format", "json", "probe", "host:3"]).unwrap();
		assert!(matches!(cli.command(), Commands::Probe { display } if display == "host:3"));
		assert_eq!(cli.format, OutputFormat::Json);
	}
}
