//! Log setup for the `vncctrl` binary.
//!
//! Without `-v` only warnings and errors reach stderr, so `eval "$(vncctrl)"`
//! sees nothing but the exports. `RUST_LOG` replaces the verbosity mapping.

use tracing_subscriber::EnvFilter;

/// Filter directives for a `-v` count.
///
/// Session narration is emitted at `info` only when the config is verbose,
/// so `-v` both enables it and lets it through.
pub fn default_directives(verbosity: u8) -> &'static str {
	match verbosity {
		0 => "warn",
		1 => "warn,vncctrl=info",
		_ => "debug",
	}
}

pub fn init_logging(verbosity: u8) {
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(verbosity)));

	tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(std::io::stderr)
		.with_target(verbosity > 1)
		.without_time()
		.compact()
		.init();
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn verbosity_widens_the_filter() {
		assert_eq!(default_directives(0), "warn");
		assert_eq!(default_directives(1), "warn,vncctrl=info");
		assert_eq!(default_directives(2), "debug");
		assert_eq!(default_directives(9), "debug");
	}

	#[test]
	fn directives_parse() {
		for verbosity in 0..3 {
			EnvFilter::try_new(default_directives(verbosity)).unwrap();
		}
	}
}
