//! Parsing of the launcher's startup announcement.
//!
//! On success vncserver writes a line such as
//! `New 'myhost:3 (alice)' desktop is myhost:3` to stderr. The text after
//! `desktop is` up to the next whitespace names the display. Do not loosen
//! this pattern without checking the launcher's actual output.

use std::sync::LazyLock;

use regex::Regex;

use crate::display::DisplayId;

static DESKTOP_ANNOUNCEMENT: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"desktop is ([^\s]+)").expect("announcement pattern is valid"));

/// First display announced in `stderr`, if any.
pub fn parse_announcement(stderr: &str) -> Option<DisplayId> {
	let captures = DESKTOP_ANNOUNCEMENT.captures(stderr)?;
	DisplayId::parse(captures.get(1)?.as_str())
}
