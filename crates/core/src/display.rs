//! Display identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Host-scoped X display name such as `myhost:3` or `myhost:3.0`.
///
/// Taken either from a pid file name or from the launcher's announcement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplayId(String);

impl DisplayId {
	/// Parses `<host>:<display>[.<screen>]`. The host may be empty; the part
	/// after the colon may not.
	pub fn parse(raw: &str) -> Option<Self> {
		let (_, display) = raw.split_once(':')?;
		if display.is_empty() {
			return None;
		}
		Some(Self(raw.to_string()))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn host(&self) -> &str {
		self.0.split_once(':').map_or("", |(host, _)| host)
	}

	/// Everything after the first colon, e.g. `3.0`.
	pub fn display_part(&self) -> &str {
		self.0.split_once(':').map_or(self.0.as_str(), |(_, display)| display)
	}

	/// Display number, if the display part starts with decimal digits.
	pub fn number(&self) -> Option<u32> {
		let part = self.display_part();
		let end = part.find(|c: char| !c.is_ascii_digit()).unwrap_or(part.len());
		part[..end].parse().ok()
	}

	/// Host-less form (`:3`) for connecting locally. Many servers only
	/// accept local connections under this name.
	pub fn local_target(&self) -> String {
		format!(":{}", self.display_part())
	}
}

impl fmt::Display for DisplayId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_host_qualified_display() {
		let display = DisplayId::parse("buildbox:7").unwrap();
		assert_eq!(display.host(), "buildbox");
		assert_eq!(display.display_part(), "7");
		assert_eq!(display.number(), Some(7));
		assert_eq!(display.local_target(), ":7");
		assert_eq!(display.to_string(), "buildbox:7");
	}

	#[test]
	fn screen_suffix_is_kept_but_not_part_of_the_number() {
		let display = DisplayId::parse("buildbox:12.0").unwrap();
		assert_eq!(display.number(), Some(12));
		assert_eq!(display.local_target(), ":12.0");
	}

	#[test]
	fn host_may_be_empty() {
		let display = DisplayId::parse(":1").unwrap();
		assert_eq!(display.host(), "");
		assert_eq!(display.local_target(), ":1");
	}

	#[test]
	fn rejects_names_without_display_part() {
		assert!(DisplayId::parse("buildbox").is_none());
		assert!(DisplayId::parse("buildbox:").is_none());
	}

	#[test]
	fn serializes_as_plain_string() {
		let display = DisplayId::parse("h:2").unwrap();
		assert_eq!(serde_json::to_string(&display).unwrap(), "\"h:2\"");
	}
}
