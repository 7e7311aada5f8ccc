//! Pid files left behind by running X servers.
//!
//! The server writes `<user_dir>/<hostname>:<display>.pid` holding its pid on
//! the first line. We never create these, only read them and remove the ones
//! that no longer describe a live server.

use std::cell::OnceCell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::display::DisplayId;
use crate::error::Result;

static PID_FILE_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(.*)\.pid$").expect("pid file pattern is valid"));

/// One `<display>.pid` marker file.
#[derive(Debug)]
pub struct PidRecord {
	path: PathBuf,
	cached_pid: OnceCell<Option<u32>>,
}

impl PidRecord {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			cached_pid: OnceCell::new(),
		}
	}

	/// Lists `<user_dir>/<hostname>:*.pid`, in file-name order.
	pub fn scan(user_dir: &Path, hostname: &str) -> Result<Vec<Self>> {
		let dir = glob::Pattern::escape(&user_dir.to_string_lossy());
		let host = glob::Pattern::escape(hostname);
		let pattern = format!("{dir}/{host}:*.pid");

		let mut records = Vec::new();
		for entry in glob::glob(&pattern)? {
			match entry {
				Ok(path) => records.push(Self::new(path)),
				Err(err) => debug!(target: "vncctrl.session", error = %err, "skipping unreadable pid file"),
			}
		}
		Ok(records)
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Pid from the first line, or `None` if the file is unreadable or garbled.
	///
	/// The file is read once per record.
	pub fn pid(&self) -> Option<u32> {
		*self.cached_pid.get_or_init(|| {
			let content = fs::read_to_string(&self.path).ok()?;
			content.lines().next()?.trim().parse().ok()
		})
	}

	/// Display named by the file: the file name minus its `.pid` suffix.
	pub fn display(&self) -> Option<DisplayId> {
		let name = self.path.file_name()?.to_str()?;
		let captures = PID_FILE_NAME.captures(name)?;
		DisplayId::parse(captures.get(1)?.as_str())
	}

	/// Removes the file. A file that is already gone is not an error.
	pub fn discard(&self) -> Result<()> {
		match fs::remove_file(&self.path) {
			Ok(()) => Ok(()),
			Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
			Err(err) => Err(err.into()),
		}
	}
}
