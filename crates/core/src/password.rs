//! The per-user VNC credential file.
//!
//! The vncserver wrapper prompts for a password when `passwd` is missing,
//! which is useless while we capture its output, so the file is created up
//! front. Once it exists it is never regenerated.

use std::ffi::OsStr;
use std::fs::{self, DirBuilder, OpenOptions};
use std::io::Write;
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt, PermissionsExt};
use std::path::Path;

use rand::Rng;
use tokio::process::Command;
use tracing::debug;
use vncctrl_runtime::{CommandRunner, WaitPolicy};

use crate::config::SessionConfig;
use crate::error::{Error, Result};

const RANDOM_PASSWORD_LEN: usize = 8;

/// Makes sure `config.passwd_file()` exists, creating the user directory if needed.
///
/// With `prompt_password` the password tool is run interactively until it
/// succeeds. Otherwise a random password is generated, which keeps viewers
/// out but lets X clients on this host use the display.
pub(crate) async fn ensure_password_file(config: &SessionConfig, runner: &CommandRunner) -> Result<()> {
	let passwd_file = config.passwd_file();
	if passwd_file.exists() {
		return Ok(());
	}

	if !config.user_dir().exists() {
		DirBuilder::new().recursive(true).mode(0o700).create(config.user_dir())?;
	}

	if config.prompt_password() {
		prompt_for_password(&config.tools().passwd, &passwd_file).await
	} else {
		write_random_password_file(&config.tools().passwd, &passwd_file, runner).await
	}
}

async fn prompt_for_password(tool: &Path, passwd_file: &Path) -> Result<()> {
	loop {
		let status = Command::new(tool)
			.arg(passwd_file)
			.status()
			.await
			.map_err(|source| vncctrl_runtime::Error::Launch {
				program: tool.display().to_string(),
				source,
			})?;
		if status.success() {
			return Ok(());
		}
		debug!(target: "vncctrl.session", ?status, "password not set; asking again");
	}
}

async fn write_random_password_file(tool: &Path, passwd_file: &Path, runner: &CommandRunner) -> Result<()> {
	let input = format!("{}\n", random_password());
	let command = [tool.as_os_str(), OsStr::new("-f")];
	let result = runner.execute(&command, input.as_bytes(), WaitPolicy::Descendants).await?;
	if !result.success() {
		return Err(Error::PasswordTool {
			status: result.exit_status,
			stderr: result.stderr_lossy(),
		});
	}

	let mut file = OpenOptions::new().write(true).create(true).truncate(true).mode(0o600).open(passwd_file)?;
	file.write_all(&result.stdout)?;
	// The umask cannot widen 0600, but an older file we truncated might be wider.
	fs::set_permissions(passwd_file, fs::Permissions::from_mode(0o600))?;
	debug!(target: "vncctrl.session", path = %passwd_file.display(), "wrote random password file");
	Ok(())
}

/// Printable ASCII, including space.
fn random_password() -> String {
	let mut rng = rand::rng();
	(0..RANDOM_PASSWORD_LEN).map(|_| char::from(rng.random_range(b' '..=b'~'))).collect()
}

#[cfg(test)]
mod tests {
	use std::os::unix::fs::PermissionsExt;
	use std::path::PathBuf;

	use tempfile::{TempDir, tempdir};

	use super::*;
	use crate::config::ToolPaths;

	fn fake_vncpasswd(dir: &TempDir, body: &str) -> PathBuf {
		let path = dir.path().join("vncpasswd");
		fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
		fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
		path
	}

	fn config_with(dir: &TempDir, passwd: PathBuf) -> SessionConfig {
		SessionConfig::new(dir.path().join("vnc")).with_tools(ToolPaths {
			passwd,
			..ToolPaths::default()
		})
	}

	#[test]
	fn random_password_is_printable() {
		let password = random_password();
		assert_eq!(password.len(), RANDOM_PASSWORD_LEN);
		assert!(password.bytes().all(|b| (b' '..=b'~').contains(&b)));
	}

	#[tokio::test]
	async fn creates_user_dir_and_private_passwd_file() {
		let dir = tempdir().unwrap();
		// Echo the obfuscated password back so the test can see what was fed in.
		let tool = fake_vncpasswd(&dir, "[ \"$1\" = \"-f\" ] || exit 9\nprintf 'obf:'; cat");
		let config = config_with(&dir, tool);

		ensure_password_file(&config, &CommandRunner::default()).await.unwrap();

		let dir_mode = fs::metadata(config.user_dir()).unwrap().permissions().mode();
		assert_eq!(dir_mode & 0o777, 0o700);
		let meta = fs::metadata(config.passwd_file()).unwrap();
		assert_eq!(meta.permissions().mode() & 0o777, 0o600);

		let content = fs::read_to_string(config.passwd_file()).unwrap();
		assert!(content.starts_with("obf:"));
		assert_eq!(content.len(), "obf:".len() + RANDOM_PASSWORD_LEN + 1);
		assert!(content.ends_with('\n'));
	}

	#[tokio::test]
	async fn existing_file_is_never_regenerated() {
		let dir = tempdir().unwrap();
		let tool = fake_vncpasswd(&dir, "exit 7");
		let config = config_with(&dir, tool);
		fs::create_dir_all(config.user_dir()).unwrap();
		fs::write(config.passwd_file(), "keep me").unwrap();

		ensure_password_file(&config, &CommandRunner::default()).await.unwrap();
		assert_eq!(fs::read_to_string(config.passwd_file()).unwrap(), "keep me");
	}

	#[tokio::test]
	async fn failing_tool_leaves_no_file() {
		let dir = tempdir().unwrap();
		let tool = fake_vncpasswd(&dir, "echo 'cannot write' >&2; exit 2");
		let config = config_with(&dir, tool);

		let err = ensure_password_file(&config, &CommandRunner::default()).await.unwrap_err();
		match err {
			Error::PasswordTool { status, stderr } => {
				assert_eq!(status, 2);
				assert_eq!(stderr, "cannot write\n");
			}
			other => panic!("unexpected error: {other}"),
		}
		assert!(!config.passwd_file().exists());
	}

	#[tokio::test]
	async fn prompt_mode_retries_until_the_tool_succeeds() {
		let dir = tempdir().unwrap();
		let attempts = dir.path().join("attempts");
		// Fails twice, then writes the file it was given.
		let body = format!(
			"echo x >> '{attempts}'\nn=$(wc -l < '{attempts}')\n[ $n -ge 3 ] || exit 1\necho secret > \"$1\"",
			attempts = attempts.display()
		);
		let tool = fake_vncpasswd(&dir, &body);
		let config = config_with(&dir, tool).with_prompt_password(true);

		ensure_password_file(&config, &CommandRunner::default()).await.unwrap();
		assert_eq!(fs::read_to_string(&attempts).unwrap().lines().count(), 3);
		assert_eq!(fs::read_to_string(config.passwd_file()).unwrap(), "secret\n");
	}

	#[tokio::test]
	async fn prompt_mode_with_missing_tool_is_a_launch_error() {
		let dir = tempdir().unwrap();
		let config = config_with(&dir, dir.path().join("missing-vncpasswd")).with_prompt_password(true);
		let err = ensure_password_file(&config, &CommandRunner::default()).await.unwrap_err();
		assert!(err.is_launch_error());
	}
}
