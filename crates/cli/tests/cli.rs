//! Integration tests for the `vncctrl` binary, with fake external tools
//! injected through the `VNCCTRL_*` environment variables.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::{TempDir, tempdir};

const LAUNCHER: &str = r#"sleep 300 &
echo $! >> "$3/spawned"
echo $! > "$3/clihost:4.pid"
echo "New 'clihost:4 (tester)' desktop is clihost:4" >&2"#;

struct Tools {
	dir: TempDir,
}

impl Tools {
	fn new(probe_body: &str) -> Self {
		let tools = Self { dir: tempdir().unwrap() };
		tools.script("xhost", probe_body);
		tools.script("vncpasswd", "cat");
		tools.script("vncserver", LAUNCHER);
		tools.script("hostname", "echo clihost");
		tools
	}

	fn script(&self, name: &str, body: &str) -> PathBuf {
		let path = self.dir.path().join(name);
		fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
		fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
		path
	}

	fn user_dir(&self) -> PathBuf {
		self.dir.path().join("vnc")
	}

	fn run(&self, args: &[&str]) -> Output {
		let bin = |name: &str| self.dir.path().join(name);
		Command::new(env!("CARGO_BIN_EXE_vncctrl"))
			.args(args)
			.env_remove("RUST_LOG")
			.env("VNCCTRL_USER_DIR", self.user_dir())
			.env("VNCCTRL_XVNC", which::which("sleep").unwrap().canonicalize().unwrap())
			.env("VNCCTRL_XHOST", bin("xhost"))
			.env("VNCCTRL_VNCPASSWD", bin("vncpasswd"))
			.env("VNCCTRL_PERL", "/bin/sh")
			.env("VNCCTRL_VNCSERVER", bin("vncserver"))
			.env("VNCCTRL_HOSTNAME", bin("hostname"))
			.output()
			.expect("failed to execute vncctrl")
	}
}

impl Drop for Tools {
	fn drop(&mut self) {
		let Ok(spawned) = fs::read_to_string(self.user_dir().join("spawned")) else {
			return;
		};
		for pid in spawned.split_whitespace() {
			let _ = Command::new("kill").arg(pid).status();
		}
	}
}

fn stdout(output: &Output) -> String {
	String::from_utf8_lossy(&output.stdout).into_owned()
}

fn json(output: &Output) -> Value {
	serde_json::from_slice(&output.stdout).unwrap_or_else(|_| panic!("not json: {}", stdout(output)))
}

#[test]
fn init_prints_shell_exports_then_reuses_the_display() {
	let tools = Tools::new("[ \"$DISPLAY\" = \":4\" ]");

	let first = tools.run(&[]);
	assert!(first.status.success(), "stderr: {}", String::from_utf8_lossy(&first.stderr));
	let xauth = tools.user_dir().join("Xauthority");
	assert_eq!(
		stdout(&first),
		format!("export DISPLAY='clihost:4'\nexport XAUTHORITY='{}'\n", xauth.display())
	);

	let second = tools.run(&["--format", "json", "init"]);
	let value = json(&second);
	assert_eq!(value["ok"], true);
	assert_eq!(value["command"], "init");
	assert_eq!(value["data"]["display"], "clihost:4");
	assert_eq!(value["data"]["source"], "existing");

	let listed = tools.run(&["list"]);
	assert_eq!(stdout(&listed), "clihost:4\n");
}

#[test]
fn list_without_user_dir_prints_nothing() {
	let tools = Tools::new("exit 0");
	let output = tools.run(&["list"]);
	assert!(output.status.success());
	assert_eq!(stdout(&output), "");
	assert!(!tools.user_dir().exists());
}

#[test]
fn probe_reports_refusal_with_failing_exit() {
	let tools = Tools::new("exit 1");
	let output = tools.run(&["probe", "clihost:9"]);
	assert_eq!(output.status.code(), Some(1));
	assert_eq!(stdout(&output), "clihost:9: refused connection\n");
}

#[test]
fn probe_rejects_malformed_display() {
	let tools = Tools::new("exit 0");
	let output = tools.run(&["-f", "json", "probe", "nocolon"]);
	assert_eq!(output.status.code(), Some(1));
	let value = json(&output);
	assert_eq!(value["ok"], false);
	assert_eq!(value["error"]["code"], "INVALID_INPUT");
}

#[test]
fn kill_is_not_implemented() {
	let tools = Tools::new("exit 0");
	let output = tools.run(&["--format", "json", "kill", "clihost:4"]);
	assert_eq!(output.status.code(), Some(1));
	let value = json(&output);
	assert_eq!(value["command"], "kill");
	assert_eq!(value["error"]["code"], "NOT_IMPLEMENTED");
	assert!(String::from_utf8_lossy(&output.stderr).contains("Error [NOT_IMPLEMENTED]"));
}

#[test]
fn missing_helper_is_silent_without_verbose() {
	let tools = Tools::new("exit 0");
	fs::remove_file(tools.dir.path().join("xhost")).unwrap();

	let output = tools.run(&["probe", "clihost:1"]);
	assert_eq!(output.status.code(), Some(1));
	assert_eq!(stdout(&output), "clihost:1: refused connection\n");
	assert_eq!(String::from_utf8_lossy(&output.stderr), "");
}
