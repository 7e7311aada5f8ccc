//! vncctrl runtime - shell-free command execution and process introspection
//!
//! This crate holds the process plumbing the session manager is built on. It
//! knows nothing about VNC:
//!
//! - **Command execution**: run a program directly, pump an input buffer into
//!   it and collect stdout/stderr without deadlocking ([`CommandRunner`])
//! - **Process table**: liveness, ownership and executable image of a pid
//!   ([`process`])
//!
//! # Termination policies
//!
//! ```text
//! WaitPolicy::Descendants   returns when every holder of the output pipes closed them
//! WaitPolicy::DirectChild   returns once the direct child exited (daemon launchers)
//! ```

pub mod command;
pub mod error;
#[cfg(unix)]
pub mod process;

pub use command::{CommandResult, CommandRunner, WaitPolicy, run_command};
pub use error::{Error, Result};
#[cfg(unix)]
pub use process::pid_is_alive;
