//! vncctrl - find, health-check, or launch a per-user VNC display
//!
//! [`SessionManager`] answers one question: which X display can this user's
//! clients draw on right now? It looks for displays recorded by earlier
//! sessions, probes them, and launches a fresh Xvnc server through the
//! `vncserver` wrapper when none answers.
//!
//! # Quick Start
//!
//! ```ignore
//! use vncctrl::{SessionConfig, SessionManager};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> vncctrl::Result<()> {
//!     let manager = SessionManager::new(SessionConfig::from_env());
//!     let env = manager.init_display().await?;
//!     std::process::Command::new("xterm").envs(env.vars()).spawn()?;
//!     Ok(())
//! }
//! ```
//!
//! # State on disk
//!
//! Everything lives in the user directory (`$HOME/.vncctrl` by default):
//!
//! ```text
//! passwd                 credential file, mode 0600
//! Xauthority             X authority file for clients
//! <host>:<n>.pid         one per launched server, written by vncserver
//! ```

mod announce;
pub mod config;
pub mod display;
pub mod environment;
pub mod error;
pub mod manager;
mod password;
pub mod pid_record;
pub mod probe;

pub use announce::parse_announcement;
pub use config::{SessionConfig, ToolPaths};
pub use display::DisplayId;
pub use environment::{SessionEnvironment, SessionSource};
pub use error::{Error, Result};
pub use manager::{SessionManager, SessionPhase};
pub use probe::{ProbeOutcome, probe_display};
