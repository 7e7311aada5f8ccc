//! Console front-end for the vncctrl session manager.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod output;
