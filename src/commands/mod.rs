//! Command implementations for the-startup CLI

pub mod completions;
pub mod helpers;
pub mod install;
pub mod status;
pub mod uninstall;
