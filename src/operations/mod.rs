//! Operations module for installing, uninstalling and inspecting an installation
//!
//! Each operation takes its configuration as an explicit value and returns a
//! report; none of them prints anything. The `commands` layer turns CLI
//! arguments into configurations and reports into terminal output.

pub mod install;
pub mod status;
pub mod uninstall;

pub use install::{InstallConfig, InstallReport, install};
pub use status::{FileStatus, status};
pub use uninstall::{UninstallConfig, uninstall};
