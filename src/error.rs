//! Error types and handling for the-startup
//!
//! Uses `thiserror` for error definitions and `miette` for pretty diagnostics.

use miette::Diagnostic;
use thiserror::Error;

/// Main error type for installer operations
#[derive(Error, Diagnostic, Debug)]
pub enum StartupError {
    // Path errors
    #[error("Invalid path '{path}': {reason}")]
    #[diagnostic(
        code(the_startup::paths::invalid),
        help("Pass an absolute path, a path relative to the current directory, or one starting with ~/")
    )]
    InvalidPath { path: String, reason: String },

    #[error("Invalid logical path '{path}': {reason}")]
    #[diagnostic(code(the_startup::paths::invalid_logical))]
    InvalidLogicalPath { path: String, reason: String },

    // Asset errors
    #[error("Asset not found in bundle: {path}")]
    #[diagnostic(
        code(the_startup::assets::missing),
        help("The bundle shipped with this binary is inconsistent; reinstall the-startup")
    )]
    AssetMissing { path: String },

    #[error("Asset '{path}' is outside every known logical root")]
    #[diagnostic(
        code(the_startup::assets::unroutable),
        help("Bundle files must live under agents/, commands/, hooks/, rules/, output-styles/ or templates/")
    )]
    UnroutableAsset { path: String },

    #[error("Asset {path} disagrees with its route: {reason}")]
    #[diagnostic(code(the_startup::assets::route_mismatch))]
    RouteMismatch { path: String, reason: String },

    #[error("Two entries route to the same destination: {path}")]
    #[diagnostic(code(the_startup::assets::routing_conflict))]
    RoutingConflict { path: String },

    #[error("Failed to read asset bundle at '{path}': {reason}")]
    #[diagnostic(code(the_startup::assets::read_failed))]
    AssetReadFailed { path: String, reason: String },

    // Manifest errors
    #[error("Lock file is corrupt: {path}: {reason}")]
    #[diagnostic(
        code(the_startup::manifest::corrupt),
        help("Inspect or remove the lock file manually; it is never overwritten automatically")
    )]
    ManifestCorrupt { path: String, reason: String },

    #[error("Failed to write lock file: {path}: {reason}")]
    #[diagnostic(
        code(the_startup::manifest::write_failed),
        help("Files were installed but could not be recorded; fix the problem and run install again")
    )]
    ManifestWrite { path: String, reason: String },

    #[error("No lock file found at {path}")]
    #[diagnostic(
        code(the_startup::manifest::not_found),
        help("Nothing to uninstall. Pass --install-path if the-startup was installed elsewhere")
    )]
    NoManifest { path: String },

    #[error("Failed to checksum {path}: {reason}")]
    #[diagnostic(code(the_startup::manifest::checksum_io))]
    ChecksumIo { path: String, reason: String },

    // Settings errors
    #[error("Host settings file is not valid: {path}: {reason}")]
    #[diagnostic(
        code(the_startup::settings::corrupt),
        help("Fix the JSON in the settings file; it was left unmodified")
    )]
    SettingsCorrupt { path: String, reason: String },

    // Apply errors
    #[error("Failed to install {logical_path} to {path}: {reason}")]
    #[diagnostic(
        code(the_startup::apply::io),
        help("The previous lock file is still authoritative; run install again after fixing the problem")
    )]
    ApplyIo {
        logical_path: String,
        path: String,
        reason: String,
    },

    #[error("Failed to remove {count} file(s): {paths}")]
    #[diagnostic(
        code(the_startup::apply::remove_io),
        help("These files are still recorded in the lock file and will be retried on the next run")
    )]
    RemoveIo { count: usize, paths: String },

    // File system errors
    #[error("Failed to read file: {path}: {reason}")]
    #[diagnostic(code(the_startup::fs::read_failed))]
    FileReadFailed { path: String, reason: String },

    #[error("Failed to write file: {path}: {reason}")]
    #[diagnostic(code(the_startup::fs::write_failed))]
    FileWriteFailed { path: String, reason: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(the_startup::fs::io_error))]
    IoError {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    // Interactive errors
    #[error("Prompt failed: {message}")]
    #[diagnostic(code(the_startup::ui::prompt_failed))]
    PromptFailed { message: String },

    #[error("Cancelled by user")]
    #[diagnostic(code(the_startup::ui::cancelled))]
    Cancelled,
}

impl StartupError {
    /// Process exit code for this error, grouped by error kind
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidPath { .. } => 2,
            Self::AssetMissing { .. } => 3,
            Self::ManifestCorrupt { .. } => 4,
            Self::ManifestWrite { .. } => 5,
            Self::SettingsCorrupt { .. } => 6,
            Self::ApplyIo { .. } => 7,
            Self::RemoveIo { .. } => 8,
            Self::NoManifest { .. } => 9,
            _ => 1,
        }
    }
}

impl From<std::io::Error> for StartupError {
    fn from(err: std::io::Error) -> Self {
        StartupError::IoError {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<inquire::InquireError> for StartupError {
    fn from(err: inquire::InquireError) -> Self {
        match err {
            inquire::InquireError::OperationCanceled
            | inquire::InquireError::OperationInterrupted => StartupError::Cancelled,
            other => StartupError::PromptFailed {
                message: other.to_string(),
            },
        }
    }
}

/// Result type alias using miette for error handling
pub type Result<T> = miette::Result<T, StartupError>;
