//! Progress bar display for plan execution

use indicatif::{ProgressBar, ProgressStyle};

use crate::apply::Step;
use crate::reconcile::PlannedOp;

/// Progress display for the file operations of one run.
///
/// The bar is created on the first operation, once the total is known, and
/// draws to stderr (hidden when stderr is not a terminal).
pub struct ProgressDisplay {
    file_pb: Option<ProgressBar>,
    enabled: bool,
}

impl ProgressDisplay {
    pub fn new(enabled: bool) -> Self {
        Self {
            file_pb: None,
            enabled,
        }
    }

    /// Show the operation about to run
    pub fn update(&mut self, op: &PlannedOp, step: Step) {
        if !self.enabled {
            return;
        }

        let file_pb = self.file_pb.get_or_insert_with(|| {
            let file_style = ProgressStyle::default_bar()
                .template("  [{bar:40.green/yellow}] {pos}/{len} files {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▉▊▋▌▍▎▏  ");
            let file_pb = ProgressBar::new(step.total as u64);
            file_pb.set_style(file_style);
            file_pb
        });

        file_pb.set_message(format!(
            "{} {}",
            op.action(),
            truncate_path(op.logical_path.as_str())
        ));
        file_pb.set_position(step.index as u64);
    }

    /// Finish file progress
    pub fn finish(&self) {
        if let Some(file_pb) = &self.file_pb {
            file_pb.finish_and_clear();
        }
    }

    /// Abandon on error
    pub fn abandon(&self) {
        if let Some(file_pb) = &self.file_pb {
            file_pb.abandon();
        }
    }
}

/// Truncate long paths for display, keeping the tail
fn truncate_path(path: &str) -> String {
    let chars = path.chars().count();
    if chars > 50 {
        let tail: String = path.chars().skip(chars - 47).collect();
        format!("...{tail}")
    } else {
        path.to_string()
    }
}
