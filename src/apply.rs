//! Plan execution
//!
//! Runs a [`ReconciliationPlan`] strictly in order. Writes go through a
//! sibling temp file and a rename; removes tolerate files that are already
//! gone and clean up directories they leave empty. A failed write aborts
//! the run, failed removes are collected and reported at the end.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::common::fs::{remove_empty_ancestors, write_atomic};
use crate::error::{Result, StartupError};
use crate::hash;
use crate::manifest::{ManifestRecord, record_from_file};
use crate::reconcile::{Operation, PlannedOp, ReconciliationPlan, Staged};
use crate::routing::{FileMode, LogicalPath};

/// A file that could not be removed; it stays recorded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveFailure {
    pub logical_path: LogicalPath,
    pub path: PathBuf,
    pub reason: String,
}

/// Position of an operation among the scheduled entries of a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// 1-based
    pub index: usize,
    pub total: usize,
}

/// Result of applying a plan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// Every file now on disk that the new lock file must record
    pub records: BTreeMap<LogicalPath, ManifestRecord>,
    pub remove_failures: Vec<RemoveFailure>,
    pub written: usize,
    pub removed: usize,
}

/// Fold remove failures into one `RemoveIo` error
pub fn remove_error(failures: &[RemoveFailure]) -> Option<StartupError> {
    if failures.is_empty() {
        return None;
    }
    let paths = failures
        .iter()
        .map(|f| f.path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    Some(StartupError::RemoveIo {
        count: failures.len(),
        paths,
    })
}

/// Execute `plan`, calling `on_op` before each scheduled operation
pub fn apply<F>(plan: &ReconciliationPlan, mut on_op: F) -> Result<ApplyOutcome>
where
    F: FnMut(&PlannedOp, Step),
{
    let mut outcome = ApplyOutcome::default();
    let total = plan.scheduled_len();
    let mut index = 0;

    for op in plan.ops() {
        if op.is_scheduled() {
            index += 1;
            on_op(op, Step { index, total });
        }

        match &op.operation {
            Operation::Create {
                bytes,
                checksum,
                mode,
            } => {
                let record = write_file(op, bytes, checksum, *mode)?;
                outcome.records.insert(op.logical_path.clone(), record);
                outcome.written += 1;
            }
            Operation::Overwrite {
                bytes,
                checksum,
                mode,
                prior,
            } => {
                let record = write_file(op, bytes, checksum, *mode)?;
                // Same content keeps the old record so the lock file stays byte-stable
                let unchanged = prior
                    .checksum
                    .as_deref()
                    .is_some_and(|recorded| hash::verify_hash(recorded, checksum));
                let record = if unchanged && record.size == prior.size {
                    prior.clone()
                } else {
                    record
                };
                outcome.records.insert(op.logical_path.clone(), record);
                outcome.written += 1;
            }
            Operation::Remove { record } => match remove_file(op) {
                Ok(()) => outcome.removed += 1,
                Err(e) => {
                    warn!(path = %op.physical.display(), error = %e, "failed to remove");
                    outcome.remove_failures.push(RemoveFailure {
                        logical_path: op.logical_path.clone(),
                        path: op.physical.clone(),
                        reason: e.to_string(),
                    });
                    outcome
                        .records
                        .insert(op.logical_path.clone(), record.clone());
                }
            },
            Operation::LeaveAsIs {
                record,
                staged: Some(staged),
            } => {
                let (record, restored) = keep_or_restore(op, record, staged)?;
                if restored {
                    outcome.written += 1;
                }
                outcome.records.insert(op.logical_path.clone(), record);
            }
            Operation::LeaveAsIs {
                record,
                staged: None,
            } => {
                if record.checksum.is_some() {
                    outcome
                        .records
                        .insert(op.logical_path.clone(), record.clone());
                    continue;
                }
                // Older lock files carry no checksum; fill it in from disk
                match record_from_file(&op.physical) {
                    Ok(fresh) => {
                        outcome.records.insert(op.logical_path.clone(), fresh);
                    }
                    Err(e) => {
                        debug!(path = %op.logical_path, error = %e, "dropping record for missing file");
                    }
                }
            }
        }
    }

    debug!(
        written = outcome.written,
        removed = outcome.removed,
        failures = outcome.remove_failures.len(),
        "applied plan"
    );
    Ok(outcome)
}

fn write_file(
    op: &PlannedOp,
    bytes: &[u8],
    checksum: &str,
    mode: FileMode,
) -> Result<ManifestRecord> {
    debug!(path = %op.logical_path, to = %op.physical.display(), %checksum, "write");

    let apply_io = |reason: String| StartupError::ApplyIo {
        logical_path: op.logical_path.to_string(),
        path: op.physical.display().to_string(),
        reason,
    };

    write_atomic(&op.physical, bytes, mode).map_err(|e| apply_io(e.to_string()))?;
    let record = record_from_file(&op.physical).map_err(|e| apply_io(e.to_string()))?;

    // The file on disk must be the bytes the plan was computed from
    if !record
        .checksum
        .as_deref()
        .is_some_and(|written| hash::verify_hash(written, checksum))
    {
        return Err(apply_io("written content does not match the planned checksum".to_string()));
    }
    Ok(record)
}

/// Keep `record` if the file still holds the staged bytes, else rewrite it.
///
/// Returns the record to carry forward and whether the file was rewritten.
fn keep_or_restore(
    op: &PlannedOp,
    record: &ManifestRecord,
    staged: &Staged,
) -> Result<(ManifestRecord, bool)> {
    let intact = hash::hash_file(&op.physical).is_ok_and(|(checksum, size)| {
        size == record.size && hash::verify_hash(&checksum, &staged.checksum)
    });
    if intact {
        return Ok((record.clone(), false));
    }

    info!(path = %op.logical_path, at = %op.physical.display(), "restoring file that changed on disk");
    let fresh = write_file(op, &staged.bytes, &staged.checksum, staged.mode)?;
    Ok((fresh, true))
}

fn remove_file(op: &PlannedOp) -> io::Result<()> {
    debug!(path = %op.logical_path, at = %op.physical.display(), "remove");

    match fs::remove_file(&op.physical) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %op.physical.display(), "already gone");
        }
        Err(e) => return Err(e),
    }

    remove_empty_ancestors(&op.physical, &op.base);
    Ok(())
}
