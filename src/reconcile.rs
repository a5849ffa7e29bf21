//! Reconciliation: the plan that turns the prior install into the current bundle
//!
//! The reconciler looks only at the staged assets, the prior lock file and
//! the routing table. It never touches the filesystem, so every decision it
//! makes can be inspected (and tested) before anything is written.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

use tracing::debug;

use crate::assets::AssetEntry;
use crate::error::{Result, StartupError};
use crate::hash;
use crate::manifest::{Manifest, ManifestRecord};
use crate::routing::{FileMode, LogicalPath, Routing};

/// Knobs for [`reconcile`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Leave files whose recorded checksum matches the new bytes
    pub skip_unchanged: bool,
}

/// Kind of a planned operation, without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Action {
    Create,
    Overwrite,
    LeaveAsIs,
    Remove,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Action::Create => "create",
            Action::Overwrite => "overwrite",
            Action::LeaveAsIs => "keep",
            Action::Remove => "remove",
        };
        f.write_str(label)
    }
}

/// What happens to one logical path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Create {
        bytes: Vec<u8>,
        checksum: String,
        mode: FileMode,
    },
    Overwrite {
        bytes: Vec<u8>,
        checksum: String,
        mode: FileMode,
        prior: ManifestRecord,
    },
    LeaveAsIs {
        record: ManifestRecord,
        /// Bundle content when the path is still shipped; the applier
        /// restores the file from it if the disk no longer matches
        staged: Option<Staged>,
    },
    Remove {
        record: ManifestRecord,
    },
}

/// Bundle bytes behind a kept entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Staged {
    pub bytes: Vec<u8>,
    pub checksum: String,
    pub mode: FileMode,
}

/// One entry of a [`ReconciliationPlan`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedOp {
    pub logical_path: LogicalPath,
    pub physical: PathBuf,
    /// Root directory that bounds empty-directory cleanup after a remove
    pub base: PathBuf,
    pub operation: Operation,
}

impl PlannedOp {
    pub fn action(&self) -> Action {
        match self.operation {
            Operation::Create { .. } => Action::Create,
            Operation::Overwrite { .. } => Action::Overwrite,
            Operation::LeaveAsIs { .. } => Action::LeaveAsIs,
            Operation::Remove { .. } => Action::Remove,
        }
    }

    /// Whether the applier has to do anything for this entry
    pub fn is_scheduled(&self) -> bool {
        self.action() != Action::LeaveAsIs
    }
}

/// Per-action counts of a plan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanSummary {
    pub create: usize,
    pub overwrite: usize,
    pub leave: usize,
    pub remove: usize,
}

/// Ordered operations: removes, then writes, then carried-forward records
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationPlan {
    ops: Vec<PlannedOp>,
}

impl ReconciliationPlan {
    pub fn ops(&self) -> &[PlannedOp] {
        &self.ops
    }

    /// Entries the applier executes, in execution order
    pub fn scheduled(&self) -> impl Iterator<Item = &PlannedOp> {
        self.ops.iter().filter(|op| op.is_scheduled())
    }

    pub fn scheduled_len(&self) -> usize {
        self.scheduled().count()
    }

    pub fn summary(&self) -> PlanSummary {
        let mut summary = PlanSummary::default();
        for op in &self.ops {
            match op.action() {
                Action::Create => summary.create += 1,
                Action::Overwrite => summary.overwrite += 1,
                Action::LeaveAsIs => summary.leave += 1,
                Action::Remove => summary.remove += 1,
            }
        }
        summary
    }

    fn from_unordered(mut removes: Vec<PlannedOp>, mut writes: Vec<PlannedOp>, mut kept: Vec<PlannedOp>) -> Self {
        // Files go before the directories that contain them
        removes.sort_by(|a, b| {
            b.physical
                .cmp(&a.physical)
                .then_with(|| b.logical_path.cmp(&a.logical_path))
        });
        writes.sort_by(|a, b| {
            a.physical
                .cmp(&b.physical)
                .then_with(|| a.logical_path.cmp(&b.logical_path))
        });
        kept.sort_by(|a, b| a.logical_path.cmp(&b.logical_path));

        let mut ops = removes;
        ops.append(&mut writes);
        ops.append(&mut kept);
        Self { ops }
    }
}

/// Classify every logical path of `assets ∪ prior` into one operation.
///
/// New assets are routed with `routing`; prior records with the roots the
/// prior lock file was written for, so a moved root yields a remove at the
/// old location and a create at the new one.
pub fn reconcile(
    assets: &[AssetEntry],
    prior: Option<&Manifest>,
    routing: &Routing,
    options: ReconcileOptions,
) -> Result<ReconciliationPlan> {
    let mut staged: BTreeMap<&LogicalPath, &AssetEntry> = BTreeMap::new();
    for asset in assets {
        if staged.insert(&asset.logical_path, asset).is_some() {
            return Err(StartupError::RoutingConflict {
                path: asset.logical_path.to_string(),
            });
        }
    }

    let empty = BTreeMap::new();
    let prior_files = prior.map_or(&empty, |m| &m.files);
    let prior_routing = prior.map(Manifest::routing);

    let mut removes = Vec::new();
    let mut writes = Vec::new();
    let mut kept = Vec::new();
    let mut destinations = BTreeSet::new();

    for (logical_path, asset) in &staged {
        let route = routing.route_asset(logical_path)?;
        if asset.destination != route.root.destination() {
            return Err(StartupError::RouteMismatch {
                path: logical_path.to_string(),
                reason: format!(
                    "staged for {:?}, routed to {:?}",
                    asset.destination,
                    route.root.destination()
                ),
            });
        }
        if asset.mode != route.mode {
            return Err(StartupError::RouteMismatch {
                path: logical_path.to_string(),
                reason: format!("staged as {:?}, routed as {:?}", asset.mode, route.mode),
            });
        }
        if !destinations.insert(route.physical.clone()) {
            return Err(StartupError::RoutingConflict {
                path: route.physical.display().to_string(),
            });
        }

        let checksum = hash::checksum(&asset.bytes);
        let prior_entry = prior_files.get(*logical_path).map(|record| {
            let old = prior_routing
                .as_ref()
                .and_then(|r| r.route(logical_path));
            (record, old)
        });

        let operation = match prior_entry {
            None => Operation::Create {
                bytes: asset.bytes.clone(),
                checksum,
                mode: route.mode,
            },
            Some((record, Some(old))) if old.physical != route.physical => {
                debug!(
                    path = %logical_path,
                    from = %old.physical.display(),
                    to = %route.physical.display(),
                    "relocated"
                );
                if old.root.is_owned() {
                    removes.push(PlannedOp {
                        logical_path: (*logical_path).clone(),
                        physical: old.physical,
                        base: old.base,
                        operation: Operation::Remove {
                            record: record.clone(),
                        },
                    });
                }
                Operation::Create {
                    bytes: asset.bytes.clone(),
                    checksum,
                    mode: route.mode,
                }
            }
            Some((record, _)) => {
                let unchanged = record
                    .checksum
                    .as_deref()
                    .is_some_and(|recorded| hash::verify_hash(recorded, &checksum));
                if options.skip_unchanged && unchanged {
                    Operation::LeaveAsIs {
                        record: record.clone(),
                        staged: Some(Staged {
                            bytes: asset.bytes.clone(),
                            checksum,
                            mode: route.mode,
                        }),
                    }
                } else {
                    Operation::Overwrite {
                        bytes: asset.bytes.clone(),
                        checksum,
                        mode: route.mode,
                        prior: record.clone(),
                    }
                }
            }
        };

        let op = PlannedOp {
            logical_path: (*logical_path).clone(),
            physical: route.physical,
            base: route.base,
            operation,
        };
        if op.is_scheduled() {
            writes.push(op);
        } else {
            kept.push(op);
        }
    }

    for (logical_path, record) in prior_files {
        if staged.contains_key(logical_path) {
            continue;
        }

        let route = prior_routing
            .as_ref()
            .and_then(|r| r.route(logical_path));
        match route {
            Some(route) if route.root.is_owned() => removes.push(PlannedOp {
                logical_path: logical_path.clone(),
                physical: route.physical,
                base: route.base,
                operation: Operation::Remove {
                    record: record.clone(),
                },
            }),
            route => {
                // Not ours to remove; keep tracking it
                let (physical, base) = route
                    .map(|r| (r.physical, r.base))
                    .unwrap_or_else(|| unrouted_location(prior, logical_path));
                kept.push(PlannedOp {
                    logical_path: logical_path.clone(),
                    physical,
                    base,
                    operation: Operation::LeaveAsIs {
                        record: record.clone(),
                        staged: None,
                    },
                });
            }
        }
    }

    let plan = ReconciliationPlan::from_unordered(removes, writes, kept);
    let summary = plan.summary();
    debug!(
        create = summary.create,
        overwrite = summary.overwrite,
        keep = summary.leave,
        remove = summary.remove,
        "reconciled"
    );
    Ok(plan)
}

/// Plan that removes every owned file a lock file records
pub fn uninstall_plan(manifest: &Manifest) -> ReconciliationPlan {
    let routing = manifest.routing();
    let mut removes = Vec::new();
    let mut kept = Vec::new();

    for (logical_path, record) in &manifest.files {
        match routing.route(logical_path) {
            Some(route) if route.root.is_owned() => removes.push(PlannedOp {
                logical_path: logical_path.clone(),
                physical: route.physical,
                base: route.base,
                operation: Operation::Remove {
                    record: record.clone(),
                },
            }),
            route => {
                let (physical, base) = route
                    .map(|r| (r.physical, r.base))
                    .unwrap_or_else(|| unrouted_location(Some(manifest), logical_path));
                kept.push(PlannedOp {
                    logical_path: logical_path.clone(),
                    physical,
                    base,
                    operation: Operation::LeaveAsIs {
                        record: record.clone(),
                        staged: None,
                    },
                });
            }
        }
    }

    ReconciliationPlan::from_unordered(removes, Vec::new(), kept)
}

/// Best-effort location for a record under a root this release does not know
fn unrouted_location(prior: Option<&Manifest>, logical_path: &LogicalPath) -> (PathBuf, PathBuf) {
    let base = prior.map(|m| m.install_root.clone()).unwrap_or_default();
    let physical = logical_path
        .segments()
        .fold(base.clone(), |acc, segment| acc.join(segment));
    (physical, base)
}
