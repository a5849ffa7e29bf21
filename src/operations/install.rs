//! Install operation
//!
//! load lock file → stage assets → reconcile → apply → patch settings →
//! write lock file. The lock file is written last; if anything before it
//! fails, the previous lock file stays authoritative.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::apply::{self, RemoveFailure, Step};
use crate::assets::{AssetEntry, AssetSource, Placeholders};
use crate::error::{Result, StartupError};
use crate::manifest::{self, Manifest};
use crate::paths::Environment;
use crate::reconcile::{
    self, Operation, PlanSummary, PlannedOp, ReconcileOptions, ReconciliationPlan,
};
use crate::routing::{Component, LogicalPath, Routing, SETTINGS_LOCAL_FILE, normalize_components};
use crate::settings::{self, HookCommands, POST_HOOK_SCRIPT, PRE_HOOK_SCRIPT, PatchOutcome};

/// Everything an install run needs, resolved up front
#[derive(Debug, Clone)]
pub struct InstallConfig {
    pub install_root: PathBuf,
    pub claude_root: PathBuf,
    /// Empty means every component
    pub components: Vec<Component>,
    pub skip_unchanged: bool,
    pub dry_run: bool,
    /// Clock value recorded as the install date
    pub now: DateTime<Utc>,
}

impl InstallConfig {
    pub fn routing(&self) -> Routing {
        Routing::new(&self.install_root, &self.claude_root)
    }

    pub fn hooks_selected(&self) -> bool {
        normalize_components(&self.components).contains(&Component::Hooks)
    }
}

/// What an install run did (or, for a dry run, would do)
#[derive(Debug, Clone)]
pub struct InstallReport {
    pub plan: ReconciliationPlan,
    pub summary: PlanSummary,
    /// The lock file written; `None` for a dry run
    pub manifest: Option<Manifest>,
    pub settings: Option<PatchOutcome>,
    /// Copies of the settings files taken before they were changed
    pub settings_backup: Vec<PathBuf>,
    pub remove_failures: Vec<RemoveFailure>,
}

impl InstallReport {
    /// Aggregated error for removes that failed, if any
    pub fn remove_error(&self) -> Option<StartupError> {
        apply::remove_error(&self.remove_failures)
    }
}

/// Read and render every asset of the selected components
pub fn stage_assets(
    source: &dyn AssetSource,
    config: &InstallConfig,
    prior: Option<&Manifest>,
    env: &Environment,
) -> Result<Vec<AssetEntry>> {
    let placeholders = Placeholders::for_roots(&config.install_root, &config.claude_root, env);
    let components = normalize_components(&config.components);

    let mut paths: Vec<LogicalPath> = Vec::new();
    for component in &components {
        paths.extend(source.list(component.dir_name())?);
    }

    if components.contains(&Component::Hooks) {
        // Settings will point at these; the bundle has to ship them
        for script in [PRE_HOOK_SCRIPT, POST_HOOK_SCRIPT] {
            let script = LogicalPath::new(script)?;
            if !paths.contains(&script) {
                return Err(StartupError::AssetMissing {
                    path: script.to_string(),
                });
            }
        }
    }

    for local in source.list(SETTINGS_LOCAL_FILE)? {
        let on_disk = config.claude_root.join(SETTINGS_LOCAL_FILE).exists();
        let recorded = prior.is_some_and(|m| m.files.contains_key(&local));
        if !on_disk || recorded {
            paths.push(local);
        } else {
            debug!(path = %local, "keeping existing local settings");
        }
    }

    paths
        .into_iter()
        .map(|logical_path| {
            let root = logical_path.root().ok_or_else(|| StartupError::UnroutableAsset {
                path: logical_path.to_string(),
            })?;
            let raw = source.read(&logical_path)?;
            let bytes = placeholders.render(&raw).into_owned();
            Ok(AssetEntry {
                destination: root.destination(),
                mode: root.mode(),
                logical_path,
                bytes,
            })
        })
        .collect()
}

/// Run the install pipeline
pub fn install<F>(
    source: &dyn AssetSource,
    config: &InstallConfig,
    env: &Environment,
    on_op: F,
) -> Result<InstallReport>
where
    F: FnMut(&PlannedOp, Step),
{
    let prior = manifest::load(&config.install_root)?;
    let components = normalize_components(&config.components);
    info!(
        install_root = %config.install_root.display(),
        claude_root = %config.claude_root.display(),
        components = components.len(),
        "install"
    );

    let assets = stage_assets(source, config, prior.as_ref(), env)?;
    let plan = reconcile::reconcile(
        &assets,
        prior.as_ref(),
        &config.routing(),
        ReconcileOptions {
            skip_unchanged: config.skip_unchanged,
        },
    )?;
    let summary = plan.summary();

    if config.dry_run {
        return Ok(InstallReport {
            plan,
            summary,
            manifest: None,
            settings: None,
            settings_backup: Vec::new(),
            remove_failures: Vec::new(),
        });
    }

    // Refuse before any file is written if the settings cannot be patched
    let settings_file = settings::settings_path(&config.claude_root);
    let commands = config
        .hooks_selected()
        .then(|| HookCommands::for_claude_root(&config.claude_root));
    let rewrite_settings =
        settings::validate(&settings_file, commands.as_ref())? || rewrites_local_settings(&plan);
    let stale_root = prior
        .as_ref()
        .map(|p| p.claude_root.as_path())
        .filter(|root| *root != config.claude_root);
    let stale_settings = stale_root.map(settings::settings_path);
    let rewrite_stale = match &stale_settings {
        Some(stale) => settings::validate(stale, None)?,
        None => false,
    };

    let mut settings_backup = Vec::new();
    if rewrite_settings {
        settings_backup = settings::backup_settings(&config.claude_root, config.now)?;
    }
    if let Some(root) = stale_root.filter(|_| rewrite_stale) {
        settings_backup.extend(settings::backup_settings(root, config.now)?);
    }

    let outcome = apply::apply(&plan, on_op)?;

    let settings = match &commands {
        Some(commands) => settings::patch_hooks(&settings_file, commands)?,
        None => settings::remove_hooks(&settings_file)?,
    };
    if let Some(stale) = &stale_settings {
        debug!(path = %stale.display(), "unregistering hooks at previous claude root");
        settings::remove_hooks(stale)?;
    }

    let mut next = Manifest::new(
        &config.install_root,
        &config.claude_root,
        components,
        outcome.records,
        config.now,
    );
    if let Some(prior) = prior.as_ref().filter(|p| p.same_content(&next)) {
        next.install_date = prior.install_date.clone();
    }
    manifest::write(&config.install_root, &next)?;
    info!(files = next.files.len(), "install complete");

    Ok(InstallReport {
        plan,
        summary,
        manifest: Some(next),
        settings: Some(settings),
        settings_backup,
        remove_failures: outcome.remove_failures,
    })
}

/// Whether the plan replaces a `settings.local.json` whose content differs
fn rewrites_local_settings(plan: &ReconciliationPlan) -> bool {
    plan.ops().iter().any(|op| match &op.operation {
        Operation::Overwrite { bytes, .. } if op.logical_path.as_str() == SETTINGS_LOCAL_FILE => {
            fs::read(&op.physical).is_ok_and(|on_disk| on_disk != *bytes)
        }
        _ => false,
    })
}
