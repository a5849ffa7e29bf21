//! Hook registration in the host's `settings.json`
//!
//! The settings document belongs to the host tool. Only two entries in it
//! are ours: a `PreToolUse` and a `PostToolUse` hook, each tagged with
//! `"_source": "the-startup"`. Everything else is left exactly as found,
//! including key order.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use crate::common::fs::write_atomic;
use crate::error::{Result, StartupError};
use crate::routing::{FileMode, PRODUCT, SETTINGS_FILE, SETTINGS_LOCAL_FILE};

/// Reserved key tagging entries inserted by this installer
pub const MARKER_KEY: &str = "_source";

/// Hook script run before a sub-agent starts
pub const PRE_HOOK_SCRIPT: &str = "hooks/log_agent_start.py";

/// Hook script run after a sub-agent completes
pub const POST_HOOK_SCRIPT: &str = "hooks/log_agent_complete.py";

/// Directory under the claude root that holds settings backups
pub const BACKUP_DIR: &str = "backups";

/// Backups kept per settings file
pub const BACKUP_RETENTION: usize = 10;

const PRE_EVENT: &str = "PreToolUse";
const POST_EVENT: &str = "PostToolUse";
const MATCHER: &str = "Task";

/// Path of the host settings document under a claude root
pub fn settings_path(claude_root: &Path) -> PathBuf {
    claude_root.join(SETTINGS_FILE)
}

/// Commands registered for the two hook events
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookCommands {
    pub pre: String,
    pub post: String,
}

impl HookCommands {
    /// Commands that run the installed hook scripts under `claude_root`
    pub fn for_claude_root(claude_root: &Path) -> Self {
        let script = |logical: &str| {
            let path = logical
                .split('/')
                .fold(claude_root.to_path_buf(), |acc, s| acc.join(s));
            shell_quote(&path.display().to_string())
        };
        Self {
            pre: script(PRE_HOOK_SCRIPT),
            post: script(POST_HOOK_SCRIPT),
        }
    }

    fn entries(&self) -> [(&'static str, &str); 2] {
        [(PRE_EVENT, &self.pre), (POST_EVENT, &self.post)]
    }
}

/// What the patcher did to the settings file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    Created,
    Updated,
    Unchanged,
}

/// Make sure both hook entries are registered
pub fn patch_hooks(path: &Path, commands: &HookCommands) -> Result<PatchOutcome> {
    let Some(mut doc) = read_settings(path)? else {
        let mut doc = Value::Object(Map::new());
        insert_hooks(&mut doc, commands, path)?;
        write_settings(path, &doc)?;
        debug!(path = %path.display(), "created settings with hooks");
        return Ok(PatchOutcome::Created);
    };

    if !insert_hooks(&mut doc, commands, path)? {
        debug!(path = %path.display(), "hooks already registered");
        return Ok(PatchOutcome::Unchanged);
    }

    write_settings(path, &doc)?;
    debug!(path = %path.display(), "registered hooks");
    Ok(PatchOutcome::Updated)
}

/// Strip every marker-tagged hook entry; a missing file is left missing
pub fn remove_hooks(path: &Path) -> Result<PatchOutcome> {
    let Some(mut doc) = read_settings(path)? else {
        return Ok(PatchOutcome::Unchanged);
    };

    if !strip_marked(&mut doc, path)? {
        return Ok(PatchOutcome::Unchanged);
    }

    write_settings(path, &doc)?;
    debug!(path = %path.display(), "removed hooks");
    Ok(PatchOutcome::Updated)
}

/// Whether both hook entries are registered with the expected commands
pub fn hooks_registered(path: &Path, commands: &HookCommands) -> Result<bool> {
    let Some(doc) = read_settings(path)? else {
        return Ok(false);
    };
    let Some(hooks) = doc.get("hooks").and_then(Value::as_object) else {
        return Ok(false);
    };

    Ok(commands.entries().iter().all(|(event, command)| {
        hooks
            .get(*event)
            .and_then(Value::as_array)
            .is_some_and(|groups| has_exactly(groups, command))
    }))
}

/// Fail with `SettingsCorrupt` unless the document can take the patch.
///
/// `Some` checks registration, `None` checks removal; nothing is written.
/// Returns whether an existing document would be rewritten.
pub fn validate(path: &Path, commands: Option<&HookCommands>) -> Result<bool> {
    let Some(mut doc) = read_settings(path)? else {
        return Ok(false);
    };
    match commands {
        Some(commands) => insert_hooks(&mut doc, commands, path),
        None => strip_marked(&mut doc, path),
    }
}

/// Copy the settings files present under `claude_root` into
/// `<claude_root>/backups/<name>.backup.<YYYYMMDD_HHMMSS>`.
///
/// Only the newest [`BACKUP_RETENTION`] copies of each file are kept.
/// Returns the backups written, empty when there was nothing to copy.
pub fn backup_settings(claude_root: &Path, now: DateTime<Utc>) -> Result<Vec<PathBuf>> {
    let dir = claude_root.join(BACKUP_DIR);
    let stamp = now.format("%Y%m%d_%H%M%S").to_string();
    let mut written = Vec::new();

    for name in [SETTINGS_FILE, SETTINGS_LOCAL_FILE] {
        let source = claude_root.join(name);
        let bytes = match fs::read(&source) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => {
                return Err(StartupError::FileReadFailed {
                    path: source.display().to_string(),
                    reason: e.to_string(),
                });
            }
        };

        let target = dir.join(format!("{name}.backup.{stamp}"));
        write_atomic(&target, &bytes, FileMode::Regular).map_err(|e| {
            StartupError::FileWriteFailed {
                path: target.display().to_string(),
                reason: e.to_string(),
            }
        })?;
        debug!(from = %source.display(), to = %target.display(), "backed up settings");
        prune_backups(&dir, name);
        written.push(target);
    }

    Ok(written)
}

/// Drop all but the newest backups of `name`; failures are only logged
fn prune_backups(dir: &Path, name: &str) {
    let prefix = format!("{name}.backup.");
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    let mut backups: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(&prefix))
        .map(|entry| entry.path())
        .collect();
    if backups.len() <= BACKUP_RETENTION {
        return;
    }

    // The timestamp suffix sorts chronologically
    backups.sort();
    let excess = backups.len() - BACKUP_RETENTION;
    for old in &backups[..excess] {
        if let Err(e) = fs::remove_file(old) {
            warn!(path = %old.display(), error = %e, "failed to prune settings backup");
        }
    }
}

fn read_settings(path: &Path) -> Result<Option<Value>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(corrupt(path, e.to_string())),
    };

    let doc: Value = serde_json::from_str(&text).map_err(|e| corrupt(path, e.to_string()))?;
    if !doc.is_object() {
        return Err(corrupt(path, "top level is not an object".to_string()));
    }
    Ok(Some(doc))
}

fn write_settings(path: &Path, doc: &Value) -> Result<()> {
    let mut text = serde_json::to_string_pretty(doc).map_err(|e| StartupError::FileWriteFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    text.push('\n');

    write_atomic(path, text.as_bytes(), FileMode::Regular).map_err(|e| {
        StartupError::FileWriteFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        }
    })
}

fn corrupt(path: &Path, reason: String) -> StartupError {
    StartupError::SettingsCorrupt {
        path: path.display().to_string(),
        reason,
    }
}

fn is_marked(value: &Value) -> bool {
    value.get(MARKER_KEY).and_then(Value::as_str) == Some(PRODUCT)
}

fn marked_hook(command: &str) -> Value {
    json!({
        "type": "command",
        "command": command,
        MARKER_KEY: PRODUCT,
    })
}

/// Exactly one marked hook in the event, in a `Task` group, running `command`
fn has_exactly(groups: &[Value], command: &str) -> bool {
    let mut found = 0;
    let mut matches = false;
    for group in groups {
        if is_marked(group) {
            found += 1;
        }
        let Some(hooks) = group.get("hooks").and_then(Value::as_array) else {
            continue;
        };
        for hook in hooks.iter().filter(|h| is_marked(h)) {
            found += 1;
            matches = group.get("matcher").and_then(Value::as_str) == Some(MATCHER)
                && hook.get("command").and_then(Value::as_str) == Some(command)
                && hook.get("type").and_then(Value::as_str) == Some("command");
        }
    }
    found == 1 && matches
}

/// Ensure our entries exist; returns whether the document changed
fn insert_hooks(doc: &mut Value, commands: &HookCommands, path: &Path) -> Result<bool> {
    let root = doc
        .as_object_mut()
        .ok_or_else(|| corrupt(path, "top level is not an object".to_string()))?;
    let hooks = root
        .entry("hooks")
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| corrupt(path, "\"hooks\" is not an object".to_string()))?;

    let mut changed = false;
    for (event, command) in commands.entries() {
        let groups = hooks
            .entry(event)
            .or_insert_with(|| Value::Array(Vec::new()))
            .as_array_mut()
            .ok_or_else(|| corrupt(path, format!("\"hooks.{event}\" is not an array")))?;

        if has_exactly(groups, command) {
            continue;
        }

        strip_from_groups(groups);
        groups.push(json!({
            "matcher": MATCHER,
            "hooks": [marked_hook(command)],
        }));
        changed = true;
    }

    Ok(changed)
}

/// Remove marked entries from every event; returns whether anything changed
fn strip_marked(doc: &mut Value, path: &Path) -> Result<bool> {
    let root = doc
        .as_object_mut()
        .ok_or_else(|| corrupt(path, "top level is not an object".to_string()))?;
    let Some(hooks_value) = root.get_mut("hooks") else {
        return Ok(false);
    };
    let hooks = hooks_value
        .as_object_mut()
        .ok_or_else(|| corrupt(path, "\"hooks\" is not an object".to_string()))?;

    let mut changed = false;
    let mut emptied = Vec::new();
    for (event, value) in hooks.iter_mut() {
        // Unknown shapes are not ours to judge
        let Some(groups) = value.as_array_mut() else {
            continue;
        };
        if strip_from_groups(groups) {
            changed = true;
            if groups.is_empty() {
                emptied.push(event.clone());
            }
        }
    }

    for event in emptied {
        hooks.shift_remove(&event);
    }
    if changed && hooks.is_empty() {
        root.shift_remove("hooks");
    }

    Ok(changed)
}

/// Drop marked groups and marked hooks; a group left with no hooks goes too
fn strip_from_groups(groups: &mut Vec<Value>) -> bool {
    let before = groups.len();
    groups.retain(|group| !is_marked(group));
    let mut changed = groups.len() != before;

    groups.retain_mut(|group| {
        let Some(hooks) = group.get_mut("hooks").and_then(Value::as_array_mut) else {
            return true;
        };
        let count = hooks.len();
        hooks.retain(|hook| !is_marked(hook));
        if hooks.len() == count {
            return true;
        }
        changed = true;
        !hooks.is_empty()
    });

    changed
}

/// Quote a path for the shell when it contains anything beyond plain path characters
fn shell_quote(path: &str) -> String {
    let plain = path
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '_' | '-' | '~' | ':' | '\\'));
    if plain {
        path.to_string()
    } else {
        format!("'{}'", path.replace('\'', r"'\''"))
    }
}
