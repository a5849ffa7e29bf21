//! Asset bundle access
//!
//! An asset source enumerates the files of a bundle under fixed logical
//! roots and reads their bytes. The embedded bundle is compiled into the
//! binary; a directory with the same layout can stand in for it.

use std::borrow::Cow;

use crate::error::Result;
use crate::paths::Environment;
use crate::routing::{Destination, FileMode, LogicalPath};

pub mod dir;
pub mod embedded;

pub use dir::DirAssets;
pub use embedded::EmbeddedAssets;

/// Read-only access to an asset bundle.
///
/// Iteration order is unspecified; callers must not depend on it.
pub trait AssetSource {
    /// Every file under a logical root: a directory name such as `agents`,
    /// or a root-level file name such as `settings.local.json`
    fn list(&self, root: &str) -> Result<Vec<LogicalPath>>;

    /// Bytes of one file; `AssetMissing` when the bundle lacks it
    fn read(&self, path: &LogicalPath) -> Result<Cow<'_, [u8]>>;
}

/// One file to install, after placeholder rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetEntry {
    pub logical_path: LogicalPath,
    pub bytes: Vec<u8>,
    pub destination: Destination,
    pub mode: FileMode,
}

/// Whether `path` lies under the logical root `root`
pub(crate) fn is_under(path: &str, root: &str) -> bool {
    path == root
        || path
            .strip_prefix(root)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Values substituted into assets at install time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholders {
    pub startup_path: String,
    pub claude_path: String,
}

impl Placeholders {
    pub const STARTUP_PATH: &'static str = "{{STARTUP_PATH}}";
    pub const CLAUDE_PATH: &'static str = "{{CLAUDE_PATH}}";

    /// Placeholder values for a pair of roots, in `~/…` form where possible
    pub fn for_roots(
        install_root: &std::path::Path,
        claude_root: &std::path::Path,
        env: &Environment,
    ) -> Self {
        Self {
            startup_path: env.tilde(install_root),
            claude_path: env.tilde(claude_root),
        }
    }

    /// Substitute placeholders in UTF-8 content; other content is returned as is
    pub fn render<'a>(&self, bytes: &'a [u8]) -> Cow<'a, [u8]> {
        let Ok(text) = std::str::from_utf8(bytes) else {
            return Cow::Borrowed(bytes);
        };
        if !text.contains(Self::STARTUP_PATH) && !text.contains(Self::CLAUDE_PATH) {
            return Cow::Borrowed(bytes);
        }

        let rendered = text
            .replace(Self::STARTUP_PATH, &self.startup_path)
            .replace(Self::CLAUDE_PATH, &self.claude_path);
        Cow::Owned(rendered.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placeholders() -> Placeholders {
        Placeholders {
            startup_path: "~/.config/the-startup".to_string(),
            claude_path: "~/.claude".to_string(),
        }
    }

    #[test]
    fn test_render_replaces_both_placeholders() {
        let rendered = placeholders().render(b"see {{STARTUP_PATH}}/templates and {{CLAUDE_PATH}}/hooks");
        assert_eq!(
            rendered.as_ref(),
            b"see ~/.config/the-startup/templates and ~/.claude/hooks"
        );
    }

    #[test]
    fn test_render_leaves_plain_and_binary_content_borrowed() {
        let plain = placeholders().render(b"no placeholders here");
        assert!(matches!(plain, Cow::Borrowed(_)));

        let binary = [0xff, 0xfe, 0x00, b'{'];
        let rendered = placeholders().render(&binary);
        assert!(matches!(rendered, Cow::Borrowed(_)));
        assert_eq!(rendered.as_ref(), &binary);
    }

    #[test]
    fn test_is_under() {
        assert!(is_under("agents/a.md", "agents"));
        assert!(is_under("settings.local.json", "settings.local.json"));
        assert!(!is_under("agents-extra/a.md", "agents"));
        assert!(!is_under("commands/a.md", "agents"));
    }
}
