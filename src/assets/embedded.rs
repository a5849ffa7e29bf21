//! Asset bundle compiled into the binary by `build.rs`

use std::borrow::Cow;

use super::{AssetSource, is_under};
use crate::error::{Result, StartupError};
use crate::routing::LogicalPath;

mod bundle {
    include!(concat!(env!("OUT_DIR"), "/bundle.rs"));
}

/// The bundle shipped with this binary
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedAssets {
    table: &'static [(&'static str, &'static [u8])],
}

impl EmbeddedAssets {
    pub fn new() -> Self {
        Self {
            table: bundle::BUNDLE,
        }
    }
}

impl Default for EmbeddedAssets {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetSource for EmbeddedAssets {
    fn list(&self, root: &str) -> Result<Vec<LogicalPath>> {
        self.table
            .iter()
            .filter(|(path, _)| is_under(path, root))
            .map(|(path, _)| LogicalPath::new(*path))
            .collect()
    }

    fn read(&self, path: &LogicalPath) -> Result<Cow<'_, [u8]>> {
        self.table
            .iter()
            .find(|(candidate, _)| *candidate == path.as_str())
            .map(|(_, bytes)| Cow::Borrowed(*bytes))
            .ok_or_else(|| StartupError::AssetMissing {
                path: path.to_string(),
            })
    }
}
