//! Saved marker layouts (JSON)

use crate::positions::{Position, PositionStore};
use crate::{InviteError, ResourceKind, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

pub const LAYOUT_VERSION: &str = "1";

/// A set of marked positions saved for reuse with the same template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    #[serde(default = "default_version")]
    pub version: String,
    /// Template the positions were marked on, informational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    pub positions: Vec<Position>,
}

fn default_version() -> String {
    LAYOUT_VERSION.to_string()
}

impl Layout {
    pub fn from_store(store: &PositionStore, template: Option<&Path>) -> Self {
        Self {
            version: default_version(),
            template: template.map(|p| p.display().to_string()),
            positions: store.as_slice().to_vec(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let layout: Self = serde_json::from_str(json)?;
        if layout.version != LAYOUT_VERSION {
            return Err(InviteError::Config(format!(
                "unsupported layout version {:?}",
                layout.version
            )));
        }
        Ok(layout)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read a layout file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| InviteError::resource(ResourceKind::Layout, path, e))?;
        let layout = Self::from_json(&content)
            .map_err(|e| InviteError::resource(ResourceKind::Layout, path, e))?;

        debug!(
            "Loaded {} positions from {}",
            layout.positions.len(),
            path.display()
        );
        Ok(layout)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path.as_ref(), self.to_json()?)?;
        Ok(())
    }

    /// Convert into a validated position store
    pub fn into_store(self) -> Result<PositionStore> {
        PositionStore::from_positions(self.positions)
    }
}
