use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

const DEFAULT_ROOT_NAME: &str = "main";
const DEFAULT_ROOT_ELEMENT: &str = "$root";
const DEFAULT_UNDO_DEPTH: usize = 100;

/// Settings of a single editing session's `Document`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct DocumentConfig {
    /// Name of the root created together with the document. It is also the
    /// root where the selection's default range lives.
    #[serde(default = "default_root_name")]
    pub default_root_name: String,

    /// Element name of the default root.
    #[serde(default = "default_root_element")]
    pub default_root_element: String,

    /// How many deltas can be undone. Older entries stay in the history but
    /// are no longer reachable through `undo`.
    #[serde(default = "default_undo_depth")]
    pub undo_depth: usize,
}

fn default_root_name() -> String {
    debug!("Using default root name: {DEFAULT_ROOT_NAME}");
    DEFAULT_ROOT_NAME.to_owned()
}

fn default_root_element() -> String {
    debug!("Using default root element: {DEFAULT_ROOT_ELEMENT}");
    DEFAULT_ROOT_ELEMENT.to_owned()
}

fn default_undo_depth() -> usize {
    debug!("Using default undo depth: {DEFAULT_UNDO_DEPTH}");
    DEFAULT_UNDO_DEPTH
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            default_root_name: default_root_name(),
            default_root_element: default_root_element(),
            undo_depth: default_undo_depth(),
        }
    }
}

impl DocumentConfig {
    /// Parse a configuration from YAML. Missing keys fall back to their
    /// defaults.
    pub fn from_yaml(contents: &str) -> Result<Self, ModelError> {
        let config = serde_yaml::from_str(contents)?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ModelError> { Ok(serde_yaml::to_string(self)?) }
}
