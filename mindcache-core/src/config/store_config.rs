use serde::{Deserialize, Serialize};

/// Configuration for the L1 store's template expansion behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// When true, `{name}` (single brace) is also accepted as a template
    /// placeholder alongside `{{name}}`, for callers migrating from an
    /// older template syntax.
    pub legacy_single_brace_templates: bool,
    /// z-index assigned to entries created without an explicit one.
    pub default_z_index: i64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            legacy_single_brace_templates: false,
            default_z_index: 0,
        }
    }
}
