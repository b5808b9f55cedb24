//! Runtime policy switches for the engine.

use serde::Deserialize;

/// Behaviour toggles read from the application settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Let sales and purchase returns take on-hand stock below zero.
    pub allow_negative_stock: bool,
    /// Run the revaluation pass inside the posting transaction whenever a
    /// posting flags a product as dirty.
    pub auto_revalue: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            allow_negative_stock: false,
            auto_revalue: true,
        }
    }
}
