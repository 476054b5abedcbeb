//! Subscription manager configuration.

use serde::{Deserialize, Serialize};

/// How many root fields a subscription document may select.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootFieldPolicy {
    /// Exactly one root field; anything else is rejected.
    #[default]
    Strict,
    /// Bind the first root field and ignore the rest.
    FirstSelection,
}

/// Configuration for a `SubscriptionManager`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Root field policy applied by the binder.
    /// Default: `Strict`
    pub root_field_policy: RootFieldPolicy,

    /// Buffer size of the channel behind `subscribe_channel` handles.
    /// Default: 1000
    pub delivery_buffer: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            root_field_policy: RootFieldPolicy::Strict,
            delivery_buffer: 1000,
        }
    }
}

impl ManagerConfig {
    /// Load a configuration from JSON. Missing keys take their defaults.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
