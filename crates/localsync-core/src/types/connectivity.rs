//! Persisted connectivity state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Last observed network reachability
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectivityState {
    pub is_connected: bool,
    #[serde(default)]
    pub last_connected: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_disconnected: Option<DateTime<Utc>>,
}

impl ConnectivityState {
    pub fn is_offline(&self) -> bool {
        !self.is_connected
    }
}
