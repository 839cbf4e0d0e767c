//! Cached user profile

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Denormalized profile of the signed-in user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Account id of the authenticated user
    pub uid: String,

    pub display_name: String,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub photo_url: Option<String>,

    #[serde(default)]
    pub bio: String,

    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    pub followers_count: u32,

    #[serde(default)]
    pub following_count: u32,

    /// When the authoritative copy last changed
    pub last_updated: DateTime<Utc>,
}

impl UserProfile {
    /// Create a profile with just a uid and display name
    pub fn new(uid: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            display_name: display_name.into(),
            email: None,
            photo_url: None,
            bio: String::new(),
            location: None,
            followers_count: 0,
            following_count: 0,
            last_updated: Utc::now(),
        }
    }
}
