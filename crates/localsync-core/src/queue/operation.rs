//! Queued operation types

use chrono::{DateTime, Utc};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::types::UserProfile;

/// Partial profile edit. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.bio.is_none()
            && self.photo_url.is_none()
            && self.location.is_none()
    }

    /// Apply the edit to a local profile copy
    pub fn apply_to(&self, profile: &mut UserProfile) {
        if let Some(display_name) = &self.display_name {
            profile.display_name = display_name.clone();
        }
        if let Some(bio) = &self.bio {
            profile.bio = bio.clone();
        }
        if let Some(photo_url) = &self.photo_url {
            profile.photo_url = Some(photo_url.clone());
        }
        if let Some(location) = &self.location {
            profile.location = Some(location.clone());
        }
    }
}

/// A remote mutation waiting for connectivity.
///
/// Serialized as `{"type": "...", "data": {...}}` so a processor can match
/// on the variant without inspecting the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum OperationKind {
    UpdateProfile(ProfileUpdate),
    LikePost { post_id: String },
    UnlikePost { post_id: String },
    AddComment { post_id: String, text: String },
    FollowUser { user_id: String },
    UnfollowUser { user_id: String },
    SendMessage {
        chat_id: String,
        /// Client-generated id the backend uses to drop replays
        client_message_id: String,
        text: String,
    },
}

impl OperationKind {
    /// Stable snake_case name of the variant
    pub fn type_name(&self) -> &'static str {
        match self {
            OperationKind::UpdateProfile(_) => "update_profile",
            OperationKind::LikePost { .. } => "like_post",
            OperationKind::UnlikePost { .. } => "unlike_post",
            OperationKind::AddComment { .. } => "add_comment",
            OperationKind::FollowUser { .. } => "follow_user",
            OperationKind::UnfollowUser { .. } => "unfollow_user",
            OperationKind::SendMessage { .. } => "send_message",
        }
    }
}

/// An entry in the offline queue.
///
/// Only `retry_count` and `last_error` change after creation, and only the
/// queue changes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflineOperation {
    /// `<type>_<unix millis>_<random suffix>`
    pub id: String,
    pub operation: OperationKind,
    pub timestamp: DateTime<Utc>,
    pub retry_count: u32,
    pub max_retries: u32,
    #[serde(default)]
    pub last_error: Option<String>,
}

impl OfflineOperation {
    pub fn new(operation: OperationKind, max_retries: u32, now: DateTime<Utc>) -> Self {
        let suffix: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(9)
            .map(char::from)
            .collect();
        let id = format!(
            "{}_{}_{}",
            operation.type_name(),
            now.timestamp_millis(),
            suffix.to_lowercase()
        );

        Self {
            id,
            operation,
            timestamp: now,
            retry_count: 0,
            max_retries,
            last_error: None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.operation.type_name()
    }

    /// Record a failed delivery attempt
    pub(crate) fn record_failure(&mut self, error: String) {
        self.retry_count = self.retry_count.saturating_add(1);
        self.last_error = Some(error);
    }

    /// No attempts left
    pub fn is_exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }
}
