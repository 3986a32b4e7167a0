//! Overlay data and settings persisted in the preferences blob.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::resources::ResourceKind;
use crate::sync::ChangeListVersions;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DarkThemeConfig {
    #[default]
    FollowSystem,
    Light,
    Dark,
}

/// Push-notification channels the user can opt out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    News,
    Transfers,
}

impl NotificationChannel {
    /// Push topic carrying sync triggers for this channel.
    pub fn topic(&self) -> &'static str {
        match self {
            NotificationChannel::News => "news",
            NotificationChannel::Transfers => "transfers",
        }
    }

    pub fn from_topic(topic: &str) -> Option<Self> {
        match topic.trim().to_ascii_lowercase().as_str() {
            "news" => Some(NotificationChannel::News),
            "transfers" => Some(NotificationChannel::Transfers),
            _ => None,
        }
    }

    pub fn resource_kind(&self) -> ResourceKind {
        match self {
            NotificationChannel::News => ResourceKind::News,
            NotificationChannel::Transfers => ResourceKind::Transfer,
        }
    }
}

/// User-local overlay on top of mirrored resources.
///
/// Ids in the sets are not tied to stored rows: an id may be bookmarked before
/// its resource arrives or after the resource is deleted remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserData {
    pub bookmarked_news_resources: BTreeSet<String>,
    pub viewed_news_resources: BTreeSet<String>,
    pub bookmarked_transfer_resources: BTreeSet<String>,
    pub viewed_transfer_resources: BTreeSet<String>,
    pub dark_theme_config: DarkThemeConfig,
    pub use_dynamic_color: bool,
    pub news_notifications_allowed: bool,
    pub transfer_notifications_allowed: bool,
}

impl Default for UserData {
    fn default() -> Self {
        Self {
            bookmarked_news_resources: BTreeSet::new(),
            viewed_news_resources: BTreeSet::new(),
            bookmarked_transfer_resources: BTreeSet::new(),
            viewed_transfer_resources: BTreeSet::new(),
            dark_theme_config: DarkThemeConfig::default(),
            use_dynamic_color: false,
            news_notifications_allowed: true,
            transfer_notifications_allowed: true,
        }
    }
}

impl UserData {
    pub fn bookmarked(&self, kind: ResourceKind) -> &BTreeSet<String> {
        match kind {
            ResourceKind::News => &self.bookmarked_news_resources,
            ResourceKind::Transfer => &self.bookmarked_transfer_resources,
        }
    }

    pub fn viewed(&self, kind: ResourceKind) -> &BTreeSet<String> {
        match kind {
            ResourceKind::News => &self.viewed_news_resources,
            ResourceKind::Transfer => &self.viewed_transfer_resources,
        }
    }

    pub(crate) fn bookmarked_mut(&mut self, kind: ResourceKind) -> &mut BTreeSet<String> {
        match kind {
            ResourceKind::News => &mut self.bookmarked_news_resources,
            ResourceKind::Transfer => &mut self.bookmarked_transfer_resources,
        }
    }

    pub(crate) fn viewed_mut(&mut self, kind: ResourceKind) -> &mut BTreeSet<String> {
        match kind {
            ResourceKind::News => &mut self.viewed_news_resources,
            ResourceKind::Transfer => &mut self.viewed_transfer_resources,
        }
    }

    pub fn notification_allowed(&self, channel: NotificationChannel) -> bool {
        match channel {
            NotificationChannel::News => self.news_notifications_allowed,
            NotificationChannel::Transfers => self.transfer_notifications_allowed,
        }
    }

    pub(crate) fn notification_allowed_mut(&mut self, channel: NotificationChannel) -> &mut bool {
        match channel {
            NotificationChannel::News => &mut self.news_notifications_allowed,
            NotificationChannel::Transfers => &mut self.transfer_notifications_allowed,
        }
    }
}

/// Shape of the single durable preferences blob.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserPreferences {
    #[serde(flatten)]
    pub user_data: UserData,
    pub change_list_versions: ChangeListVersions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_missing_fields_fall_back_to_defaults() {
        let prefs: UserPreferences =
            serde_json::from_str(r#"{"bookmarkedNewsResources":["4"]}"#).expect("parse");
        assert!(prefs.user_data.bookmarked_news_resources.contains("4"));
        assert_eq!(prefs.change_list_versions, ChangeListVersions::default());
        assert!(prefs.user_data.news_notifications_allowed);
    }

    #[test]
    fn topics_map_to_channels() {
        assert_eq!(
            NotificationChannel::from_topic(" Transfers "),
            Some(NotificationChannel::Transfers)
        );
        assert_eq!(NotificationChannel::from_topic("weather"), None);
        assert_eq!(
            NotificationChannel::News.resource_kind(),
            ResourceKind::News
        );
    }
}
