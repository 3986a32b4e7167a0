use std::sync::Arc;

use futures::stream::BoxStream;

use crate::preferences::{DarkThemeConfig, NotificationChannel, PreferencesDataSource, UserData};
use crate::resources::ResourceKind;

/// User-facing writes to the overlay. Resource rows are never touched.
#[derive(Clone)]
pub struct UserDataRepository {
    preferences: Arc<PreferencesDataSource>,
}

impl UserDataRepository {
    pub fn new(preferences: Arc<PreferencesDataSource>) -> Self {
        Self { preferences }
    }

    pub fn user_data(&self) -> BoxStream<'static, Arc<UserData>> {
        self.preferences.user_data()
    }

    pub async fn set_news_resource_bookmarked(&self, id: &str, bookmarked: bool) {
        self.preferences
            .set_bookmarked(ResourceKind::News, id, bookmarked)
            .await;
    }

    pub async fn set_transfer_resource_bookmarked(&self, id: &str, bookmarked: bool) {
        self.preferences
            .set_bookmarked(ResourceKind::Transfer, id, bookmarked)
            .await;
    }

    pub async fn set_news_resource_viewed(&self, id: &str, viewed: bool) {
        self.preferences
            .set_viewed(ResourceKind::News, id, viewed)
            .await;
    }

    pub async fn set_transfer_resource_viewed(&self, id: &str, viewed: bool) {
        self.preferences
            .set_viewed(ResourceKind::Transfer, id, viewed)
            .await;
    }

    /// Marks a whole feed page at once; one write instead of one per id.
    pub async fn set_resources_viewed(&self, kind: ResourceKind, ids: &[String], viewed: bool) {
        self.preferences.set_viewed_batch(kind, ids, viewed).await;
    }

    pub async fn set_dark_theme_config(&self, config: DarkThemeConfig) {
        self.preferences.set_dark_theme_config(config).await;
    }

    pub async fn set_dynamic_color_preference(&self, enabled: bool) {
        self.preferences.set_dynamic_color(enabled).await;
    }

    pub async fn set_notifications_allowed(&self, channel: NotificationChannel, allowed: bool) {
        self.preferences
            .set_notification_allowed(channel, allowed)
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::InMemoryPreferencesBackend;
    use futures::StreamExt;

    #[tokio::test]
    async fn toggles_land_in_the_overlay_stream() {
        let preferences = Arc::new(
            PreferencesDataSource::load(Arc::new(InMemoryPreferencesBackend::new()))
                .await
                .expect("prefs"),
        );
        let repo = UserDataRepository::new(preferences);
        let mut stream = repo.user_data();
        assert!(stream.next().await.expect("initial").bookmarked(ResourceKind::News).is_empty());

        repo.set_news_resource_bookmarked("42", true).await;
        let data = stream.next().await.expect("bookmark");
        assert!(data.bookmarked(ResourceKind::News).contains("42"));
        assert!(data.bookmarked(ResourceKind::Transfer).is_empty());

        repo.set_resources_viewed(
            ResourceKind::Transfer,
            &["1".to_string(), "2".to_string()],
            true,
        )
        .await;
        let data = stream.next().await.expect("viewed");
        assert_eq!(data.viewed(ResourceKind::Transfer).len(), 2);

        repo.set_notifications_allowed(NotificationChannel::Transfers, false)
            .await;
        let data = stream.next().await.expect("notifications");
        assert!(!data.notification_allowed(NotificationChannel::Transfers));
        assert!(data.notification_allowed(NotificationChannel::News));
    }
}
