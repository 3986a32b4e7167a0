//! Read-time join of a mirrored resource with the user's overlay data.

use serde::Serialize;

use super::{NewsResource, Resource, TransferResource};
use crate::preferences::UserData;

/// A resource as the UI sees it: canonical row plus overlay flags.
///
/// Never stored; rebuilt from the latest row and the latest [`UserData`] on
/// every emission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResource<R> {
    #[serde(flatten)]
    pub resource: R,
    pub is_saved: bool,
    pub has_been_viewed: bool,
}

pub type UserNewsResource = UserResource<NewsResource>;
pub type UserTransferResource = UserResource<TransferResource>;

impl<R: Resource> UserResource<R> {
    pub fn new(resource: R, user_data: &UserData) -> Self {
        let is_saved = user_data.bookmarked(R::KIND).contains(resource.id());
        let has_been_viewed = user_data.viewed(R::KIND).contains(resource.id());
        Self {
            resource,
            is_saved,
            has_been_viewed,
        }
    }

    pub fn id(&self) -> &str {
        self.resource.id()
    }
}

pub fn map_to_user_resources<R: Resource>(
    resources: Vec<R>,
    user_data: &UserData,
) -> Vec<UserResource<R>> {
    resources
        .into_iter()
        .map(|resource| UserResource::new(resource, user_data))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::ResourceKind;
    use chrono::{TimeZone, Utc};

    fn news(id: &str) -> NewsResource {
        NewsResource {
            id: id.to_string(),
            title: format!("Headline {id}"),
            content: "Body".to_string(),
            category: "1".to_string(),
            is_important: false,
            author_name: None,
            author_image_url: None,
            url: format!("https://kickfeed.app/news/{id}"),
            topics: vec![],
            header_image_url: None,
            publish_date: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    fn transfer(id: &str) -> TransferResource {
        TransferResource {
            id: id.to_string(),
            player_name: "Player".to_string(),
            club_from: "From FC".to_string(),
            club_from_image_url: None,
            club_to: "To United".to_string(),
            club_to_image_url: None,
            price: "Free".to_string(),
            url: String::new(),
        }
    }

    #[test]
    fn join_reflects_bookmark_and_viewed_sets() {
        let mut user_data = UserData::default();
        user_data
            .bookmarked_news_resources
            .insert("1".to_string());
        user_data.viewed_news_resources.insert("2".to_string());

        let joined = map_to_user_resources(vec![news("1"), news("2"), news("3")], &user_data);
        let flags: Vec<_> = joined
            .iter()
            .map(|r| (r.id().to_string(), r.is_saved, r.has_been_viewed))
            .collect();
        assert_eq!(
            flags,
            vec![
                ("1".to_string(), true, false),
                ("2".to_string(), false, true),
                ("3".to_string(), false, false),
            ]
        );
    }

    #[test]
    fn kinds_do_not_share_overlay_sets() {
        let mut user_data = UserData::default();
        user_data
            .bookmarked_news_resources
            .insert("7".to_string());

        let joined = UserResource::new(transfer("7"), &user_data);
        assert!(!joined.is_saved);
        assert_eq!(TransferResource::KIND, ResourceKind::Transfer);
    }
}
