//! Database model for mirrored news.

use chrono::DateTime;
use diesel::prelude::*;
use log::warn;
use serde::{Deserialize, Serialize};

use kickfeed_core::resources::NewsResource;

#[derive(
    Queryable,
    Identifiable,
    Insertable,
    AsChangeset,
    Selectable,
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
)]
#[diesel(table_name = crate::schema::news_resources)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct NewsResourceDB {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: String,
    pub is_important: bool,
    pub author_name: Option<String>,
    pub author_image_url: Option<String>,
    pub url: String,
    /// JSON array of topic names.
    pub topics: String,
    pub header_image_url: Option<String>,
    /// Milliseconds since the Unix epoch, UTC.
    pub publish_date: i64,
}

impl From<NewsResource> for NewsResourceDB {
    fn from(resource: NewsResource) -> Self {
        let topics = serde_json::to_string(&resource.topics).unwrap_or_else(|_| "[]".to_string());
        Self {
            id: resource.id,
            title: resource.title,
            content: resource.content,
            category: resource.category,
            is_important: resource.is_important,
            author_name: resource.author_name,
            author_image_url: resource.author_image_url,
            url: resource.url,
            topics,
            header_image_url: resource.header_image_url,
            publish_date: resource.publish_date.timestamp_millis(),
        }
    }
}

impl From<NewsResourceDB> for NewsResource {
    fn from(db: NewsResourceDB) -> Self {
        let topics = serde_json::from_str(&db.topics).unwrap_or_else(|err| {
            warn!("[Storage] News {} has unreadable topics: {}", db.id, err);
            Vec::new()
        });
        Self {
            publish_date: DateTime::from_timestamp_millis(db.publish_date).unwrap_or_default(),
            id: db.id,
            title: db.title,
            content: db.content,
            category: db.category,
            is_important: db.is_important,
            author_name: db.author_name,
            author_image_url: db.author_image_url,
            url: db.url,
            topics,
            header_image_url: db.header_image_url,
        }
    }
}
