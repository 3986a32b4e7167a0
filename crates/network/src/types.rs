//! Wire shapes served by the backend and their conversion into resources.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};

use kickfeed_core::resources::{NewsResource, TransferResource};
use kickfeed_core::sync::ChangeListEntry;

use crate::error::{NetworkError, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMATS: [&str; 2] = ["%H:%M:%S", "%H:%M"];

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkNewsResource {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    pub body: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub category: String,
    /// "true" / "false"; anything else reads as not important.
    #[serde(default)]
    pub is_important: Option<String>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub author_image: Option<String>,
    pub link: String,
    /// Comma-separated topic tags.
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    pub date: String,
    #[serde(default)]
    pub time: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkTransferResource {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub player_name: String,
    pub club_from: String,
    #[serde(default)]
    pub club_from_image: Option<String>,
    pub club_to: String,
    #[serde(default)]
    pub club_to_image: Option<String>,
    #[serde(default)]
    pub price: String,
    pub link: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkChangeList {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub change_list_version: i64,
    pub is_delete: bool,
}

impl From<NetworkChangeList> for ChangeListEntry {
    fn from(entry: NetworkChangeList) -> Self {
        ChangeListEntry {
            id: entry.id,
            change_list_version: entry.change_list_version,
            is_delete: entry.is_delete,
        }
    }
}

impl NetworkNewsResource {
    /// Converts with `date`/`time` read as wall-clock time in `tz`.
    pub fn into_resource_in<Tz: TimeZone>(self, tz: &Tz) -> Result<NewsResource> {
        let publish_date = publish_date_in(&self.date, self.time.as_deref(), tz)?;
        Ok(NewsResource {
            is_important: self
                .is_important
                .as_deref()
                .is_some_and(|flag| flag.trim().eq_ignore_ascii_case("true")),
            topics: split_tags(self.tags.as_deref()),
            author_name: non_blank(self.author_name),
            author_image_url: non_blank(self.author_image),
            header_image_url: non_blank(self.image),
            id: self.id,
            title: self.title,
            content: self.body,
            category: self.category,
            url: self.link,
            publish_date,
        })
    }
}

impl TryFrom<NetworkNewsResource> for NewsResource {
    type Error = NetworkError;

    fn try_from(value: NetworkNewsResource) -> Result<Self> {
        value.into_resource_in(&Local)
    }
}

impl From<NetworkTransferResource> for TransferResource {
    fn from(value: NetworkTransferResource) -> Self {
        TransferResource {
            id: value.id,
            player_name: value.player_name,
            club_from: value.club_from,
            club_from_image_url: non_blank(value.club_from_image),
            club_to: value.club_to,
            club_to_image_url: non_blank(value.club_to_image),
            price: value.price,
            url: value.link,
        }
    }
}

/// A missing time means midnight. Times skipped by a DST jump fall back to
/// reading the wall clock as UTC.
fn publish_date_in<Tz: TimeZone>(
    date: &str,
    time: Option<&str>,
    tz: &Tz,
) -> Result<DateTime<Utc>> {
    let day = NaiveDate::parse_from_str(date.trim(), DATE_FORMAT)
        .map_err(|err| NetworkError::malformed(format!("date '{date}': {err}")))?;
    let clock = match time.map(str::trim).filter(|t| !t.is_empty()) {
        None => NaiveTime::MIN,
        Some(raw) => TIME_FORMATS
            .iter()
            .find_map(|format| NaiveTime::parse_from_str(raw, format).ok())
            .ok_or_else(|| NetworkError::malformed(format!("time '{raw}'")))?,
    };
    let naive = NaiveDateTime::new(day, clock);
    Ok(tz
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or_else(|| naive.and_utc()))
}

fn split_tags(tags: Option<&str>) -> Vec<String> {
    tags.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Ids and category codes arrive as numbers or strings depending on the
/// endpoint.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Number(n) => n.to_string(),
        Raw::Text(s) => s,
    })
}
