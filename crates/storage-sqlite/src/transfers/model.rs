use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use kickfeed_core::resources::TransferResource;

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
#[diesel(table_name = crate::schema::transfer_resources)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct TransferResourceDB {
    pub id: String,
    pub player_name: String,
    pub club_from: String,
    pub club_from_image_url: Option<String>,
    pub club_to: String,
    pub club_to_image_url: Option<String>,
    pub price: String,
    pub url: String,
}

impl From<TransferResource> for TransferResourceDB {
    fn from(resource: TransferResource) -> Self {
        Self {
            id: resource.id,
            player_name: resource.player_name,
            club_from: resource.club_from,
            club_from_image_url: resource.club_from_image_url,
            club_to: resource.club_to,
            club_to_image_url: resource.club_to_image_url,
            price: resource.price,
            url: resource.url,
        }
    }
}

impl From<TransferResourceDB> for TransferResource {
    fn from(db: TransferResourceDB) -> Self {
        Self {
            id: db.id,
            player_name: db.player_name,
            club_from: db.club_from,
            club_from_image_url: db.club_from_image_url,
            club_to: db.club_to,
            club_to_image_url: db.club_to_image_url,
            price: db.price,
            url: db.url,
        }
    }
}
