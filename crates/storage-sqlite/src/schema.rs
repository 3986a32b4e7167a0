// FTS4 shadow tables are virtual and only reached through `sql_query`.

diesel::table! {
    news_resources (id) {
        id -> Text,
        title -> Text,
        content -> Text,
        category -> Text,
        is_important -> Bool,
        author_name -> Nullable<Text>,
        author_image_url -> Nullable<Text>,
        url -> Text,
        topics -> Text,
        header_image_url -> Nullable<Text>,
        publish_date -> BigInt,
    }
}

diesel::table! {
    transfer_resources (id) {
        id -> Text,
        player_name -> Text,
        club_from -> Text,
        club_from_image_url -> Nullable<Text>,
        club_to -> Text,
        club_to_image_url -> Nullable<Text>,
        price -> Text,
        url -> Text,
    }
}

diesel::table! {
    user_preferences (id) {
        id -> Integer,
        payload -> Text,
        updated_at -> Text,
    }
}
