use serde::{Deserialize, Serialize};

pub const ITEM_KINDS: [&str; 2] = ["lost", "found"];
pub const ITEM_STATUSES: [&str; 3] = ["active", "claimed", "resolved"];

pub const ITEM_COLUMNS: &str = "id, kind, item_name, category, description, location, date, \
     contact_name, contact_phone, status, reported_by, image_url, created_at, updated_at";

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ItemRow {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub item_name: String,
    pub category: String,
    pub description: String,
    pub location: String,
    pub date: String,
    pub contact_name: String,
    pub contact_phone: String,
    pub status: String,
    pub reported_by: i64,
    pub image_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Create requires every field but `status`/`imageUrl`; update applies
/// whichever are present.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemRequest {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub item_name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub date: Option<String>,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub status: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ItemQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub status: Option<String>,
}
