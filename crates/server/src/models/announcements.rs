use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use super::users::UserRef;

pub const CATEGORIES: [&str; 6] = ["academic", "event", "exam", "general", "urgent", "video"];
pub const PRIORITIES: [&str; 4] = ["low", "medium", "high", "urgent"];
pub const AUDIENCES: [&str; 5] = ["all", "student", "faculty", "parent", "admin"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attachment {
    pub name: String,
    pub url: String,
}

#[derive(Debug, sqlx::FromRow)]
pub struct AnnouncementRow {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub category: String,
    pub target_audience: Json<Vec<String>>,
    pub target_classes: Json<Vec<String>>,
    pub priority: String,
    pub attachments: Json<Vec<Attachment>>,
    pub published_by: i64,
    pub published_at: String,
    pub expires_at: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
    pub publisher_name: String,
    pub publisher_email: String,
    pub publisher_role: String,
    pub is_read: bool,
    pub read_count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementResponse {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub category: String,
    pub target_audience: Vec<String>,
    pub target_classes: Vec<String>,
    pub priority: String,
    pub attachments: Vec<Attachment>,
    pub published_by: UserRef,
    pub published_at: String,
    pub expires_at: Option<String>,
    pub is_active: bool,
    pub is_read: bool,
    pub read_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<AnnouncementRow> for AnnouncementResponse {
    fn from(row: AnnouncementRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            content: row.content,
            category: row.category,
            target_audience: row.target_audience.0,
            target_classes: row.target_classes.0,
            priority: row.priority,
            attachments: row.attachments.0,
            published_by: UserRef {
                id: row.published_by,
                name: row.publisher_name,
                email: Some(row.publisher_email),
                role: Some(row.publisher_role),
            },
            published_at: row.published_at,
            expires_at: row.expires_at,
            is_active: row.is_active,
            is_read: row.is_read,
            read_count: row.read_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateAnnouncementRequest {
    pub title: String,
    pub content: String,
    pub category: Option<String>,
    pub target_audience: Vec<String>,
    pub target_classes: Vec<String>,
    pub priority: Option<String>,
    pub attachments: Vec<Attachment>,
    pub expires_at: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateAnnouncementRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub target_audience: Option<Vec<String>>,
    pub target_classes: Option<Vec<String>>,
    pub priority: Option<String>,
    pub attachments: Option<Vec<Attachment>>,
    pub expires_at: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AnnouncementQuery {
    pub category: Option<String>,
    pub priority: Option<String>,
    pub audience: Option<String>,
}
