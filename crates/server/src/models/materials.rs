use serde::{Deserialize, Serialize};

use super::attendance::Pagination;
use super::users::UserRef;

pub const MAX_URL_LEN: usize = 2048;

#[derive(Debug, sqlx::FromRow)]
pub struct MaterialRow {
    pub id: i64,
    pub title: String,
    pub subject: String,
    pub class_name: String,
    pub kind: String,
    pub file_url: String,
    pub size: String,
    pub uploaded_by: i64,
    pub uploader_name: String,
    pub uploader_role: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialResponse {
    pub id: i64,
    pub title: String,
    pub subject: String,
    #[serde(rename = "class")]
    pub class_name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub file_url: String,
    pub size: String,
    pub uploaded_by: UserRef,
    pub created_at: String,
    pub updated_at: String,
}

impl From<MaterialRow> for MaterialResponse {
    fn from(row: MaterialRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            subject: row.subject,
            class_name: row.class_name,
            kind: row.kind,
            file_url: row.file_url,
            size: row.size,
            uploaded_by: UserRef {
                id: row.uploaded_by,
                name: row.uploader_name,
                email: None,
                role: Some(row.uploader_role),
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UploadMaterialRequest {
    pub title: String,
    pub subject: String,
    #[serde(rename = "class")]
    pub class_name: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub file_url: String,
    pub size: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MaterialQuery {
    #[serde(rename = "class")]
    pub class_name: Option<String>,
    pub subject: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct MaterialListResponse {
    pub materials: Vec<MaterialResponse>,
    pub pagination: Pagination,
}

/// Materials are links to external storage; inline data URIs and oversized
/// URLs are refused.
pub fn is_link_only(url: &str) -> bool {
    !url.starts_with("data:") && url.len() <= MAX_URL_LEN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_uris_and_long_urls_are_rejected() {
        assert!(is_link_only("https://drive.example.com/file/abc"));
        assert!(!is_link_only("data:application/pdf;base64,JVBERi0x"));
        assert!(!is_link_only(&format!("https://x.io/{}", "a".repeat(MAX_URL_LEN))));
    }
}
