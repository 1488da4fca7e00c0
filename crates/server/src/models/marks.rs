use serde::{Deserialize, Serialize};

pub const MARK_COLUMNS: &str = "id, student_id, student_usn, student_name, class_name, subject, \
     exam_type, max_marks, obtained_marks, date, uploaded_by, created_at, updated_at";

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MarkRow {
    pub id: i64,
    pub student_id: i64,
    pub student_usn: String,
    pub student_name: String,
    #[serde(rename = "class")]
    pub class_name: String,
    pub subject: String,
    pub exam_type: String,
    pub max_marks: f64,
    pub obtained_marks: f64,
    pub date: String,
    pub uploaded_by: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarksEntry {
    pub student_usn: String,
    pub student_name: Option<String>,
    pub obtained_marks: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UploadMarksRequest {
    pub marks_data: Vec<MarksEntry>,
    #[serde(rename = "class")]
    pub class_name: String,
    pub subject: String,
    pub exam_type: String,
    pub max_marks: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct UploadMarksResponse {
    pub message: String,
    pub count: usize,
    pub records: Vec<MarkRow>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MarksQuery {
    #[serde(rename = "studentUsn")]
    pub student_usn: Option<String>,
    #[serde(rename = "class")]
    pub class_name: Option<String>,
    pub subject: Option<String>,
    #[serde(rename = "examType")]
    pub exam_type: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarksStats {
    pub average_percentage: f64,
    pub total_results: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PublishRequest {
    pub branch: String,
    pub semester: Option<i64>,
}
