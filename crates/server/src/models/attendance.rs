use serde::{Deserialize, Serialize};

pub const STATUSES: [&str; 4] = ["present", "absent", "late", "excused"];

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRow {
    pub id: i64,
    pub student_id: i64,
    pub student_usn: String,
    pub student_name: String,
    #[serde(rename = "class")]
    pub class_name: String,
    pub subject: String,
    pub date: String,
    pub status: String,
    pub marked_by: i64,
    pub remarks: String,
    pub created_at: String,
    pub updated_at: String,
}

pub const ATTENDANCE_COLUMNS: &str = "id, student_id, student_usn, student_name, class_name, \
     subject, date, status, marked_by, remarks, created_at, updated_at";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AttendanceEntry {
    pub student_usn: String,
    pub student_name: Option<String>,
    pub status: String,
    pub remarks: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarkAttendanceRequest {
    #[serde(rename = "class")]
    pub class_name: String,
    pub subject: String,
    pub date: String,
    pub attendance_data: Vec<AttendanceEntry>,
}

#[derive(Debug, Serialize)]
pub struct MarkAttendanceResponse {
    pub message: String,
    pub count: usize,
    pub records: Vec<AttendanceRow>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AttendanceQuery {
    #[serde(rename = "studentUsn")]
    pub student_usn: Option<String>,
    #[serde(rename = "class")]
    pub class_name: Option<String>,
    pub subject: Option<String>,
    pub date: Option<String>,
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(total: i64, page: i64, limit: i64) -> Self {
        let pages = if limit > 0 { (total + limit - 1) / limit } else { 0 };
        Self {
            total,
            page,
            limit,
            pages,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AttendanceListResponse {
    pub records: Vec<AttendanceRow>,
    pub pagination: Pagination,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ReportQuery {
    #[serde(rename = "studentUsn")]
    pub student_usn: Option<String>,
    #[serde(rename = "class")]
    pub class_name: Option<String>,
    pub subject: Option<String>,
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
}

#[derive(Debug, Default, PartialEq, Serialize)]
pub struct ReportStats {
    pub total: i64,
    pub present: i64,
    pub absent: i64,
    pub late: i64,
    pub excused: i64,
    pub percentage: f64,
}

impl ReportStats {
    /// Tallies statuses; percentage is present over total, two decimals.
    pub fn tally<'a>(statuses: impl IntoIterator<Item = &'a str>) -> Self {
        let mut stats = Self::default();
        for status in statuses {
            stats.total += 1;
            match status {
                "present" => stats.present += 1,
                "absent" => stats.absent += 1,
                "late" => stats.late += 1,
                "excused" => stats.excused += 1,
                _ => {}
            }
        }
        if stats.total > 0 {
            let pct = stats.present as f64 * 100.0 / stats.total as f64;
            stats.percentage = (pct * 100.0).round() / 100.0;
        }
        stats
    }
}

#[derive(Debug, Serialize)]
pub struct AttendanceReport {
    pub stats: ReportStats,
    pub records: Vec<AttendanceRow>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ClassQuery {
    #[serde(rename = "class")]
    pub class_name: Option<String>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ClassStudent {
    pub id: i64,
    pub name: String,
    pub usn: Option<String>,
    pub email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceStats {
    pub total_records: i64,
    pub present_records: i64,
    pub percentage: f64,
}
