use serde::{Deserialize, Serialize};

use crate::ai::HistoryTurn;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChatRequest {
    pub message: String,
    pub history: Vec<HistoryTurn>,
    pub context: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicStats {
    pub students: i64,
    pub faculty: i64,
    pub notices: i64,
    pub uptime: f64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
