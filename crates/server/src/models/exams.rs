use serde::{Deserialize, Serialize};
use sqlx::types::Json;

pub const EXAM_COLUMNS: &str = "id, title, description, semester, branch, duration, date, \
     is_active, created_by, created_at, updated_at";

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ExamRow {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub semester: i64,
    pub branch: String,
    pub duration: i64,
    pub date: String,
    pub is_active: bool,
    pub created_by: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QuestionRow {
    pub id: i64,
    pub position: i64,
    pub question: String,
    pub options: Json<Vec<String>>,
    pub correct_answer: i64,
    pub points: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub id: i64,
    pub position: i64,
    pub question: String,
    pub options: Vec<String>,
    pub points: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<i64>,
}

impl QuestionView {
    pub fn from_row(row: QuestionRow, reveal_answer: bool) -> Self {
        Self {
            id: row.id,
            position: row.position,
            question: row.question,
            options: row.options.0,
            points: row.points,
            correct_answer: reveal_answer.then_some(row.correct_answer),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSummary {
    #[serde(flatten)]
    pub exam: ExamRow,
    pub question_count: i64,
}

#[derive(Debug, sqlx::FromRow)]
pub struct ExamSummaryRow {
    #[sqlx(flatten)]
    pub exam: ExamRow,
    pub question_count: i64,
}

#[derive(Debug, Serialize)]
pub struct ExamDetail {
    #[serde(flatten)]
    pub exam: ExamRow,
    pub questions: Vec<QuestionView>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuestionInput {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: Option<i64>,
    pub points: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateExamRequest {
    pub title: String,
    pub description: Option<String>,
    pub semester: Option<i64>,
    pub branch: String,
    pub duration: Option<i64>,
    pub date: String,
    pub questions: Vec<QuestionInput>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubmittedAnswer {
    pub question_index: i64,
    pub selected_option: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SubmitExamRequest {
    pub answers: Vec<SubmittedAnswer>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitExamResponse {
    pub message: String,
    pub score: f64,
    pub max_score: f64,
}

/// Scores answers against `(correct_answer, points)` pairs indexed by
/// question position. Unanswered questions still count toward the maximum.
pub fn score_answers(questions: &[(i64, f64)], answers: &[SubmittedAnswer]) -> (f64, f64) {
    let mut score = 0.0;
    let mut max_score = 0.0;
    for (idx, (correct, points)) in questions.iter().enumerate() {
        max_score += points;
        let chosen = answers
            .iter()
            .find(|a| a.question_index == idx as i64)
            .and_then(|a| a.selected_option);
        if chosen == Some(*correct) {
            score += points;
        }
    }
    (score, max_score)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_matching_options_score() {
        let questions = [(1, 2.0), (0, 1.0), (3, 1.0)];
        let answers = [
            SubmittedAnswer {
                question_index: 0,
                selected_option: Some(1),
            },
            SubmittedAnswer {
                question_index: 1,
                selected_option: Some(2),
            },
        ];
        assert_eq!(score_answers(&questions, &answers), (2.0, 4.0));
        assert_eq!(score_answers(&questions, &[]), (0.0, 4.0));
    }
}
