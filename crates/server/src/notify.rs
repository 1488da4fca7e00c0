//! Outbound email/SMS notices. Delivery is logged only; no provider is wired.

use tracing::info;

use crate::models::users::UserRow;

pub struct Notifier {
    portal_url: String,
    institution: String,
}

impl Notifier {
    pub fn new(portal_url: impl Into<String>, institution: impl Into<String>) -> Self {
        Self {
            portal_url: portal_url.into().trim_end_matches('/').to_string(),
            institution: institution.into(),
        }
    }

    pub async fn send_email(&self, to: &str, subject: &str, body: &str) {
        info!(to, subject, body_len = body.len(), "email queued");
    }

    pub async fn send_sms(&self, to: &str, text: &str) {
        info!(to, text, "sms queued");
    }

    pub async fn notify_results(&self, student: &UserRow, semester_label: &str) {
        let subject = format!("Academic Results Published - {}", self.institution);
        let body = format!(
            "Hello {},\n\nYour examination results for {} have been published.\n\
             View the detailed marksheet at {}/dashboard/results",
            student.name, semester_label, self.portal_url
        );
        self.send_email(&student.email, &subject, &body).await;

        if let Some(phone) = student.phone.as_deref().filter(|p| !p.is_empty()) {
            let text = format!("Results for {semester_label} are out. Check the portal now.");
            self.send_sms(phone, &text).await;
        }
    }

    pub fn exam_url(&self, exam_id: i64) -> String {
        format!("{}/dashboard/exam/{exam_id}", self.portal_url)
    }

    pub async fn send_exam_link(&self, student: &UserRow, exam_title: &str, exam_id: i64) {
        let url = self.exam_url(exam_id);
        let subject = format!("{exam_title} Access - {}", self.institution);
        let body = format!(
            "Dear {},\n\nYou have been invited to take the online exam: {exam_title}.\n\
             Sign in with your portal credentials at {url}",
            student.name
        );
        self.send_email(&student.email, &subject, &body).await;

        if let Some(phone) = student.phone.as_deref().filter(|p| !p.is_empty()) {
            let text = format!("Exam alert: {exam_title} is now active. Access here: {url}");
            self.send_sms(phone, &text).await;
        }
    }
}
