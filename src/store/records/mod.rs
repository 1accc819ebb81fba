
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::pipeline::ContextRecord;

/// A knowledge article: the record behind the Q&A dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Article {
    pub title: String,
    #[serde(rename = "abstract")]
    #[sqlx(rename = "abstract")]
    pub summary: String,
}

/// A patient case: the record behind the clinic dashboard. Field set matches
/// the similar-case projection the dashboard displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PatientCase {
    pub patient_id: String,
    pub name: String,
    pub age: i64,
    pub diagnosis: String,
    pub symptoms: String,
    pub medications: String,
    pub doctor_notes: String,
    pub lab_results: String,
}

impl ContextRecord for Article {
    #[inline]
    fn context_line(&self) -> String {
        format!("{}: {}", self.title, self.summary)
    }
}

impl ContextRecord for PatientCase {
    #[inline]
    fn context_line(&self) -> String {
        format!(
            "Patient {}: {}, {}. Notes: {}",
            self.name, self.diagnosis, self.symptoms, self.doctor_notes
        )
    }
}

impl Article {
    /// Text embedded for similarity search; same shape as the context line so
    /// query and corpus live in the same space.
    #[inline]
    pub fn embedding_text(&self) -> String {
        self.context_line()
    }
}

impl PatientCase {
    /// Text embedded for similarity search: the clinical free-text fields.
    #[inline]
    pub fn embedding_text(&self) -> String {
        format!(
            "{} {} {} {} {}",
            self.diagnosis, self.symptoms, self.medications, self.doctor_notes, self.lab_results
        )
    }
}
