
use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::store::records::{Article, PatientCase};

/// Corpus-wide headline numbers for the clinic dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientStats {
    pub total_patients: i64,
    pub critical_cases: i64,
}

pub struct ArticleQueries;

pub struct PatientQueries;

impl ArticleQueries {
    #[inline]
    pub async fn insert_batch(pool: &SqlitePool, articles: &[Article]) -> Result<()> {
        let mut tx = pool.begin().await.context("Failed to begin transaction")?;
        let now = Utc::now().naive_utc();

        for article in articles {
            sqlx::query(
                "INSERT INTO articles (id, title, abstract, created_date) VALUES (?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&article.title)
            .bind(&article.summary)
            .bind(now)
            .execute(&mut *tx)
            .await
            .context("Failed to insert article")?;
        }

        tx.commit().await.context("Failed to commit transaction")?;
        debug!("Inserted {} articles", articles.len());
        Ok(())
    }

    #[inline]
    pub async fn count(pool: &SqlitePool) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(1) FROM articles")
            .fetch_one(pool)
            .await
            .context("Failed to count articles")
    }
}

impl PatientQueries {
    #[inline]
    pub async fn insert_batch(pool: &SqlitePool, cases: &[PatientCase]) -> Result<()> {
        let mut tx = pool.begin().await.context("Failed to begin transaction")?;
        let now = Utc::now().naive_utc();

        for case in cases {
            sqlx::query(
                "INSERT INTO patients \
                 (id, patient_id, name, age, diagnosis, symptoms, medications, doctor_notes, lab_results, created_date) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&case.patient_id)
            .bind(&case.name)
            .bind(case.age)
            .bind(&case.diagnosis)
            .bind(&case.symptoms)
            .bind(&case.medications)
            .bind(&case.doctor_notes)
            .bind(&case.lab_results)
            .bind(now)
            .execute(&mut *tx)
            .await
            .context("Failed to insert patient case")?;
        }

        tx.commit().await.context("Failed to commit transaction")?;
        debug!("Inserted {} patient cases", cases.len());
        Ok(())
    }

    #[inline]
    pub async fn count(pool: &SqlitePool) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(1) FROM patients")
            .fetch_one(pool)
            .await
            .context("Failed to count patients")
    }

    /// Total and critical patient counts, in one pass.
    #[inline]
    pub async fn stats(pool: &SqlitePool) -> Result<PatientStats> {
        let row = sqlx::query(
            "SELECT COUNT(1) AS total_patients, \
                    COUNT(CASE WHEN diagnosis LIKE '%Critical%' THEN 1 END) AS critical_cases \
             FROM patients",
        )
        .fetch_one(pool)
        .await
        .context("Failed to fetch patient stats")?;

        Ok(PatientStats {
            total_patients: row.try_get("total_patients")?,
            critical_cases: row.try_get("critical_cases")?,
        })
    }

    /// Diagnosis frequency, most common first.
    #[inline]
    pub async fn diagnosis_counts(pool: &SqlitePool) -> Result<Vec<(String, i64)>> {
        grouped_counts(pool, "diagnosis").await
    }

    /// Symptom-string frequency, most common first.
    #[inline]
    pub async fn symptom_counts(pool: &SqlitePool) -> Result<Vec<(String, i64)>> {
        grouped_counts(pool, "symptoms").await
    }
}

async fn grouped_counts(pool: &SqlitePool, column: &str) -> Result<Vec<(String, i64)>> {
    // column is a compile-time constant from the two callers above, never user input
    let sql = format!(
        "SELECT {column} AS label, COUNT(1) AS n FROM patients \
         GROUP BY {column} ORDER BY n DESC, label ASC"
    );

    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .with_context(|| format!("Failed to fetch {column} counts"))?;

    rows.into_iter()
        .map(|row| -> Result<(String, i64)> {
            let label: String = row.try_get("label")?;
            let n: i64 = row.try_get("n")?;
            Ok((label, n))
        })
        .collect()
}
