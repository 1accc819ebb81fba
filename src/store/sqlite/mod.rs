use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::{debug, info};

use crate::store::records::{Article, PatientCase};
use crate::store::sqlite::queries::{ArticleQueries, PatientQueries};


pub mod queries;

pub use queries::PatientStats;

pub type DbPool = Pool<Sqlite>;

/// Relational mirror of the corpus. The vector store answers similarity
/// queries; this store answers the dashboard's aggregate queries.
#[derive(Debug, Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    pub async fn new<P: AsRef<Path>>(database_url: P) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_url)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .context("Failed to create database connection pool")?;

        let database = Self { pool };
        database.run_migrations().await?;

        Ok(database)
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("src/store/sqlite/migrations")
            .run(&self.pool)
            .await
            .context("Failed to run schema migration")?;

        debug!("Database migrations completed successfully");
        Ok(())
    }

    // Article operations
    pub async fn insert_articles(&self, articles: &[Article]) -> Result<()> {
        ArticleQueries::insert_batch(&self.pool, articles).await
    }

    pub async fn article_count(&self) -> Result<i64> {
        ArticleQueries::count(&self.pool).await
    }

    // Patient operations
    pub async fn insert_patients(&self, cases: &[PatientCase]) -> Result<()> {
        PatientQueries::insert_batch(&self.pool, cases).await
    }

    pub async fn patient_count(&self) -> Result<i64> {
        PatientQueries::count(&self.pool).await
    }

    pub async fn patient_stats(&self) -> Result<PatientStats> {
        PatientQueries::stats(&self.pool).await
    }

    pub async fn diagnosis_counts(&self) -> Result<Vec<(String, i64)>> {
        PatientQueries::diagnosis_counts(&self.pool).await
    }

    pub async fn symptom_counts(&self) -> Result<Vec<(String, i64)>> {
        PatientQueries::symptom_counts(&self.pool).await
    }
}
