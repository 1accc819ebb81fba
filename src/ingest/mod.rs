//! Corpus loading: parse a JSON corpus file, embed each row, and persist it
//! to the vector store and the relational store in lockstep.

#[cfg(test)]
mod tests;

use std::fs;
use std::path::Path;

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::Result;
use crate::embeddings::ollama::OllamaClient;
use crate::store::records::{Article, PatientCase};
use crate::store::sqlite::Database;
use crate::store::vectors::VectorStore;

/// Rows embedded and written per pass. Keeps one failed batch from
/// discarding the whole load.
const LOAD_BATCH_SIZE: usize = 32;

/// Parse a JSON array of articles from `path`.
#[inline]
pub fn read_articles<P: AsRef<Path>>(path: P) -> Result<Vec<Article>> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read corpus file: {}", path.display()))?;
    let articles: Vec<Article> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse articles from: {}", path.display()))?;
    Ok(articles)
}

/// Parse a JSON array of patient cases from `path`.
#[inline]
pub fn read_cases<P: AsRef<Path>>(path: P) -> Result<Vec<PatientCase>> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read corpus file: {}", path.display()))?;
    let cases: Vec<PatientCase> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse patient cases from: {}", path.display()))?;
    Ok(cases)
}

/// Writes embedded corpus rows into both stores.
pub struct Loader<'a> {
    embedder: &'a OllamaClient,
    vectors: &'a VectorStore,
    database: &'a Database,
}

impl<'a> Loader<'a> {
    #[inline]
    pub fn new(embedder: &'a OllamaClient, vectors: &'a VectorStore, database: &'a Database) -> Self {
        Self {
            embedder,
            vectors,
            database,
        }
    }

    /// Embed and store `articles`, returning the number loaded.
    #[inline]
    pub async fn load_articles(&self, articles: &[Article]) -> Result<usize> {
        if articles.is_empty() {
            info!("Article corpus is empty; nothing to load");
            return Ok(0);
        }

        let bar = progress_bar(articles.len(), "articles");
        let mut loaded = 0;

        for batch in articles.chunks(LOAD_BATCH_SIZE) {
            let texts: Vec<String> = batch.iter().map(Article::embedding_text).collect();
            let embeddings = self.embedder.generate_embeddings_batch(&texts)?;

            let rows: Vec<(Article, Vec<f32>)> = batch
                .iter()
                .cloned()
                .zip(embeddings.into_iter())
                .collect();
            self.vectors.add_articles(&rows).await?;
            self.database.insert_articles(batch).await?;

            loaded += batch.len();
            bar.set_position(loaded as u64);
            debug!("Loaded batch of {} articles", batch.len());
        }

        bar.finish_and_clear();
        info!("Loaded {} articles", loaded);
        Ok(loaded)
    }

    /// Embed and store patient `cases`, returning the number loaded.
    #[inline]
    pub async fn load_cases(&self, cases: &[PatientCase]) -> Result<usize> {
        if cases.is_empty() {
            info!("Patient corpus is empty; nothing to load");
            return Ok(0);
        }

        let bar = progress_bar(cases.len(), "patient cases");
        let mut loaded = 0;

        for batch in cases.chunks(LOAD_BATCH_SIZE) {
            let texts: Vec<String> = batch.iter().map(PatientCase::embedding_text).collect();
            let embeddings = self.embedder.generate_embeddings_batch(&texts)?;

            let rows: Vec<(PatientCase, Vec<f32>)> = batch
                .iter()
                .cloned()
                .zip(embeddings.into_iter())
                .collect();
            self.vectors.add_cases(&rows).await?;
            self.database.insert_patients(batch).await?;

            loaded += batch.len();
            bar.set_position(loaded as u64);
            debug!("Loaded batch of {} patient cases", batch.len());
        }

        bar.finish_and_clear();
        info!("Loaded {} patient cases", loaded);
        Ok(loaded)
    }
}

fn progress_bar(total: usize, noun: &str) -> ProgressBar {
    let bar = if console::user_attended_stderr() {
        ProgressBar::new(total as u64).with_style(
            ProgressStyle::with_template("{spinner} [{pos}/{len}] Embedding {msg}")
                .expect("style template is valid"),
        )
    } else {
        ProgressBar::hidden()
    };
    bar.set_message(noun.to_string());
    bar
}
