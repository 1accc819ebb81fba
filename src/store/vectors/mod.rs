
use arrow::array::{Array, FixedSizeListArray, Float32Array, Int64Array, RecordBatchIterator, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::{
    Connection,
    query::{ExecutableQuery, QueryBase},
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::Config;
use crate::embeddings::OllamaClient;
use crate::pipeline::{Retrieved, Retriever};
use crate::store::records::{Article, PatientCase};
use crate::{RagError, Result};
use async_trait::async_trait;

const ARTICLES_TABLE: &str = "articles";
const CASES_TABLE: &str = "patients";

/// Vector store over LanceDB: one table per corpus, each holding a
/// fixed-size f32 vector column alongside the record's text fields.
/// Opened per invocation; dropping it releases the connection.
pub struct VectorStore {
    connection: Connection,
    dimension: usize,
}

impl VectorStore {
    /// Connect to the vector database under the configured base directory,
    /// creating both corpus tables if they do not exist yet.
    #[inline]
    pub async fn open(config: &Config) -> Result<Self> {
        let db_path = config.vector_database_path();
        debug!("Opening LanceDB at path: {:?}", db_path);

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                RagError::Connection(format!("Failed to create vector database directory: {}", e))
            })?;
        }

        let uri = format!("file://{}", db_path.display());
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| RagError::Connection(format!("Failed to connect to LanceDB: {}", e)))?;

        let store = Self {
            connection,
            dimension: config.ollama.embedding_dimension as usize,
        };

        store
            .ensure_table(ARTICLES_TABLE, store.article_schema())
            .await?;
        store.ensure_table(CASES_TABLE, store.case_schema()).await?;

        Ok(store)
    }

    async fn ensure_table(&self, name: &str, schema: Arc<Schema>) -> Result<()> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| RagError::Connection(format!("Failed to list tables: {}", e)))?;

        if table_names.contains(&name.to_string()) {
            return Ok(());
        }

        info!("Creating {} table with {} dimensions", name, self.dimension);
        self.connection
            .create_empty_table(name, schema)
            .execute()
            .await
            .map_err(|e| RagError::Connection(format!("Failed to create table {}: {}", name, e)))?;

        Ok(())
    }

    fn vector_field(&self) -> Field {
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, false)),
                self.dimension as i32,
            ),
            false,
        )
    }

    fn article_schema(&self) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            self.vector_field(),
            Field::new("title", DataType::Utf8, false),
            Field::new("abstract", DataType::Utf8, false),
        ]))
    }

    fn case_schema(&self) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            self.vector_field(),
            Field::new("patient_id", DataType::Utf8, false),
            Field::new("name", DataType::Utf8, false),
            Field::new("age", DataType::Int64, false),
            Field::new("diagnosis", DataType::Utf8, false),
            Field::new("symptoms", DataType::Utf8, false),
            Field::new("medications", DataType::Utf8, false),
            Field::new("doctor_notes", DataType::Utf8, false),
            Field::new("lab_results", DataType::Utf8, false),
        ]))
    }

    fn vector_array(&self, vectors: &[&[f32]]) -> Result<FixedSizeListArray> {
        for vector in vectors {
            if vector.len() != self.dimension {
                return Err(RagError::Query(format!(
                    "Embedding dimension mismatch: expected {}, got {}",
                    self.dimension,
                    vector.len()
                )));
            }
        }

        let mut flat_values = Vec::with_capacity(vectors.len() * self.dimension);
        for vector in vectors {
            flat_values.extend_from_slice(vector);
        }
        let values_array = Float32Array::from(flat_values);
        let field = Arc::new(Field::new("item", DataType::Float32, false));
        FixedSizeListArray::try_new(field, self.dimension as i32, Arc::new(values_array), None)
            .map_err(|e| RagError::Query(format!("Failed to create vector array: {}", e)))
    }

    async fn append_batch(&self, table_name: &str, batch: RecordBatch) -> Result<()> {
        let table = self
            .connection
            .open_table(table_name)
            .execute()
            .await
            .map_err(|e| RagError::Connection(format!("Failed to open table: {}", e)))?;

        let schema = batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| RagError::Query(format!("Failed to insert into {}: {}", table_name, e)))?;

        Ok(())
    }

    /// Store a batch of articles with their embeddings.
    #[inline]
    pub async fn add_articles(&self, rows: &[(Article, Vec<f32>)]) -> Result<()> {
        if rows.is_empty() {
            debug!("No articles to store");
            return Ok(());
        }

        let ids: Vec<String> = rows.iter().map(|_| uuid::Uuid::new_v4().to_string()).collect();
        let vectors: Vec<&[f32]> = rows.iter().map(|(_, v)| v.as_slice()).collect();
        let titles: Vec<&str> = rows.iter().map(|(a, _)| a.title.as_str()).collect();
        let summaries: Vec<&str> = rows.iter().map(|(a, _)| a.summary.as_str()).collect();

        let arrays: Vec<Arc<dyn Array>> = vec![
            Arc::new(StringArray::from(
                ids.iter().map(String::as_str).collect::<Vec<_>>(),
            )),
            Arc::new(self.vector_array(&vectors)?),
            Arc::new(StringArray::from(titles)),
            Arc::new(StringArray::from(summaries)),
        ];

        let batch = RecordBatch::try_new(self.article_schema(), arrays)
            .map_err(|e| RagError::Query(format!("Failed to create record batch: {}", e)))?;

        self.append_batch(ARTICLES_TABLE, batch).await?;
        info!("Stored {} articles", rows.len());
        Ok(())
    }

    /// Store a batch of patient cases with their embeddings.
    #[inline]
    pub async fn add_cases(&self, rows: &[(PatientCase, Vec<f32>)]) -> Result<()> {
        if rows.is_empty() {
            debug!("No patient cases to store");
            return Ok(());
        }

        let ids: Vec<String> = rows.iter().map(|_| uuid::Uuid::new_v4().to_string()).collect();
        let vectors: Vec<&[f32]> = rows.iter().map(|(_, v)| v.as_slice()).collect();

        let arrays: Vec<Arc<dyn Array>> = vec![
            Arc::new(StringArray::from(
                ids.iter().map(String::as_str).collect::<Vec<_>>(),
            )),
            Arc::new(self.vector_array(&vectors)?),
            Arc::new(StringArray::from(
                rows.iter().map(|(c, _)| c.patient_id.as_str()).collect::<Vec<_>>(),
            )),
            Arc::new(StringArray::from(
                rows.iter().map(|(c, _)| c.name.as_str()).collect::<Vec<_>>(),
            )),
            Arc::new(Int64Array::from(
                rows.iter().map(|(c, _)| c.age).collect::<Vec<_>>(),
            )),
            Arc::new(StringArray::from(
                rows.iter().map(|(c, _)| c.diagnosis.as_str()).collect::<Vec<_>>(),
            )),
            Arc::new(StringArray::from(
                rows.iter().map(|(c, _)| c.symptoms.as_str()).collect::<Vec<_>>(),
            )),
            Arc::new(StringArray::from(
                rows.iter().map(|(c, _)| c.medications.as_str()).collect::<Vec<_>>(),
            )),
            Arc::new(StringArray::from(
                rows.iter().map(|(c, _)| c.doctor_notes.as_str()).collect::<Vec<_>>(),
            )),
            Arc::new(StringArray::from(
                rows.iter().map(|(c, _)| c.lab_results.as_str()).collect::<Vec<_>>(),
            )),
        ];

        let batch = RecordBatch::try_new(self.case_schema(), arrays)
            .map_err(|e| RagError::Query(format!("Failed to create record batch: {}", e)))?;

        self.append_batch(CASES_TABLE, batch).await?;
        info!("Stored {} patient cases", rows.len());
        Ok(())
    }

    /// Top-K article search, ascending by vector distance.
    #[inline]
    pub async fn search_articles(
        &self,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<Retrieved<Article>>> {
        let batches = self.search(ARTICLES_TABLE, query_vector, limit).await?;

        let mut results = Vec::new();
        for batch in &batches {
            let titles = string_column(batch, "title")?;
            let summaries = string_column(batch, "abstract")?;
            let distances = distance_column(batch);

            for row in 0..batch.num_rows() {
                results.push(Retrieved {
                    record: Article {
                        title: titles.value(row).to_string(),
                        summary: summaries.value(row).to_string(),
                    },
                    distance: distance_at(distances, row),
                });
            }
        }

        debug!("Parsed {} article results", results.len());
        Ok(results)
    }

    /// Top-K patient-case search, ascending by vector distance.
    #[inline]
    pub async fn search_cases(
        &self,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<Retrieved<PatientCase>>> {
        let batches = self.search(CASES_TABLE, query_vector, limit).await?;

        let mut results = Vec::new();
        for batch in &batches {
            let patient_ids = string_column(batch, "patient_id")?;
            let names = string_column(batch, "name")?;
            let ages = i64_column(batch, "age")?;
            let diagnoses = string_column(batch, "diagnosis")?;
            let symptoms = string_column(batch, "symptoms")?;
            let medications = string_column(batch, "medications")?;
            let doctor_notes = string_column(batch, "doctor_notes")?;
            let lab_results = string_column(batch, "lab_results")?;
            let distances = distance_column(batch);

            for row in 0..batch.num_rows() {
                results.push(Retrieved {
                    record: PatientCase {
                        patient_id: patient_ids.value(row).to_string(),
                        name: names.value(row).to_string(),
                        age: ages.value(row),
                        diagnosis: diagnoses.value(row).to_string(),
                        symptoms: symptoms.value(row).to_string(),
                        medications: medications.value(row).to_string(),
                        doctor_notes: doctor_notes.value(row).to_string(),
                        lab_results: lab_results.value(row).to_string(),
                    },
                    distance: distance_at(distances, row),
                });
            }
        }

        debug!("Parsed {} case results", results.len());
        Ok(results)
    }

    async fn search(
        &self,
        table_name: &str,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<RecordBatch>> {
        debug!("Searching {} with limit: {}", table_name, limit);

        let table = self
            .connection
            .open_table(table_name)
            .execute()
            .await
            .map_err(|e| RagError::Connection(format!("Failed to open table: {}", e)))?;

        let results = table
            .vector_search(query_vector)
            .map_err(|e| RagError::Query(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .limit(limit)
            .execute()
            .await
            .map_err(|e| RagError::Query(format!("Failed to execute search: {}", e)))?;

        results
            .try_collect()
            .await
            .map_err(|e| RagError::Query(format!("Failed to read result stream: {}", e)))
    }

    /// Number of stored articles.
    #[inline]
    pub async fn article_count(&self) -> Result<u64> {
        self.count(ARTICLES_TABLE).await
    }

    /// Number of stored patient cases.
    #[inline]
    pub async fn case_count(&self) -> Result<u64> {
        self.count(CASES_TABLE).await
    }

    async fn count(&self, table_name: &str) -> Result<u64> {
        let table = self
            .connection
            .open_table(table_name)
            .execute()
            .await
            .map_err(|e| RagError::Connection(format!("Failed to open table: {}", e)))?;

        let count = table
            .count_rows(None)
            .await
            .map_err(|e| RagError::Query(format!("Failed to count rows: {}", e)))?;

        Ok(count as u64)
    }
}

/// Article retrieval: embed the query text, then top-K search. One embedding
/// round-trip plus one store round-trip per call.
pub struct ArticleRetriever<'a> {
    embedder: &'a OllamaClient,
    store: &'a VectorStore,
}

impl<'a> ArticleRetriever<'a> {
    #[inline]
    pub fn new(embedder: &'a OllamaClient, store: &'a VectorStore) -> Self {
        Self { embedder, store }
    }
}

#[async_trait]
impl Retriever for ArticleRetriever<'_> {
    type Record = Article;

    #[inline]
    async fn retrieve(&self, query: &str, limit: usize) -> Result<Vec<Retrieved<Article>>> {
        let query_vector = self
            .embedder
            .generate_embedding(query)
            .map_err(|e| RagError::Embedding(e.to_string()))?;
        self.store.search_articles(&query_vector, limit).await
    }
}

/// Patient-case retrieval for the clinic dashboard.
pub struct CaseRetriever<'a> {
    embedder: &'a OllamaClient,
    store: &'a VectorStore,
}

impl<'a> CaseRetriever<'a> {
    #[inline]
    pub fn new(embedder: &'a OllamaClient, store: &'a VectorStore) -> Self {
        Self { embedder, store }
    }
}

#[async_trait]
impl Retriever for CaseRetriever<'_> {
    type Record = PatientCase;

    #[inline]
    async fn retrieve(&self, query: &str, limit: usize) -> Result<Vec<Retrieved<PatientCase>>> {
        let query_vector = self
            .embedder
            .generate_embedding(query)
            .map_err(|e| RagError::Embedding(e.to_string()))?;
        self.store.search_cases(&query_vector, limit).await
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| RagError::Query(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| RagError::Query(format!("Invalid {} column type", name)))
}

fn i64_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Int64Array> {
    batch
        .column_by_name(name)
        .ok_or_else(|| RagError::Query(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<Int64Array>()
        .ok_or_else(|| RagError::Query(format!("Invalid {} column type", name)))
}

fn distance_column(batch: &RecordBatch) -> Option<&Float32Array> {
    batch
        .column_by_name("_distance")
        .and_then(|col| col.as_any().downcast_ref::<Float32Array>())
}

fn distance_at(distances: Option<&Float32Array>, row: usize) -> f32 {
    distances.map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) })
}
