use anyhow::{Context, Result};
use clap::ValueEnum;
use console::style;
use tracing::info;

use crate::config::{Config, get_config_dir};
use crate::embeddings::ollama::OllamaClient;
use crate::generation::cohere::CohereClient;
use crate::ingest::{Loader, read_articles, read_cases};
use crate::pipeline::{PromptStyle, RagOutcome, RagPipeline};
use crate::present;
use crate::stats::{age_by_diagnosis, term_frequencies};
use crate::store::sqlite::Database;
use crate::store::vectors::{ArticleRetriever, CaseRetriever, VectorStore};

/// Dominant terms shown in the clinic dashboard's term list.
const TERM_LIMIT: usize = 25;

/// Which corpus a `load` invocation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CorpusKind {
    Articles,
    Patients,
}

/// Answer a question against the article corpus
#[inline]
pub async fn ask(question: &str, limit: Option<usize>) -> Result<()> {
    let config = load_config()?;
    let top_k = limit.unwrap_or(config.retrieval.article_top_k);
    info!("Answering against the article corpus (top {})", top_k);

    let embedder = OllamaClient::new(&config).context("Failed to create embedding client")?;
    let generator = CohereClient::new(&config).context("Failed to create chat client")?;
    let vectors = VectorStore::open(&config)
        .await
        .context("Failed to open vector store")?;

    let retriever = ArticleRetriever::new(&embedder, &vectors);
    let pipeline = RagPipeline::new(&retriever, &generator, PromptStyle::Question, top_k);

    match pipeline.run(question).await? {
        RagOutcome::Answer { records, answer } => {
            present::print_articles(&records);
            present::print_answer(&answer);
        }
        RagOutcome::NoMatches => present::print_no_matches(),
    }

    Ok(())
}

/// Generate doctor notes and treatment suggestions from similar cases
#[inline]
pub async fn clinic(question: &str, limit: Option<usize>) -> Result<()> {
    let config = load_config()?;
    let top_k = limit.unwrap_or(config.retrieval.case_top_k);
    info!("Answering against the patient corpus (top {})", top_k);

    let embedder = OllamaClient::new(&config).context("Failed to create embedding client")?;
    let generator = CohereClient::new(&config).context("Failed to create chat client")?;
    let vectors = VectorStore::open(&config)
        .await
        .context("Failed to open vector store")?;
    let database = open_database(&config).await?;

    let retriever = CaseRetriever::new(&embedder, &vectors);
    let pipeline = RagPipeline::new(&retriever, &generator, PromptStyle::DoctorNotes, top_k);

    match pipeline.run(question).await? {
        RagOutcome::Answer { records, answer } => {
            present::print_cases(&records);
            present::print_answer(&answer);

            let cases: Vec<_> = records.into_iter().map(|r| r.record).collect();
            let note_texts: Vec<&str> = cases
                .iter()
                .flat_map(|case| [case.symptoms.as_str(), case.doctor_notes.as_str()])
                .collect();
            present::print_term_frequencies(
                "Dominant terms in similar cases",
                &term_frequencies(&note_texts, TERM_LIMIT),
            );
            present::print_age_summaries(&age_by_diagnosis(&cases));
        }
        RagOutcome::NoMatches => present::print_no_matches(),
    }

    let stats = database
        .patient_stats()
        .await
        .context("Failed to read corpus statistics")?;
    present::print_patient_stats(&stats);
    present::print_grouped_counts(
        "Cases per diagnosis",
        &database
            .diagnosis_counts()
            .await
            .context("Failed to read diagnosis counts")?,
    );
    present::print_grouped_counts(
        "Cases per symptom profile",
        &database
            .symptom_counts()
            .await
            .context("Failed to read symptom counts")?,
    );

    Ok(())
}

/// Load a JSON corpus file into the stores
#[inline]
pub async fn load(corpus: CorpusKind, file: &str) -> Result<()> {
    let config = load_config()?;
    let embedder = OllamaClient::new(&config).context("Failed to create embedding client")?;
    embedder
        .health_check()
        .context("Ollama is not reachable; is it running?")?;

    let vectors = VectorStore::open(&config)
        .await
        .context("Failed to open vector store")?;
    let database = open_database(&config).await?;
    let loader = Loader::new(&embedder, &vectors, &database);

    let loaded = match corpus {
        CorpusKind::Articles => {
            let articles = read_articles(file)?;
            loader.load_articles(&articles).await?
        }
        CorpusKind::Patients => {
            let cases = read_cases(file)?;
            loader.load_cases(&cases).await?
        }
    };

    println!("{}", style(format!("✓ Loaded {} records", loaded)).green());
    Ok(())
}

/// Show store sizes and service reachability
#[inline]
pub async fn show_status() -> Result<()> {
    let config = load_config()?;

    println!("{}", style("📊 Ragdash Status").bold().cyan());
    println!();

    match OllamaClient::new(&config).and_then(|client| client.ping().map(|()| client)) {
        Ok(_) => println!("  Ollama: {}", style("reachable").green()),
        Err(e) => println!("  Ollama: {} ({})", style("unreachable").red(), e),
    }
    println!(
        "  Chat API key: {}",
        if config.require_chat_api_key().is_ok() {
            style("present").green()
        } else {
            style("missing").red()
        }
    );
    println!();

    let vectors = VectorStore::open(&config)
        .await
        .context("Failed to open vector store")?;
    println!(
        "  Indexed articles: {}",
        style(vectors.article_count().await?).cyan()
    );
    println!(
        "  Indexed patient cases: {}",
        style(vectors.case_count().await?).cyan()
    );

    let database = open_database(&config).await?;
    let stats = database.patient_stats().await?;
    println!(
        "  Patient rows: {} ({} critical)",
        style(stats.total_patients).cyan(),
        style(stats.critical_cases).red()
    );
    println!(
        "  Article rows: {}",
        style(database.article_count().await?).cyan()
    );

    Ok(())
}

fn load_config() -> Result<Config> {
    let config_dir = get_config_dir()?;
    Config::load(&config_dir).context("Failed to load configuration")
}

async fn open_database(config: &Config) -> Result<Database> {
    let database = Database::new(config.database_path())
        .await
        .context("Failed to open database")?;
    Ok(database)
}
