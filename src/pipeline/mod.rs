//! The retrieval-augmented generation pass.
//!
//! One submission drives one strictly forward pass: retrieve the most similar
//! records, assemble their text into a context block, build a prompt, and
//! request a generated answer. No step is retried and nothing outlives the
//! invocation. The seams (`Retriever`, `AnswerGenerator`) exist so the pass
//! can be exercised without a store or a hosted service behind it.

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use itertools::Itertools;
use tracing::{debug, info};

use crate::{RagError, Result};

/// Delimiter between formatted records in a context block.
pub const RECORD_DELIMITER: &str = "\n\n";

/// A record that can contribute one formatted line to a context block.
pub trait ContextRecord {
    /// `<label>: <field1>, <field2>, ...` — the record's contribution to the
    /// assembled context, in its domain's phrasing.
    fn context_line(&self) -> String;
}

/// A retrieved record together with its vector distance. Array position is
/// the rank; rank 0 is the most similar.
#[derive(Debug, Clone, PartialEq)]
pub struct Retrieved<R> {
    pub record: R,
    pub distance: f32,
}

/// Similarity retrieval seam: query text in, ranked records out.
#[async_trait]
pub trait Retriever {
    type Record: ContextRecord;

    /// Return at most `limit` records, ascending by vector distance.
    async fn retrieve(&self, query: &str, limit: usize) -> Result<Vec<Retrieved<Self::Record>>>;
}

/// Answer generation seam: one prompt in, generated text out.
pub trait AnswerGenerator {
    fn generate(&self, prompt: &str) -> Result<String>;
}

/// Instruction phrasing appended after the context block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptStyle {
    /// `Answer the question: <query>`
    Question,
    /// `Generate doctor notes and treatment suggestions.`
    DoctorNotes,
}

/// Outcome of one pipeline pass. Zero retrieved records is a valid terminal
/// state, not an error; generation is skipped in that case.
#[derive(Debug, Clone, PartialEq)]
pub enum RagOutcome<R> {
    Answer {
        records: Vec<Retrieved<R>>,
        answer: String,
    },
    NoMatches,
}

/// Join the records' context lines in rank order. Empty input yields an
/// empty string, which the pipeline treats as the skip-generation signal.
#[inline]
pub fn assemble_context<R: ContextRecord>(records: &[Retrieved<R>]) -> String {
    records
        .iter()
        .map(|r| r.record.context_line())
        .join(RECORD_DELIMITER)
}

/// Build the prompt sent to the chat service. Deterministic: the same
/// context and question always produce the same bytes.
#[inline]
pub fn build_prompt(style: PromptStyle, context: &str, question: &str) -> String {
    match style {
        PromptStyle::Question => format!(
            "Using this context:\n{}\n\nAnswer the question: {}",
            context, question
        ),
        PromptStyle::DoctorNotes => format!(
            "Using this context:\n{}\n\nGenerate doctor notes and treatment suggestions.",
            context
        ),
    }
}

/// One-shot RAG pipeline over a retriever and a generator.
pub struct RagPipeline<'a, R, G> {
    retriever: &'a R,
    generator: &'a G,
    style: PromptStyle,
    top_k: usize,
}

impl<'a, R, G> RagPipeline<'a, R, G>
where
    R: Retriever + Sync,
    G: AnswerGenerator + Sync,
{
    #[inline]
    pub fn new(retriever: &'a R, generator: &'a G, style: PromptStyle, top_k: usize) -> Self {
        Self {
            retriever,
            generator,
            style,
            top_k,
        }
    }

    /// Run one forward pass for `question`.
    ///
    /// An empty question short-circuits before retrieval. An empty retrieval
    /// result (or one whose context trims to nothing) returns
    /// [`RagOutcome::NoMatches`] without touching the generator. Any
    /// retrieval or generation failure aborts the remaining steps.
    #[inline]
    pub async fn run(&self, question: &str) -> Result<RagOutcome<R::Record>> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RagError::EmptyQuery);
        }

        debug!("Retrieving top {} records", self.top_k);
        let records = self.retriever.retrieve(question, self.top_k).await?;
        info!("Retrieved {} records", records.len());

        let context = assemble_context(&records);
        if context.trim().is_empty() {
            info!("No relevant records; skipping generation");
            return Ok(RagOutcome::NoMatches);
        }

        let prompt = build_prompt(self.style, &context, question);
        debug!("Submitting prompt ({} bytes)", prompt.len());
        let answer = self.generator.generate(&prompt)?;

        Ok(RagOutcome::Answer { records, answer })
    }
}
