use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, PartialEq)]
struct StubArticle {
    title: String,
    summary: String,
}

impl ContextRecord for StubArticle {
    fn context_line(&self) -> String {
        format!("{}: {}", self.title, self.summary)
    }
}

/// Record whose context line is pure whitespace, for the trim check.
#[derive(Debug, Clone, PartialEq)]
struct BlankRecord;

impl ContextRecord for BlankRecord {
    fn context_line(&self) -> String {
        "   ".to_string()
    }
}

struct StubRetriever<R> {
    result: std::result::Result<Vec<Retrieved<R>>, String>,
    calls: AtomicUsize,
}

impl<R> StubRetriever<R> {
    fn returning(records: Vec<Retrieved<R>>) -> Self {
        Self {
            result: Ok(records),
            calls: AtomicUsize::new(0),
        }
    }

    fn failing_with_connection_error() -> Self {
        Self {
            result: Err("store unreachable".to_string()),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl<R: ContextRecord + Clone + Send + Sync> Retriever for StubRetriever<R> {
    type Record = R;

    async fn retrieve(&self, _query: &str, limit: usize) -> Result<Vec<Retrieved<R>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.result {
            Ok(records) => Ok(records.iter().take(limit).cloned().collect()),
            Err(msg) => Err(RagError::Connection(msg.clone())),
        }
    }
}

struct CountingGenerator {
    calls: AtomicUsize,
    response: std::result::Result<String, String>,
    last_prompt: std::sync::Mutex<Option<String>>,
}

impl CountingGenerator {
    fn answering(text: &str) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            response: Ok(text.to_string()),
            last_prompt: std::sync::Mutex::new(None),
        }
    }

    fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            response: Err("quota exceeded".to_string()),
            last_prompt: std::sync::Mutex::new(None),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AnswerGenerator for CountingGenerator {
    fn generate(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self
            .last_prompt
            .lock()
            .expect("prompt mutex should not be poisoned") = Some(prompt.to_string());
        match &self.response {
            Ok(text) => Ok(text.clone()),
            Err(msg) => Err(RagError::Generation(msg.clone())),
        }
    }
}

fn articles(pairs: &[(&str, &str)]) -> Vec<Retrieved<StubArticle>> {
    pairs
        .iter()
        .enumerate()
        .map(|(rank, (title, summary))| Retrieved {
            record: StubArticle {
                title: (*title).to_string(),
                summary: (*summary).to_string(),
            },
            distance: rank as f32 * 0.1,
        })
        .collect()
}

#[tokio::test]
async fn context_and_prompt_for_three_articles() {
    let retriever = StubRetriever::returning(articles(&[
        ("T1", "A1"),
        ("T2", "A2"),
        ("T3", "A3"),
    ]));
    let generator = CountingGenerator::answering("An answer.");
    let pipeline = RagPipeline::new(&retriever, &generator, PromptStyle::Question, 3);

    let outcome = pipeline
        .run("What is diabetes?")
        .await
        .expect("pipeline should succeed");

    match outcome {
        RagOutcome::Answer { records, answer } => {
            assert_eq!(records.len(), 3);
            assert_eq!(answer, "An answer.");
        }
        RagOutcome::NoMatches => panic!("Expected an answer"),
    }

    let prompt = generator
        .last_prompt
        .lock()
        .expect("prompt mutex should not be poisoned")
        .clone()
        .expect("generator should have been called");
    assert_eq!(
        prompt,
        "Using this context:\nT1: A1\n\nT2: A2\n\nT3: A3\n\nAnswer the question: What is diabetes?"
    );
}

#[tokio::test]
async fn zero_records_skips_generation() {
    let retriever = StubRetriever::<StubArticle>::returning(Vec::new());
    let generator = CountingGenerator::answering("should never appear");
    let pipeline = RagPipeline::new(&retriever, &generator, PromptStyle::Question, 3);

    let outcome = pipeline
        .run("xyzzynonexistent")
        .await
        .expect("pipeline should succeed");

    assert_eq!(outcome, RagOutcome::NoMatches);
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn whitespace_only_context_skips_generation() {
    let retriever = StubRetriever::returning(vec![Retrieved {
        record: BlankRecord,
        distance: 0.0,
    }]);
    let generator = CountingGenerator::answering("should never appear");
    let pipeline = RagPipeline::new(&retriever, &generator, PromptStyle::Question, 3);

    let outcome = pipeline
        .run("anything")
        .await
        .expect("pipeline should succeed");

    assert_eq!(outcome, RagOutcome::NoMatches);
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn empty_question_short_circuits_before_retrieval() {
    let retriever = StubRetriever::returning(articles(&[("T1", "A1")]));
    let generator = CountingGenerator::answering("unused");
    let pipeline = RagPipeline::new(&retriever, &generator, PromptStyle::Question, 3);

    let err = pipeline.run("   ").await.expect_err("should fail");
    assert!(matches!(err, RagError::EmptyQuery));
    assert_eq!(retriever.calls.load(Ordering::SeqCst), 0);
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn connection_error_aborts_before_assembly_and_generation() {
    let retriever = StubRetriever::<StubArticle>::failing_with_connection_error();
    let generator = CountingGenerator::answering("unused");
    let pipeline = RagPipeline::new(&retriever, &generator, PromptStyle::Question, 3);

    let err = pipeline.run("anything").await.expect_err("should fail");
    assert!(matches!(err, RagError::Connection(_)));
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn generation_error_discards_the_context() {
    let retriever = StubRetriever::returning(articles(&[("T1", "A1")]));
    let generator = CountingGenerator::failing();
    let pipeline = RagPipeline::new(&retriever, &generator, PromptStyle::Question, 3);

    let err = pipeline.run("anything").await.expect_err("should fail");
    match err {
        RagError::Generation(msg) => assert_eq!(msg, "quota exceeded"),
        other => panic!("Expected generation error, got {:?}", other),
    }
    assert_eq!(generator.call_count(), 1);
}

#[tokio::test]
async fn retrieval_respects_the_limit() {
    let retriever = StubRetriever::returning(articles(&[
        ("T1", "A1"),
        ("T2", "A2"),
        ("T3", "A3"),
        ("T4", "A4"),
    ]));
    let generator = CountingGenerator::answering("ok");
    let pipeline = RagPipeline::new(&retriever, &generator, PromptStyle::Question, 2);

    let outcome = pipeline
        .run("anything")
        .await
        .expect("pipeline should succeed");

    match outcome {
        RagOutcome::Answer { records, .. } => {
            assert_eq!(records.len(), 2);
            assert!(records.windows(2).all(|w| w[0].distance <= w[1].distance));
        }
        RagOutcome::NoMatches => panic!("Expected an answer"),
    }
}

#[test]
fn context_assembly_preserves_rank_order_and_delimiter() {
    let records = articles(&[("T1", "A1"), ("T2", "A2"), ("T3", "A3")]);
    let context = assemble_context(&records);

    assert_eq!(context, "T1: A1\n\nT2: A2\n\nT3: A3");
    assert_eq!(context.split(RECORD_DELIMITER).count(), records.len());
    for (rank, (title, _)) in [("T1", "A1"), ("T2", "A2"), ("T3", "A3")].iter().enumerate() {
        let line = context
            .split(RECORD_DELIMITER)
            .nth(rank)
            .expect("line should exist");
        assert!(line.starts_with(title));
        assert_eq!(context.matches(&format!("{}:", title)).count(), 1);
    }
}

#[test]
fn empty_context_assembly_yields_empty_string() {
    let records: Vec<Retrieved<StubArticle>> = Vec::new();
    assert_eq!(assemble_context(&records), "");
}

#[test]
fn prompt_is_deterministic() {
    let a = build_prompt(PromptStyle::Question, "T1: A1", "What is diabetes?");
    let b = build_prompt(PromptStyle::Question, "T1: A1", "What is diabetes?");
    assert_eq!(a, b);
    assert_eq!(
        a,
        "Using this context:\nT1: A1\n\nAnswer the question: What is diabetes?"
    );
}

#[test]
fn doctor_notes_prompt_uses_the_clinic_phrasing() {
    let prompt = build_prompt(PromptStyle::DoctorNotes, "Patient A: flu, cough. Notes: rest", "");
    assert_eq!(
        prompt,
        "Using this context:\nPatient A: flu, cough. Notes: rest\n\nGenerate doctor notes and treatment suggestions."
    );
}
