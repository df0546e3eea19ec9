#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// From raw forum posts and course notes to answers, with a deterministic
// embedder standing in for the Ollama model.

use anyhow::Result;
use course_ta::assistant::{
    AnswerKind, Assistant, EMPTY_QUESTION_MESSAGE, NO_MATCH_MESSAGE, NOT_LOADED_MESSAGE,
};
use course_ta::corpus::builder::{DocumentBody, RawDocument, build_corpus, chunk_documents};
use course_ta::corpus::{Corpus, Source};
use course_ta::embeddings::{ChunkingConfig, Embedder};
use course_ta::retrieval::RetrievalConfig;
use tempfile::TempDir;

const CSV_POST: &str = "https://discourse.example/t/ga1-csv/101";
const DOCKER_POST: &str = "https://discourse.example/t/docker/202";
const NOTES_URL: &str = "https://notes.example/2025";

/// Counts which vocabulary words occur in the text
struct VocabularyEmbedder;

const VOCABULARY: [&str; 7] = ["pandas", "csv", "read", "assignment", "docker", "python", "kumu"];

impl Embedder for VocabularyEmbedder {
    fn model_name(&self) -> &str {
        "vocabulary"
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let text = text.to_lowercase();
        Ok(VOCABULARY
            .iter()
            .map(|word| if text.contains(word) { 1.0 } else { 0.0 })
            .collect())
    }
}

fn documents() -> Vec<RawDocument> {
    vec![
        RawDocument {
            url: CSV_POST.to_string(),
            body: DocumentBody::Html(
                "<p>Use <code>pandas.read_csv</code> for assignment 1 and check the header row</p>"
                    .to_string(),
            ),
            source: Source::Discourse,
            anchored: true,
        },
        RawDocument {
            url: DOCKER_POST.to_string(),
            body: DocumentBody::Html(
                "<div><p>Docker setup guide for the project environment on Windows</p></div>"
                    .to_string(),
            ),
            source: Source::Discourse,
            anchored: true,
        },
        RawDocument {
            url: NOTES_URL.to_string(),
            body: DocumentBody::Text(
                "Kumu is a tool for drawing network maps of relationships between people"
                    .to_string(),
            ),
            source: Source::Course,
            anchored: false,
        },
    ]
}

fn built_corpus() -> Corpus {
    let records =
        chunk_documents(&documents(), &ChunkingConfig::default()).expect("chunking should succeed");
    build_corpus(&records, &VocabularyEmbedder).expect("corpus should build")
}

fn assistant_with(settings: RetrievalConfig) -> Assistant<VocabularyEmbedder> {
    Assistant::new(built_corpus(), VocabularyEmbedder, settings)
}

fn assistant() -> Assistant<VocabularyEmbedder> {
    assistant_with(RetrievalConfig::default())
}

#[test]
fn built_corpus_keeps_urls_and_sources() {
    let corpus = built_corpus();

    let urls: Vec<&str> = corpus.chunks().iter().map(|c| c.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            CSV_POST,
            DOCKER_POST,
            "https://notes.example/2025#chunk-1"
        ]
    );
    assert_eq!(corpus.chunks()[2].source, Source::Course);
    assert_eq!(corpus.dimension(), Some(VOCABULARY.len()));
}

#[test]
fn built_corpus_survives_save_and_load() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = dir.path().join("corpus.json");
    let corpus = built_corpus();

    corpus.save(&path).expect("corpus should save");
    let loaded = Corpus::load(&path).expect("corpus should load");

    let first = Assistant::new(corpus, VocabularyEmbedder, RetrievalConfig::default())
        .answer("how to read csv for assignment", None);
    let second = Assistant::new(loaded, VocabularyEmbedder, RetrievalConfig::default())
        .answer("how to read csv for assignment", None);
    assert_eq!(first, second);
}

#[test]
fn csv_question_ranks_pandas_post_first() {
    let answer = assistant().answer("how to read csv for assignment", None);

    assert_eq!(answer.kind, AnswerKind::Semantic);
    assert_eq!(
        answer.answer,
        "read_csv for assignment 1 and check the header row"
    );
    let urls: Vec<&str> = answer.links.iter().map(|l| l.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![CSV_POST, DOCKER_POST, "https://notes.example/2025#chunk-1"]
    );
    assert!((answer.links[0].score - 0.87).abs() < 1e-6);
    assert!(answer.render_links().starts_with("1. [Use pandas.read_csv"));
}

#[test]
fn empty_question_gets_prompt() {
    let answer = assistant().answer("", None);

    assert_eq!(answer.answer, EMPTY_QUESTION_MESSAGE);
    assert!(answer.links.is_empty());
}

#[test]
fn unrelated_question_finds_nothing() {
    let answer = assistant().answer("kubernetes", None);

    assert_eq!(answer.answer, NO_MATCH_MESSAGE);
    assert!(answer.links.is_empty());
}

#[test]
fn lexical_question_uses_fallback() {
    let answer = assistant().answer("setup guide", None);

    assert_eq!(answer.kind, AnswerKind::Fallback);
    assert_eq!(
        answer.answer,
        "(Fallback from discourse):\n\nDocker setup guide for the project environment on Windows"
    );
    assert_eq!(answer.links.len(), 1);
    assert_eq!(answer.links[0].url, DOCKER_POST);
}

#[test]
fn raised_threshold_switches_to_fallback() {
    let answer = assistant_with(RetrievalConfig {
        confidence_threshold: 0.9,
        ..RetrievalConfig::default()
    })
    .answer("how to read csv for assignment", None);

    assert_eq!(answer.kind, AnswerKind::Fallback);
    assert_eq!(answer.links[0].url, CSV_POST);
}

#[test]
fn empty_corpus_is_not_loaded() {
    let assistant = Assistant::new(
        Corpus::empty(),
        VocabularyEmbedder,
        RetrievalConfig::default(),
    );

    for question in ["", "how to read csv for assignment"] {
        let answer = assistant.answer(question, None);
        assert_eq!(answer.answer, NOT_LOADED_MESSAGE);
        assert!(answer.links.is_empty());
    }
}

#[test]
fn answers_are_deterministic() {
    let assistant = assistant();

    let answers: Vec<_> = (0..3)
        .map(|_| assistant.answer("docker python setup", None))
        .collect();

    assert!(answers.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn answer_serializes_as_answer_and_links() {
    let answer = assistant().answer("how to read csv for assignment", None);

    let value = serde_json::to_value(&answer).expect("answer should serialize");

    assert!(value.get("kind").is_none());
    assert_eq!(value["links"][0]["url"], CSV_POST);
    assert_eq!(value["links"][0]["source"], "discourse");
}
