use super::*;
use anyhow::bail;
use serde_json::json;
use std::cell::RefCell;

/// Returns the same vector for every text and records what it was asked
struct FixedEmbedder {
    vector: Vec<f32>,
    seen: RefCell<Vec<String>>,
}

impl FixedEmbedder {
    fn new(vector: Vec<f32>) -> Self {
        Self {
            vector,
            seen: RefCell::new(Vec::new()),
        }
    }
}

impl Embedder for FixedEmbedder {
    fn model_name(&self) -> &str {
        "fixed"
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.seen.borrow_mut().push(text.to_string());
        Ok(self.vector.clone())
    }
}

struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    fn model_name(&self) -> &str {
        "failing"
    }

    fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        bail!("connection refused")
    }
}

struct StubRecognizer(Result<String, String>);

impl TextRecognizer for StubRecognizer {
    fn recognize(&self, _image: &[u8]) -> Result<String> {
        match &self.0 {
            Ok(text) => Ok(text.clone()),
            Err(message) => bail!("{}", message),
        }
    }
}

fn chunk(text: &str, embedding: Vec<f32>, url: &str, source: Source) -> Chunk {
    Chunk {
        text: text.to_string(),
        embedding,
        url: url.to_string(),
        source,
    }
}

fn forum_corpus() -> Corpus {
    Corpus::new(vec![
        chunk(
            "Use pandas.read_csv for assignment 1",
            vec![1.0, 0.0],
            "u1",
            Source::Course,
        ),
        chunk("Docker setup guide", vec![0.0, 1.0], "u2", Source::Discourse),
        chunk(
            "Install Python 3.12.\nThen create a virtual environment",
            vec![0.8, 0.6],
            "u3",
            Source::Discourse,
        ),
    ])
    .expect("corpus should build")
}

fn assistant(vector: Vec<f32>) -> Assistant<FixedEmbedder> {
    Assistant::new(
        forum_corpus(),
        FixedEmbedder::new(vector),
        RetrievalConfig::default(),
    )
}

#[test]
fn empty_corpus_is_not_loaded_for_every_query() {
    let assistant = Assistant::new(
        Corpus::empty(),
        FixedEmbedder::new(vec![1.0]),
        RetrievalConfig::default(),
    );

    for question in ["", "   ", "how to read csv"] {
        let answer = assistant.answer(question, None);
        assert_eq!(answer.answer, NOT_LOADED_MESSAGE);
        assert!(answer.links.is_empty());
        assert_eq!(answer.kind, AnswerKind::NotLoaded);
    }
}

#[test]
fn empty_question_prompts_for_input() {
    let assistant = assistant(vec![1.0, 0.0]);

    let answer = assistant.answer("  \n ", None);

    assert_eq!(answer.answer, EMPTY_QUESTION_MESSAGE);
    assert!(answer.links.is_empty());
    assert_eq!(answer.kind, AnswerKind::EmptyQuestion);
    assert!(assistant.embedder.seen.borrow().is_empty());
}

#[test]
fn confident_match_answers_semantically() {
    let assistant = assistant(vec![1.0, 0.0]);

    let answer = assistant.answer("How to read CSV for assignment", None);

    assert_eq!(answer.kind, AnswerKind::Semantic);
    assert_eq!(answer.answer, "read_csv for assignment 1");
    let urls: Vec<&str> = answer.links.iter().map(|l| l.url.as_str()).collect();
    assert_eq!(urls, vec!["u1", "u3", "u2"]);
    let scores: Vec<f32> = answer.links.iter().map(|l| l.score).collect();
    assert_eq!(scores, vec![1.0, 0.8, 0.0]);
}

#[test]
fn question_is_trimmed_and_lowercased_for_embedding() {
    let assistant = assistant(vec![1.0, 0.0]);

    assistant.answer("  How To Read CSV  ", None);

    assert_eq!(*assistant.embedder.seen.borrow(), vec!["how to read csv"]);
}

#[test]
fn top_k_limits_links() {
    let assistant = Assistant::new(
        forum_corpus(),
        FixedEmbedder::new(vec![1.0, 0.0]),
        RetrievalConfig {
            top_k: 1,
            ..RetrievalConfig::default()
        },
    );

    let answer = assistant.answer("read csv", None);

    assert_eq!(answer.links.len(), 1);
}

#[test]
fn score_at_threshold_is_confident() {
    let assistant = Assistant::new(
        forum_corpus(),
        FixedEmbedder::new(vec![1.0, 0.0]),
        RetrievalConfig {
            confidence_threshold: 1.0,
            ..RetrievalConfig::default()
        },
    );

    assert_eq!(
        assistant.answer("read csv", None).kind,
        AnswerKind::Semantic
    );
}

#[test]
fn weak_match_falls_back_to_keywords() {
    let assistant = assistant(vec![0.0, 0.0]);

    let answer = assistant.answer("how to read csv for assignment", None);

    assert_eq!(answer.kind, AnswerKind::Fallback);
    assert_eq!(
        answer.answer,
        "(Fallback from course):\n\nread_csv for assignment 1"
    );
    assert_eq!(answer.links.len(), 1);
    assert_eq!(answer.links[0].url, "u1");
    assert!((answer.links[0].score - 4.05).abs() < 1e-4);
}

#[test]
fn no_overlap_finds_nothing() {
    let assistant = assistant(vec![0.0, 0.0]);

    let answer = assistant.answer("kubernetes", None);

    assert_eq!(answer.answer, NO_MATCH_MESSAGE);
    assert!(answer.links.is_empty());
    assert_eq!(answer.kind, AnswerKind::NoMatch);
}

#[test]
fn embedder_failure_becomes_error_answer() {
    let assistant = Assistant::new(forum_corpus(), FailingEmbedder, RetrievalConfig::default());

    let answer = assistant.answer("read csv", None);

    assert_eq!(answer.kind, AnswerKind::Error);
    assert!(answer.answer.starts_with("An error occurred: "));
    assert!(answer.answer.contains("connection refused"));
    assert!(answer.links.is_empty());
}

#[test]
fn dimension_mismatch_becomes_error_answer() {
    let assistant = assistant(vec![1.0, 0.0, 0.0]);

    let answer = assistant.answer("read csv", None);

    assert_eq!(answer.kind, AnswerKind::Error);
    assert!(answer.answer.contains("dimensions"));
}

#[test]
fn recognized_text_replaces_question() {
    let assistant = assistant(vec![1.0, 0.0])
        .with_recognizer(Box::new(StubRecognizer(Ok("How do I submit GA2?".into()))));

    assistant.answer("typed", Some(b"png"));

    assert_eq!(*assistant.embedder.seen.borrow(), vec!["how do i submit ga2?"]);
}

#[test]
fn blank_recognition_keeps_typed_question() {
    let assistant = assistant(vec![1.0, 0.0])
        .with_recognizer(Box::new(StubRecognizer(Ok("  \n".into()))));

    assistant.answer("typed question", Some(b"png"));

    assert_eq!(*assistant.embedder.seen.borrow(), vec!["typed question"]);
}

#[test]
fn recognition_failure_keeps_typed_question() {
    let assistant = assistant(vec![1.0, 0.0])
        .with_recognizer(Box::new(StubRecognizer(Err("tesseract missing".into()))));

    let answer = assistant.answer("typed question", Some(b"png"));

    assert_eq!(answer.kind, AnswerKind::Semantic);
    assert_eq!(*assistant.embedder.seen.borrow(), vec!["typed question"]);
}

#[test]
fn image_without_recognizer_uses_typed_question() {
    let assistant = assistant(vec![1.0, 0.0]);

    let answer = assistant.answer("", Some(b"png"));

    assert_eq!(answer.answer, EMPTY_QUESTION_MESSAGE);
}

#[test]
fn image_only_question() {
    let assistant = assistant(vec![1.0, 0.0])
        .with_recognizer(Box::new(StubRecognizer(Ok("read csv".into()))));

    let answer = assistant.answer("", Some(b"png"));

    assert_eq!(answer.kind, AnswerKind::Semantic);
}

#[test]
fn snippets_are_single_line_and_bounded() {
    let long = format!("line one\nline two {}", "x".repeat(200));
    let corpus = Corpus::new(vec![chunk(&long, vec![1.0], "u1", Source::Course)])
        .expect("corpus should build");
    let assistant = Assistant::new(
        corpus,
        FixedEmbedder::new(vec![1.0]),
        RetrievalConfig::default(),
    );

    let answer = assistant.answer("line", None);
    let snippet = &answer.links[0].text;

    assert_eq!(snippet.chars().count(), 80);
    assert!(snippet.starts_with("line one line two"));
    assert!(!snippet.contains('\n'));
}

#[test]
fn render_links_as_markdown_list() {
    let assistant = assistant(vec![1.0, 0.0]);

    let answer = assistant.answer("read csv", None);

    let rendered = answer.render_links();
    let lines: Vec<&str> = rendered.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[0],
        "1. [Use pandas.read_csv for assignment 1...](u1) - course (1.00)"
    );
    assert!(lines[1].starts_with("2. [Install Python 3.12. Then create"));
    assert!(lines[1].ends_with("(u3) - discourse (0.80)"));
}

#[test]
fn render_no_links() {
    let answer = Answer::message(AnswerKind::NoMatch, NO_MATCH_MESSAGE);
    assert_eq!(answer.render_links(), "");
}

#[test]
fn answer_serializes_without_kind() {
    let answer = Answer {
        answer: "Use pandas".to_string(),
        links: vec![Link {
            url: "u1".to_string(),
            text: "Use pandas".to_string(),
            source: Source::Course,
            score: 0.5,
        }],
        kind: AnswerKind::Semantic,
    };

    assert_eq!(
        serde_json::to_value(&answer).expect("answer should serialize"),
        json!({
            "answer": "Use pandas",
            "links": [{"url": "u1", "text": "Use pandas", "source": "course", "score": 0.5}]
        })
    );
}

#[test]
fn answers_are_deterministic() {
    let assistant = assistant(vec![0.6, 0.8]);

    let first = assistant.answer("virtual environment", None);
    let second = assistant.answer("virtual environment", None);

    assert_eq!(first, second);
}
