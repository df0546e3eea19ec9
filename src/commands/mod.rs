
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::assistant::Assistant;
use crate::assistant::ocr::TesseractRecognizer;
use crate::config::Config;
use crate::corpus::builder::{
    RawDocument, build_corpus, chunk_documents, load_notes, load_posts,
};
use crate::corpus::{Corpus, CorpusError, Source, migrate_legacy};
use crate::embeddings::{Embedder, OllamaClient};

/// Where the course notes are published; windows link to `#chunk-N` anchors below it
pub const DEFAULT_NOTES_BASE_URL: &str = "https://course-notes.tds.iitm.ac.in/2025";

/// Link given to migrated records that carry no URL of their own
pub const DEFAULT_FORUM_URL: &str = "https://discourse.onlinedegree.iitm.ac.in/";

const GREP_SNIPPET_CHARS: usize = 200;

/// A corpus file to merge and the source given to its untagged records
#[derive(Debug, Clone, PartialEq)]
pub struct MergeInput {
    pub path: PathBuf,
    pub source: Option<Source>,
}

/// Connect to Ollama and fail unless the configured model is available
#[inline]
pub fn connect_embedder(config: &Config) -> Result<OllamaClient> {
    let client =
        OllamaClient::new(&config.ollama).context("Failed to create Ollama client")?;
    client
        .health_check()
        .context("Ollama health check failed")?;
    Ok(client)
}

/// Load the configured corpus for answering. A missing file gives an empty
/// corpus so every question is answered with the not-loaded message.
#[inline]
pub fn load_answer_corpus(path: &Path, dimension: usize) -> Result<Corpus> {
    let corpus = match Corpus::load(path) {
        Ok(corpus) => corpus,
        Err(CorpusError::NotFound(path)) => {
            warn!(
                "No corpus at {}; run `course-ta build` to create one",
                path.display()
            );
            return Ok(Corpus::empty());
        }
        Err(e) => return Err(e.into()),
    };

    corpus
        .ensure_dimension(dimension)
        .context("Corpus was embedded with a different model")?;
    Ok(corpus)
}

/// Build the assistant from configuration: embedder, corpus and recognizer
#[inline]
pub fn load_assistant(config: &Config) -> Result<Assistant<OllamaClient>> {
    let embedder = connect_embedder(config)?;
    let corpus = load_answer_corpus(&config.corpus_path(), embedder.embedding_dimension())?;

    let mut assistant = Assistant::new(corpus, embedder, config.retrieval.clone());
    if let Some(recognizer) = TesseractRecognizer::from_config(&config.ocr) {
        assistant = assistant.with_recognizer(Box::new(recognizer));
    }
    Ok(assistant)
}

/// Chunk and embed forum posts and course notes into a corpus file
#[inline]
pub fn build_corpus_file(
    config: &Config,
    posts: &[PathBuf],
    notes: &[PathBuf],
    base_url: &str,
    output: Option<&Path>,
) -> Result<()> {
    let mut documents: Vec<RawDocument> = Vec::new();
    for path in posts {
        documents.extend(load_posts(path)?);
    }
    for path in notes {
        documents.push(load_notes(path, base_url)?);
    }

    if documents.is_empty() {
        println!("No input documents. Pass --posts and/or --notes.");
        return Ok(());
    }

    let records = chunk_documents(&documents, &config.chunking)?;
    let embedder = connect_embedder(config)?;
    let corpus = build_corpus(&records, &embedder)?;
    corpus
        .ensure_dimension(embedder.embedding_dimension())
        .context("Model output does not match the configured embedding dimension")?;

    let output = output.map_or_else(|| config.corpus_path(), Path::to_path_buf);
    corpus.save(&output)?;

    println!(
        "✅ Built {} chunks from {} documents with {}",
        corpus.len(),
        documents.len(),
        embedder.model_name()
    );
    println!("   Saved to {}", output.display());
    Ok(())
}

/// Default output of a migration: `name_fixed.json` next to the input
#[inline]
pub fn migrated_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map_or_else(|| "corpus".into(), |stem| stem.to_string_lossy());
    input.with_file_name(format!("{}_fixed.json", stem))
}

/// Rewrite a corpus file using legacy `chunk` records in the canonical schema
#[inline]
pub fn migrate_corpus_file(input: &Path, output: &Path, default_url: &str) -> Result<()> {
    let (corpus, report) = migrate_legacy(input, default_url)?;
    corpus.save(output)?;

    println!("✅ Migrated {} records", report.migrated);
    println!("   Already canonical: {}", report.unchanged);
    if report.skipped > 0 {
        println!("   ⚠️  Skipped without text: {}", report.skipped);
    }
    println!("   Saved to {}", output.display());
    Ok(())
}

/// Concatenate corpus files in order into one
#[inline]
pub fn merge_corpus_files(inputs: &[MergeInput], output: &Path) -> Result<Corpus> {
    let mut parts = Vec::with_capacity(inputs.len());
    for input in inputs {
        let mut corpus = Corpus::load(&input.path)
            .with_context(|| format!("Failed to load {}", input.path.display()))?;
        info!("Merging {} chunks from {}", corpus.len(), input.path.display());
        if let Some(source) = input.source {
            corpus = corpus.with_default_source(source);
        }
        parts.push(corpus);
    }

    let merged = Corpus::merge(parts).context("Corpora use different embedding models")?;
    merged.save(output)?;

    println!(
        "✅ Merged {} chunks from {} files into {}",
        merged.len(),
        inputs.len(),
        output.display()
    );
    Ok(merged)
}

/// Answer one question and print it with its links
#[inline]
pub fn ask(config: &Config, question: &str, image: Option<&Path>, json: bool) -> Result<()> {
    let image = image
        .map(|path| {
            fs::read(path).with_context(|| format!("Failed to read image: {}", path.display()))
        })
        .transpose()?;

    let assistant = load_assistant(config)?;
    let answer = assistant.answer(question, image.as_deref());

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&answer).context("Failed to serialize answer")?
        );
        return Ok(());
    }

    println!("🧠 Answer");
    println!("{}", answer.answer);
    if !answer.links.is_empty() {
        println!();
        println!("🔗 Relevant Links");
        println!("{}", answer.render_links());
    }
    Ok(())
}

/// Print every chunk whose text contains `term`
#[inline]
pub fn grep_corpus(path: &Path, term: &str) -> Result<usize> {
    let corpus = Corpus::load(path)?;
    let matches = corpus.find_containing(term);

    println!("🔍 Chunks containing \"{}\": {}", term, matches.len());
    for (index, chunk) in &matches {
        let snippet: String = chunk.text.chars().take(GREP_SNIPPET_CHARS).collect();
        println!();
        println!("--- #{} [{}] {}", index, chunk.source, chunk.url);
        println!("{}", snippet);
    }

    Ok(matches.len())
}

/// Report configuration, Ollama health and corpus statistics
#[inline]
pub fn show_status(config: &Config) -> Result<()> {
    println!("📊 Course TA Status Report");
    println!("{}", "=".repeat(50));
    println!();

    println!("🤖 Ollama Status:");
    let dimension = match OllamaClient::new(&config.ollama) {
        Ok(client) => match client.health_check() {
            Ok(()) => {
                println!(
                    "   ✅ Ollama: Connected ({}:{})",
                    config.ollama.host, config.ollama.port
                );
                println!("   📋 Model: {}", config.ollama.model);
                Some(client.embedding_dimension())
            }
            Err(e) => {
                println!("   ⚠️  Ollama: Unhealthy - {:#}", e);
                None
            }
        },
        Err(e) => {
            println!("   ❌ Ollama: Invalid configuration - {:#}", e);
            None
        }
    };

    println!();
    println!("📚 Corpus Status:");
    let corpus_path = config.corpus_path();
    println!("   📁 Path: {}", corpus_path.display());
    match Corpus::load(&corpus_path) {
        Ok(corpus) => {
            let count = |source: Source| {
                corpus
                    .chunks()
                    .iter()
                    .filter(|chunk| chunk.source == source)
                    .count()
            };
            println!("   📄 Chunks: {}", corpus.len());
            println!("   🎓 Course notes: {}", count(Source::Course));
            println!("   💬 Forum posts: {}", count(Source::Discourse));
            println!("   ❔ Untagged: {}", count(Source::Unknown));
            match (corpus.dimension(), dimension) {
                (Some(found), Some(expected)) if found != expected => {
                    println!(
                        "   ❌ Dimension: {} (model produces {}; rebuild the corpus)",
                        found, expected
                    );
                }
                (Some(found), _) => println!("   🔢 Dimension: {}", found),
                (None, _) => println!("   📭 Corpus is empty"),
            }
        }
        Err(CorpusError::NotFound(_)) => {
            println!("   📭 No corpus file yet");
        }
        Err(e) => {
            println!("   ❌ {}", e);
        }
    }

    println!();
    println!("💡 Next Steps:");
    println!("   • Use 'course-ta build --posts <json> --notes <txt>' to build the corpus");
    println!("   • Use 'course-ta ask \"<question>\"' to ask a question");
    println!("   • Use 'course-ta config' to change settings");

    Ok(())
}
