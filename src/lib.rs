use thiserror::Error;

pub type Result<T> = std::result::Result<T, CourseTaError>;

#[derive(Error, Debug)]
pub enum CourseTaError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Corpus error: {0}")]
    Corpus(#[from] corpus::CorpusError),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Recognition error: {0}")]
    Recognition(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod assistant;
pub mod commands;
pub mod config;
pub mod corpus;
pub mod embeddings;
pub mod retrieval;
