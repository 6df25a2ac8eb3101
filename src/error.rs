//! Error types for caption preprocessing and run orchestration

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptionError {
    #[error("missing file '{path}': {source}")]
    MissingFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("example '{name}' has no usable sentences")]
    EmptyExample { name: String },

    #[error("vocabulary word '{word}' maps to the padding index 0")]
    PaddingCollision { word: String },

    #[error("vocabulary has {0} words, more than a token id can index")]
    VocabularyTooLarge(usize),

    #[error("invalid vocabulary file '{path}': {source}")]
    VocabularyFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid token pattern: {0}")]
    TokenPattern(#[from] regex::Error),

    #[error("worker pool error: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("resume directory '{0}' does not exist")]
    ResumeDir(PathBuf),

    #[error("{0} is handled by the network collaborator and is not available here")]
    Unsupported(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CaptionError>;
