//! Error types shared across the crate.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Errors raised while talking to the question bank over the wire.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("failed to connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: tungstenite::Error,
    },

    #[error("connection to the question bank was closed")]
    Disconnected,

    #[error("no reply within {0:?}")]
    Timeout(Duration),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("unexpected reply, wanted {expected}")]
    UnexpectedReply { expected: &'static str },

    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors raised while loading a question bank file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{} must contain at least one survey", .0.display())]
    Empty(PathBuf),

    #[error("survey {survey_id} lists question {question_id} more than once")]
    DuplicateQuestionId { survey_id: i64, question_id: i64 },

    #[error("question {question_id} lists option {option_id} more than once")]
    DuplicateOptionId { question_id: i64, option_id: i64 },
}

/// Top-level error for the binary.
#[derive(Debug, Error)]
pub enum QuizError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Launch(String),
}
