//! Error types for the conversion pipeline.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConvertError>;

/// Which export a record came from. `Merged` labels reconciled records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Text,
    Html,
    Merged,
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Source::Text => write!(f, "text export"),
            Source::Html => write!(f, "html export"),
            Source::Merged => write!(f, "reconciled records"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    #[error("passphrase must be between 1 and 56 bytes (got {0})")]
    InvalidKeyLength(usize),

    #[error("passphrase incorrect")]
    WrongPassphrase,
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("duplicate title {title:?} in {export}")]
    DuplicateTitle { export: Source, title: String },

    #[error("line {line}: record has an empty title")]
    EmptyTitle { line: usize },

    #[error("line {line}: expected at most 12 fields, found {found}")]
    TooManyFields { line: usize, found: usize },

    #[error("invalid hex word {token:?} in record block")]
    InvalidWord { token: String },

    #[error("malformed record: {reason}")]
    MalformedRecord { reason: String },

    #[error("record {title:?}: malformed field row {row}")]
    MalformedRow { title: String, row: usize },

    #[error("invalid date {value:?}, expected M/D/YY")]
    InvalidDate { value: String },

    #[error("record {title:?} has no Accessed/Modified row")]
    MissingTimestamps { title: String },

    #[error(
        "exports disagree on titles\n  only in text export: {only_primary:?}\n  only in html export: {only_secondary:?}"
    )]
    TitleSetMismatch {
        only_primary: Vec<String>,
        only_secondary: Vec<String>,
    },

    #[error("record {title:?}: {field} differs between exports\n{primary}\n{secondary}")]
    FieldMismatch {
        title: String,
        field: String,
        primary: String,
        secondary: String,
    },

    #[error(transparent)]
    Cipher(#[from] CipherError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
