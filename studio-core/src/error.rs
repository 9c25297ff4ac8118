//! Error types for document, import, and persistence operations.

use thiserror::Error;

use crate::validate::ValidationError;

/// Result type for document and engine operations.
pub type StudioResult<T> = Result<T, StudioError>;

/// Errors that can occur in document and engine operations.
#[derive(Debug, Error)]
pub enum StudioError {
    /// Element not found on the page.
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Page index outside the document.
    #[error("Page {index} out of range (document has {count} pages)")]
    PageOutOfRange {
        /// Requested page index.
        index: usize,
        /// Number of pages in the document.
        count: usize,
    },

    /// The element is flagged non-removable or non-editable.
    #[error("Element {0} is protected")]
    ProtectedElement(String),

    /// Invalid element operation.
    #[error("Invalid operation on element: {0}")]
    InvalidOperation(String),

    /// Document serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Writing an exported file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Malformed bytes for the native document format.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Malformed document JSON at line {line}, column {column}: {message}")]
pub struct ParseError {
    /// Parser message.
    pub message: String,
    /// 1-based line of the failure (0 when unknown).
    pub line: usize,
    /// 1-based column of the failure (0 when unknown).
    pub column: usize,
}

impl From<serde_json::Error> for ParseError {
    fn from(err: serde_json::Error) -> Self {
        Self {
            message: err.to_string(),
            line: err.line(),
            column: err.column(),
        }
    }
}

/// SVG input outside the supported grammar.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConversionError {
    /// Input is not valid UTF-8 text.
    #[error("SVG input is not valid UTF-8")]
    NotUtf8,
    /// Input is not well-formed XML.
    #[error("Malformed SVG markup: {0}")]
    Xml(String),
    /// Root element is not `<svg>`.
    #[error("Root element is <{0}>, expected <svg>")]
    NotSvg(String),
    /// The converted document could not be encoded.
    #[error("Converted document could not be encoded: {0}")]
    Encode(String),
}

/// Failure of a single `import_file` call.
#[derive(Debug, Error)]
pub enum ImportError {
    /// File extension/MIME type is neither document JSON nor SVG.
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    /// File exceeds the import size limit.
    #[error("File too large: {size} bytes (max {max})")]
    TooLarge {
        /// Size of the rejected input.
        size: usize,
        /// Configured maximum.
        max: usize,
    },

    /// Reading the file contents failed.
    #[error("Failed to read file: {0}")]
    Read(#[from] std::io::Error),

    /// Malformed document JSON.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// SVG outside the supported grammar.
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// Parseable but semantically invalid document.
    #[error("Document failed validation with {} error(s)", .0.len())]
    Invalid(Vec<ValidationError>),

    /// A newer create/import moved the session on before this one committed.
    #[error("Import superseded by a newer request")]
    Superseded,
}

impl ImportError {
    /// Translation key of the user-facing message for this failure.
    #[must_use]
    pub fn message_key(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat(_) => crate::i18n::keys::IMPORT_UNSUPPORTED,
            Self::TooLarge { .. } => crate::i18n::keys::IMPORT_TOO_LARGE,
            Self::Invalid(_) => crate::i18n::keys::IMPORT_INVALID,
            Self::Read(_) | Self::Parse(_) | Self::Conversion(_) | Self::Superseded => {
                crate::i18n::keys::IMPORT_FAILED
            }
        }
    }

    /// Diagnostic lines for display next to the message.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<String> {
        match self {
            Self::Invalid(errors) => errors.iter().map(ToString::to_string).collect(),
            other => vec![other.to_string()],
        }
    }
}

/// Durable-storage read/write failure.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The document could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// The storage backend refused the operation.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Rejection of a whole drag-and-drop gesture.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DropError {
    /// Some dropped items were not recognised files.
    #[error("Dropped {items} item(s) but only {files} recognised file(s)")]
    CountMismatch {
        /// Number of items in the gesture.
        items: usize,
        /// Number of recognised files.
        files: usize,
    },
}
