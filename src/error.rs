use thiserror::Error;

/// Errors raised while opening a book through the archiver cache.
#[derive(Debug, Clone, Error)]
pub enum OpenError {
    /// The container is not a supported archive or document
    #[error("Unsupported format: {reason}")]
    FormatUnsupported { reason: String },

    /// The file is missing, unreadable, or access was revoked
    #[error("Resource unavailable: {path}: {reason}")]
    ResourceUnavailable { path: String, reason: String },
}

impl OpenError {
    pub(crate) fn unsupported(reason: impl Into<String>) -> Self {
        OpenError::FormatUnsupported {
            reason: reason.into(),
        }
    }

    pub(crate) fn unavailable(path: impl Into<String>, reason: impl ToString) -> Self {
        OpenError::ResourceUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Errors delivered through a page decode completion.
#[derive(Debug, Clone, Error)]
pub enum PageError {
    /// The page is out of range or its image data could not be decoded
    #[error("Broken page {index}: {reason}")]
    BrokenPage { index: usize, reason: String },

    /// The underlying file could not be read while extracting the page
    #[error("Resource unavailable while reading page {index}: {reason}")]
    ResourceUnavailable { index: usize, reason: String },

    /// The decode task did not produce a result (worker panicked or the source was closed)
    #[error("Decode of page {index} did not complete: {reason}")]
    Unknown { index: usize, reason: String },
}

impl PageError {
    pub(crate) fn broken(index: usize, reason: impl ToString) -> Self {
        PageError::BrokenPage {
            index,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn unknown(index: usize, reason: impl ToString) -> Self {
        PageError::Unknown {
            index,
            reason: reason.to_string(),
        }
    }

    /// Index of the page this error refers to.
    pub fn index(&self) -> usize {
        match self {
            PageError::BrokenPage { index, .. }
            | PageError::ResourceUnavailable { index, .. }
            | PageError::Unknown { index, .. } => *index,
        }
    }
}

/// Errors produced by the serving facade.
///
/// The HTTP layer maps `BookNotFound`, `CollectionNotFound` and
/// `PageOutOfRange` to 404, `InvalidPageNumber` to 400 and everything else
/// to 500.
#[derive(Debug, Clone, Error)]
pub enum ServeError {
    /// No book with this id exists in the catalog
    #[error("Book not found: {book_id}")]
    BookNotFound { book_id: String },

    /// No collection with this id exists in the catalog
    #[error("Collection not found: {collection_id}")]
    CollectionNotFound { collection_id: String },

    /// The requested page index is past the end of the book
    #[error("Page {index} out of range for book {book_id} ({page_count} pages)")]
    PageOutOfRange {
        book_id: String,
        index: usize,
        page_count: usize,
    },

    /// The page path segment is not a number
    #[error("Invalid page number: {value}")]
    InvalidPageNumber { value: String },

    /// Opening the book failed
    #[error(transparent)]
    Open(#[from] OpenError),

    /// Decoding the page failed
    #[error(transparent)]
    Page(#[from] PageError),

    /// Encoding the response image failed
    #[error("Failed to encode image: {message}")]
    EncodeError { message: String },
}

impl ServeError {
    /// Whether the error means the requested resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ServeError::BookNotFound { .. }
                | ServeError::CollectionNotFound { .. }
                | ServeError::PageOutOfRange { .. }
        )
    }
}
