use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Invalid module image {path}: {message}")]
    InvalidImage { path: String, message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Patch not found: {0}")]
    PatchNotFound(String),

    #[cfg(feature = "remote")]
    #[error("Network error: {0}")]
    Network(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is a "file not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Per-patch failure.
///
/// Faults are never propagated as process-level errors; they end up as the
/// `Error` status of a single patch together with the `Display` text as the
/// human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchFault {
    #[error("module {0} not found on disk")]
    ModuleNotFound(String),

    #[error("module {0} not loaded into memory")]
    ModuleNotLoaded(String),

    #[error("failed to get module info for {0}")]
    ModuleInfoUnavailable(String),

    #[error("file offset {offset:#x} is not mapped by any section of {module}")]
    RvaNotFound { module: String, offset: u64 },

    #[error("invalid module or offset ({offset:#x} + {len} exceeds {limit:#x})")]
    OffsetOutOfBounds { offset: u64, len: usize, limit: u64 },

    #[error("invalid offset, bad address")]
    BadAddress,

    #[error("malformed pattern: {0}")]
    MalformedPattern(String),

    #[error("pattern occurrence {occurrence} not found ({found} match(es))")]
    PatternOccurrenceNotFound { occurrence: i64, found: usize },

    #[error("bad patch; patch is neither on nor off")]
    NeitherOnNorOff,

    #[error("bad patch; patch is both on and off (cumulative)")]
    BothOnAndOff,

    #[error("no match found in union")]
    NoUnionMatch,

    #[error("number {value} out of range [{min}, {max}]")]
    ValueOutOfRange { value: i64, min: i64, max: i64 },

    #[error("unknown union variant '{0}'")]
    UnknownVariant(String),

    #[error("live bytes match neither state, refusing to write")]
    SourceMismatch,
}

impl PatchFault {
    /// Fatal faults are cached on the patch and never re-resolved.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PatchFault::ModuleNotFound(_)
                | PatchFault::RvaNotFound { .. }
                | PatchFault::OffsetOutOfBounds { .. }
                | PatchFault::MalformedPattern(_)
                | PatchFault::PatternOccurrenceNotFound { .. }
        )
    }
}
