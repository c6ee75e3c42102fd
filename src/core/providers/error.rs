use thiserror::Error;

/// Error type shared by all metric providers.
///
/// Uses `thiserror` for automatic `Display`/`Error` derivation with
/// context-rich messages. A provider error spoils at most one collection
/// pass; the scheduler is never taken down by one.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Failed to read a file. Includes the path and the underlying I/O error.
    #[error("failed to read {path}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A value was found but could not be parsed as the expected metric.
    #[error("failed to parse {metric} from {location}: {reason}")]
    Parse {
        metric: String,
        location: String,
        reason: String,
    },

    /// Data was present but did not have the expected shape.
    #[error("invalid format in {location}: {reason}")]
    InvalidFormat { location: String, reason: String },

    /// A low-level system call failed.
    #[error("system call {syscall} failed: {reason}")]
    SystemCall {
        syscall: &'static str,
        reason: String,
    },
}

/// Result alias used throughout the provider modules.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;
