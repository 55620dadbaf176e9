use thiserror::Error;

pub type PartResult<T> = std::result::Result<T, PartError>;

#[derive(Error, Debug)]
pub enum PartError {
    #[error("Short read at offset {offset}: expected {expected} bytes, got {actual}")]
    ShortRead {
        offset: u64,
        expected: usize,
        actual: usize,
    },

    #[error("Malformed GPT: {0}")]
    MalformedGpt(String),

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Block device not found: {0}")]
    DeviceNotFound(String),

    #[error("Unsupported device path: {0} (only paths directly under /dev are supported)")]
    UnsupportedPath(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("nix errno: {0}")]
    Nix(#[from] nix::errno::Errno),
}

impl PartError {
    /// Failures that may be downgraded to "no identity available" by best-effort callers.
    pub fn is_access_denied(&self) -> bool {
        match self {
            PartError::PermissionDenied => true,
            PartError::Io(err) => err.kind() == std::io::ErrorKind::PermissionDenied,
            _ => false,
        }
    }
}
