use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum ReclaimError {
    IoError(std::io::Error),
    ConfigError(String),
    DataError(String),
    HookError(String),
    StoreError(String),
}

impl fmt::Display for ReclaimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReclaimError::IoError(err) => write!(f, "IO error: {}", err),
            ReclaimError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            ReclaimError::DataError(msg) => write!(f, "Data error: {}", msg),
            ReclaimError::HookError(msg) => write!(f, "Hook error: {}", msg),
            ReclaimError::StoreError(msg) => write!(f, "Flag store error: {}", msg),
        }
    }
}

impl Error for ReclaimError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ReclaimError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ReclaimError {
    fn from(err: std::io::Error) -> Self {
        ReclaimError::IoError(err)
    }
}

impl From<serde_json::Error> for ReclaimError {
    fn from(err: serde_json::Error) -> Self {
        ReclaimError::DataError(err.to_string())
    }
}
