use sitecms_core::CoreError;
use sitecms_storage::StorageError;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("item not found: {0}")]
    ItemNotFound(String),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// How the editor should treat a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad input. Nothing was written; retrying the same call fails again.
    Validation,
    /// The store was unavailable. Nothing was half-applied; retry is safe.
    Transient,
    /// The target no longer matches what the caller saw. Refetch.
    Conflict,
    Internal,
}

impl EngineError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Validation(_) | Self::Core(_) | Self::Config(_) => ErrorClass::Validation,
            Self::ItemNotFound(_) => ErrorClass::Conflict,
            Self::Storage(e) if e.is_validation() => ErrorClass::Validation,
            Self::Storage(e) if e.is_transient() => ErrorClass::Transient,
            Self::Storage(StorageError::NotFound(_)) => ErrorClass::Conflict,
            Self::Storage(_) => ErrorClass::Internal,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.class() == ErrorClass::Transient
    }
}
