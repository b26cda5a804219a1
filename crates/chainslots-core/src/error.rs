//! Error types for the storage decode pipeline.

use alloy_primitives::U256;
use std::sync::Arc;
use thiserror::Error;

/// An `ArrayDescriptor` that is internally inconsistent.
///
/// Always a configuration error: raised before any storage read and never
/// worth retrying.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("slots_per_element must be at least 1")]
    ZeroSlotsPerElement,

    #[error("descriptor has no fields")]
    NoFields,

    #[error("field '{field}' has zero bit width")]
    ZeroWidth { field: String },

    #[error("field '{field}' spans bits {offset}..{end}, past the 256-bit word")]
    OutOfRange { field: String, offset: u16, end: u32 },

    #[error("field '{field}' sits in word {word} but elements only have {slots_per_element} word(s)")]
    WordOutOfRange {
        field: String,
        word: u32,
        slots_per_element: u32,
    },

    #[error("fields '{first}' and '{second}' overlap in word {word}")]
    Overlap {
        first: String,
        second: String,
        word: u32,
    },

    #[error("field '{field}' of type {kind} cannot be {width} bits wide")]
    BadWidthForKind {
        field: String,
        kind: String,
        width: u16,
    },

    #[error("duplicate field name '{field}'")]
    DuplicateField { field: String },

    #[error("unsupported field type '{ty}'")]
    UnsupportedType { ty: String },

    #[error("field '{field}' mixes explicit and packed placement")]
    MixedPlacement { field: String },
}

/// A storage slot could not be read.
///
/// Carries the reader's own error as `source`, unchanged, together with
/// whether the reader judged the failure transient. Callers that retry a
/// whole pass should only do so for transient failures.
#[derive(Debug, Clone, Error)]
#[error("failed to read storage slot 0x{slot:x}: {reason}")]
pub struct StorageReadError {
    pub slot: U256,
    pub reason: String,
    pub transient: bool,
    #[source]
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl StorageReadError {
    /// A permanent failure with no underlying error value.
    pub fn new(slot: U256, reason: impl Into<String>) -> Self {
        Self {
            slot,
            reason: reason.into(),
            transient: false,
            source: None,
        }
    }

    /// Wrap the error the reader got from its backend.
    pub fn with_source<E>(slot: U256, reason: impl Into<String>, source: E, transient: bool) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            slot,
            reason: reason.into(),
            transient,
            source: Some(Arc::new(source)),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.transient
    }

    /// The backend error, if it is of type `E`.
    pub fn source_as<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.source.as_deref().and_then(|e| e.downcast_ref::<E>())
    }
}

/// Errors returned by `decode_array`.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed descriptor: {0}")]
    MalformedDescriptor(#[from] DescriptorError),

    #[error(transparent)]
    StorageRead(#[from] StorageReadError),

    #[error("array length {length} exceeds the limit of {limit} elements")]
    LengthTooLarge { length: U256, limit: u64 },
}

/// Errors raised while loading a descriptor file.
#[derive(Debug, Error)]
pub enum DescriptorFileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid slot '{0}'")]
    InvalidSlot(String),

    #[error("invalid address '{0}'")]
    InvalidAddress(String),

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn plain_read_error_has_no_source() {
        let err = StorageReadError::new(U256::from(16u8), "lock poisoned");
        assert_eq!(err.to_string(), "failed to read storage slot 0x10: lock poisoned");
        assert!(err.source().is_none());
        assert!(!err.is_transient());
    }

    #[test]
    fn backend_error_is_kept_as_source() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out");
        let err = StorageReadError::with_source(U256::ZERO, "eth_getStorageAt", io, true);
        assert!(err.is_transient());
        assert_eq!(err.source().map(|e| e.to_string()).as_deref(), Some("timed out"));
        assert_eq!(
            err.source_as::<std::io::Error>().map(|e| e.kind()),
            Some(std::io::ErrorKind::TimedOut)
        );
        assert!(err.source_as::<std::fmt::Error>().is_none());
    }
}
