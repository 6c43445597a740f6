//! Compat-layer error types
//!
//! Two disjoint failure classes cross this subsystem (see the embedder API
//! contract): realm errors, which are returned to the caller and may be
//! retried once the realm is ready, and contract violations (late template
//! mutation, bad linkage, out-of-range field access), which are native-code
//! bugs and terminate through [`fatal`].

use thiserror::Error;

/// Recoverable instantiation failures caused by the target realm.
///
/// No instance is produced and nothing stays registered with the collector
/// when one of these is returned. The caller owns all retry policy.
#[derive(Debug, Error)]
pub enum RealmError {
    /// The realm exists but has not finished initialization.
    #[error("realm is not initialized")]
    NotInitialized,

    /// The realm has been torn down and can no longer host objects.
    #[error("realm has been torn down")]
    TornDown,

    /// The host engine failed to allocate the object.
    #[error("host object allocation failed: {0}")]
    Allocation(String),
}

impl RealmError {
    /// Create an allocation failure with a host-engine message.
    pub fn allocation(msg: impl Into<String>) -> Self {
        Self::Allocation(msg.into())
    }
}

/// Result type for realm-facing operations.
pub type RealmResult<T> = std::result::Result<T, RealmError>;

/// Report an embedder contract violation and abort.
///
/// Configuration errors (mutating an instantiated template, cyclic
/// constructor linkage, field-count overflow) and programming errors
/// (out-of-range internal field access) are never recoverable: surfacing
/// them immediately beats corrupting adjacent state. The message is logged
/// before the panic so embedders running with a subscriber see it even if
/// the panic is swallowed by a foreign unwind boundary.
#[cold]
pub(crate) fn fatal(entry_point: &str, message: &str) -> ! {
    tracing::error!(entry_point, "FatalError: {message}");
    panic!("FatalError: {entry_point}: {message}");
}
