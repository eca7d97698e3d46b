use thiserror::Error;

use crate::Token;

/// Errors reported by the checked (Rust-side) callback operations.
///
/// The `extern "C"` trampolines cannot return these; they treat every error as a
/// fault instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CallbackError {
    #[error("Failed to acquire callback registry lock")]
    RegistryLock,

    #[error("No callback registered for token {token}")]
    TokenNotFound { token: Token },

    #[error("Callback signature mismatch for token {token}: expected {expected}, found {found}")]
    SignatureMismatch {
        token: Token,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Callback token space exhausted")]
    TokensExhausted,
}
