//! Errors returned to callers of the conversion lookup.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    /// Neither USD, a built-in fiat nor a registered custom fiat.
    #[error("unexpected not fiat symbol {0:?}")]
    UnsupportedSymbol(String),

    /// Known symbol without a table entry yet. Retrying after the next refresh may succeed.
    #[error("convert mod from {0:?} not found in cache")]
    NotYetAvailable(String),
}
