use std::borrow::Cow;

use lreg_database::DatabaseError;
use lreg_domain::versioned::LineageId;

/// Verksemd slice error type.
#[lreg_derive::lreg_error]
pub enum VerksemdError {
    #[error("Invalid verksemd{}: {message}", format_context(.context))]
    Validation { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Verksemd {id} not found")]
    NotFound { id: LineageId },

    #[error("Verksemd storage failed{}: {source}", format_context(.context))]
    Storage {
        #[source]
        source: DatabaseError,
        context: Option<Cow<'static, str>>,
    },

    /// Enhetsregisteret lookup failed. `not_found` is set when the registry has no such unit.
    #[error("Registry lookup for {orgnummer} failed: {message}")]
    Registry { orgnummer: String, message: Cow<'static, str>, not_found: bool },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
