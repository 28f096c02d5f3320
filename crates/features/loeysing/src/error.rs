use std::borrow::Cow;

use lreg_database::DatabaseError;
use lreg_domain::versioned::LineageId;
use lreg_verksemd::VerksemdError;

/// Løysing slice error type.
#[lreg_derive::lreg_error]
pub enum LoeysingError {
    #[error("Invalid løysing{}: {message}", format_context(.context))]
    Validation { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Løysing {id} not found")]
    NotFound { id: LineageId },

    #[error("Løysing storage failed{}: {source}", format_context(.context))]
    Storage {
        #[source]
        source: DatabaseError,
        context: Option<Cow<'static, str>>,
    },

    /// Resolving the owning verksemd failed.
    #[error("Owner lookup failed{}: {source}", format_context(.context))]
    Verksemd {
        #[source]
        source: VerksemdError,
        context: Option<Cow<'static, str>>,
    },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
