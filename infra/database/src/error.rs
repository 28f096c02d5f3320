use std::borrow::Cow;

use lreg_domain::versioned::{LineageId, VersionedError};

/// Errors raised by the storage layer.
#[lreg_derive::lreg_error]
pub enum DatabaseError {
    /// Builder or query parameters are missing or malformed.
    #[error("Validation error{}: {message}", format_context(.context))]
    Validation { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Connectivity or health checks failed.
    #[error("Database connection failed{}: {message}", format_context(.context))]
    Connection { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Root sign-in was rejected.
    #[error("Authentication failed{}: {message}", format_context(.context))]
    Auth { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Errors from the `SurrealDB` engine.
    #[error("SurrealDB error{}: {source}", format_context(.context))]
    Surreal {
        #[source]
        source: surrealdb::Error,
        context: Option<Cow<'static, str>>,
    },

    /// A stored lineage could not be folded into an entity.
    #[error("Corrupt lineage{}: {source}", format_context(.context))]
    Versioned {
        #[source]
        source: VersionedError,
        context: Option<Cow<'static, str>>,
    },

    /// No active entity for the lineage.
    #[error("No active {table} with id {id}")]
    NotFound { table: &'static str, id: LineageId },

    /// Migration failures or checksum drift.
    #[error("Migration error{}: {message}", format_context(.context))]
    Migration { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Unexpected states.
    #[error("Internal database error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
