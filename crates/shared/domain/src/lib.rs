//! # Domain Models
//!
//! Pure domain types for the registry: configuration, the append-only versioning fold and
//! the two versioned entities, [`loeysing::Loeysing`] and [`verksemd::Verksemd`].
//! No I/O lives here; storage and HTTP concerns sit in the infra and feature crates.

extern crate self as lreg_domain;

pub mod config;
pub mod constants;
pub mod loeysing;
pub mod nettadresse;
pub mod registry;
pub mod verksemd;
pub mod versioned;
