#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Procedural macros shared by the registry crates.
//!
//! * [`macro@lreg_error`] turns an enum into a context-carrying error type.
//! * [`macro@versioned_model`] generates the sparse diff record and the
//!   `Versioned` implementation for an append-only entity.
//! * [`macro@api_model`] and [`macro@api_handler`] keep HTTP DTOs and handlers uniform.
//! * [`macro@lreg_slice`] wraps feature state into a registrable slice handle.
//!
//! Examples are `ignore`d here; the consuming crates exercise every macro in their tests.

mod macros;

use proc_macro::TokenStream;
use syn::{DeriveInput, ItemFn, ItemStruct, parse_macro_input};

/// Attribute macro to define a standard API data model.
///
/// # Injected Behaviors
///
/// * **Derives**: `Debug`, `Serialize` and `Deserialize` when missing.
/// * **`OpenAPI`**: `utoipa::ToSchema` when the consuming crate enables `server`.
/// * **Serde Policy**: `rename_all = "camelCase"` unless overridden; unknown fields are
///   rejected unless `deny_unknown_fields = false`.
///
/// # Example
///
/// ```rust,ignore
/// #[lreg_derive::api_model(deny_unknown_fields = false)]
/// pub struct NyLoeysing {
///     pub namn: Option<String>,
///     pub url: Option<String>,
/// }
/// ```
#[proc_macro_attribute]
pub fn api_model(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemStruct);
    macros::api::expand_api_model(attr.into(), input).into()
}

/// Attribute macro to bridge Axum handlers with `OpenAPI` documentation.
///
/// Accepts the regular `utoipa::path` arguments and applies them only when the
/// consuming crate is built with the `server` feature.
///
/// ```rust,ignore
/// #[lreg_derive::api_handler(get, path = "/health", responses((status = OK)))]
/// pub async fn health_handler() -> impl IntoResponse { "up" }
/// ```
#[proc_macro_attribute]
pub fn api_handler(args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    macros::api::expand_api_handler(args.into(), input).into()
}

/// Turns an enum into an error type wired for the registry crates.
///
/// # Generated Items
///
/// * `#[derive(Debug, thiserror::Error)]` when not already present.
/// * `<ErrorName>Ext` trait adding `.context(...)` to `Result<T, ErrorName>` and to
///   `Result<T, Source>` for every variant holding a `source` field.
/// * `From<Source>` for each variant with a `source` field.
/// * `From<&'static str>` and `From<String>` when an `Internal` variant exists.
/// * `ErrorName::context_str()` returning the attached context, if any.
/// * A module-private `format_context` helper used by the `#[error(...)]` strings.
///
/// # Requirements
///
/// Variants must use named fields. Variants with a source must also declare
/// `context: Option<Cow<'static, str>>`. Only one annotated enum per module.
///
/// ```rust,ignore
/// #[lreg_derive::lreg_error]
/// pub enum StoreError {
///     #[error("Store error{}: {source}", format_context(.context))]
///     Surreal { source: surrealdb::Error, context: Option<Cow<'static, str>> },
///     #[error("Internal error{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
/// ```
#[proc_macro_attribute]
pub fn lreg_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::error::expand_error(input).into()
}

/// Generates the append-only versioning glue for an entity struct.
///
/// For `struct Loeysing` it emits `struct LoeysingDiff` with one `Option` per payload
/// field, implements `lreg_domain::versioned::Sparse` for it and
/// `lreg_domain::versioned::Versioned` for the entity.
///
/// # Field attributes
///
/// * `#[versioned(lineage)]`: the `i64` lineage id, required exactly once.
/// * `#[versioned(aktiv)]`: the derived `bool` active flag, optional.
///
/// Every other field is payload. A payload field of type `T` becomes `Option<T>` in the
/// diff, so a field of type `Option<T>` becomes `Option<Option<T>>`: `Some(None)` clears
/// it.
///
/// ```rust,ignore
/// #[lreg_derive::versioned_model]
/// #[derive(Debug, Clone, PartialEq)]
/// pub struct Loeysing {
///     #[versioned(lineage)]
///     pub id: i64,
///     pub namn: String,
///     pub verksemd_id: Option<i64>,
///     #[versioned(aktiv)]
///     pub aktiv: bool,
/// }
/// ```
#[proc_macro_attribute]
pub fn versioned_model(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemStruct);
    macros::versioned::expand_versioned(input).into()
}

/// Attribute macro to define a feature slice handle.
///
/// Generates `<Name>Inner` with the declared fields, an `Arc` wrapper named `<Name>`
/// that derefs to it, and the `FeatureSlice` implementation used by the server state.
///
/// ```rust,ignore
/// #[lreg_derive::lreg_slice]
/// pub struct Loeysingar {
///     pub repository: LoeysingRepository,
/// }
/// ```
#[proc_macro_attribute]
pub fn lreg_slice(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(item as ItemStruct);
    macros::slice::expand_slice(input).into()
}
