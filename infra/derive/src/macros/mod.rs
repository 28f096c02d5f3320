use fxhash::FxHashSet;
use syn::Attribute;

pub mod api;
pub mod error;
pub mod slice;
pub mod versioned;

/// Collects the trait names already present in `#[derive(...)]` attributes.
///
/// Paths are reduced to their last segment, so `serde::Serialize` reads as `Serialize`.
pub(crate) fn derived_traits(attrs: &[Attribute]) -> FxHashSet<String> {
    let mut traits = FxHashSet::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("derive")) {
        let _ = attr.parse_nested_meta(|meta| {
            if let Some(last) = meta.path.segments.last() {
                traits.insert(last.ident.to_string());
            }
            Ok(())
        });
    }
    traits
}
