use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::parse::Parser;
use syn::punctuated::Punctuated;
use syn::{Attribute, Expr, ItemFn, ItemStruct, Lit, LitStr, Meta, MetaNameValue, Token};

use super::derived_traits;

/// Arguments accepted by `#[api_model(...)]`.
#[derive(Default)]
struct ModelArgs {
    rename_all: Option<LitStr>,
    deny_unknown_fields: Option<bool>,
}

/// Serde settings already written on the struct by hand.
#[derive(Default)]
struct ExistingSerde {
    rename_all: Option<LitStr>,
    deny_unknown_fields: bool,
}

pub fn expand_api_model(args: TokenStream, input: ItemStruct) -> TokenStream {
    match model_attributes(args, &input) {
        Ok(attrs) => quote! {
            #attrs
            #input
        },
        Err(err) => err.to_compile_error(),
    }
}

pub fn expand_api_handler(args: TokenStream, input: ItemFn) -> TokenStream {
    let ItemFn { attrs, vis, sig, block } = input;

    quote! {
        #(#attrs)*
        #[allow(clippy::unused_async)]
        #[cfg_attr(feature = "server", ::utoipa::path(#args))]
        #vis #sig #block
    }
}

fn model_attributes(args: TokenStream, input: &ItemStruct) -> syn::Result<TokenStream> {
    let args = parse_model_args(args)?;
    let existing = existing_serde(&input.attrs)?;
    let derives = derived_traits(&input.attrs);

    let mut missing = Vec::new();
    for (name, path) in [
        ("Debug", quote! { Debug }),
        ("Serialize", quote! { ::serde::Serialize }),
        ("Deserialize", quote! { ::serde::Deserialize }),
    ] {
        if !derives.contains(name) {
            missing.push(path);
        }
    }
    let derive = if missing.is_empty() {
        quote! {}
    } else {
        quote! { #[derive(#(#missing),*)] }
    };

    let schema = if derives.contains("ToSchema") {
        quote! {}
    } else {
        quote! { #[cfg_attr(feature = "server", derive(::utoipa::ToSchema))] }
    };

    let wanted_case =
        args.rename_all.unwrap_or_else(|| LitStr::new("camelCase", Span::call_site()));
    let rename = match &existing.rename_all {
        Some(lit) if lit.value() != wanted_case.value() => {
            return Err(syn::Error::new_spanned(
                lit,
                "serde rename_all conflicts with api_model(rename_all = ...)",
            ));
        }
        Some(_) => quote! {},
        None => quote! { #[serde(rename_all = #wanted_case)] },
    };

    let deny = match (args.deny_unknown_fields.unwrap_or(true), existing.deny_unknown_fields) {
        (false, true) => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "serde(deny_unknown_fields) is set by hand; remove it before disabling",
            ));
        }
        (true, false) => quote! { #[serde(deny_unknown_fields)] },
        _ => quote! {},
    };

    Ok(quote! {
        #derive
        #schema
        #rename
        #deny
    })
}

fn parse_model_args(args: TokenStream) -> syn::Result<ModelArgs> {
    let metas = Punctuated::<Meta, Token![,]>::parse_terminated.parse2(args)?;
    let mut parsed = ModelArgs::default();

    for meta in metas {
        let Meta::NameValue(nv) = meta else {
            return Err(syn::Error::new_spanned(meta, "expected `key = value` arguments"));
        };
        if nv.path.is_ident("rename_all") {
            let Lit::Str(lit) = literal(&nv)? else {
                return Err(syn::Error::new_spanned(&nv.value, "rename_all takes a string"));
            };
            replace_once(&mut parsed.rename_all, lit.clone(), &nv)?;
        } else if nv.path.is_ident("deny_unknown_fields") {
            let Lit::Bool(lit) = literal(&nv)? else {
                return Err(syn::Error::new_spanned(&nv.value, "deny_unknown_fields takes a bool"));
            };
            replace_once(&mut parsed.deny_unknown_fields, lit.value, &nv)?;
        } else {
            return Err(syn::Error::new_spanned(
                &nv.path,
                "unsupported argument; expected rename_all or deny_unknown_fields",
            ));
        }
    }

    Ok(parsed)
}

fn literal(nv: &MetaNameValue) -> syn::Result<&Lit> {
    match &nv.value {
        Expr::Lit(expr) => Ok(&expr.lit),
        other => Err(syn::Error::new_spanned(other, "expected a literal")),
    }
}

fn replace_once<T>(slot: &mut Option<T>, value: T, at: &MetaNameValue) -> syn::Result<()> {
    if slot.replace(value).is_some() {
        return Err(syn::Error::new_spanned(at, "duplicate argument"));
    }
    Ok(())
}

fn existing_serde(attrs: &[Attribute]) -> syn::Result<ExistingSerde> {
    let mut existing = ExistingSerde::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") {
                existing.rename_all = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("deny_unknown_fields") {
                existing.deny_unknown_fields = true;
            } else if meta.input.peek(Token![=]) {
                let _: Expr = meta.value()?.parse()?;
            }
            Ok(())
        })?;
    }
    Ok(existing)
}
