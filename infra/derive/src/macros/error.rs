use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{Attribute, Data, DeriveInput, Field, Fields, GenericArgument, Ident, PathArguments, Type};

use super::derived_traits;

/// One enum variant as seen by the error macro.
struct ErrorVariant<'a> {
    ident: &'a Ident,
    cfg: Vec<&'a Attribute>,
    source: Option<(&'a Ident, &'a Type)>,
    carries_context: bool,
}

impl ErrorVariant<'_> {
    fn is_internal(&self) -> bool {
        self.ident == "Internal"
    }
}

pub fn expand_error(input: DeriveInput) -> TokenStream {
    match ErrorModel::parse(&input) {
        Ok(model) => model.render(&input),
        Err(err) => err.to_compile_error(),
    }
}

struct ErrorModel<'a> {
    name: &'a Ident,
    ext: Ident,
    variants: Vec<ErrorVariant<'a>>,
}

impl<'a> ErrorModel<'a> {
    fn parse(input: &'a DeriveInput) -> syn::Result<Self> {
        let Data::Enum(data) = &input.data else {
            return Err(syn::Error::new_spanned(&input.ident, "lreg_error only applies to enums"));
        };

        let mut variants = Vec::with_capacity(data.variants.len());
        for variant in &data.variants {
            let Fields::Named(fields) = &variant.fields else {
                return Err(syn::Error::new_spanned(
                    variant,
                    "lreg_error variants must use named fields",
                ));
            };

            let mut source = None;
            let mut carries_context = false;
            for field in &fields.named {
                let Some(ident) = field.ident.as_ref() else { continue };
                if ident == "context" {
                    if !is_optional_cow_str(&field.ty) {
                        return Err(syn::Error::new_spanned(
                            &field.ty,
                            "`context` must be Option<Cow<'static, str>>",
                        ));
                    }
                    carries_context = true;
                } else if source.is_none() && is_source_field(ident, field) {
                    source = Some((ident, &field.ty));
                }
            }

            if source.is_some() && !carries_context {
                return Err(syn::Error::new_spanned(
                    &variant.ident,
                    "variants with a source also need `context: Option<Cow<'static, str>>`",
                ));
            }

            variants.push(ErrorVariant {
                ident: &variant.ident,
                cfg: variant.attrs.iter().filter(|a| a.path().is_ident("cfg")).collect(),
                source,
                carries_context,
            });
        }

        Ok(Self { name: &input.ident, ext: format_ident!("{}Ext", input.ident), variants })
    }

    fn render(&self, input: &DeriveInput) -> TokenStream {
        let derives = derived_traits(&input.attrs);
        let mut missing = Vec::new();
        if !derives.contains("Debug") {
            missing.push(quote! { Debug });
        }
        if !derives.contains("Error") {
            missing.push(quote! { ::thiserror::Error });
        }
        let derive = if missing.is_empty() {
            quote! {}
        } else {
            quote! { #[derive(#(#missing),*)] }
        };

        let ext = self.ext_trait();
        let accessor = self.context_accessor();
        let conversions = self.variants.iter().filter_map(|v| self.source_conversion(v));
        let internal = self.internal_conversions();

        quote! {
            #[allow(non_shorthand_field_patterns)]
            #derive
            #input

            #ext
            #accessor
            #(#conversions)*
            #internal

            #[allow(dead_code)]
            fn format_context(
                context: &Option<::std::borrow::Cow<'static, str>>,
            ) -> ::std::borrow::Cow<'static, str> {
                match context {
                    Some(c) => ::std::borrow::Cow::Owned(format!(" ({c})")),
                    None => ::std::borrow::Cow::Borrowed(""),
                }
            }
        }
    }

    fn ext_trait(&self) -> TokenStream {
        let name = self.name;
        let ext = &self.ext;
        let arms = self.variants.iter().filter(|v| v.carries_context).map(|v| {
            let ident = v.ident;
            let cfg = &v.cfg;
            quote! { #(#cfg)* #name::#ident { context: slot, .. } => *slot = Some(context.into()), }
        });

        quote! {
            pub trait #ext<T> {
                fn context(
                    self,
                    context: impl Into<::std::borrow::Cow<'static, str>>,
                ) -> ::std::result::Result<T, #name>;
            }

            #[automatically_derived]
            impl<T> #ext<T> for ::std::result::Result<T, #name> {
                #[inline]
                fn context(self, context: impl Into<::std::borrow::Cow<'static, str>>) -> Self {
                    self.map_err(|mut err| {
                        match &mut err {
                            #(#arms)*
                            _ => {}
                        }
                        err
                    })
                }
            }
        }
    }

    fn context_accessor(&self) -> TokenStream {
        let name = self.name;
        let arms = self.variants.iter().filter(|v| v.carries_context).map(|v| {
            let ident = v.ident;
            let cfg = &v.cfg;
            quote! { #(#cfg)* Self::#ident { context, .. } => context.as_deref(), }
        });

        quote! {
            #[automatically_derived]
            impl #name {
                /// Context attached through the `.context(...)` extension, if any.
                #[must_use]
                #[allow(unreachable_patterns)]
                pub fn context_str(&self) -> Option<&str> {
                    match self {
                        #(#arms)*
                        _ => None,
                    }
                }
            }
        }
    }

    fn source_conversion(&self, variant: &ErrorVariant<'_>) -> Option<TokenStream> {
        if variant.is_internal() {
            return None;
        }
        let (field, ty) = variant.source?;
        let name = self.name;
        let ext = &self.ext;
        let ident = variant.ident;
        let cfg = &variant.cfg;

        Some(quote! {
            #(#cfg)*
            #[automatically_derived]
            impl From<#ty> for #name {
                #[inline]
                fn from(#field: #ty) -> Self {
                    Self::#ident { #field, context: None }
                }
            }

            #(#cfg)*
            impl<T> #ext<T> for ::std::result::Result<T, #ty> {
                #[inline]
                fn context(
                    self,
                    context: impl Into<::std::borrow::Cow<'static, str>>,
                ) -> ::std::result::Result<T, #name> {
                    self.map_err(|#field| #name::#ident { #field, context: Some(context.into()) })
                }
            }
        })
    }

    fn internal_conversions(&self) -> TokenStream {
        let Some(internal) = self.variants.iter().find(|v| v.is_internal()) else {
            return quote! {};
        };
        let name = self.name;
        let cfg = &internal.cfg;

        quote! {
            #(#cfg)*
            impl From<&'static str> for #name {
                #[inline]
                fn from(message: &'static str) -> Self {
                    Self::Internal { message: ::std::borrow::Cow::Borrowed(message), context: None }
                }
            }

            #(#cfg)*
            impl From<String> for #name {
                #[inline]
                fn from(message: String) -> Self {
                    Self::Internal { message: ::std::borrow::Cow::Owned(message), context: None }
                }
            }
        }
    }
}

fn is_source_field(ident: &Ident, field: &Field) -> bool {
    ident == "source"
        || field.attrs.iter().any(|a| a.path().is_ident("source") || a.path().is_ident("from"))
}

/// Matches `Option<Cow<'static, str>>` by the last path segments.
fn is_optional_cow_str(ty: &Type) -> bool {
    let Some(inner) = single_type_argument(ty, "Option") else {
        return false;
    };
    let Type::Path(path) = inner else {
        return false;
    };
    let Some(cow) = path.path.segments.last() else {
        return false;
    };
    if cow.ident != "Cow" {
        return false;
    }
    let PathArguments::AngleBracketed(args) = &cow.arguments else {
        return false;
    };

    let mut args = args.args.iter();
    let static_lifetime =
        matches!(args.next(), Some(GenericArgument::Lifetime(lt)) if lt.ident == "static");
    let str_type = matches!(
        args.next(),
        Some(GenericArgument::Type(Type::Path(p)))
            if p.path.segments.last().is_some_and(|s| s.ident == "str")
    );
    static_lifetime && str_type
}

/// Returns `T` for `Wrapper<T>` when the last path segment is `wrapper`.
pub(crate) fn single_type_argument<'t>(ty: &'t Type, wrapper: &str) -> Option<&'t Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(inner) if args.args.len() == 1 => Some(inner),
        _ => None,
    }
}
