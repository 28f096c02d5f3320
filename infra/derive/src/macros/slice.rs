use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::ItemStruct;

pub fn expand_slice(input: ItemStruct) -> TokenStream {
    let ItemStruct { attrs, vis, ident, generics, fields, .. } = &input;
    if !generics.params.is_empty() {
        return syn::Error::new_spanned(generics, "lreg_slice does not support generics")
            .to_compile_error();
    }

    let inner = format_ident!("{ident}Inner");
    let body = match fields {
        syn::Fields::Named(_) => quote! { #fields },
        _ => quote! { #fields; },
    };

    quote! {
        #(#attrs)*
        #[derive(Debug)]
        #vis struct #inner #body

        /// Shared handle over the slice state.
        #[derive(Debug, Clone)]
        #vis struct #ident(::std::sync::Arc<#inner>);

        impl #ident {
            #[must_use]
            pub fn new(inner: #inner) -> Self {
                Self(::std::sync::Arc::new(inner))
            }
        }

        impl From<#inner> for #ident {
            fn from(inner: #inner) -> Self {
                Self::new(inner)
            }
        }

        impl ::std::ops::Deref for #ident {
            type Target = #inner;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl ::lreg_kernel::domain::registry::FeatureSlice for #ident {
            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }
        }
    }
}
