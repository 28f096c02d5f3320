use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{Fields, Ident, ItemStruct, Type};

use super::error::single_type_argument;

enum Role {
    Lineage,
    Aktiv,
    Payload,
}

struct Payload<'a> {
    ident: &'a Ident,
    ty: &'a Type,
    /// The entity field is `Option<T>`: its diff slot is `Option<Option<T>>`, where
    /// `Some(None)` clears the field.
    optional: bool,
}

pub fn expand_versioned(mut input: ItemStruct) -> TokenStream {
    match collect_roles(&mut input) {
        Ok((lineage, aktiv)) => render(&input, &lineage, aktiv.as_ref()),
        Err(err) => err.to_compile_error(),
    }
}

/// Strips `#[versioned(...)]` from the fields and returns the lineage and aktiv idents.
fn collect_roles(input: &mut ItemStruct) -> syn::Result<(Ident, Option<Ident>)> {
    let Fields::Named(fields) = &mut input.fields else {
        return Err(syn::Error::new_spanned(&input.ident, "versioned_model needs named fields"));
    };

    let mut lineage = None;
    let mut aktiv = None;
    for field in &mut fields.named {
        let role = field_role(&field.attrs)?;
        field.attrs.retain(|a| !a.path().is_ident("versioned"));
        let Some(ident) = field.ident.clone() else { continue };
        let slot = match role {
            Role::Lineage => &mut lineage,
            Role::Aktiv => &mut aktiv,
            Role::Payload => continue,
        };
        if slot.replace(ident).is_some() {
            return Err(syn::Error::new_spanned(field, "duplicate versioned role"));
        }
    }

    let lineage = lineage.ok_or_else(|| {
        syn::Error::new_spanned(&input.ident, "missing a `#[versioned(lineage)]` field")
    })?;
    Ok((lineage, aktiv))
}

fn field_role(attrs: &[syn::Attribute]) -> syn::Result<Role> {
    let mut role = Role::Payload;
    for attr in attrs.iter().filter(|a| a.path().is_ident("versioned")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("lineage") {
                role = Role::Lineage;
                Ok(())
            } else if meta.path.is_ident("aktiv") {
                role = Role::Aktiv;
                Ok(())
            } else {
                Err(meta.error("expected `lineage` or `aktiv`"))
            }
        })?;
    }
    Ok(role)
}

fn render(input: &ItemStruct, lineage: &Ident, aktiv: Option<&Ident>) -> TokenStream {
    let name = &input.ident;
    let vis = &input.vis;
    let diff = format_ident!("{name}Diff");
    let doc = format!(
        " Sparse change record for [`{name}`]. `None` means unchanged; optional fields \
         use `Some(None)` to clear."
    );

    let payload: Vec<Payload<'_>> = input
        .fields
        .iter()
        .filter_map(|f| {
            let ident = f.ident.as_ref()?;
            (ident != lineage && aktiv.is_none_or(|a| ident != a)).then(|| Payload {
                ident,
                ty: &f.ty,
                optional: single_type_argument(&f.ty, "Option").is_some(),
            })
        })
        .collect();

    let diff_fields = payload.iter().map(|p| {
        let Payload { ident, ty, .. } = p;
        quote! { pub #ident: ::core::option::Option<#ty> }
    });
    let merge_fields = payload.iter().map(|p| {
        let ident = p.ident;
        quote! { #ident: later.#ident.or(self.#ident) }
    });
    let snapshot_fields = payload.iter().map(|p| {
        let ident = p.ident;
        quote! { #ident: ::core::option::Option::Some(self.#ident.clone()) }
    });
    let diff_exprs = payload.iter().map(|p| {
        let ident = p.ident;
        quote! {
            #ident: (previous.#ident != next.#ident).then(|| next.#ident.clone())
        }
    });
    let restore_fields = payload.iter().map(|p| {
        let ident = p.ident;
        let label = ident.to_string();
        if p.optional {
            quote! { #ident: diff.#ident.flatten() }
        } else {
            quote! {
                #ident: diff.#ident.ok_or(::lreg_domain::versioned::VersionedError::Incomplete {
                    lineage,
                    field: #label,
                })?
            }
        }
    });

    let (aktiv_getter, aktiv_restore) = aktiv.map_or_else(
        || (quote! { true }, quote! { let _ = aktiv; }),
        |a| (quote! { self.#a }, quote! {}),
    );
    let aktiv_field = aktiv.map(|a| quote! { #a: aktiv, });

    quote! {
        #input

        #[doc = #doc]
        #[derive(Debug, Clone, Default, PartialEq)]
        #vis struct #diff {
            #(#diff_fields,)*
        }

        #[automatically_derived]
        impl ::lreg_domain::versioned::Sparse for #diff {
            fn merge(self, later: Self) -> Self {
                Self { #(#merge_fields,)* }
            }
        }

        #[automatically_derived]
        impl ::lreg_domain::versioned::Versioned for #name {
            type Diff = #diff;

            fn lineage(&self) -> ::lreg_domain::versioned::LineageId {
                self.#lineage
            }

            fn is_aktiv(&self) -> bool {
                #aktiv_getter
            }

            fn snapshot(&self) -> Self::Diff {
                #diff { #(#snapshot_fields,)* }
            }

            fn diff(previous: &Self, next: &Self) -> Self::Diff {
                #diff { #(#diff_exprs,)* }
            }

            fn restore(
                lineage: ::lreg_domain::versioned::LineageId,
                aktiv: bool,
                diff: Self::Diff,
            ) -> ::core::result::Result<Self, ::lreg_domain::versioned::VersionedError> {
                #aktiv_restore
                Ok(Self {
                    #lineage: lineage,
                    #aktiv_field
                    #(#restore_fields,)*
                })
            }
        }
    }
}
