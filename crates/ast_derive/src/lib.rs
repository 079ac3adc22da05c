//! `#[derive(WalkAst)]`: generates `crate::walk::Walk` for goparser AST nodes.
//!
//! Every field is walked in declaration order. Fields marked `#[walk(skip)]`
//! are left out, which is how leaf payloads without a `Walk` impl (constant
//! values, array lengths, body spans) opt out of traversal.

use proc_macro::TokenStream;
use quote::{format_ident, quote, quote_spanned};
use syn::{parse_macro_input, spanned::Spanned, Data, DeriveInput, Field, Fields, Index};

#[proc_macro_derive(WalkAst, attributes(walk))]
pub fn derive_walk_ast(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let span = input.span();

    let walk_body = match generate_walk_body(&input.data) {
        Ok(body) => body,
        Err(err) => return err.into_compile_error().into(),
    };

    let expanded = quote_spanned! {span =>
        impl<'ast> crate::walk::Walk<'ast> for #name {
            #[inline(always)]
            #[allow(unused_variables)]
            fn walk<V: crate::walk::Visitor<'ast> + ?Sized>(
                &self,
                a: &'ast crate::ast::AstArena,
                v: &mut V
            ) {
                #walk_body
            }
        }
    };

    expanded.into()
}

/// True when the field carries `#[walk(skip)]`.
fn is_skipped(field: &Field) -> syn::Result<bool> {
    let mut skip = false;
    for attr in field.attrs.iter().filter(|a| a.path().is_ident("walk")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                skip = true;
                Ok(())
            } else {
                Err(meta.error("unsupported walk attribute; expected `skip`"))
            }
        })?;
    }
    Ok(skip)
}

fn generate_walk_body(data: &Data) -> syn::Result<proc_macro2::TokenStream> {
    match data {
        Data::Struct(data_struct) => generate_fields_walk(&data_struct.fields),
        Data::Enum(data_enum) => {
            let arms = data_enum
                .variants
                .iter()
                .map(|variant| generate_variant_arm(&variant.ident, &variant.fields))
                .collect::<syn::Result<Vec<_>>>()?;

            Ok(quote! {
                match self {
                    #(#arms)*
                }
            })
        }
        Data::Union(u) => Err(syn::Error::new_spanned(
            u.union_token,
            "WalkAst cannot be derived for unions",
        )),
    }
}

fn generate_fields_walk(fields: &Fields) -> syn::Result<proc_macro2::TokenStream> {
    let mut walk_calls = Vec::new();
    for (i, field) in fields.iter().enumerate() {
        if is_skipped(field)? {
            continue;
        }
        let field_access = match &field.ident {
            Some(ident) => quote! { &self.#ident },
            None => {
                let index = Index::from(i);
                quote! { &self.#index }
            }
        };
        walk_calls.push(quote! { crate::walk::Walk::walk(#field_access, a, v); });
    }

    Ok(quote! { #(#walk_calls)* })
}

fn generate_variant_arm(
    variant_name: &syn::Ident,
    fields: &Fields,
) -> syn::Result<proc_macro2::TokenStream> {
    match fields {
        Fields::Unit => Ok(quote! { Self::#variant_name => {} }),
        Fields::Named(fields_named) => {
            let mut patterns = Vec::new();
            let mut walk_calls = Vec::new();
            for field in &fields_named.named {
                let Some(ident) = field.ident.as_ref() else {
                    continue;
                };
                if is_skipped(field)? {
                    patterns.push(quote! { #ident: _ });
                } else {
                    patterns.push(quote! { #ident });
                    walk_calls.push(quote! { crate::walk::Walk::walk(#ident, a, v); });
                }
            }

            Ok(quote! {
                Self::#variant_name { #(#patterns),* } => {
                    #(#walk_calls)*
                }
            })
        }
        Fields::Unnamed(fields_unnamed) => {
            let mut patterns = Vec::new();
            let mut walk_calls = Vec::new();
            for (i, field) in fields_unnamed.unnamed.iter().enumerate() {
                if is_skipped(field)? {
                    patterns.push(quote! { _ });
                } else {
                    let binding = format_ident!("f{}", i);
                    walk_calls.push(quote! { crate::walk::Walk::walk(#binding, a, v); });
                    patterns.push(quote! { #binding });
                }
            }

            Ok(quote! {
                Self::#variant_name(#(#patterns),*) => {
                    #(#walk_calls)*
                }
            })
        }
    }
}
