use proc_macro::TokenStream;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, LitStr};

pub fn derive_schematic(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(err) => TokenStream::from(err.to_compile_error()),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let collection = extract_collection(input)?;
    let unique = extract_unique_fields(input)?;

    Ok(quote! {
        impl #impl_generics ::docbind::Schematic for #name #ty_generics #where_clause {
            const COLLECTION: &'static str = #collection;

            fn schema() -> ::docbind::Schema {
                ::docbind::Schema::new()
                    #( .unique(#unique) )*
            }
        }
    })
}

fn extract_collection(input: &DeriveInput) -> syn::Result<String> {
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("document")) {
        let mut collection = None;
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("collection") {
                let value: LitStr = meta.value()?.parse()?;
                collection = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("expected `collection = \"...\"`"))
            }
        })?;

        if let Some(c) = collection {
            if c.is_empty() {
                return Err(syn::Error::new_spanned(attr, "collection name cannot be empty"));
            }
            return Ok(c);
        }
    }

    // Default: snake_case struct name + "s"
    Ok(format!("{}s", to_snake_case(&input.ident.to_string())))
}

fn extract_unique_fields(input: &DeriveInput) -> syn::Result<Vec<String>> {
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input.ident,
                    "Schematic derive only supports structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "Schematic derive only supports structs",
            ))
        }
    };

    let mut unique = Vec::new();
    for field in fields {
        let mut is_unique = false;
        for attr in field.attrs.iter().filter(|a| a.path().is_ident("document")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("unique") {
                    is_unique = true;
                    Ok(())
                } else {
                    Err(meta.error("expected `unique`"))
                }
            })?;
        }
        if !is_unique {
            continue;
        }

        let stored_name = match serde_rename(&field.attrs)? {
            Some(renamed) => renamed,
            None => match &field.ident {
                Some(ident) => ident.to_string().trim_start_matches("r#").to_string(),
                None => continue,
            },
        };
        unique.push(stored_name);
    }
    Ok(unique)
}

/// Reads `#[serde(rename = "...")]`. Other serde options are skipped.
fn serde_rename(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    let mut renamed = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.input.peek(syn::Token![=]) {
                let value: syn::Expr = meta.value()?.parse()?;
                if meta.path.is_ident("rename") {
                    if let syn::Expr::Lit(syn::ExprLit {
                        lit: syn::Lit::Str(name),
                        ..
                    }) = value
                    {
                        renamed = Some(name.value());
                    }
                }
            } else if meta.input.peek(syn::token::Paren) {
                // e.g. rename(serialize = "..."), only a plain rename is honoured
                meta.parse_nested_meta(|inner| {
                    if inner.input.peek(syn::Token![=]) {
                        let _: syn::Expr = inner.value()?.parse()?;
                    }
                    Ok(())
                })?;
            }
            Ok(())
        })?;
    }
    Ok(renamed)
}

fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, ch) in s.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.extend(ch.to_lowercase());
        } else {
            result.push(ch);
        }
    }
    result
}
