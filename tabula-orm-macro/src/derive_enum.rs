//! # Enum Derive Macro Implementation
//!
//! This module implements the procedural macro expansion for `#[derive(DbEnum)]`.
//! It generates `Display` and `FromStr` using the variant names as the string
//! representation, and a `ColumnValue` impl that stores the enum as that name.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, spanned::Spanned};

/// Expands the `#[derive(DbEnum)]` macro.
pub fn expand(ast: DeriveInput) -> syn::Result<TokenStream> {
    let name = &ast.ident;

    let variants = match &ast.data {
        Data::Enum(data_enum) => &data_enum.variants,
        _ => return Err(syn::Error::new(ast.span(), "DbEnum can only be derived for enums")),
    };

    if let Some(variant) = variants.iter().find(|v| !matches!(v.fields, Fields::Unit)) {
        return Err(syn::Error::new(variant.span(), "DbEnum variants cannot carry data"));
    }

    // Self::Variant => "Variant"
    let display_arms = variants.iter().map(|variant| {
        let variant_ident = &variant.ident;
        let variant_name = variant_ident.to_string();
        quote! {
            Self::#variant_ident => f.write_str(#variant_name),
        }
    });

    // "Variant" => Ok(Self::Variant)
    let from_str_arms = variants.iter().map(|variant| {
        let variant_ident = &variant.ident;
        let variant_name = variant_ident.to_string();
        quote! {
            #variant_name => Ok(Self::#variant_ident),
        }
    });

    Ok(quote! {
        impl std::fmt::Display for #name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    #(#display_arms)*
                }
            }
        }

        impl std::str::FromStr for #name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    #(#from_str_arms)*
                    _ => Err(format!("Unknown variant: {}", s)),
                }
            }
        }

        impl tabula_orm::ColumnValue for #name {
            const SEMANTIC: tabula_orm::SemanticType = tabula_orm::SemanticType::Enum;

            fn to_value(&self) -> tabula_orm::Value {
                tabula_orm::Value::Text(self.to_string())
            }

            fn from_value(value: tabula_orm::Value) -> Result<Self, tabula_orm::Error> {
                tabula_orm::__private::decode_enum(value)
            }
        }
    })
}
