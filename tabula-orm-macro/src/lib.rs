//! Derive macros of Tabula ORM: `#[derive(Model)]` and `#[derive(DbEnum)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod derive_enum;
mod derive_model;

/// Derives `tabula_orm::Model` for a struct with named fields.
///
/// Struct attributes: `#[orm(table = "name")]`,
/// `#[orm(builder = "Type::ctor(col_a, col_b)")]`.
///
/// Field attributes: `column = "name"`, `primary_key`, `nullable`,
/// `length = N`, `precision = N`, `scale = N`, `index`, `index = "name"`,
/// `unique`, `foreign_key = "Type::column"`, `on_update = "..."`,
/// `on_delete = "..."`.
///
/// Without a builder the struct must implement `Default`.
#[proc_macro_derive(Model, attributes(orm))]
pub fn model_derive(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    derive_model::expand(ast).unwrap_or_else(syn::Error::into_compile_error).into()
}

/// Derives `Display`, `FromStr` and `tabula_orm::ColumnValue` for a
/// fieldless enum stored by variant name.
#[proc_macro_derive(DbEnum)]
pub fn db_enum_derive(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    derive_enum::expand(ast).unwrap_or_else(syn::Error::into_compile_error).into()
}
