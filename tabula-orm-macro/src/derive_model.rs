//! # Model Derive Macro Implementation
//!
//! Expands `#[derive(Model)]` into a `tabula_orm::Model` impl: the table
//! name, one `ColumnDescriptor` per field, the construction strategy, the
//! value accessor and the primary key setter.

use heck::ToSnakeCase;
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Expr, ExprCall, Fields, Ident, LitInt, LitStr, Path, Type, spanned::Spanned};

/// Metadata parsed from the `#[orm(...)]` attributes of one field.
struct FieldSpec<'a> {
    ident: &'a Ident,
    ty: &'a Type,
    column: String,
    primary_key: bool,
    nullable: bool,
    length: Option<u32>,
    precision: Option<u32>,
    scale: Option<u32>,
    index: Option<String>,
    unique: bool,
    foreign_key: Option<(Path, String)>,
    on_update: TokenStream,
    on_delete: TokenStream,
}

fn reference_option(lit: &LitStr) -> syn::Result<TokenStream> {
    let variant = match lit.value().to_ascii_lowercase().replace(' ', "_").as_str() {
        "restrict" => quote! { Restrict },
        "cascade" => quote! { Cascade },
        "set_null" => quote! { SetNull },
        "no_action" => quote! { NoAction },
        "none" => quote! { None },
        _ => {
            return Err(syn::Error::new(
                lit.span(),
                "expected one of: restrict, cascade, set_null, no_action, none",
            ));
        }
    };
    Ok(quote! { tabula_orm::ReferenceOption::#variant })
}

fn parse_field(field: &syn::Field) -> syn::Result<FieldSpec<'_>> {
    let ident = field.ident.as_ref().ok_or_else(|| syn::Error::new(field.span(), "Model fields must be named"))?;
    let name = ident.to_string();

    let mut spec = FieldSpec {
        ident,
        ty: &field.ty,
        column: name.strip_prefix("r#").unwrap_or(&name).to_string(),
        primary_key: false,
        nullable: false,
        length: None,
        precision: None,
        scale: None,
        index: None,
        unique: false,
        foreign_key: None,
        on_update: quote! { tabula_orm::ReferenceOption::None },
        on_delete: quote! { tabula_orm::ReferenceOption::None },
    };

    for attr in field.attrs.iter().filter(|a| a.path().is_ident("orm")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("column") {
                spec.column = meta.value()?.parse::<LitStr>()?.value();
            } else if meta.path.is_ident("primary_key") {
                spec.primary_key = true;
            } else if meta.path.is_ident("nullable") {
                spec.nullable = true;
            } else if meta.path.is_ident("length") {
                spec.length = Some(meta.value()?.parse::<LitInt>()?.base10_parse()?);
            } else if meta.path.is_ident("precision") {
                spec.precision = Some(meta.value()?.parse::<LitInt>()?.base10_parse()?);
            } else if meta.path.is_ident("scale") {
                spec.scale = Some(meta.value()?.parse::<LitInt>()?.base10_parse()?);
            } else if meta.path.is_ident("index") {
                spec.index = Some(match meta.value() {
                    Ok(value) => value.parse::<LitStr>()?.value(),
                    Err(_) => String::new(),
                });
            } else if meta.path.is_ident("unique") {
                spec.unique = true;
            } else if meta.path.is_ident("foreign_key") {
                let lit: LitStr = meta.value()?.parse()?;
                let value = lit.value();
                let Some((target, column)) = value.rsplit_once("::") else {
                    return Err(meta.error("Invalid format for foreign_key. Use 'Type::column'"));
                };
                let target: Path = syn::parse_str(target).map_err(|e| syn::Error::new(lit.span(), e))?;
                spec.foreign_key = Some((target, column.to_string()));
            } else if meta.path.is_ident("on_update") {
                spec.on_update = reference_option(&meta.value()?.parse()?)?;
            } else if meta.path.is_ident("on_delete") {
                spec.on_delete = reference_option(&meta.value()?.parse()?)?;
            } else {
                return Err(meta.error("unsupported orm attribute"));
            }
            Ok(())
        })?;
    }

    Ok(spec)
}

/// Parses `Path::ctor(col_a, col_b)` into the constructor path and the
/// column name of each argument.
fn parse_builder(lit: &LitStr) -> syn::Result<(Expr, Vec<String>)> {
    let call: ExprCall = lit.parse()?;
    let columns = call
        .args
        .iter()
        .map(|arg| match arg {
            Expr::Path(path) if path.path.get_ident().is_some() => {
                Ok(path.path.get_ident().map(|i| i.to_string()).unwrap_or_default())
            }
            other => Err(syn::Error::new(lit.span(), format!("builder argument `{}` must be a column name", quote!(#other)))),
        })
        .collect::<syn::Result<Vec<_>>>()?;
    Ok((*call.func, columns))
}

fn column_tokens(spec: &FieldSpec<'_>, table: &str) -> TokenStream {
    let ty = spec.ty;
    let column = &spec.column;
    let nullable = spec.nullable;

    let mut chain = quote! {
        tabula_orm::ColumnDescriptor::new(#column, <#ty as tabula_orm::ColumnValue>::SEMANTIC)
            .nullable(<#ty as tabula_orm::ColumnValue>::NULLABLE || #nullable)
    };

    if spec.primary_key {
        chain.extend(quote! { .primary_key() });
    }
    if let Some(length) = spec.length {
        chain.extend(quote! { .length(#length) });
    }
    if let Some(precision) = spec.precision {
        chain.extend(quote! { .precision(#precision) });
    }
    if let Some(scale) = spec.scale {
        chain.extend(quote! { .scale(#scale) });
    }

    if spec.index.is_some() || spec.unique {
        let name = match &spec.index {
            Some(name) if !name.is_empty() => name.clone(),
            _ if spec.unique => format!("unique_{}_{}", table, column),
            _ => format!("idx_{}_{}", table, column),
        };
        let unique = spec.unique;
        chain.extend(quote! { .index(#name, #unique) });
    }

    if let Some((target, referenced)) = &spec.foreign_key {
        let on_update = &spec.on_update;
        let on_delete = &spec.on_delete;
        chain.extend(quote! {
            .foreign_key(
                tabula_orm::ForeignKey::new(<#target as tabula_orm::Model>::table_name(), #referenced)
                    .on_update(#on_update)
                    .on_delete(#on_delete)
            )
        });
    }

    chain
}

/// Expands the `#[derive(Model)]` macro.
pub fn expand(ast: DeriveInput) -> syn::Result<TokenStream> {
    let struct_name = &ast.ident;

    let fields = match &ast.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => return Err(syn::Error::new(ast.span(), "Model must have named fields")),
        },
        _ => return Err(syn::Error::new(ast.span(), "Model must be a struct")),
    };

    let mut table = struct_name.to_string().to_snake_case();
    let mut builder = None;
    for attr in ast.attrs.iter().filter(|a| a.path().is_ident("orm")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                table = meta.value()?.parse::<LitStr>()?.value();
            } else if meta.path.is_ident("builder") {
                builder = Some(parse_builder(&meta.value()?.parse()?)?);
            } else {
                return Err(meta.error("unsupported orm attribute"));
            }
            Ok(())
        })?;
    }

    let specs = fields.iter().map(parse_field).collect::<syn::Result<Vec<_>>>()?;

    let columns = specs.iter().map(|spec| column_tokens(spec, &table));
    let values = specs.iter().map(|spec| {
        let ident = spec.ident;
        quote! { tabula_orm::ColumnValue::to_value(&self.#ident) }
    });

    let construction = match builder {
        Some((constructor, parameters)) => {
            let arguments = parameters.iter().map(|column| {
                quote! {
                    tabula_orm::__private::decode_column(values.next().unwrap_or(tabula_orm::Value::Null), #column)?
                }
            });
            quote! {
                tabula_orm::Construction::Builder {
                    build: |values: Vec<tabula_orm::Value>| -> Result<Self, tabula_orm::Error> {
                        let mut values = values.into_iter();
                        Ok(#constructor(#(#arguments),*))
                    },
                    parameters: &[#(#parameters),*],
                }
            }
        }
        None => {
            let arms = specs.iter().enumerate().map(|(index, spec)| {
                let ident = spec.ident;
                let column = &spec.column;
                quote! {
                    #index => record.#ident = tabula_orm::__private::decode_column(value, #column)?,
                }
            });
            quote! {
                tabula_orm::Construction::FieldAssign {
                    create: <Self as Default>::default,
                    assign: |record: &mut Self, index: usize, value: tabula_orm::Value| -> Result<(), tabula_orm::Error> {
                        match index {
                            #(#arms)*
                            _ => {}
                        }
                        Ok(())
                    },
                }
            }
        }
    };

    let set_primary_key = match specs.iter().find(|spec| spec.primary_key) {
        Some(spec) => {
            let ident = spec.ident;
            let column = &spec.column;
            quote! {
                self.#ident = tabula_orm::__private::decode_column(value, #column)?;
                Ok(())
            }
        }
        None => quote! {
            let _ = value;
            Err(tabula_orm::MappingError::MissingPrimaryKey { table: #table }.into())
        },
    };

    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics tabula_orm::Model for #struct_name #ty_generics #where_clause {
            fn table_name() -> &'static str {
                #table
            }

            fn columns() -> Vec<tabula_orm::ColumnDescriptor> {
                vec![#(#columns),*]
            }

            fn construction() -> tabula_orm::Construction<Self> {
                #construction
            }

            fn values(&self) -> Vec<tabula_orm::Value> {
                vec![#(#values),*]
            }

            fn set_primary_key(&mut self, value: tabula_orm::Value) -> Result<(), tabula_orm::Error> {
                #set_primary_key
            }
        }
    })
}
