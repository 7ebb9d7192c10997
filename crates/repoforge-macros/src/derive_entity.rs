//! `#[derive(SqlEntity)]` — implements [`repoforge_core::entity::Entity`],
//! [`repoforge_core::runtime::FromRow`], and
//! [`repoforge_core::runtime::ToColumnValues`] for a plain struct, the
//! counterpart to the discovery pass's assumption that every entity type it
//! references already has all three.
//!
//! Column names are computed once, at macro-expansion time, via the same
//! [`repoforge_core::name_mapper::map`] the runtime template engine trusts
//! (`entity.rs`'s doc comment: "this engine does not call the name mapper
//! itself, it trusts what discovery already resolved") — so the mapping
//! happens exactly once, not on every `columns()` call.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, LitStr};

use repoforge_core::name_mapper;

use crate::error::GeneratorError;

struct FieldPlan {
    ident: syn::Ident,
    member_name: String,
    column_name: String,
    is_identity: bool,
    is_nullable: bool,
}

fn struct_attr_lit(attrs: &[syn::Attribute], name: &str) -> Option<String> {
    attrs.iter().find(|a| a.path().is_ident(name)).and_then(|a| a.parse_args::<LitStr>().ok()).map(|lit| lit.value())
}

fn is_option_type(ty: &syn::Type) -> bool {
    matches!(ty, syn::Type::Path(p) if p.path.segments.last().is_some_and(|s| s.ident == "Option"))
}

/// `repoforge.toml`'s `table_prefix`, applied to every name-mapped (i.e. not
/// explicitly `#[table_name("...")]`-overridden) table name.
fn configured_table_prefix() -> Option<String> {
    repoforge_core::config::RepoforgeConfig::load_from_manifest_dir().ok()?.table_prefix
}

pub fn expand(input: DeriveInput) -> Result<TokenStream, GeneratorError> {
    let struct_ident = &input.ident;

    let Data::Struct(data) = &input.data else {
        return Err(GeneratorError::Syn(format!("#[derive(SqlEntity)] only supports structs, `{struct_ident}` is not one")));
    };
    let Fields::Named(fields) = &data.fields else {
        return Err(GeneratorError::Syn(format!("#[derive(SqlEntity)] requires named fields on `{struct_ident}`")));
    };

    let table_name = match struct_attr_lit(&input.attrs, "table_name") {
        Some(explicit) => explicit,
        None => {
            let mapped = name_mapper::map(Some(&struct_ident.to_string())).expect("struct identifier is never empty");
            match configured_table_prefix() {
                Some(prefix) => format!("{prefix}{mapped}"),
                None => mapped,
            }
        }
    };

    let has_explicit_identity = fields.named.iter().any(|f| f.attrs.iter().any(|a| a.path().is_ident("identity")));

    let mut plans = Vec::with_capacity(fields.named.len());
    for field in &fields.named {
        let ident = field.ident.clone().expect("named field");
        let member_name = ident.to_string();
        let column_name = match struct_attr_lit(&field.attrs, "column") {
            Some(explicit) => explicit,
            None => name_mapper::map(Some(&member_name)).expect("field identifier is never empty"),
        };
        let is_identity = if has_explicit_identity {
            field.attrs.iter().any(|a| a.path().is_ident("identity"))
        } else {
            column_name == "id"
        };
        let is_nullable = is_option_type(&field.ty);
        plans.push(FieldPlan { ident, member_name, column_name, is_identity, is_nullable });
    }

    Ok(emit(struct_ident, &table_name, &plans))
}

fn emit(struct_ident: &syn::Ident, table_name: &str, fields: &[FieldPlan]) -> TokenStream {
    let columns_static = quote::format_ident!("__{}_SQL_ENTITY_COLUMNS", struct_ident.to_string().to_uppercase());

    let column_entries: Vec<TokenStream> = fields
        .iter()
        .map(|f| {
            let member_name = &f.member_name;
            let column_name = &f.column_name;
            let is_identity = f.is_identity;
            let is_nullable = f.is_nullable;
            quote! {
                ::repoforge_core::entity::ColumnDescriptor {
                    member_name: #member_name,
                    column_name: #column_name,
                    is_identity: #is_identity,
                    is_nullable: #is_nullable,
                }
            }
        })
        .collect();

    let column_value_entries: Vec<TokenStream> = fields
        .iter()
        .map(|f| {
            let ident = &f.ident;
            let column_name = &f.column_name;
            quote! {
                (#column_name, ::repoforge_core::runtime::IntoValue::into_value(self.#ident.clone()))
            }
        })
        .collect();

    let field_reads: Vec<TokenStream> = fields
        .iter()
        .map(|f| {
            let ident = &f.ident;
            let column_name = &f.column_name;
            quote! {
                #ident: {
                    let __ord = row.ordinal_of(#column_name)
                        .ok_or_else(|| ::repoforge_core::runtime::DriverError::UnknownColumn(#column_name.to_string()))?;
                    let __value = row.get(__ord)
                        .ok_or_else(|| ::repoforge_core::runtime::DriverError::UnknownColumn(#column_name.to_string()))?;
                    ::repoforge_core::runtime::FromValue::from_value(__value)?
                }
            }
        })
        .collect();

    quote! {
        #[allow(non_upper_case_globals)]
        static #columns_static: &[::repoforge_core::entity::ColumnDescriptor] = &[#(#column_entries),*];

        impl ::repoforge_core::entity::Entity for #struct_ident {
            fn table_name() -> &'static str {
                #table_name
            }

            fn columns() -> &'static [::repoforge_core::entity::ColumnDescriptor] {
                #columns_static
            }
        }

        impl ::repoforge_core::runtime::FromRow for #struct_ident {
            fn from_row(row: &dyn ::repoforge_core::runtime::Row) -> Result<Self, ::repoforge_core::runtime::DriverError> {
                Ok(Self {
                    #(#field_reads),*
                })
            }
        }

        impl ::repoforge_core::runtime::ToColumnValues for #struct_ident {
            fn to_column_values(&self) -> Vec<(&'static str, ::repoforge_core::runtime::Value)> {
                vec![#(#column_value_entries),*]
            }
        }
    }
}
