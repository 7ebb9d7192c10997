//! Discovery Pass (C7) — resolves the trait annotated with
//! `#[repoforge::repository(...)]` into a [`RepositorySpec`]: the generated
//! struct's name, the dialect every method renders against, and the list of
//! trait methods to emit bodies for.
//!
//! Unlike a whole-compilation symbol scan, discovery here is scoped to the
//! single annotated item — the macro invocation already pins down which
//! trait is the service interface, so there is no separate search step.

use proc_macro2::Ident;
use quote::format_ident;
use syn::parse::{Parse, ParseStream};
use syn::{ItemTrait, LitStr, Token, TraitItem, TraitItemFn};

use repoforge_core::dialect::Dialect;

use crate::error::DiscoveryError;

/// Arguments to the outer `#[repository(...)]` invocation.
pub struct RepositoryArgs {
    pub dialect: Option<Ident>,
    /// Name of an injected connection field on a pre-existing struct, for
    /// the "injected field" discovery shape (§4.7). When absent, the macro
    /// generates its own struct owning the connection outright.
    pub connection_field: Option<LitStr>,
    /// The §6 `DbSetType`/`RepositoryFor` "alternative entity root
    /// selection": the entity a method's SQL is built against when its own
    /// signature has no entity-typed parameter or return (an `Update`/
    /// `Delete` keyed only by scalar columns, for instance).
    pub entity: Option<syn::Type>,
}

impl Parse for RepositoryArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut dialect = None;
        let mut connection_field = None;
        let mut entity = None;
        while !input.is_empty() {
            let key: Ident = input.parse()?;
            input.parse::<Token![=]>()?;
            match key.to_string().as_str() {
                "dialect" => dialect = Some(input.parse()?),
                "connection" => connection_field = Some(input.parse()?),
                "entity" => entity = Some(input.parse()?),
                other => {
                    return Err(syn::Error::new(key.span(), format!("unknown `repository` argument `{other}`")));
                }
            }
            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }
        Ok(Self { dialect, connection_field, entity })
    }
}

/// A discovered repository, ready for the operation inferrer and emitter.
pub struct RepositorySpec {
    pub trait_ident: Ident,
    pub impl_ident: Ident,
    pub dialect: Dialect,
    pub methods: Vec<TraitItemFn>,
    /// The class-level entity fallback, when `#[repository(entity = ...)]`
    /// was given.
    pub default_entity: Option<syn::Type>,
}

/// Map the bare dialect identifier accepted in `#[repository(dialect = ...)]`
/// (and in a method-level `#[dialect(...)]` override) onto the closed set.
pub fn parse_dialect_ident(ident: &Ident) -> Option<Dialect> {
    match ident.to_string().as_str() {
        "MySql" | "mysql" => Some(Dialect::MySql),
        "SqlServer" | "sqlserver" => Some(Dialect::SqlServer),
        "Postgresql" | "postgresql" | "Postgres" | "postgres" => Some(Dialect::Postgresql),
        "Oracle" | "oracle" => Some(Dialect::Oracle),
        "Db2" | "db2" | "DB2" => Some(Dialect::Db2),
        "Sqlite" | "sqlite" | "SQLite" => Some(Dialect::Sqlite),
        _ => None,
    }
}

/// A method-level `#[dialect(...)]` override, if present. Only a refinement
/// is accepted silently; an outright conflicting value is an
/// `AmbiguousDialect` diagnostic (§4.7).
fn method_dialect_override(method: &TraitItemFn) -> Option<Ident> {
    for attr in &method.attrs {
        if attr.path().is_ident("dialect") {
            if let Ok(ident) = attr.parse_args::<Ident>() {
                return Some(ident);
            }
        }
    }
    None
}

/// The hard-coded last resort when neither `#[repository(dialect = ...)]`
/// nor `repoforge.toml`'s `default_dialect` name a dialect.
const FALLBACK_DIALECT: Dialect = Dialect::SqlServer;

fn configured_default_dialect() -> Option<Dialect> {
    let config = repoforge_core::config::RepoforgeConfig::load_from_manifest_dir().ok()?;
    let name = config.default_dialect?;
    parse_dialect_ident(&format_ident!("{}", name))
}

pub fn discover(args: &RepositoryArgs, item_trait: &ItemTrait) -> Result<RepositorySpec, DiscoveryError> {
    let class_dialect = args
        .dialect
        .as_ref()
        .and_then(parse_dialect_ident)
        .or_else(configured_default_dialect)
        .unwrap_or(FALLBACK_DIALECT);

    let methods: Vec<TraitItemFn> = item_trait
        .items
        .iter()
        .filter_map(|item| match item {
            TraitItem::Fn(f) => Some(f.clone()),
            _ => None,
        })
        .collect();

    for method in &methods {
        if let Some(method_ident) = method_dialect_override(method) {
            let Some(method_dialect) = parse_dialect_ident(&method_ident) else {
                continue;
            };
            if method_dialect != class_dialect && args.dialect.is_some() {
                return Err(DiscoveryError::AmbiguousDialect {
                    class: format!("{class_dialect:?}"),
                    method: format!("{method_dialect:?}"),
                });
            }
        }
    }

    if args.connection_field.is_some() {
        // The injected-field shape needs a pre-existing struct to attach
        // to; this macro only ever sees the trait, so there is nothing to
        // search for a connection field on.
        return Err(DiscoveryError::MissingConnection);
    }

    let trait_ident = item_trait.ident.clone();
    let impl_ident = format_ident!("{}Repository", trait_ident);

    Ok(RepositorySpec {
        trait_ident,
        impl_ident,
        dialect: class_dialect,
        methods,
        default_entity: args.entity.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn resolves_class_dialect_and_impl_name() {
        let item_trait: ItemTrait = parse_quote! {
            trait UserRepository {
                async fn get_by_id(&self, id: i64) -> Option<User>;
            }
        };
        let args = RepositoryArgs { dialect: Some(format_ident!("SqlServer")), connection_field: None, entity: None };
        let spec = discover(&args, &item_trait).unwrap();
        assert_eq!(spec.dialect, Dialect::SqlServer);
        assert_eq!(spec.impl_ident.to_string(), "UserRepositoryRepository");
        assert_eq!(spec.methods.len(), 1);
    }

    #[test]
    fn missing_connection_when_injected_field_requested() {
        let item_trait: ItemTrait = parse_quote! {
            trait UserRepository {
                async fn get_by_id(&self, id: i64) -> Option<User>;
            }
        };
        let args = RepositoryArgs { dialect: None, connection_field: Some(parse_quote!("conn")), entity: None };
        let err = discover(&args, &item_trait).unwrap_err();
        assert!(matches!(err, DiscoveryError::MissingConnection));
    }
}
