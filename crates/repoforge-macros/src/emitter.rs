//! Emitter (C8) — builds the implementation body for one trait method: a
//! `static` template cache shared across all generated methods, argument
//! validation, command acquisition with scoped release, parameter binding,
//! execution dispatch by return shape, and a `#[tracing::instrument]` span
//! standing in for the "structured comments" requirement (§4.8 item 7).

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{FnArg, ItemTrait, Pat, TraitItem, TraitItemFn, Type};

use repoforge_core::attrs::{OperationKind, ReturnShapeKind, SelectRefinement, SqlSource};
use repoforge_core::dialect::Dialect;

use crate::discovery::RepositorySpec;
use crate::sql_synthesis::{self, MethodPlan};

fn dialect_tokens(dialect: Dialect) -> TokenStream {
    let variant = format_ident!("{}", format!("{dialect:?}"));
    quote! { ::repoforge_core::dialect::Dialect::#variant }
}

/// Strip the attribute surface's recognized attributes from a trait method
/// before re-embedding it in the generated trait declaration — they've
/// already been consumed by [`sql_synthesis::plan`], and leaving them in
/// place would mean resolving them a second time as independent
/// passthrough macros for no benefit.
fn strip_recognized_attrs(method: &mut TraitItemFn) {
    const RECOGNIZED: &[&str] = &["sql_template", "raw_sql", "sqlx", "table_name", "return_inserted_id", "sql_execute_type", "dialect"];
    method.attrs.retain(|attr| !RECOGNIZED.iter().any(|name| attr.path().is_ident(name)));
}

/// Rewrite a method's declared return type `T` to `Result<T, DriverError>` —
/// every generated body ends in a driver call, so the trait declaration and
/// its impl both need to say so, not just the bare shape the user wrote.
/// Applied identically to the re-embedded trait item and the impl method so
/// the two signatures keep agreeing with each other.
fn wrap_result_signature(sig: &syn::Signature) -> syn::Signature {
    let mut sig = sig.clone();
    let declared: syn::Type = match &sig.output {
        syn::ReturnType::Default => syn::parse_quote!(()),
        syn::ReturnType::Type(_, ty) => (**ty).clone(),
    };
    sig.output = syn::parse_quote!(-> Result<#declared, ::repoforge_core::runtime::DriverError>);
    sig
}

/// Emit the whole generated module: the (cleaned) trait, the repository
/// struct, and its trait impl.
pub fn emit(spec: &RepositorySpec, item_trait: &ItemTrait) -> TokenStream {
    let trait_ident = &spec.trait_ident;
    let impl_ident = &spec.impl_ident;

    let mut cleaned_trait = item_trait.clone();
    for item in &mut cleaned_trait.items {
        if let TraitItem::Fn(f) = item {
            strip_recognized_attrs(f);
            f.sig = wrap_result_signature(&f.sig);
        }
    }

    let methods: Vec<TokenStream> = spec
        .methods
        .iter()
        .map(|m| match sql_synthesis::plan(m) {
            Ok(plan) => emit_method(m, &plan, spec.dialect, spec.default_entity.as_ref()),
            Err(err) => err.into_compile_error(m.sig.ident.span()),
        })
        .collect();

    quote! {
        #[::repoforge_core::async_trait]
        #cleaned_trait

        /// Generated implementation of
        #[doc = concat!("[`", stringify!(#trait_ident), "`]")]
        /// against a dialect-specific connection.
        pub struct #impl_ident<C: ::repoforge_core::runtime::Connection> {
            conn: ::repoforge_core::tokio::sync::Mutex<C>,
        }

        impl<C: ::repoforge_core::runtime::Connection> #impl_ident<C> {
            pub fn new(conn: C) -> Self {
                Self { conn: ::repoforge_core::tokio::sync::Mutex::new(conn) }
            }
        }

        #[::repoforge_core::async_trait]
        impl<C: ::repoforge_core::runtime::Connection + Send + Sync> #trait_ident for #impl_ident<C> {
            #(#methods)*
        }
    }
}

fn emit_method(method: &TraitItemFn, plan: &MethodPlan, dialect: Dialect, default_entity: Option<&Type>) -> TokenStream {
    let sig = wrap_result_signature(&method.sig);
    let dialect_ts = dialect_tokens(dialect);

    // §6 `DbSetType`/`RepositoryFor`: a method whose own signature carries no
    // entity-typed parameter or return (e.g. `update_email(id, email)`) falls
    // back to the class-level entity so template synthesis still knows which
    // table/columns to target.
    let entity_ty = plan.entity_type.as_ref().or(default_entity);

    let batch_guard = emit_batch_guard(plan);
    let (cancel_binding, cancellation_check) = match &plan.cancellation_param {
        Some(ident) => (
            quote! { let __cancel = #ident.clone(); },
            quote! { ::repoforge_core::runtime::check_not_canceled(&__cancel)?; },
        ),
        None => (quote! { let __cancel = ::repoforge_core::runtime::cancellation_token_unused(); }, quote! {}),
    };

    let sql_and_bind = emit_sql_and_bind(method, plan, &dialect_ts, entity_ty);
    let dispatch = emit_dispatch(plan, &dialect_ts, entity_ty);

    let operation_name = format!("{:?}", plan.operation);

    quote! {
        #[::repoforge_core::tracing::instrument(skip(self), fields(operation = #operation_name))]
        #sig {
            #cancel_binding
            #cancellation_check
            #batch_guard
            let mut __conn_guard = self.conn.lock().await;
            ::repoforge_core::runtime::with_open_connection(&mut *__conn_guard, move |__conn| async move {
                #sql_and_bind
                #dispatch
            }).await
        }
    }
}

/// §4.6/§9 supplement: a `Batch*` operation with an empty collection is
/// rejected before any driver call, reusing the same diagnostic name the
/// operation inferrer uses for the "no sequence parameter at all" case.
fn emit_batch_guard(plan: &MethodPlan) -> TokenStream {
    if !plan.operation.is_batch() {
        return quote! {};
    }
    let Some(collection_ident) = plan.bind_params.first() else {
        return quote! {};
    };
    quote! {
        if #collection_ident.is_empty() {
            return Err(::repoforge_core::runtime::DriverError::BatchRequiresCollection);
        }
    }
}

/// Find a bound parameter's declared type by matching its ident against the
/// method's own parameter list — `MethodPlan` only carries idents, not
/// types, so this is resolved straight from the original signature.
fn param_type<'a>(method: &'a TraitItemFn, ident: &syn::Ident) -> Option<&'a Type> {
    method.sig.inputs.iter().find_map(|arg| match arg {
        FnArg::Typed(p) => match p.pat.as_ref() {
            Pat::Ident(id) if &id.ident == ident => Some(p.ty.as_ref()),
            _ => None,
        },
        FnArg::Receiver(_) => None,
    })
}

/// Whether a bound parameter's type is the entity this method's SQL is
/// built against — if so it binds one parameter per property via
/// [`repoforge_core::runtime::ToColumnValues`], never as a single
/// `IntoValue`-converted whole value (no such impl exists for entity types).
fn is_entity_param(method: &TraitItemFn, ident: &syn::Ident, entity_ty: Option<&Type>) -> bool {
    let (Some(entity_ty), Some(ty)) = (entity_ty, param_type(method, ident)) else {
        return false;
    };
    sql_synthesis::peel(ty) == entity_ty
}

/// Bind statements for a SQL source with no placeholder expansion to check
/// against (`RawSql`, or a `Template`/`Inferred` source with no entity type
/// resolved at all): bind every non-skipped parameter directly, one column
/// per property for an entity-typed parameter, one value for a scalar.
fn emit_bind_statements(method: &TraitItemFn, plan: &MethodPlan, entity_ty: Option<&Type>, skip_first: bool) -> Vec<TokenStream> {
    plan.bind_params
        .iter()
        .enumerate()
        .filter(|(i, _)| !(skip_first && *i == 0))
        .map(|(_, ident)| {
            if is_entity_param(method, ident, entity_ty) {
                quote! {
                    for (__col, __val) in ::repoforge_core::runtime::ToColumnValues::to_column_values(&#ident) {
                        __stmt.bind(__col, __val);
                    }
                }
            } else {
                let name = ident.to_string();
                quote! { __stmt.bind(#name, ::repoforge_core::runtime::IntoValue::into_value(#ident.clone())); }
            }
        })
        .collect()
}

/// Every candidate `(column_name, Value)` pair this method's non-collection
/// parameters can supply — an entity-typed parameter contributes one entry
/// per property, a scalar parameter contributes its own name. Matched
/// against the template's actually-expanded placeholder set afterwards, so
/// only what the rendered SQL really references gets bound (invariant: every
/// emitted placeholder has a matching bound parameter, and nothing else).
fn emit_bind_candidates(method: &TraitItemFn, plan: &MethodPlan, entity_ty: Option<&Type>, skip_first: bool) -> TokenStream {
    let pushes: Vec<TokenStream> = plan
        .bind_params
        .iter()
        .enumerate()
        .filter(|(i, _)| !(skip_first && *i == 0))
        .map(|(_, ident)| {
            if is_entity_param(method, ident, entity_ty) {
                quote! { __bind_candidates.extend(::repoforge_core::runtime::ToColumnValues::to_column_values(&#ident)); }
            } else {
                let name = ident.to_string();
                quote! { __bind_candidates.push((#name, ::repoforge_core::runtime::IntoValue::into_value(#ident.clone()))); }
            }
        })
        .collect();

    quote! {
        let mut __bind_candidates: Vec<(&str, ::repoforge_core::runtime::Value)> = Vec::new();
        #(#pushes)*
    }
}

/// Bind every name the expansion actually introduced, in order, from
/// whichever candidate supplies it — the direct fix for invariant I1
/// (every placeholder gets the descriptor the rendered SQL actually
/// references) in place of binding the raw method parameters regardless of
/// what the rendered text ended up needing.
fn emit_expansion_binds() -> TokenStream {
    quote! {
        for __param_name in &__expansion.params {
            if let Some((_, __value)) = __bind_candidates.iter().find(|(__name, _)| *__name == __param_name.as_str()) {
                __stmt.bind(__param_name, __value.clone());
            }
        }
    }
}

fn emit_sql_and_bind(method: &TraitItemFn, plan: &MethodPlan, dialect_ts: &TokenStream, entity_ty: Option<&Type>) -> TokenStream {
    let skip_first = plan.operation.is_batch();

    match &plan.source {
        SqlSource::Expression => {
            let expr_ident = plan.expression_param.as_ref().expect("SqlSource::Expression implies an ExpressionToSql parameter");
            quote! {
                let __expr_rendered = #expr_ident.render().map_err(|e| ::repoforge_core::runtime::DriverError::InvalidArgument(e.to_string()))?;
                let mut __stmt = __conn.prepare(&__expr_rendered.sql);
                for __p in &__expr_rendered.params {
                    __stmt.bind(&__p.name, ::repoforge_core::runtime::value_from_literal(&__p.value));
                }
            }
        }
        SqlSource::RawSql(text) => {
            let binds = emit_bind_statements(method, plan, entity_ty, skip_first);
            quote! {
                let mut __stmt = __conn.prepare(#text);
                #(#binds)*
            }
        }
        SqlSource::Template(text) => emit_template_sql(method, plan, text, dialect_ts, skip_first, entity_ty),
        SqlSource::Inferred => {
            let text = sql_synthesis::inferred_template_text(plan.operation, plan.refinement);
            emit_template_sql(method, plan, &text, dialect_ts, skip_first, entity_ty)
        }
    }
}

fn emit_template_sql(method: &TraitItemFn, plan: &MethodPlan, text: &str, dialect_ts: &TokenStream, skip_first: bool, entity_ty: Option<&Type>) -> TokenStream {
    let method_param_names: Vec<String> = plan.bind_params.iter().map(|i| i.to_string()).collect();

    match entity_ty {
        Some(ty) => {
            // A batch operation's only bind parameter is the collection
            // itself (filtered out by `skip_first`); its properties are
            // bound per item in `emit_batch_dispatch`'s loop, not once here.
            let bind_block = if skip_first {
                quote! {}
            } else {
                let candidates = emit_bind_candidates(method, plan, entity_ty, skip_first);
                let expansion_binds = emit_expansion_binds();
                quote! {
                    #candidates
                    #expansion_binds
                }
            };
            quote! {
                let __method_params: Vec<&str> = vec![#(#method_param_names),*];
                let __expansion = ::repoforge_core::template::cache::template_cache()
                    .get_or_expand(#text, #dialect_ts, <#ty as ::repoforge_core::entity::Entity>::table_name(), <#ty as ::repoforge_core::entity::Entity>::columns(), &__method_params)
                    .map_err(|e| ::repoforge_core::runtime::DriverError::InvalidArgument(e.to_string()))?;
                let mut __stmt = __conn.prepare(&__expansion.sql);
                #bind_block
            }
        }
        None => {
            let binds = emit_bind_statements(method, plan, entity_ty, skip_first);
            quote! {
                let mut __stmt = __conn.prepare(#text);
                #(#binds)*
            }
        }
    }
}

fn emit_dispatch(plan: &MethodPlan, dialect_ts: &TokenStream, entity_ty: Option<&Type>) -> TokenStream {
    if plan.refinement == SelectRefinement::Exists {
        return quote! {
            let __value = __stmt.execute_scalar(&__cancel).await?;
            Ok(!matches!(__value, ::repoforge_core::runtime::Value::Int(0)))
        };
    }
    if plan.refinement == SelectRefinement::Scalar {
        return quote! {
            let __value = __stmt.execute_scalar(&__cancel).await?;
            ::repoforge_core::runtime::FromValue::from_value(&__value)
        };
    }

    match plan.operation {
        OperationKind::Select => emit_select_dispatch(plan, entity_ty),
        OperationKind::Insert => emit_insert_dispatch(plan, dialect_ts),
        OperationKind::Update | OperationKind::Delete => quote! {
            let __affected = __stmt.execute_non_query(&__cancel).await?;
            Ok(__affected)
        },
        OperationKind::BatchInsert | OperationKind::BatchUpdate | OperationKind::BatchDelete | OperationKind::BatchCommand => emit_batch_dispatch(plan, entity_ty),
    }
}

/// §4.6/§9 supplement: a driver that exposes a batch-capable command runs the
/// statement once; one that doesn't falls back to executing it once per bound
/// collection entry, reusing the same prepared statement. The per-item bind
/// reuses the same expanded placeholder set the single-item path bound
/// against, so a batch entity's properties land under the same parameter
/// names the rendered SQL actually references.
fn emit_batch_dispatch(plan: &MethodPlan, entity_ty: Option<&Type>) -> TokenStream {
    let Some(collection_ident) = plan.bind_params.first() else {
        return quote! {
            let __affected = __stmt.execute_non_query(&__cancel).await?;
            Ok(__affected)
        };
    };

    // Only a `Template`/`Inferred` source expands placeholders into an
    // `__expansion` binding to key per-item binds off of; a `RawSql` batch
    // binds every property directly, trusting the static text to reference
    // them by column name.
    let uses_expansion = entity_ty.is_some() && matches!(plan.source, SqlSource::Template(_) | SqlSource::Inferred);

    let per_item_bind = if uses_expansion {
        quote! {
            let __item_values = ::repoforge_core::runtime::ToColumnValues::to_column_values(__item);
            for __param_name in &__expansion.params {
                if let Some((_, __value)) = __item_values.iter().find(|(__name, _)| *__name == __param_name.as_str()) {
                    __stmt.bind(__param_name, __value.clone());
                }
            }
        }
    } else if entity_ty.is_some() {
        quote! {
            for (__col, __val) in ::repoforge_core::runtime::ToColumnValues::to_column_values(__item) {
                __stmt.bind(__col, __val);
            }
        }
    } else {
        quote! {
            __stmt.bind("item", ::repoforge_core::runtime::IntoValue::into_value(__item.clone()));
        }
    };

    quote! {
        if __conn.supports_native_batch() {
            let __affected = __stmt.execute_non_query(&__cancel).await?;
            Ok(__affected)
        } else {
            let mut __affected = 0u64;
            for __item in #collection_ident.iter() {
                ::repoforge_core::runtime::check_not_canceled(&__cancel)?;
                #per_item_bind
                __affected += __stmt.execute_non_query(&__cancel).await?;
            }
            Ok(__affected)
        }
    }
}

fn emit_select_dispatch(plan: &MethodPlan, entity_ty: Option<&Type>) -> TokenStream {
    let Some(entity_ty) = entity_ty else {
        return quote! {
            let __value = __stmt.execute_scalar(&__cancel).await?;
            ::repoforge_core::runtime::FromValue::from_value(&__value)
        };
    };

    let materialize = quote! {
        let __rows = __stmt.execute_reader(&__cancel).await?;
        let mut __entities = Vec::with_capacity(__rows.len());
        for __row in &__rows {
            __entities.push(<#entity_ty as ::repoforge_core::runtime::FromRow>::from_row(__row.as_ref())?);
        }
    };

    match plan.return_shape {
        ReturnShapeKind::SequenceEntity => quote! {
            #materialize
            Ok(__entities)
        },
        ReturnShapeKind::OptionEntity => quote! {
            #materialize
            Ok(__entities.into_iter().next())
        },
        _ => quote! {
            #materialize
            __entities.into_iter().next().ok_or(::repoforge_core::runtime::DriverError::NotFound)
        },
    }
}

fn emit_insert_dispatch(plan: &MethodPlan, dialect_ts: &TokenStream) -> TokenStream {
    let affected = quote! { __stmt.execute_non_query(&__cancel).await?; };
    if !plan.returns_inserted_id {
        return quote! {
            #affected
            Ok(())
        };
    }
    quote! {
        #affected
        match <::repoforge_core::dialect::Dialect as ::repoforge_core::dialect::SqlDialect>::insert_id_strategy(&#dialect_ts) {
            ::repoforge_core::dialect::InsertIdStrategy::AppendedSelect(sql) => {
                let mut __id_stmt = __conn.prepare(sql);
                let __id = __id_stmt.execute_scalar(&__cancel).await?;
                ::repoforge_core::runtime::FromValue::from_value(&__id)
            }
            ::repoforge_core::dialect::InsertIdStrategy::ReturningClause | ::repoforge_core::dialect::InsertIdStrategy::SequenceCurrval => {
                let __id = __stmt.execute_scalar(&__cancel).await?;
                ::repoforge_core::runtime::FromValue::from_value(&__id)
            }
        }
    }
}
