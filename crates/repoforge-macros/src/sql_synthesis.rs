//! Glues the Operation Inferrer to whichever SQL source a method actually
//! has, and resolves the entity type a method's columns/table come from.
//!
//! Placeholder expansion itself (§4.4a) is deferred to the generated
//! method's body: the macro only needs the *text* and the *entity type* at
//! expansion time, since `Entity::columns()`/`table_name()` aren't known
//! until the entity's own `#[derive(SqlEntity)]` expansion runs — which may
//! be in another crate entirely. The emitter wires the resolved text into a
//! call against a process-lifetime [`repoforge_core::template::cache::TemplateCache`],
//! which is the literal analogue of §4.4's "cache is per-run" scoped to the
//! lifetime a `static` actually has in emitted code.

use syn::{FnArg, GenericArgument, Pat, PathArguments, TraitItemFn, Type};

use repoforge_core::attrs::{OperationKind, ReturnShapeKind, SelectRefinement, SqlSource};

use crate::operation_inferrer;

/// Where a method's SQL comes from, resolved to actual text/type where the
/// attribute surface gave us one.
pub struct MethodPlan {
    pub operation: OperationKind,
    pub refinement: SelectRefinement,
    pub source: SqlSource,
    pub returns_inserted_id: bool,
    pub table_override: Option<String>,
    /// The entity type whose `table_name()`/`columns()` this method's SQL is
    /// built against, when one is resolvable.
    pub entity_type: Option<Type>,
    /// Parameter idents to bind, in declaration order, excluding `&self`, a
    /// trailing `CancellationToken`, and an `ExpressionToSql<_>` parameter.
    pub bind_params: Vec<syn::Ident>,
    /// The method's `CancellationToken` parameter ident, if it declared one.
    pub cancellation_param: Option<syn::Ident>,
    /// The method's `ExpressionToSql<_>` parameter ident, when `source` is
    /// `SqlSource::Expression`.
    pub expression_param: Option<syn::Ident>,
    /// The method's declared return shape, used by the emitter to choose
    /// between scalar/option/sequence/affected-rows dispatch.
    pub return_shape: ReturnShapeKind,
}

struct MethodAttrs {
    template: Option<String>,
    raw_sql: Option<String>,
    explicit_op: Option<OperationKind>,
    table_name: Option<String>,
    returns_inserted_id: bool,
}

fn parse_method_attrs(method: &TraitItemFn) -> MethodAttrs {
    let mut attrs = MethodAttrs {
        template: None,
        raw_sql: None,
        explicit_op: None,
        table_name: None,
        returns_inserted_id: false,
    };

    for attr in &method.attrs {
        if attr.path().is_ident("sql_template") {
            if let Ok(lit) = attr.parse_args::<syn::LitStr>() {
                attrs.template = Some(lit.value());
            }
        } else if attr.path().is_ident("raw_sql") || attr.path().is_ident("sqlx") {
            if let Ok(lit) = attr.parse_args::<syn::LitStr>() {
                attrs.raw_sql = Some(lit.value());
            }
        } else if attr.path().is_ident("table_name") {
            if let Ok(lit) = attr.parse_args::<syn::LitStr>() {
                attrs.table_name = Some(lit.value());
            }
        } else if attr.path().is_ident("return_inserted_id") {
            attrs.returns_inserted_id = true;
        } else if attr.path().is_ident("sql_execute_type") {
            attrs.explicit_op = parse_sql_execute_type(attr);
        }
    }

    attrs
}

fn parse_sql_execute_type(attr: &syn::Attribute) -> Option<OperationKind> {
    let ident: syn::Ident = attr.parse_args().ok()?;
    match ident.to_string().as_str() {
        "Select" => Some(OperationKind::Select),
        "Update" => Some(OperationKind::Update),
        "Insert" => Some(OperationKind::Insert),
        "Delete" => Some(OperationKind::Delete),
        "BatchInsert" => Some(OperationKind::BatchInsert),
        "BatchUpdate" => Some(OperationKind::BatchUpdate),
        "BatchDelete" => Some(OperationKind::BatchDelete),
        "BatchCommand" => Some(OperationKind::BatchCommand),
        _ => None,
    }
}

/// Does this parameter's type look like `ExpressionToSql<...>`? If so the
/// method's `source` is `Expression` (§3) and no template synthesis runs.
fn is_expression_param(ty: &Type) -> bool {
    matches!(ty, Type::Path(p) if p.path.segments.last().is_some_and(|s| s.ident == "ExpressionToSql"))
}

fn is_cancellation_token(ty: &Type) -> bool {
    matches!(ty, Type::Path(p) if p.path.segments.last().is_some_and(|s| s.ident == "CancellationToken"))
}

/// Strip one layer of `Option<_>`/`Vec<_>`/a reference to find the element
/// type a return or parameter position carries, for entity resolution.
pub(crate) fn peel(ty: &Type) -> &Type {
    match ty {
        Type::Reference(r) => peel(&r.elem),
        Type::Path(p) => {
            let Some(seg) = p.path.segments.last() else { return ty };
            if matches!(seg.ident.to_string().as_str(), "Option" | "Vec" | "VecDeque") {
                if let PathArguments::AngleBracketed(args) = &seg.arguments {
                    if let Some(GenericArgument::Type(inner)) = args.args.first() {
                        return peel(inner);
                    }
                }
            }
            ty
        }
        _ => ty,
    }
}

/// Resolve the entity type a method's SQL is synthesized against: the
/// return type for Select-family operations, otherwise the first
/// non-scalar, non-`ExpressionToSql`, non-cancellation parameter.
fn resolve_entity_type(method: &TraitItemFn, operation: OperationKind) -> Option<Type> {
    if matches!(operation, OperationKind::Select) {
        if let syn::ReturnType::Type(_, ty) = &method.sig.output {
            return Some(peel(ty).clone());
        }
    }

    for arg in &method.sig.inputs {
        let FnArg::Typed(pat_type) = arg else { continue };
        let ty = peel(&pat_type.ty);
        if is_expression_param(&pat_type.ty) || is_cancellation_token(&pat_type.ty) {
            continue;
        }
        if matches!(ty, Type::Path(_)) && !type_analyzer_scalar(ty) {
            return Some(ty.clone());
        }
    }
    None
}

fn type_analyzer_scalar(ty: &Type) -> bool {
    matches!(crate::type_analyzer::classify_return(&syn::ReturnType::Type(Default::default(), Box::new(ty.clone()))), ReturnShapeKind::Scalar)
}

fn pat_ident(arg: &FnArg) -> Option<syn::Ident> {
    match arg {
        FnArg::Typed(p) => match p.pat.as_ref() {
            Pat::Ident(id) => Some(id.ident.clone()),
            _ => None,
        },
        FnArg::Receiver(_) => None,
    }
}

/// Build the plan for one method: resolved SQL source, operation kind, the
/// entity it's built against, and the parameters to bind.
pub fn plan(method: &TraitItemFn) -> Result<MethodPlan, crate::error::GeneratorError> {
    let attrs = parse_method_attrs(method);

    let expression_param = method.sig.inputs.iter().any(|arg| matches!(arg, FnArg::Typed(p) if is_expression_param(&p.ty)));

    let source = if expression_param {
        SqlSource::Expression
    } else if let Some(text) = &attrs.template {
        SqlSource::Template(text.clone())
    } else if let Some(text) = &attrs.raw_sql {
        SqlSource::RawSql(text.clone())
    } else {
        SqlSource::Inferred
    };

    let (operation, refinement) = operation_inferrer::infer(method, attrs.explicit_op, &source)?;

    // Resolved even for `Expression` sources: the emitter still needs the
    // entity type to materialize rows via `FromRow` on the select path, it
    // just skips template placeholder expansion for this source.
    let entity_type = resolve_entity_type(method, operation);

    let cancellation_param = method.sig.inputs.iter().find(|arg| matches!(arg, FnArg::Typed(p) if is_cancellation_token(&p.ty))).and_then(pat_ident);

    let expression_param = method.sig.inputs.iter().find(|arg| matches!(arg, FnArg::Typed(p) if is_expression_param(&p.ty))).and_then(pat_ident);

    let bind_params = method
        .sig
        .inputs
        .iter()
        .filter_map(|arg| match arg {
            FnArg::Typed(p) => {
                if is_cancellation_token(&p.ty) || is_expression_param(&p.ty) {
                    return None;
                }
                match p.pat.as_ref() {
                    Pat::Ident(id) => Some(id.ident.clone()),
                    _ => None,
                }
            }
            FnArg::Receiver(_) => None,
        })
        .collect();

    let return_shape = crate::type_analyzer::classify_return(&method.sig.output);

    Ok(MethodPlan {
        operation,
        refinement,
        source,
        returns_inserted_id: attrs.returns_inserted_id,
        table_override: attrs.table_name,
        entity_type,
        bind_params,
        cancellation_param,
        expression_param,
        return_shape,
    })
}

/// Synthesize the `{{...}}` placeholder text for an `Inferred` operation —
/// step 4.6's "default SQL from the operation and inferred table", expressed
/// as placeholder text so it runs through the same expansion path as an
/// explicit `#[sql_template(...)]`.
pub fn inferred_template_text(operation: OperationKind, refinement: SelectRefinement) -> String {
    match operation {
        OperationKind::Select => match refinement {
            SelectRefinement::Scalar => "SELECT {{count:*}} FROM {{table}} WHERE {{where:auto}}".to_string(),
            SelectRefinement::Exists => "SELECT {{count:*}} FROM {{table}} WHERE {{where:auto}}".to_string(),
            SelectRefinement::None => "SELECT {{columns:auto}} FROM {{table}} WHERE {{where:auto}}".to_string(),
        },
        OperationKind::Insert | OperationKind::BatchInsert => "INSERT INTO {{table}} ({{columns:auto|exclude=id}}) VALUES ({{values:auto}})".to_string(),
        OperationKind::Update | OperationKind::BatchUpdate => "UPDATE {{table}} SET {{set:auto}} WHERE {{where:id}}".to_string(),
        OperationKind::Delete | OperationKind::BatchDelete => "DELETE FROM {{table}} WHERE {{where:id}}".to_string(),
        OperationKind::BatchCommand => "DELETE FROM {{table}} WHERE {{where:auto}}".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn method(sig: &str) -> TraitItemFn {
        let src = format!("trait T {{ {sig}; }}");
        let item: syn::ItemTrait = syn::parse_str(&src).unwrap();
        match &item.items[0] {
            syn::TraitItem::Fn(f) => f.clone(),
            _ => unreachable!(),
        }
    }

    #[test]
    fn inferred_select_resolves_entity_from_return_type() {
        let m = method("async fn get_by_id(&self, id: i64) -> Option<User>");
        let plan = plan(&m).unwrap();
        assert_eq!(plan.operation, OperationKind::Select);
        assert!(matches!(plan.entity_type, Some(syn::Type::Path(ref p)) if p.path.is_ident("User")));
        assert_eq!(plan.bind_params.len(), 1);
    }

    #[test]
    fn template_attribute_is_picked_up() {
        let m: TraitItemFn = parse_quote! {
            #[sql_template("SELECT {{columns:auto}} FROM {{table}} WHERE {{where:id}}")]
            async fn get_by_id(&self, id: i64) -> Option<User>
        };
        let plan = plan(&m).unwrap();
        assert!(matches!(plan.source, SqlSource::Template(_)));
    }

    #[test]
    fn insert_resolves_entity_from_parameter() {
        let m = method("async fn create(&self, user: User) -> i64");
        let plan = plan(&m).unwrap();
        assert_eq!(plan.operation, OperationKind::Insert);
        assert!(plan.entity_type.is_some());
    }
}
