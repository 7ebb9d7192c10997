//! Operation Inferrer (C6) — resolves the SQL operation kind for a method,
//! first match wins (§4.6):
//!
//!   1. an explicit `#[sql_execute_type(...)]` attribute;
//!   2. the leading keyword of a template/raw-SQL attribute;
//!   3. a case-insensitive method-name prefix table;
//!   4. default `Select`.

use syn::TraitItemFn;

use repoforge_core::attrs::{OperationKind, SelectRefinement, SqlSource};

use crate::error::InferenceError;

/// Case-insensitive prefix table from §4.6, checked in declaration order —
/// `Count`/`Exists` must be checked before the generic `Select`-family
/// prefixes so their refinement isn't lost to an earlier partial match.
const SELECT_REFINING_PREFIXES: &[(&str, SelectRefinement)] = &[("count", SelectRefinement::Scalar), ("exists", SelectRefinement::Exists)];

const SELECT_PREFIXES: &[&str] = &["get", "find", "select", "query", "list", "search"];
const INSERT_PREFIXES: &[&str] = &["add", "create", "insert"];
const UPDATE_PREFIXES: &[&str] = &["update", "modify", "set"];
const DELETE_PREFIXES: &[&str] = &["delete", "remove"];

fn method_name_prefix(name: &str) -> (OperationKind, SelectRefinement) {
    let lower = name.to_lowercase();

    for (prefix, refinement) in SELECT_REFINING_PREFIXES {
        if lower.starts_with(prefix) {
            return (OperationKind::Select, *refinement);
        }
    }
    if SELECT_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        return (OperationKind::Select, SelectRefinement::None);
    }
    if INSERT_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        return (OperationKind::Insert, SelectRefinement::None);
    }
    if UPDATE_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        return (OperationKind::Update, SelectRefinement::None);
    }
    if DELETE_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        return (OperationKind::Delete, SelectRefinement::None);
    }
    (OperationKind::Select, SelectRefinement::None)
}

/// Derive an operation kind from the leading keyword of a raw/template SQL
/// string — step 2 of the selection order.
fn from_leading_keyword(sql: &str) -> Option<OperationKind> {
    let trimmed = sql.trim_start();
    let first_word: String = trimmed.split_whitespace().next()?.to_uppercase();
    match first_word.as_str() {
        "SELECT" => Some(OperationKind::Select),
        "INSERT" => Some(OperationKind::Insert),
        "UPDATE" => Some(OperationKind::Update),
        "DELETE" => Some(OperationKind::Delete),
        _ => None,
    }
}

/// Whether a trait method has a parameter whose type is some sequence
/// wrapper (`Vec<_>`, `&[_]`, `impl IntoIterator<...>`) — used to satisfy
/// `BatchRequiresCollection` for a `Batch*` operation.
fn has_sequence_parameter(method: &TraitItemFn) -> bool {
    method.sig.inputs.iter().any(|arg| {
        let syn::FnArg::Typed(pat_type) = arg else { return false };
        matches!(&*pat_type.ty, syn::Type::Path(p) if p.path.segments.last().is_some_and(|s| matches!(s.ident.to_string().as_str(), "Vec" | "VecDeque")))
            || matches!(&*pat_type.ty, syn::Type::Reference(r) if matches!(&*r.elem, syn::Type::Slice(_)))
    })
}

/// Resolve `(OperationKind, SelectRefinement)` for one method.
///
/// `explicit` is the parsed `#[sql_execute_type(...)]` value, if any;
/// `sql_source` carries a template/raw-SQL string when the method has one.
pub fn infer(method: &TraitItemFn, explicit: Option<OperationKind>, sql_source: &SqlSource) -> Result<(OperationKind, SelectRefinement), InferenceError> {
    let (kind, refinement) = if let Some(kind) = explicit {
        (kind, SelectRefinement::None)
    } else if let SqlSource::Template(text) | SqlSource::RawSql(text) = sql_source {
        match from_leading_keyword(text) {
            Some(kind) => (kind, SelectRefinement::None),
            None => method_name_prefix(&method.sig.ident.to_string()),
        }
    } else {
        method_name_prefix(&method.sig.ident.to_string())
    };

    if kind.is_batch() && !has_sequence_parameter(method) {
        return Err(InferenceError::BatchRequiresCollection(method.sig.ident.to_string()));
    }

    Ok((kind, refinement))
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
    fn get_prefix_infers_select() {
        let m = method("async fn get_by_id(&self, id: i64) -> Option<i64>");
        let (kind, refinement) = infer(&m, None, &SqlSource::Inferred).unwrap();
        assert_eq!(kind, OperationKind::Select);
        assert_eq!(refinement, SelectRefinement::None);
    }

    #[test]
    fn count_prefix_refines_to_scalar() {
        let m = method("async fn count_active(&self) -> i64");
        let (kind, refinement) = infer(&m, None, &SqlSource::Inferred).unwrap();
        assert_eq!(kind, OperationKind::Select);
        assert_eq!(refinement, SelectRefinement::Scalar);
    }

    #[test]
    fn leading_keyword_overrides_name_prefix() {
        let m = method("async fn get_stats(&self) -> i64");
        let sql = SqlSource::RawSql("DELETE FROM stale_sessions".to_string());
        let (kind, _) = infer(&m, None, &sql).unwrap();
        assert_eq!(kind, OperationKind::Delete);
    }

    #[test]
    fn batch_without_sequence_param_fails() {
        let m = method("async fn insert_users(&self, user: User) -> i64");
        let err = infer(&m, Some(OperationKind::BatchInsert), &SqlSource::Inferred).unwrap_err();
        assert!(matches!(err, InferenceError::BatchRequiresCollection(_)));
    }

    #[test]
    fn batch_with_vec_param_succeeds() {
        let m = method("async fn insert_users(&self, users: Vec<User>) -> i64");
        let (kind, _) = infer(&m, Some(OperationKind::BatchInsert), &SqlSource::Inferred).unwrap();
        assert_eq!(kind, OperationKind::BatchInsert);
    }
}
