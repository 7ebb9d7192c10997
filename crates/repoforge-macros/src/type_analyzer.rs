//! Type Analyzer (C3) — classifies a method's return type at macro-expansion
//! time. Rust's `async fn` sugar already strips the future wrapper at the
//! signature level (`sig.asyncness`), so the "deferred-result of T" peeling
//! in §4.3 specializes to a single flag instead of recursive generic
//! unwrapping; everything else below mirrors the original classification.

use syn::{GenericArgument, PathArguments, ReturnType, Type};

use repoforge_core::attrs::ReturnShapeKind;

/// `string` is always Scalar (never a sequence) — an explicit edge policy
/// from §4.3, called out because `String`/`str` would otherwise look like
/// any other named type to a generic-arguments walk.
const SCALAR_TYPE_NAMES: &[&str] = &[
    "String", "str", "bool", "char", "i8", "i16", "i32", "i64", "i128", "isize", "u8", "u16", "u32", "u64", "u128",
    "usize", "f32", "f64", "Uuid", "NaiveDateTime", "DateTime", "Duration", "Decimal",
];

/// Classify a method's declared return type.
///
/// `Option<T>` classifies as `OptionEntity` only when `T` itself resolves to
/// `Entity`; `Option<Scalar>` stays `Scalar` — nullability is tracked
/// orthogonally, never as its own shape (§4.3 "Nullable").
pub fn classify_return(ret: &ReturnType) -> ReturnShapeKind {
    let ty = match ret {
        ReturnType::Default => return ReturnShapeKind::Void,
        ReturnType::Type(_, ty) => ty.as_ref(),
    };
    classify_type(ty)
}

fn classify_type(ty: &Type) -> ReturnShapeKind {
    let Type::Path(type_path) = ty else {
        return ReturnShapeKind::Scalar;
    };
    let Some(segment) = type_path.path.segments.last() else {
        return ReturnShapeKind::Scalar;
    };
    let name = segment.ident.to_string();

    match name.as_str() {
        "Option" => match single_generic_arg(segment) {
            Some(inner) if is_entity_like(inner) => ReturnShapeKind::OptionEntity,
            _ => ReturnShapeKind::Scalar,
        },
        "Vec" | "VecDeque" | "HashSet" | "BTreeSet" => ReturnShapeKind::SequenceEntity,
        _ if SCALAR_TYPE_NAMES.contains(&name.as_str()) => ReturnShapeKind::Scalar,
        "AffectedRows" => ReturnShapeKind::AffectedRows,
        "()" => ReturnShapeKind::Void,
        _ => ReturnShapeKind::Entity,
    }
}

fn single_generic_arg(segment: &syn::PathSegment) -> Option<&Type> {
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    args.args.iter().find_map(|arg| match arg {
        GenericArgument::Type(t) => Some(t),
        _ => None,
    })
}

/// A type "resolves to Entity" if it isn't one of the recognized Scalar
/// names and isn't itself a further collection wrapper — the practical
/// stand-in for "namespace outside a curated framework set" (§4.3), since
/// Rust has no such namespace curation to inspect.
fn is_entity_like(ty: &Type) -> bool {
    !matches!(classify_type(ty), ReturnShapeKind::Scalar)
}

/// Whether `u64`/affected-rows-shaped return is from a non-query operation —
/// used by the emitter to skip scalar/reader dispatch entirely for
/// INSERT/UPDATE/DELETE methods with no explicit return.
pub fn is_void_or_affected_rows(kind: ReturnShapeKind) -> bool {
    matches!(kind, ReturnShapeKind::Void | ReturnShapeKind::AffectedRows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn option_of_entity_is_option_entity() {
        let ret: ReturnType = parse_quote! { -> Option<User> };
        assert_eq!(classify_return(&ret), ReturnShapeKind::OptionEntity);
    }

    #[test]
    fn option_of_scalar_stays_scalar() {
        let ret: ReturnType = parse_quote! { -> Option<i64> };
        assert_eq!(classify_return(&ret), ReturnShapeKind::Scalar);
    }

    #[test]
    fn vec_is_sequence() {
        let ret: ReturnType = parse_quote! { -> Vec<User> };
        assert_eq!(classify_return(&ret), ReturnShapeKind::SequenceEntity);
    }

    #[test]
    fn no_return_is_void() {
        let ret: ReturnType = parse_quote! {};
        assert_eq!(classify_return(&ret), ReturnShapeKind::Void);
    }

    #[test]
    fn bare_string_is_scalar_not_entity() {
        let ret: ReturnType = parse_quote! { -> String };
        assert_eq!(classify_return(&ret), ReturnShapeKind::Scalar);
    }
}
