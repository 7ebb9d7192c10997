//! SQL Template Engine — two coexisting template languages selected by
//! attribute: placeholder expansion (§4.4a) and text templates with
//! directives (§4.4b).

pub mod cache;
pub mod placeholder;
pub mod text;

use crate::dialect::{Dialect, SqlDialect};
use crate::entity::ColumnDescriptor;
use placeholder::{Expansion, TemplateError};

/// Scan `raw_text` for `{{...}}` placeholders, expand each via
/// [`placeholder::expand`], and splice the results back into the
/// surrounding literal text. Fails with [`TemplateError::UnclosedBrace`]
/// on an unmatched `{{`.
pub fn expand_placeholders(
    raw_text: &str,
    dialect: Dialect,
    table_name: &str,
    columns: &[ColumnDescriptor],
    method_params: &[&str],
) -> Result<Expansion, TemplateError> {
    let mut sql = String::with_capacity(raw_text.len());
    let mut params = Vec::new();
    let mut warnings = Vec::new();

    let mut rest = raw_text;
    loop {
        match rest.find("{{") {
            None => {
                sql.push_str(rest);
                break;
            }
            Some(start) => {
                sql.push_str(&rest[..start]);
                let after = &rest[start + 2..];
                let end = after.find("}}").ok_or(TemplateError::UnclosedBrace)?;
                let body = &after[..end];
                let op = placeholder::parse(body)?;
                let expansion = placeholder::expand(&op, dialect, table_name, columns, method_params);
                sql.push_str(&expansion.sql);
                params.extend(expansion.params);
                if let Some(w) = expansion.warning {
                    warnings.push(w);
                }
                rest = &after[end + 2..];
            }
        }
    }

    for warning in &warnings {
        tracing::warn!(%warning, "template placeholder warning");
    }

    Ok(Expansion {
        sql,
        params,
        warning: warnings.into_iter().next(),
    })
}

/// §3 validation surface: `{ ok, errors[], warnings[] }`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationResult {
    pub ok: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

pub fn validate(raw_text: &str) -> ValidationResult {
    let mut errors = Vec::new();

    let mut depth = 0i32;
    let mut rest = raw_text;
    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        match after.find("}}") {
            None => {
                errors.push("unclosed `{{...}}`".to_string());
                break;
            }
            Some(end) => {
                let body = after[..end].trim();
                if body.starts_with("if ") || body == "each" || body.starts_with("each ") {
                    depth += 1;
                }
                if body == "endif" || body == "endeach" {
                    depth -= 1;
                }
                if body.starts_with("each ") && !body.contains(" in ") {
                    errors.push(format!("`each` without `item in coll`: {{{{{body}}}}}"));
                }
                rest = &after[end + 2..];
            }
        }
    }
    if depth != 0 {
        errors.push("unclosed `if`/`each` block".to_string());
    }

    ValidationResult { ok: errors.is_empty(), errors, warnings: Vec::new() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;

    fn user_columns() -> Vec<ColumnDescriptor> {
        vec![
            ColumnDescriptor { member_name: "Id", column_name: "id", is_identity: true, is_nullable: false },
            ColumnDescriptor { member_name: "Name", column_name: "name", is_identity: false, is_nullable: false },
            ColumnDescriptor { member_name: "Email", column_name: "email", is_identity: false, is_nullable: false },
            ColumnDescriptor { member_name: "Age", column_name: "age", is_identity: false, is_nullable: false },
        ]
    }

    #[test]
    fn scenario_template_placeholder() {
        let cols = user_columns();
        let expansion = expand_placeholders(
            "SELECT {{columns:auto}} FROM {{table}} WHERE {{where:id}}",
            Dialect::SqlServer,
            "user",
            &cols,
            &[],
        )
        .unwrap();
        assert_eq!(expansion.sql, "SELECT id, name, email, age FROM user WHERE id = @id");
    }

    #[test]
    fn unclosed_brace_is_rejected() {
        let err = expand_placeholders("SELECT {{table", Dialect::SqlServer, "user", &user_columns(), &[]).unwrap_err();
        assert_eq!(err, TemplateError::UnclosedBrace);
    }

    #[test]
    fn validate_rejects_each_without_item_in_coll() {
        let result = validate("{{each foo}}{{endeach}}");
        assert!(!result.ok);
    }

    #[test]
    fn validate_accepts_balanced_directives() {
        let result = validate("{{if cond}}{{each item in coll}}{{var}}{{endeach}}{{endif}}");
        assert!(result.ok, "{:?}", result.errors);
    }
}
