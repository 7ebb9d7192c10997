//! Placeholder-expansion template language: `{{ op(:arg)?(|key=value)* }}`.
//!
//! Used for per-method SQL attributes and the inferrer's synthesized SQL.
//! Column/table names it expands are read directly off an already
//! name-mapped [`ColumnDescriptor`] list — this engine does not call the
//! name mapper itself, it trusts what discovery already resolved.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::dialect::{Dialect, SqlDialect};
use crate::entity::ColumnDescriptor;
use crate::expr::AggregateKind;

#[derive(Debug, Error, PartialEq)]
pub enum TemplateError {
    #[error("unclosed `{{{{...}}}}` placeholder")]
    UnclosedBrace,
    #[error("malformed placeholder directive: {0}")]
    MalformedDirective(String),
    #[error("unclosed `if`/`each` block")]
    UnclosedBlock,
    #[error("`each` without `item in coll`: {0}")]
    EachMissingItemIn(String),
    #[error("unknown variable referenced in template: {0}")]
    UnknownVariable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringFn {
    Upper,
    Lower,
    Trim,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateTrunc {
    Today,
    Week,
    Month,
    Year,
}

/// One recognized placeholder operation. `Unknown` carries the original
/// `{{...}}` text verbatim (§4.4: unknown ops are preserved and warned on,
/// never dropped).
#[derive(Debug, Clone, PartialEq)]
pub enum PlaceholderOp {
    Table,
    ColumnsAuto { exclude: Vec<String> },
    ColumnsQuoted,
    ValuesAuto,
    SetAuto,
    WhereId,
    WhereAuto,
    OrderBy(Vec<String>),
    Limit { count: Option<u64> },
    Aggregate { kind: AggregateKind, column: String },
    StringFn { kind: StringFn, column: String },
    DateTrunc { kind: DateTrunc, column: String },
    Between { column: String },
    Like { column: String, pattern: String },
    In { column: String, values: Vec<String> },
    NotNull { column: String },
    IsNull { column: String },
    Round { column: String, decimals: u32 },
    Distinct { column: String },
    Unknown(String),
}

/// Parse the content between `{{` and `}}` (exclusive of the braces).
pub fn parse(body: &str) -> Result<PlaceholderOp, TemplateError> {
    let body = body.trim();
    let mut parts = body.splitn(2, '|');
    let head = parts.next().unwrap_or_default();
    let kv_tail = parts.next().unwrap_or_default();
    let kv = parse_kv(kv_tail)?;

    let mut head_parts = head.splitn(2, ':');
    let op = head_parts.next().unwrap_or_default().trim();
    let arg = head_parts.next().map(str::trim).unwrap_or_default();

    Ok(match op {
        "table" => PlaceholderOp::Table,
        "columns" if arg == "auto" => PlaceholderOp::ColumnsAuto {
            exclude: kv.get("exclude").map(|v| v.split(',').map(str::trim).map(str::to_string).collect()).unwrap_or_default(),
        },
        "columns" if arg == "quoted" => PlaceholderOp::ColumnsQuoted,
        "values" if arg == "auto" => PlaceholderOp::ValuesAuto,
        "set" if arg == "auto" => PlaceholderOp::SetAuto,
        "where" if arg == "id" => PlaceholderOp::WhereId,
        "where" if arg == "auto" => PlaceholderOp::WhereAuto,
        "orderby" => PlaceholderOp::OrderBy(arg.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()),
        "limit" if arg == "default" => PlaceholderOp::Limit {
            count: kv.get("count").and_then(|v| v.parse().ok()),
        },
        "sum" => PlaceholderOp::Aggregate { kind: AggregateKind::Sum, column: arg.to_string() },
        "avg" => PlaceholderOp::Aggregate { kind: AggregateKind::Avg, column: arg.to_string() },
        "min" => PlaceholderOp::Aggregate { kind: AggregateKind::Min, column: arg.to_string() },
        "max" => PlaceholderOp::Aggregate { kind: AggregateKind::Max, column: arg.to_string() },
        "count" => PlaceholderOp::Aggregate { kind: AggregateKind::Count, column: arg.to_string() },
        "upper" => PlaceholderOp::StringFn { kind: StringFn::Upper, column: arg.to_string() },
        "lower" => PlaceholderOp::StringFn { kind: StringFn::Lower, column: arg.to_string() },
        "trim" => PlaceholderOp::StringFn { kind: StringFn::Trim, column: arg.to_string() },
        "today" => PlaceholderOp::DateTrunc { kind: DateTrunc::Today, column: arg.to_string() },
        "week" => PlaceholderOp::DateTrunc { kind: DateTrunc::Week, column: arg.to_string() },
        "month" => PlaceholderOp::DateTrunc { kind: DateTrunc::Month, column: arg.to_string() },
        "year" => PlaceholderOp::DateTrunc { kind: DateTrunc::Year, column: arg.to_string() },
        "between" => PlaceholderOp::Between { column: arg.to_string() },
        "like" => PlaceholderOp::Like {
            column: arg.to_string(),
            pattern: kv.get("pattern").cloned().unwrap_or_default(),
        },
        "in" => PlaceholderOp::In {
            column: arg.to_string(),
            values: kv.get("values").map(|v| v.split(',').map(str::trim).map(str::to_string).collect()).unwrap_or_default(),
        },
        "notnull" => PlaceholderOp::NotNull { column: arg.to_string() },
        "isnull" => PlaceholderOp::IsNull { column: arg.to_string() },
        "round" => PlaceholderOp::Round {
            column: arg.to_string(),
            decimals: kv.get("decimals").and_then(|v| v.parse().ok()).unwrap_or(0),
        },
        "distinct" => PlaceholderOp::Distinct { column: arg.to_string() },
        _ => PlaceholderOp::Unknown(body.to_string()),
    })
}

fn parse_kv(tail: &str) -> Result<BTreeMap<String, String>, TemplateError> {
    let mut map = BTreeMap::new();
    if tail.is_empty() {
        return Ok(map);
    }
    for pair in tail.split('|') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let mut kv = pair.splitn(2, '=');
        let key = kv.next().ok_or_else(|| TemplateError::MalformedDirective(pair.to_string()))?;
        let value = kv.next().ok_or_else(|| TemplateError::MalformedDirective(pair.to_string()))?;
        map.insert(key.trim().to_string(), value.trim().to_string());
    }
    Ok(map)
}

/// The result of expanding one placeholder: the SQL fragment and any
/// parameter names it introduced (in declaration order).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Expansion {
    pub sql: String,
    pub params: Vec<String>,
    pub warning: Option<String>,
}

impl Expansion {
    fn sql(sql: impl Into<String>) -> Self {
        Self { sql: sql.into(), params: Vec::new(), warning: None }
    }
}

pub fn expand(op: &PlaceholderOp, dialect: Dialect, table_name: &str, columns: &[ColumnDescriptor], method_params: &[&str]) -> Expansion {
    match op {
        PlaceholderOp::Table => Expansion::sql(table_name),

        PlaceholderOp::ColumnsAuto { exclude } => {
            let names: Vec<&str> = columns.iter().map(|c| c.column_name).filter(|n| !exclude.iter().any(|e| e == n)).collect();
            Expansion::sql(names.join(", "))
        }

        PlaceholderOp::ColumnsQuoted => {
            let names: Vec<String> = columns.iter().map(|c| dialect.quote_identifier(c.column_name)).collect();
            Expansion::sql(names.join(", "))
        }

        PlaceholderOp::ValuesAuto => {
            let params: Vec<String> = columns.iter().filter(|c| !c.is_identity).map(|c| c.column_name.to_string()).collect();
            let refs: Vec<String> = params.iter().enumerate().map(|(i, p)| dialect.param_ref(p, i)).collect();
            Expansion { sql: refs.join(", "), params, warning: None }
        }

        PlaceholderOp::SetAuto => {
            let params: Vec<String> = columns.iter().filter(|c| !c.is_identity).map(|c| c.column_name.to_string()).collect();
            let pairs: Vec<String> = params
                .iter()
                .enumerate()
                .map(|(i, p)| format!("{} = {}", dialect.quote_identifier(p), dialect.param_ref(p, i)))
                .collect();
            Expansion { sql: pairs.join(", "), params, warning: None }
        }

        PlaceholderOp::WhereId => {
            let id = columns.iter().find(|c| c.is_identity).map(|c| c.column_name).unwrap_or("id");
            Expansion { sql: format!("{} = {}", id, dialect.param_ref(id, 0)), params: vec![id.to_string()], warning: None }
        }

        PlaceholderOp::WhereAuto => {
            let params: Vec<String> = method_params.iter().map(|s| s.to_string()).collect();
            let clauses: Vec<String> = params.iter().enumerate().map(|(i, p)| format!("{} = {}", p, dialect.param_ref(p, i))).collect();
            Expansion { sql: clauses.join(" AND "), params, warning: None }
        }

        PlaceholderOp::OrderBy(cols) => {
            let rendered: Vec<String> = cols.iter().map(|c| dialect.quote_identifier(c)).collect();
            Expansion::sql(format!("ORDER BY {}", rendered.join(", ")))
        }

        PlaceholderOp::Limit { count } => Expansion::sql(dialect.paging(None, *count)),

        PlaceholderOp::Aggregate { kind, column } => {
            let inner = if column.is_empty() || column == "*" { "*".to_string() } else { dialect.quote_identifier(column) };
            Expansion::sql(format!("{}({})", kind.sql_name(), inner))
        }

        PlaceholderOp::StringFn { kind, column } => {
            let fn_name = match kind {
                StringFn::Upper => "UPPER",
                StringFn::Lower => "LOWER",
                StringFn::Trim => "TRIM",
            };
            let remapped = dialect.remap_function(fn_name).unwrap_or(fn_name);
            Expansion::sql(format!("{}({})", remapped, dialect.quote_identifier(column)))
        }

        PlaceholderOp::DateTrunc { kind, column } => {
            let col = dialect.quote_identifier(column);
            let sql = match kind {
                DateTrunc::Today => format!("CAST({col} AS DATE) = CAST(GETDATE() AS DATE)"),
                DateTrunc::Week => format!("DATEPART(week, {col}) = DATEPART(week, GETDATE())"),
                DateTrunc::Month => format!("DATEPART(month, {col}) = DATEPART(month, GETDATE())"),
                DateTrunc::Year => format!("DATEPART(year, {col}) = DATEPART(year, GETDATE())"),
            };
            Expansion::sql(sql)
        }

        PlaceholderOp::Between { column } => {
            let col = dialect.quote_identifier(column);
            let min_ref = dialect.param_ref(&format!("{column}_min"), 0);
            let max_ref = dialect.param_ref(&format!("{column}_max"), 1);
            Expansion {
                sql: format!("{col} BETWEEN {min_ref} AND {max_ref}"),
                params: vec![format!("{column}_min"), format!("{column}_max")],
                warning: None,
            }
        }

        PlaceholderOp::Like { column, pattern } => {
            let col = dialect.quote_identifier(column);
            if pattern.is_empty() {
                let p = dialect.param_ref(&format!("{column}_pattern"), 0);
                Expansion { sql: format!("{col} LIKE {p}"), params: vec![format!("{column}_pattern")], warning: None }
            } else {
                Expansion::sql(format!("{col} LIKE {}", dialect.quote_string(pattern)))
            }
        }

        PlaceholderOp::In { column, values } => {
            let col = dialect.quote_identifier(column);
            let rendered: Vec<String> = values.iter().map(|v| dialect.quote_string(v)).collect();
            Expansion::sql(format!("{col} IN ({})", rendered.join(", ")))
        }

        PlaceholderOp::NotNull { column } => Expansion::sql(format!("{} IS NOT NULL", dialect.quote_identifier(column))),
        PlaceholderOp::IsNull { column } => Expansion::sql(format!("{} IS NULL", dialect.quote_identifier(column))),

        PlaceholderOp::Round { column, decimals } => Expansion::sql(format!("ROUND({}, {})", dialect.quote_identifier(column), decimals)),

        PlaceholderOp::Distinct { column } => Expansion::sql(format!("DISTINCT {}", dialect.quote_identifier(column))),

        PlaceholderOp::Unknown(text) => Expansion {
            sql: format!("{{{{{text}}}}}"),
            params: Vec::new(),
            warning: Some(format!("unrecognized placeholder op `{{{{{text}}}}}` preserved verbatim")),
        },
    }
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
    fn scenario_template_placeholder_select() {
        let cols = user_columns();
        let columns_sql = expand(&parse("columns:auto").unwrap(), Dialect::SqlServer, "user", &cols, &[]).sql;
        let table_sql = expand(&parse("table").unwrap(), Dialect::SqlServer, "user", &cols, &[]).sql;
        let where_sql = expand(&parse("where:id").unwrap(), Dialect::SqlServer, "user", &cols, &[]).sql;

        let rendered = format!("SELECT {columns_sql} FROM {table_sql} WHERE {where_sql}");
        assert_eq!(rendered, "SELECT id, name, email, age FROM user WHERE id = @id");
    }

    #[test]
    fn unknown_op_is_preserved_with_a_warning() {
        let exp = expand(&parse("frobnicate:x").unwrap(), Dialect::SqlServer, "user", &user_columns(), &[]);
        assert_eq!(exp.sql, "{{frobnicate:x}}");
        assert!(exp.warning.is_some());
    }

    #[test]
    fn columns_auto_respects_exclude() {
        let exp = expand(&parse("columns:auto|exclude=email").unwrap(), Dialect::SqlServer, "user", &user_columns(), &[]);
        assert_eq!(exp.sql, "id, name, age");
    }
}
