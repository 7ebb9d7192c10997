//! PostgreSQL dialect.
//!
//! Double-quoted identifiers, native booleans, `LIMIT … OFFSET …` paging,
//! `||` concatenation, positional `$n` parameters, `RETURNING` for the
//! inserted key.

use super::{helpers, ConcatKind, DialectSpec, InsertIdStrategy, PagingStrategy, ParamPrefix, SqlDialect};

#[derive(Debug, Clone, Copy)]
pub struct PostgresqlImpl;

impl SqlDialect for PostgresqlImpl {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    fn spec(&self) -> DialectSpec {
        DialectSpec {
            open_ident: '"',
            close_ident: '"',
            open_string: '\'',
            close_string: '\'',
            param_prefix: ParamPrefix::Dollar,
            paging_strategy: PagingStrategy::LimitOffset,
            concat_kind: ConcatKind::DoublePipe,
            like_escape: '\\',
        }
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_literal(b)
    }

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        match name.to_ascii_uppercase().as_str() {
            "LEN" => Some("LENGTH"),
            _ => None,
        }
    }

    fn insert_id_strategy(&self) -> InsertIdStrategy {
        InsertIdStrategy::ReturningClause
    }
}
