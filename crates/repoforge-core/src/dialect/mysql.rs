//! MySQL dialect.
//!
//! Backtick identifiers, `1`/`0` booleans, `LIMIT n OFFSET m` paging, no
//! `RETURNING` (uses `LAST_INSERT_ID()`), `||` reserved for logical OR so
//! concatenation goes through `CONCAT()`.

use super::{helpers, ConcatKind, DialectSpec, InsertIdStrategy, PagingStrategy, ParamPrefix, SqlDialect};

#[derive(Debug, Clone, Copy)]
pub struct MySqlImpl;

impl SqlDialect for MySqlImpl {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn spec(&self) -> DialectSpec {
        DialectSpec {
            open_ident: '`',
            close_ident: '`',
            open_string: '\'',
            close_string: '\'',
            param_prefix: ParamPrefix::At,
            paging_strategy: PagingStrategy::LimitOffset,
            concat_kind: ConcatKind::ConcatFn,
            like_escape: '\\',
        }
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_backtick(ident)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_numeric(b)
    }

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        match name.to_ascii_uppercase().as_str() {
            "NOW" => Some("NOW"),
            "LEN" => Some("CHAR_LENGTH"),
            _ => None,
        }
    }

    fn insert_id_strategy(&self) -> InsertIdStrategy {
        InsertIdStrategy::AppendedSelect("SELECT LAST_INSERT_ID();")
    }
}
