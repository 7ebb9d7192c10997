//! SQLite dialect.
//!
//! Double-quoted identifiers, numeric booleans, `LIMIT … OFFSET …` paging,
//! `||` concatenation, named `@param` binding, `last_insert_rowid()` for the
//! last inserted key.

use super::{helpers, ConcatKind, DialectSpec, InsertIdStrategy, PagingStrategy, ParamPrefix, SqlDialect};

#[derive(Debug, Clone, Copy)]
pub struct SqliteImpl;

impl SqlDialect for SqliteImpl {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn spec(&self) -> DialectSpec {
        DialectSpec {
            open_ident: '"',
            close_ident: '"',
            open_string: '\'',
            close_string: '\'',
            param_prefix: ParamPrefix::At,
            paging_strategy: PagingStrategy::LimitOffset,
            concat_kind: ConcatKind::DoublePipe,
            like_escape: '\\',
        }
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_numeric(b)
    }

    fn insert_id_strategy(&self) -> InsertIdStrategy {
        InsertIdStrategy::AppendedSelect("SELECT last_insert_rowid();")
    }

    fn supports_native_batch(&self) -> bool {
        false
    }
}
