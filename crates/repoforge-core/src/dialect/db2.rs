//! IBM DB2 dialect.
//!
//! Double-quoted identifiers, numeric booleans, `TOP (n)` paging (offsets
//! require `FETCH FIRST`/`OFFSET` variants outside this generator's scope),
//! positional `?` parameters, sequence `CURRVAL` for the last inserted key.

use super::{helpers, ConcatKind, DialectSpec, InsertIdStrategy, PagingStrategy, ParamPrefix, SqlDialect};

#[derive(Debug, Clone, Copy)]
pub struct Db2Impl;

impl SqlDialect for Db2Impl {
    fn name(&self) -> &'static str {
        "db2"
    }

    fn spec(&self) -> DialectSpec {
        DialectSpec {
            open_ident: '"',
            close_ident: '"',
            open_string: '\'',
            close_string: '\'',
            param_prefix: ParamPrefix::QuestionMark,
            paging_strategy: PagingStrategy::Top,
            concat_kind: ConcatKind::ConcatFn,
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
        InsertIdStrategy::SequenceCurrval
    }

    fn supports_native_batch(&self) -> bool {
        false
    }
}
