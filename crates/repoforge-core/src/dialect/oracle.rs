//! Oracle dialect.
//!
//! Double-quoted identifiers, numeric booleans (Oracle has no boolean type
//! usable in a projection), `ROWNUM`-based paging, positional `:n`
//! parameters, sequence `CURRVAL` for the last inserted key.

use super::{helpers, ConcatKind, DialectSpec, InsertIdStrategy, PagingStrategy, ParamPrefix, SqlDialect};

#[derive(Debug, Clone, Copy)]
pub struct OracleImpl;

impl SqlDialect for OracleImpl {
    fn name(&self) -> &'static str {
        "oracle"
    }

    fn spec(&self) -> DialectSpec {
        DialectSpec {
            open_ident: '"',
            close_ident: '"',
            open_string: '\'',
            close_string: '\'',
            param_prefix: ParamPrefix::ColonPositional,
            paging_strategy: PagingStrategy::RowNum,
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

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        match name.to_ascii_uppercase().as_str() {
            "NOW" => Some("SYSDATE"),
            "LEN" => Some("LENGTH"),
            _ => None,
        }
    }

    fn insert_id_strategy(&self) -> InsertIdStrategy {
        InsertIdStrategy::SequenceCurrval
    }

    fn supports_native_batch(&self) -> bool {
        false
    }
}
