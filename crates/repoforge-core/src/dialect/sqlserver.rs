//! SQL Server (T-SQL) dialect.
//!
//! Bracket identifiers, numeric booleans (no native bool type in a SELECT
//! list), `OFFSET … FETCH` paging which requires an `ORDER BY`, `+` for
//! string concatenation, `SCOPE_IDENTITY()` for the last inserted key.

use super::{helpers, ConcatKind, DialectSpec, InsertIdStrategy, PagingStrategy, ParamPrefix, SqlDialect};

#[derive(Debug, Clone, Copy)]
pub struct SqlServerImpl;

impl SqlDialect for SqlServerImpl {
    fn name(&self) -> &'static str {
        "sqlserver"
    }

    fn spec(&self) -> DialectSpec {
        DialectSpec {
            open_ident: '[',
            close_ident: ']',
            open_string: '\'',
            close_string: '\'',
            param_prefix: ParamPrefix::At,
            paging_strategy: PagingStrategy::OffsetFetch,
            concat_kind: ConcatKind::Plus,
            like_escape: '\\',
        }
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_bracket(ident)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_numeric(b)
    }

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        match name.to_ascii_uppercase().as_str() {
            "NOW" => Some("GETDATE"),
            "LENGTH" => Some("LEN"),
            _ => None,
        }
    }

    fn insert_id_strategy(&self) -> InsertIdStrategy {
        InsertIdStrategy::AppendedSelect("SELECT SCOPE_IDENTITY();")
    }

    fn supports_native_batch(&self) -> bool {
        // Table-valued parameters exist but the opaque driver boundary here
        // doesn't expose them; fall back to the per-item loop.
        false
    }
}
