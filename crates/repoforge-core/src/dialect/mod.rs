//! Dialect Registry — named dialect records, identifier/string quoting,
//! parameter-prefix rendering, and dialect-specific paging/concat/last-insert
//! fragments.
//!
//! Six predefined dialects only; the set is closed by design (new dialects
//! are an explicit trait impl, never a runtime-configured tuple, which would
//! let callers build the six quoting permutations without exercising any of
//! the translator's escaping logic).

mod db2;
mod mysql;
mod oracle;
mod postgresql;
pub mod helpers;
mod sqlite;
mod sqlserver;

pub use db2::Db2Impl;
pub use mysql::MySqlImpl;
pub use oracle::OracleImpl;
pub use postgresql::PostgresqlImpl;
pub use sqlite::SqliteImpl;
pub use sqlserver::SqlServerImpl;

use crate::token::TokenStream;

/// Pagination strategy a dialect uses to express `LIMIT`/`OFFSET`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagingStrategy {
    OffsetFetch,
    LimitOffset,
    RowNum,
    Top,
}

/// String concatenation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcatKind {
    Plus,
    ConcatFn,
    DoublePipe,
}

/// How a dialect exposes the identity of a just-inserted row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertIdStrategy {
    /// Append a second statement after the INSERT, e.g. `SELECT LAST_INSERT_ID();`.
    AppendedSelect(&'static str),
    /// Add a `RETURNING <col>` clause to the INSERT itself.
    ReturningClause,
    /// Read the value back from a named sequence's `CURRVAL`.
    SequenceCurrval,
}

/// The immutable record described in the data model: every field a dialect
/// contributes, independent of any trait-object indirection. Useful for
/// snapshot-style assertions in tests and for the template engine, which
/// only needs data, not behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialectSpec {
    pub open_ident: char,
    pub close_ident: char,
    pub open_string: char,
    pub close_string: char,
    pub param_prefix: ParamPrefix,
    pub paging_strategy: PagingStrategy,
    pub concat_kind: ConcatKind,
    pub like_escape: char,
}

/// How a dialect spells a parameter reference. `At` interpolates `name`;
/// the rest are positional per the data model's invariant on `declared_index`
/// (DB2 `?`, Oracle `:n`, PostgreSql `$n`) and ignore `name` entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamPrefix {
    At,
    ColonPositional,
    Dollar,
    QuestionMark,
}

/// Dialect-specific rendering behavior. Implemented once per predefined
/// dialect; [`Dialect`] delegates to the matching impl so call sites never
/// need to match on the enum themselves.
pub trait SqlDialect: std::fmt::Debug {
    fn name(&self) -> &'static str;
    fn spec(&self) -> DialectSpec;

    fn quote_identifier(&self, ident: &str) -> String {
        let s = self.spec();
        format!("{}{}{}", s.open_ident, ident.replace(s.close_ident, &format!("{0}{0}", s.close_ident)), s.close_ident)
    }

    fn quote_string(&self, s: &str) -> String {
        helpers::quote_string_single(s)
    }

    fn format_bool(&self, b: bool) -> &'static str;

    fn format_null(&self) -> &'static str {
        "NULL"
    }

    fn concat_operator(&self) -> &'static str {
        match self.spec().concat_kind {
            ConcatKind::Plus => "+",
            ConcatKind::DoublePipe => "||",
            ConcatKind::ConcatFn => "CONCAT",
        }
    }

    /// Whether `concat_operator` is an infix operator (`+`/`||`) rather than
    /// a function name that must wrap its arguments (`CONCAT(a, b)`).
    fn concat_is_infix(&self) -> bool {
        !matches!(self.spec().concat_kind, ConcatKind::ConcatFn)
    }

    /// Render a bound-parameter reference. Named dialects ignore `index`;
    /// positional dialects (DB2, Oracle) render from `index` instead of `name`.
    fn param_ref(&self, name: &str, index: usize) -> String {
        match self.spec().param_prefix {
            ParamPrefix::At => format!("@{name}"),
            ParamPrefix::ColonPositional => format!(":{}", index + 1),
            ParamPrefix::Dollar => format!("${}", index + 1),
            ParamPrefix::QuestionMark => "?".to_string(),
        }
    }

    fn requires_order_by_for_paging(&self) -> bool {
        self.spec().paging_strategy == PagingStrategy::OffsetFetch
    }

    /// Render the paging suffix/prefix for this dialect. `Top`-strategy
    /// dialects return a `SELECT`-prefix fragment instead of a suffix; the
    /// caller distinguishes the two by `paging_strategy`.
    fn paging(&self, offset: Option<u64>, limit: Option<u64>) -> String {
        match self.spec().paging_strategy {
            PagingStrategy::LimitOffset => helpers::paging_limit_offset(limit, offset),
            PagingStrategy::OffsetFetch => helpers::paging_offset_fetch(limit, offset),
            PagingStrategy::RowNum => helpers::paging_rownum(limit),
            PagingStrategy::Top => helpers::paging_top(limit),
        }
    }

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        let _ = name;
        None
    }

    fn insert_id_strategy(&self) -> InsertIdStrategy;

    /// Whether the driver for this dialect exposes a native multi-row batch
    /// command; when `false` the emitter falls back to a per-item loop.
    fn supports_native_batch(&self) -> bool {
        true
    }

    fn emit_limit_offset_tokens(&self, offset: Option<u64>, limit: Option<u64>) -> TokenStream {
        use crate::token::Token;
        let mut ts = TokenStream::new();
        ts.push(Token::Raw(self.paging(offset, limit)));
        ts
    }
}

/// The closed dialect set from the data model. Discriminants are the stable
/// integers the attribute surface commits to (§6): `MySql=0, SqlServer=1,
/// Postgresql=2, Oracle=3, DB2=4, SQLite=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    MySql = 0,
    SqlServer = 1,
    Postgresql = 2,
    Oracle = 3,
    Db2 = 4,
    Sqlite = 5,
}

impl Dialect {
    fn implementation(self) -> &'static dyn SqlDialect {
        match self {
            Dialect::MySql => &MySqlImpl,
            Dialect::SqlServer => &SqlServerImpl,
            Dialect::Postgresql => &PostgresqlImpl,
            Dialect::Oracle => &OracleImpl,
            Dialect::Db2 => &Db2Impl,
            Dialect::Sqlite => &SqliteImpl,
        }
    }
}

impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.implementation().name()
    }

    fn spec(&self) -> DialectSpec {
        self.implementation().spec()
    }

    fn quote_identifier(&self, ident: &str) -> String {
        self.implementation().quote_identifier(ident)
    }

    fn quote_string(&self, s: &str) -> String {
        self.implementation().quote_string(s)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        self.implementation().format_bool(b)
    }

    fn concat_operator(&self) -> &'static str {
        self.implementation().concat_operator()
    }

    fn param_ref(&self, name: &str, index: usize) -> String {
        self.implementation().param_ref(name, index)
    }

    fn paging(&self, offset: Option<u64>, limit: Option<u64>) -> String {
        self.implementation().paging(offset, limit)
    }

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        self.implementation().remap_function(name)
    }

    fn insert_id_strategy(&self) -> InsertIdStrategy {
        self.implementation().insert_id_strategy()
    }

    fn supports_native_batch(&self) -> bool {
        self.implementation().supports_native_batch()
    }
}

/// `lookup(kind) -> Dialect` from the public surface. The input is already
/// the closed enum, so this is an explicit identity step rather than a
/// lookup table — it exists so callers go through one named entry point
/// instead of constructing `Dialect` values ad hoc.
pub fn lookup(kind: Dialect) -> Dialect {
    kind
}

pub fn wrap_ident(dialect: Dialect, name: &str) -> String {
    dialect.quote_identifier(name)
}

pub fn wrap_string(dialect: Dialect, literal: &str) -> String {
    dialect.quote_string(literal)
}

pub fn param_ref(dialect: Dialect, name: &str, index: usize) -> String {
    dialect.param_ref(name, index)
}

pub fn paging(dialect: Dialect, offset: Option<u64>, limit: Option<u64>) -> String {
    dialect.paging(offset, limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_dialect_quotes_identifiers_with_its_own_bracket() {
        assert_eq!(wrap_ident(Dialect::SqlServer, "id"), "[id]");
        assert_eq!(wrap_ident(Dialect::MySql, "id"), "`id`");
        assert_eq!(wrap_ident(Dialect::Postgresql, "id"), "\"id\"");
        assert_eq!(wrap_ident(Dialect::Oracle, "id"), "\"id\"");
        assert_eq!(wrap_ident(Dialect::Db2, "id"), "\"id\"");
        assert_eq!(wrap_ident(Dialect::Sqlite, "id"), "\"id\"");
    }

    #[test]
    fn all_dialects_use_single_quotes_for_strings() {
        for d in [
            Dialect::MySql,
            Dialect::SqlServer,
            Dialect::Postgresql,
            Dialect::Oracle,
            Dialect::Db2,
            Dialect::Sqlite,
        ] {
            assert_eq!(wrap_string(d, "o'brien"), "'o''brien'");
        }
    }

    #[test]
    fn param_ref_matches_dialect_convention() {
        assert_eq!(param_ref(Dialect::SqlServer, "id", 0), "@id");
        assert_eq!(param_ref(Dialect::Sqlite, "id", 0), "@id");
        assert_eq!(param_ref(Dialect::Oracle, "id", 2), ":3");
        assert_eq!(param_ref(Dialect::Postgresql, "id", 2), "$3");
        assert_eq!(param_ref(Dialect::Db2, "id", 0), "?");
    }

    #[test]
    fn paging_picks_the_dialect_strategy() {
        assert_eq!(paging(Dialect::MySql, Some(0), Some(10)), "LIMIT 10 OFFSET 0");
        assert_eq!(
            paging(Dialect::SqlServer, Some(0), Some(10)),
            "OFFSET 0 ROWS FETCH NEXT 10 ROWS ONLY"
        );
        assert_eq!(paging(Dialect::Oracle, None, Some(5)), "WHERE ROWNUM <= 5");
        assert_eq!(paging(Dialect::Db2, None, Some(5)), "TOP (5)");
    }
}
