//! Shared building blocks reused by more than one [`super::SqlDialect`] impl.
//! Plain functions, no state — easy to unit-test in isolation.

pub fn quote_double(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

pub fn quote_backtick(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}

pub fn quote_bracket(ident: &str) -> String {
    format!("[{}]", ident.replace(']', "]]"))
}

pub fn quote_string_single(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

pub fn format_bool_literal(b: bool) -> &'static str {
    if b {
        "TRUE"
    } else {
        "FALSE"
    }
}

pub fn format_bool_numeric(b: bool) -> &'static str {
    if b {
        "1"
    } else {
        "0"
    }
}

/// `LIMIT n OFFSET m` — the ANSI-ish default used by MySql, PostgreSql and Sqlite.
pub fn paging_limit_offset(limit: Option<u64>, offset: Option<u64>) -> String {
    let mut s = String::new();
    if let Some(lim) = limit {
        s.push_str(&format!("LIMIT {lim}"));
    }
    if let Some(off) = offset {
        if !s.is_empty() {
            s.push(' ');
        }
        s.push_str(&format!("OFFSET {off}"));
    }
    s
}

/// `OFFSET m ROWS FETCH NEXT n ROWS ONLY` — SqlServer, requires an ORDER BY.
pub fn paging_offset_fetch(limit: Option<u64>, offset: Option<u64>) -> String {
    let off = offset.unwrap_or(0);
    match limit {
        Some(lim) => format!("OFFSET {off} ROWS FETCH NEXT {lim} ROWS ONLY"),
        None => format!("OFFSET {off} ROWS"),
    }
}

/// `WHERE ROWNUM <= n` wrapper fragment used by Oracle for a plain limit
/// (offsetless paging only; an offset requires the caller to nest a subquery,
/// which is out of scope for the placeholder-level paging helper).
pub fn paging_rownum(limit: Option<u64>) -> String {
    match limit {
        Some(lim) => format!("WHERE ROWNUM <= {lim}"),
        None => String::new(),
    }
}

/// `SELECT TOP (n) …` prefix — DB2 and legacy SqlServer style. Returned as the
/// fragment to splice immediately after `SELECT`; offsets are not expressible
/// in the TOP form and are rejected by the caller.
pub fn paging_top(limit: Option<u64>) -> String {
    match limit {
        Some(lim) => format!("TOP ({lim})"),
        None => String::new(),
    }
}
