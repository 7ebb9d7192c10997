//! SQL tokens — the atomic, dialect-agnostic units the translator and
//! template engine emit. A [`TokenStream`] serializes itself to a string for
//! a specific [`Dialect`]; nothing downstream of token construction needs to
//! know which dialect it targets.

use crate::dialect::{Dialect, SqlDialect};

/// A single element of generated SQL.
///
/// Adding a variant here is meant to force every `serialize` match arm (and
/// anything else matching exhaustively) to be updated.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Select,
    From,
    Where,
    And,
    Or,
    Not,
    As,
    GroupBy,
    Having,
    OrderBy,
    Asc,
    Desc,
    Limit,
    Offset,
    Fetch,
    Next,
    Rows,
    Only,
    Top,
    Case,
    When,
    Then,
    Else,
    End,
    In,
    Between,
    Like,
    IsNull,
    IsNotNull,
    Distinct,
    Insert,
    Into,
    Values,
    Update,
    Set,
    Delete,
    Returning,

    Comma,
    LParen,
    RParen,

    Eq,
    Ne,
    Lt,
    Gt,
    Lte,
    Gte,
    Plus,
    Minus,
    Mul,
    Div,
    Mod,
    Concat,

    Space,

    Ident(String),
    QualifiedIdent { table: Option<String>, name: String },
    LitInt(i64),
    LitFloat(f64),
    LitString(String),
    LitBool(bool),
    LitNull,
    Param(String),
    FunctionName(String),

    /// Raw SQL passed through verbatim.
    ///
    /// Only for trusted, static fragments (dialect-specific paging suffixes,
    /// aggregate expressions already rendered elsewhere). Never place
    /// caller-controlled strings here — use `LitString`/`Param` instead.
    Raw(String),
}

impl Token {
    pub fn serialize(&self, dialect: Dialect) -> String {
        match self {
            Token::Select => "SELECT".into(),
            Token::From => "FROM".into(),
            Token::Where => "WHERE".into(),
            Token::And => "AND".into(),
            Token::Or => "OR".into(),
            Token::Not => "NOT".into(),
            Token::As => "AS".into(),
            Token::GroupBy => "GROUP BY".into(),
            Token::Having => "HAVING".into(),
            Token::OrderBy => "ORDER BY".into(),
            Token::Asc => "ASC".into(),
            Token::Desc => "DESC".into(),
            Token::Limit => "LIMIT".into(),
            Token::Offset => "OFFSET".into(),
            Token::Fetch => "FETCH".into(),
            Token::Next => "NEXT".into(),
            Token::Rows => "ROWS".into(),
            Token::Only => "ONLY".into(),
            Token::Top => "TOP".into(),
            Token::Case => "CASE".into(),
            Token::When => "WHEN".into(),
            Token::Then => "THEN".into(),
            Token::Else => "ELSE".into(),
            Token::End => "END".into(),
            Token::In => "IN".into(),
            Token::Between => "BETWEEN".into(),
            Token::Like => "LIKE".into(),
            Token::IsNull => "IS NULL".into(),
            Token::IsNotNull => "IS NOT NULL".into(),
            Token::Distinct => "DISTINCT".into(),
            Token::Insert => "INSERT".into(),
            Token::Into => "INTO".into(),
            Token::Values => "VALUES".into(),
            Token::Update => "UPDATE".into(),
            Token::Set => "SET".into(),
            Token::Delete => "DELETE".into(),
            Token::Returning => "RETURNING".into(),

            Token::Comma => ",".into(),
            Token::LParen => "(".into(),
            Token::RParen => ")".into(),

            Token::Eq => "=".into(),
            Token::Ne => "<>".into(),
            Token::Lt => "<".into(),
            Token::Gt => ">".into(),
            Token::Lte => "<=".into(),
            Token::Gte => ">=".into(),
            Token::Plus => "+".into(),
            Token::Minus => "-".into(),
            Token::Mul => "*".into(),
            Token::Div => "/".into(),
            Token::Mod => "%".into(),
            Token::Concat => dialect.concat_operator().into(),

            Token::Space => " ".into(),

            Token::Ident(name) => dialect.quote_identifier(name),
            Token::QualifiedIdent { table, name } => match table {
                Some(t) => format!("{}.{}", dialect.quote_identifier(t), dialect.quote_identifier(name)),
                None => dialect.quote_identifier(name),
            },
            Token::LitInt(i) => i.to_string(),
            Token::LitFloat(f) => format_float(*f),
            Token::LitString(s) => dialect.quote_string(s),
            Token::LitBool(b) => dialect.format_bool(*b).into(),
            Token::LitNull => dialect.format_null().into(),
            Token::Param(name) => name.clone(),
            Token::FunctionName(name) => dialect.remap_function(name).map(str::to_string).unwrap_or_else(|| name.clone()),
            Token::Raw(s) => s.clone(),
        }
    }
}

/// Render a float the way the translator requires: invariant culture,
/// never exponent form (§4.5, §9 Open Question — NaN/Infinity are rejected
/// upstream as `UnsupportedExpression` before a token is ever built).
fn format_float(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{:.1}", f)
    } else {
        let s = format!("{}", f);
        if s.contains('e') || s.contains('E') {
            format!("{:.17}", f).trim_end_matches('0').trim_end_matches('.').to_string()
        } else {
            s
        }
    }
}

/// An ordered sequence of tokens, joined with no separator other than what
/// each `push`/`space` call inserts explicitly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenStream(Vec<Token>);

impl TokenStream {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, token: Token) -> &mut Self {
        self.0.push(token);
        self
    }

    pub fn space(&mut self) -> &mut Self {
        self.0.push(Token::Space);
        self
    }

    pub fn extend(&mut self, other: TokenStream) -> &mut Self {
        self.0.extend(other.0);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn render(&self, dialect: Dialect) -> String {
        self.0.iter().map(|t| t.serialize(dialect)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_joins_without_extra_whitespace() {
        let mut ts = TokenStream::new();
        ts.push(Token::Select).space().push(Token::Ident("id".into()));
        assert_eq!(ts.render(Dialect::Postgresql), "SELECT \"id\"");
    }

    #[test]
    fn float_never_uses_exponent_form() {
        assert_eq!(format_float(1.0), "1.0");
        assert_eq!(format_float(18.5), "18.5");
        assert!(!format_float(0.000000001).contains('e'));
    }
}
