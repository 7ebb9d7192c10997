//! Expression-to-SQL Translator — walks a typed predicate/projection/update
//! AST and renders dialect-specific SQL plus an ordered parameter set.
//!
//! Captured values are inlined as SQL literals by default (the behavior
//! observed in the system this generator reproduces); call
//! [`ExpressionToSql::parameterized`] to switch a builder to emitting bound
//! parameters instead. The two modes never mix within one render.

use std::marker::PhantomData;

use thiserror::Error;

use crate::dialect::{Dialect, SqlDialect};
use crate::entity::Entity;
use crate::expr::{AggregateKind, BinaryOp, Expr, Literal, MethodCall, UnaryOp};
use crate::token::{Token, TokenStream};

#[derive(Debug, Error, PartialEq)]
pub enum TranslateError {
    #[error("unsupported expression node: {node}")]
    UnsupportedExpression { node: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParamMode {
    Inline,
    Parameterized,
}

/// A bound parameter produced by a parameterized render.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundParam {
    pub name: String,
    pub value: Literal,
}

/// The output of a translator render: SQL text plus, in parameterized mode,
/// the ordered parameters that back it.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub sql: String,
    pub params: Vec<BoundParam>,
}

/// Builder mirroring the source system's fluent `ExpressionToSql<T>` API.
/// Entirely data — `.render()` is the only place SQL text gets produced.
#[derive(Debug)]
pub struct ExpressionToSql<E: Entity> {
    dialect: Dialect,
    predicate: Option<Expr>,
    order_by: Vec<(String, OrderDirection)>,
    group_by: Vec<String>,
    having: Option<Expr>,
    take: Option<u64>,
    skip: Option<u64>,
    distinct: bool,
    select_list: Vec<(String, Option<Expr>)>,
    mode: ParamMode,
    _marker: PhantomData<E>,
}

impl<E: Entity> ExpressionToSql<E> {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            predicate: None,
            order_by: Vec::new(),
            group_by: Vec::new(),
            having: None,
            take: None,
            skip: None,
            distinct: false,
            select_list: Vec::new(),
            mode: ParamMode::Inline,
            _marker: PhantomData,
        }
    }

    pub fn for_my_sql() -> Self {
        Self::new(Dialect::MySql)
    }

    pub fn for_sql_server() -> Self {
        Self::new(Dialect::SqlServer)
    }

    pub fn for_postgresql() -> Self {
        Self::new(Dialect::Postgresql)
    }

    pub fn for_oracle() -> Self {
        Self::new(Dialect::Oracle)
    }

    pub fn for_db2() -> Self {
        Self::new(Dialect::Db2)
    }

    pub fn for_sqlite() -> Self {
        Self::new(Dialect::Sqlite)
    }

    /// Switch to parameterized rendering — used by template-mode callers
    /// that need a numbered parameter set rather than inlined literals.
    pub fn parameterized(mut self) -> Self {
        self.mode = ParamMode::Parameterized;
        self
    }

    pub fn where_(mut self, predicate: Expr) -> Self {
        self.predicate = Some(match self.predicate {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: OrderDirection) -> Self {
        self.order_by.push((column.into(), direction));
        self
    }

    pub fn group_by(mut self, column: impl Into<String>) -> Self {
        self.group_by.push(column.into());
        self
    }

    pub fn having(mut self, predicate: Expr) -> Self {
        self.having = Some(predicate);
        self
    }

    pub fn take(mut self, n: u64) -> Self {
        self.take = Some(n);
        self
    }

    pub fn skip(mut self, n: u64) -> Self {
        self.skip = Some(n);
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Add a projected column, or an aggregate term aliased to `alias`.
    pub fn select(mut self, alias: impl Into<String>, expr: Option<Expr>) -> Self {
        self.select_list.push((alias.into(), expr));
        self
    }

    pub fn render(&self) -> Result<Rendered, TranslateError> {
        let mut params = Vec::new();
        let mut sql = String::from("SELECT ");

        if self.distinct {
            sql.push_str("DISTINCT ");
        }

        if self.select_list.is_empty() {
            sql.push('*');
        } else {
            let mut parts = Vec::new();
            for (alias, expr) in &self.select_list {
                match expr {
                    Some(e) => {
                        let ts = render_value(e, self.dialect, self.mode, &mut params)?;
                        parts.push(format!("{} AS {}", ts.render(self.dialect), self.dialect.quote_identifier(alias)));
                    }
                    None => parts.push(self.dialect.quote_identifier(alias)),
                }
            }
            sql.push_str(&parts.join(", "));
        }

        sql.push_str(&format!(" FROM {}", self.dialect.quote_identifier(E::table_name())));

        if let Some(predicate) = &self.predicate {
            let ts = render_predicate(predicate, self.dialect, self.mode, &mut params)?;
            sql.push_str(&format!(" WHERE {}", ts.render(self.dialect)));
        }

        if !self.group_by.is_empty() {
            let cols: Vec<String> = self.group_by.iter().map(|c| self.dialect.quote_identifier(c)).collect();
            sql.push_str(&format!(" GROUP BY {}", cols.join(", ")));
        }

        if let Some(having) = &self.having {
            let ts = render_value(having, self.dialect, self.mode, &mut params)?;
            sql.push_str(&format!(" HAVING {}", ts.render(self.dialect)));
        }

        if !self.order_by.is_empty() {
            let cols: Vec<String> = self
                .order_by
                .iter()
                .map(|(c, dir)| {
                    let d = match dir {
                        OrderDirection::Asc => "ASC",
                        OrderDirection::Desc => "DESC",
                    };
                    format!("{} {}", self.dialect.quote_identifier(c), d)
                })
                .collect();
            sql.push_str(&format!(" ORDER BY {}", cols.join(", ")));
        } else if self.skip.is_some() {
            tracing::warn!(table = E::table_name(), "Skip used without OrderBy; row order is not guaranteed by this dialect");
        }

        if self.take.is_some() || self.skip.is_some() {
            let suffix = self.dialect.paging(self.skip, self.take);
            if !suffix.is_empty() {
                sql.push(' ');
                sql.push_str(&suffix);
            }
        }

        Ok(Rendered { sql, params })
    }
}

/// Render `expr` where it is used as a boolean predicate (top of a WHERE,
/// or an operand of AND/OR/NOT) — a bare boolean column becomes `col = 1`
/// (or the dialect's truthy literal) here, unlike in value position.
fn render_predicate(expr: &Expr, dialect: Dialect, mode: ParamMode, params: &mut Vec<BoundParam>) -> Result<TokenStream, TranslateError> {
    match expr {
        Expr::Column(name) => {
            let mut ts = TokenStream::new();
            ts.push(Token::Ident(name.clone())).space().push(Token::Eq).space().push(bool_token(dialect, true));
            Ok(ts)
        }
        Expr::BinaryOp { left, op: BinaryOp::And, right } => combine(left, right, "AND", dialect, mode, params, render_predicate),
        Expr::BinaryOp { left, op: BinaryOp::Or, right } => combine(left, right, "OR", dialect, mode, params, render_predicate),
        Expr::UnaryOp { op: UnaryOp::Not, expr } => {
            let inner = render_predicate(expr, dialect, mode, params)?;
            let mut ts = TokenStream::new();
            ts.push(Token::Not).space().push(Token::LParen).extend(inner).push(Token::RParen);
            Ok(ts)
        }
        _ => render_value(expr, dialect, mode, params),
    }
}

fn combine(
    left: &Expr,
    right: &Expr,
    keyword: &str,
    dialect: Dialect,
    mode: ParamMode,
    params: &mut Vec<BoundParam>,
    render: fn(&Expr, Dialect, ParamMode, &mut Vec<BoundParam>) -> Result<TokenStream, TranslateError>,
) -> Result<TokenStream, TranslateError> {
    let l = render(left, dialect, mode, params)?;
    let r = render(right, dialect, mode, params)?;
    let mut ts = TokenStream::new();
    ts.extend(l).space().push(Token::Raw(keyword.to_string())).space().extend(r);
    Ok(ts)
}

fn bool_token(dialect: Dialect, value: bool) -> Token {
    Token::Raw(dialect.format_bool(value).to_string())
}

/// Render `expr` in value position: comparisons, arithmetic, function
/// calls, literals — anything that isn't itself the top of a boolean
/// connective.
fn render_value(expr: &Expr, dialect: Dialect, mode: ParamMode, params: &mut Vec<BoundParam>) -> Result<TokenStream, TranslateError> {
    match expr {
        Expr::Column(name) => {
            let mut ts = TokenStream::new();
            ts.push(Token::Ident(name.clone()));
            Ok(ts)
        }

        Expr::Literal(lit) | Expr::Captured(lit) => render_literal(lit, dialect, mode, params),

        Expr::BinaryOp { left, op: BinaryOp::Eq, right } if is_null(right) => null_check(left, dialect, mode, params, false),
        Expr::BinaryOp { left, op: BinaryOp::Eq, right } if is_null(left) => null_check(right, dialect, mode, params, false),
        Expr::BinaryOp { left, op: BinaryOp::Ne, right } if is_null(right) => null_check(left, dialect, mode, params, true),
        Expr::BinaryOp { left, op: BinaryOp::Ne, right } if is_null(left) => null_check(right, dialect, mode, params, true),

        Expr::BinaryOp { left, op: BinaryOp::And, right } => combine(left, right, "AND", dialect, mode, params, render_predicate),
        Expr::BinaryOp { left, op: BinaryOp::Or, right } => combine(left, right, "OR", dialect, mode, params, render_predicate),

        Expr::BinaryOp { left, op, right } => {
            let l = render_value(left, dialect, mode, params)?;
            let r = render_value(right, dialect, mode, params)?;
            let mut ts = TokenStream::new();
            ts.extend(l).space().push(op_token(dialect, *op)).space().extend(r);
            Ok(ts)
        }

        Expr::UnaryOp { op: UnaryOp::Not, expr } => render_predicate(&Expr::UnaryOp { op: UnaryOp::Not, expr: expr.clone() }, dialect, mode, params),
        Expr::UnaryOp { op: UnaryOp::Neg, expr } => {
            let inner = render_value(expr, dialect, mode, params)?;
            let mut ts = TokenStream::new();
            ts.push(Token::Minus).extend(inner);
            Ok(ts)
        }

        Expr::Call { method, receiver, args } => render_call(*method, receiver, args, dialect, mode, params),

        Expr::In { expr, values, negated } => {
            let lhs = render_value(expr, dialect, mode, params)?;
            let mut rendered_values = Vec::with_capacity(values.len());
            for v in values {
                rendered_values.push(render_value(v, dialect, mode, params)?.render(dialect));
            }
            let mut ts = TokenStream::new();
            ts.extend(lhs).space();
            if *negated {
                ts.push(Token::Not).space();
            }
            ts.push(Token::In).space().push(Token::Raw(format!("({})", rendered_values.join(", "))));
            Ok(ts)
        }

        Expr::IsNull { expr, negated } => null_check(expr, dialect, mode, params, *negated),

        Expr::Conditional { when_clauses, else_clause } => {
            let mut ts = TokenStream::new();
            ts.push(Token::Case);
            for (cond, result) in when_clauses {
                let c = render_predicate(cond, dialect, mode, params)?;
                let r = render_value(result, dialect, mode, params)?;
                ts.space().push(Token::When).space().extend(c).space().push(Token::Then).space().extend(r);
            }
            if let Some(else_expr) = else_clause {
                let e = render_value(else_expr, dialect, mode, params)?;
                ts.space().push(Token::Else).space().extend(e);
            }
            ts.space().push(Token::End);
            Ok(ts)
        }

        Expr::Coalesce(items) => {
            let mut rendered = Vec::with_capacity(items.len());
            for item in items {
                rendered.push(render_value(item, dialect, mode, params)?.render(dialect));
            }
            let mut ts = TokenStream::new();
            ts.push(Token::Raw(format!("COALESCE({})", rendered.join(", "))));
            Ok(ts)
        }

        Expr::Aggregate { kind, arg } => {
            let inner = match arg {
                Some(a) => render_value(a, dialect, mode, params)?.render(dialect),
                None => "*".to_string(),
            };
            let mut ts = TokenStream::new();
            ts.push(Token::Raw(format!("{}({})", kind.sql_name(), inner)));
            Ok(ts)
        }

        Expr::Take(_) | Expr::Skip(_) => Err(TranslateError::UnsupportedExpression {
            node: "Take/Skip may only appear as paging, not as a value expression".to_string(),
        }),
    }
}

fn is_null(expr: &Expr) -> bool {
    matches!(expr, Expr::Literal(Literal::Null) | Expr::Captured(Literal::Null))
}

fn null_check(expr: &Expr, dialect: Dialect, mode: ParamMode, params: &mut Vec<BoundParam>, negated: bool) -> Result<TokenStream, TranslateError> {
    let inner = render_value(expr, dialect, mode, params)?;
    let mut ts = TokenStream::new();
    ts.extend(inner).space().push(if negated { Token::IsNotNull } else { Token::IsNull });
    Ok(ts)
}

fn op_token(dialect: Dialect, op: BinaryOp) -> Token {
    match op {
        BinaryOp::Add => Token::Plus,
        BinaryOp::Sub => Token::Minus,
        BinaryOp::Mul => Token::Mul,
        BinaryOp::Div => Token::Div,
        BinaryOp::Mod => Token::Mod,
        BinaryOp::Eq => Token::Eq,
        BinaryOp::Ne => Token::Ne,
        BinaryOp::Lt => Token::Lt,
        BinaryOp::Gt => Token::Gt,
        BinaryOp::Lte => Token::Lte,
        BinaryOp::Gte => Token::Gte,
        BinaryOp::And => Token::And,
        BinaryOp::Or => Token::Or,
        BinaryOp::Concat => {
            if dialect.concat_is_infix() {
                Token::Concat
            } else {
                Token::Raw(",".to_string())
            }
        }
    }
}

fn render_literal(lit: &Literal, dialect: Dialect, mode: ParamMode, params: &mut Vec<BoundParam>) -> Result<TokenStream, TranslateError> {
    if let Literal::Float(f) = lit {
        if f.is_nan() || f.is_infinite() {
            return Err(TranslateError::UnsupportedExpression {
                node: "NaN/Infinity float literal".to_string(),
            });
        }
    }

    match mode {
        ParamMode::Inline => {
            let token = match lit {
                Literal::Int(i) => Token::LitInt(*i),
                Literal::Float(f) => Token::LitFloat(*f),
                Literal::String(s) => Token::LitString(s.clone()),
                Literal::Bool(b) => Token::LitBool(*b),
                Literal::Null => Token::LitNull,
            };
            let mut ts = TokenStream::new();
            ts.push(token);
            Ok(ts)
        }
        ParamMode::Parameterized => {
            let name = format!("p{}", params.len());
            params.push(BoundParam { name: name.clone(), value: lit.clone() });
            let mut ts = TokenStream::new();
            ts.push(Token::Param(dialect.param_ref(&name, params.len() - 1)));
            Ok(ts)
        }
    }
}

fn render_call(method: MethodCall, receiver: &Expr, args: &[Expr], dialect: Dialect, mode: ParamMode, params: &mut Vec<BoundParam>) -> Result<TokenStream, TranslateError> {
    let recv = render_value(receiver, dialect, mode, params)?.render(dialect);
    let mut ts = TokenStream::new();

    match method {
        MethodCall::StringContains => {
            let pattern = like_pattern(args, dialect, mode, params, "%{}%")?;
            ts.push(Token::Raw(recv)).space().push(Token::Like).space().push(Token::Raw(pattern));
        }
        MethodCall::StartsWith => {
            let pattern = like_pattern(args, dialect, mode, params, "{}%")?;
            ts.push(Token::Raw(recv)).space().push(Token::Like).space().push(Token::Raw(pattern));
        }
        MethodCall::EndsWith => {
            let pattern = like_pattern(args, dialect, mode, params, "%{}")?;
            ts.push(Token::Raw(recv)).space().push(Token::Like).space().push(Token::Raw(pattern));
        }
        MethodCall::ToUpper => {
            ts.push(Token::Raw(format!("UPPER({})", recv)));
        }
        MethodCall::ToLower => {
            ts.push(Token::Raw(format!("LOWER({})", recv)));
        }
        MethodCall::Trim => {
            ts.push(Token::Raw(format!("TRIM({})", recv)));
        }
        MethodCall::Substring => {
            let rendered_args = render_args(args, dialect, mode, params)?;
            ts.push(Token::Raw(format!("SUBSTRING({}, {})", recv, rendered_args.join(", "))));
        }
        MethodCall::MathAbs => {
            ts.push(Token::Raw(format!("ABS({})", recv)));
        }
        MethodCall::MathCeiling => {
            ts.push(Token::Raw(format!("CEILING({})", recv)));
        }
        MethodCall::MathFloor => {
            ts.push(Token::Raw(format!("FLOOR({})", recv)));
        }
        MethodCall::AddDays | MethodCall::AddYears => {
            let unit = if method == MethodCall::AddDays { "day" } else { "year" };
            let rendered_args = render_args(args, dialect, mode, params)?;
            ts.push(Token::Raw(format!("DATEADD({}, {}, {})", unit, rendered_args.join(", "), recv)));
        }
    }

    Ok(ts)
}

fn render_args(args: &[Expr], dialect: Dialect, mode: ParamMode, params: &mut Vec<BoundParam>) -> Result<Vec<String>, TranslateError> {
    let mut out = Vec::with_capacity(args.len());
    for a in args {
        out.push(render_value(a, dialect, mode, params)?.render(dialect));
    }
    Ok(out)
}

/// Render the LIKE pattern for `Contains`/`StartsWith`/`EndsWith`. A string
/// literal argument is escaped and wrapped at generation time; a non-literal
/// argument (a captured column or parameter) is composed with the dialect's
/// concatenation idiom instead, since wildcards can't be baked into it ahead
/// of time.
fn like_pattern(args: &[Expr], dialect: Dialect, mode: ParamMode, params: &mut Vec<BoundParam>, template: &str) -> Result<String, TranslateError> {
    let arg = args.first().ok_or_else(|| TranslateError::UnsupportedExpression {
        node: "LIKE-producing call requires exactly one argument".to_string(),
    })?;
    match arg {
        Expr::Literal(Literal::String(s)) | Expr::Captured(Literal::String(s)) => {
            let escaped = escape_like(s, dialect.spec().like_escape);
            Ok(dialect.quote_string(&template.replace("{}", &escaped)))
        }
        other => {
            let rendered = render_value(other, dialect, mode, params)?.render(dialect);
            let leading = template.starts_with('%');
            let trailing = template.ends_with('%');
            let parts: Vec<String> = [leading.then(|| dialect.quote_string("%")), Some(rendered), trailing.then(|| dialect.quote_string("%"))]
                .into_iter()
                .flatten()
                .collect();
            if dialect.concat_is_infix() {
                Ok(parts.join(&format!(" {} ", dialect.concat_operator())))
            } else {
                Ok(format!("{}({})", dialect.concat_operator(), parts.join(", ")))
            }
        }
    }
}

fn escape_like(s: &str, escape: char) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c == '%' || c == '_' || c == escape {
            out.push(escape);
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::ColumnDescriptor;
    use pretty_assertions::assert_eq;

    struct User;

    impl Entity for User {
        fn table_name() -> &'static str {
            "User"
        }

        fn columns() -> &'static [ColumnDescriptor] {
            &[
                ColumnDescriptor { member_name: "Id", column_name: "Id", is_identity: true, is_nullable: false },
                ColumnDescriptor { member_name: "Name", column_name: "Name", is_identity: false, is_nullable: false },
                ColumnDescriptor { member_name: "Age", column_name: "Age", is_identity: false, is_nullable: false },
                ColumnDescriptor { member_name: "IsActive", column_name: "IsActive", is_identity: false, is_nullable: false },
                ColumnDescriptor { member_name: "DepartmentId", column_name: "DepartmentId", is_identity: false, is_nullable: false },
            ]
        }
    }

    #[test]
    fn predicate_order_by_and_paging() {
        let predicate = Expr::column("Age").ge_lit(18).and(Expr::column("IsActive"));
        let rendered = ExpressionToSql::<User>::for_sql_server()
            .where_(predicate)
            .order_by("Name", OrderDirection::Asc)
            .take(10)
            .render()
            .unwrap();

        assert_eq!(
            rendered.sql,
            "SELECT * FROM [User] WHERE [Age] >= 18 AND [IsActive] = 1 ORDER BY [Name] ASC OFFSET 0 ROWS FETCH NEXT 10 ROWS ONLY"
        );
    }

    #[test]
    fn group_by_having_on_mysql() {
        let rendered = ExpressionToSql::<User>::for_my_sql()
            .group_by("DepartmentId")
            .having(Expr::Aggregate { kind: AggregateKind::Count, arg: None }.gt_lit(5))
            .select("DepartmentId", None)
            .select("C", Some(Expr::Aggregate { kind: AggregateKind::Count, arg: None }))
            .render()
            .unwrap();

        assert!(rendered.sql.contains("GROUP BY `DepartmentId`"));
        assert!(rendered.sql.contains("HAVING COUNT(*) > 5"));
    }

    #[test]
    fn null_comparisons_become_is_null() {
        let rendered = ExpressionToSql::<User>::for_sql_server()
            .where_(Expr::column("Name").eq(Expr::Literal(Literal::Null)))
            .render()
            .unwrap();
        assert_eq!(rendered.sql, "SELECT * FROM [User] WHERE [Name] IS NULL");
        assert!(!rendered.sql.contains("= NULL"));
    }

    #[test]
    fn nan_float_is_unsupported() {
        let err = ExpressionToSql::<User>::for_sql_server()
            .where_(Expr::column("Age").eq(Expr::Literal(Literal::Float(f64::NAN))))
            .render()
            .unwrap_err();
        assert!(matches!(err, TranslateError::UnsupportedExpression { .. }));
    }

    #[test]
    fn skip_without_order_by_still_renders_but_warns() {
        let rendered = ExpressionToSql::<User>::for_sql_server().skip(5).take(10).render().unwrap();
        assert!(rendered.sql.contains("OFFSET 5 ROWS FETCH NEXT 10 ROWS ONLY"));
    }

    #[test]
    fn string_contains_becomes_like() {
        let rendered = ExpressionToSql::<User>::for_sql_server()
            .where_(Expr::Call {
                method: MethodCall::StringContains,
                receiver: Box::new(Expr::column("Name")),
                args: vec![Expr::Literal(Literal::String("an".to_string()))],
            })
            .render()
            .unwrap();
        assert_eq!(rendered.sql, "SELECT * FROM [User] WHERE [Name] LIKE '%an%'");
    }
}
