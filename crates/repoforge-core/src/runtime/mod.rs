//! The opaque runtime boundary generated repository methods are written
//! against. Only a trait surface ships here — no concrete driver backend;
//! the runtime database driver is an explicit out-of-scope collaborator
//! (§1), and tests implement this boundary with a small in-memory fake.

pub mod translate;

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// A bound value passed to a [`Statement`], or read back from a [`Row`].
/// Mirrors the semantic-type categories the Type Analyzer classifies:
/// integers, floats, text, bool, and an explicit null sentinel (the driver's
/// null marker, per §4.8 step 3).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Null,
}

/// Convert a bound Rust value into the driver-opaque [`Value`] — the
/// generated-code analogue of choosing the DB type from a parameter's
/// semantic type (§4.8 step 3), without a per-type match in the emitter.
pub trait IntoValue {
    fn into_value(self) -> Value;
}

macro_rules! impl_into_value {
    ($ty:ty, $variant:ident) => {
        impl IntoValue for $ty {
            fn into_value(self) -> Value {
                Value::$variant(self.into())
            }
        }
    };
}

impl_into_value!(i64, Int);
impl_into_value!(i32, Int);
impl_into_value!(f64, Float);
impl_into_value!(f32, Float);
impl_into_value!(String, Text);
impl_into_value!(bool, Bool);

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::Text(self.to_string())
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        match self {
            Some(v) => v.into_value(),
            None => Value::Null,
        }
    }
}

/// Read a column back out of a driver-opaque [`Value`] into a Rust type —
/// the reader-access side of §4.3's "strong-typed accessor" rule, expressed
/// as a trait instead of a per-type match so `FromRow` impls stay generic.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, DriverError>;
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self, DriverError> {
        match value {
            Value::Int(i) => Ok(*i),
            other => Err(DriverError::InvalidArgument(format!("expected Int, got {other:?}"))),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, DriverError> {
        match value {
            Value::Float(f) => Ok(*f),
            other => Err(DriverError::InvalidArgument(format!("expected Float, got {other:?}"))),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, DriverError> {
        match value {
            Value::Text(s) => Ok(s.clone()),
            other => Err(DriverError::InvalidArgument(format!("expected Text, got {other:?}"))),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, DriverError> {
        match value {
            Value::Bool(b) => Ok(*b),
            other => Err(DriverError::InvalidArgument(format!("expected Bool, got {other:?}"))),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, DriverError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Materialize one row into an entity. `#[derive(SqlEntity)]` implements
/// this by resolving each field's column ordinal once and reading it back
/// with [`FromValue`] — the "resolve column ordinals once per reader" rule
/// in §4.8 step 4 applies per-row here since `Row` is handed in fresh each
/// time; the emitter resolves ordinals before the loop and passes them
/// through unchanged (see `repoforge-macros::emitter`).
pub trait FromRow: Sized {
    fn from_row(row: &dyn Row) -> Result<Self, DriverError>;
}

/// The write-side counterpart to [`FromRow`]: one bind-ready value per
/// column, in the same declaration order as `Entity::columns()`.
/// `#[derive(SqlEntity)]` implements this per field, so the emitter can bind
/// an entity-typed parameter one property at a time without ever needing to
/// know that entity's field names itself — it only sees a `syn::Type` path,
/// never the struct definition.
pub trait ToColumnValues {
    fn to_column_values(&self) -> Vec<(&'static str, Value)>;
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Null => write!(f, "NULL"),
        }
    }
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("operation canceled before any I/O was performed")]
    Canceled,
    #[error("argument {0:?} must not be null")]
    InvalidArgument(String),
    #[error("batch operation requires a non-empty collection parameter")]
    BatchRequiresCollection,
    #[error("column {0:?} not found on the active reader")]
    UnknownColumn(String),
    #[error("expected exactly one row, got none")]
    NotFound,
    #[error("driver returned an error: {0}")]
    Remote(String),
}

/// A single result row. Column ordinals are resolved once per reader and
/// reused across every row (§4.8 step 4).
pub trait Row: Send + Sync {
    fn get(&self, ordinal: usize) -> Option<&Value>;
    fn ordinal_of(&self, column: &str) -> Option<usize>;
}

/// A prepared, parameter-bound statement ready for execution.
#[async_trait]
pub trait Statement: Send + Sync {
    fn bind(&mut self, name: &str, value: Value);

    async fn execute_non_query(&mut self, cancel: &CancellationToken) -> Result<u64, DriverError>;
    async fn execute_scalar(&mut self, cancel: &CancellationToken) -> Result<Value, DriverError>;
    async fn execute_reader(&mut self, cancel: &CancellationToken) -> Result<Vec<Box<dyn Row>>, DriverError>;
}

/// The connection abstraction a discovered repository is built against —
/// either an injected field or a primary-constructor parameter, per §4.7.
#[async_trait]
pub trait Connection: Send + Sync {
    fn is_open(&self) -> bool;
    async fn open(&mut self) -> Result<(), DriverError>;
    async fn close(&mut self) -> Result<(), DriverError>;
    fn prepare(&self, sql: &str) -> Box<dyn Statement>;

    /// Whether this connection's driver exposes a batch-capable command;
    /// the emitter checks this before choosing the native batch path over
    /// the per-item fallback loop.
    fn supports_native_batch(&self) -> bool {
        false
    }
}

/// Open `conn` if it is closed, run `body` against it, then close it again
/// only if this call is the one that opened it — the scoped-release
/// semantics described in §4.8 step 2 and the resource policy in §5.
///
/// `body` receives `conn` as a shared reference rather than capturing it
/// from the enclosing scope: `conn` is only ever taken mutably here, for
/// `open`/`close`, and those calls happen strictly before and after `body`
/// runs, never while its future is live. Handing `conn` in as a parameter
/// keeps that non-overlap visible to the borrow checker instead of relying
/// on the caller's closure to capture the same place twice.
pub async fn with_open_connection<C, T, F, Fut>(conn: &mut C, body: F) -> Result<T, DriverError>
where
    C: Connection + ?Sized,
    F: FnOnce(&C) -> Fut,
    Fut: std::future::Future<Output = Result<T, DriverError>>,
{
    let opened_here = !conn.is_open();
    if opened_here {
        conn.open().await?;
    }
    let result = body(conn).await;
    if opened_here {
        conn.close().await?;
    }
    result
}

/// Fail fast with [`DriverError::Canceled`] if `cancel` was already
/// triggered — called before any I/O, per §4.8 step 5.
pub fn check_not_canceled(cancel: &CancellationToken) -> Result<(), DriverError> {
    if cancel.is_cancelled() {
        Err(DriverError::Canceled)
    } else {
        Ok(())
    }
}

/// A fresh, never-canceled token for a generated method whose trait
/// signature has no `CancellationToken` parameter of its own — cancellation
/// still threads through the same code path, it simply can never fire.
pub fn cancellation_token_unused() -> CancellationToken {
    CancellationToken::new()
}

/// Convert an [`ExpressionToSql`](crate::runtime::translate::ExpressionToSql)
/// bound parameter's captured [`crate::expr::Literal`] into the driver-opaque
/// `Value` the statement binds — used when a method's SQL source is
/// `Expression` (§3) and parameters come from the translator's own render,
/// not from method arguments.
pub fn value_from_literal(literal: &crate::expr::Literal) -> Value {
    match literal {
        crate::expr::Literal::Int(i) => Value::Int(*i),
        crate::expr::Literal::Float(f) => Value::Float(*f),
        crate::expr::Literal::String(s) => Value::Text(s.clone()),
        crate::expr::Literal::Bool(b) => Value::Bool(*b),
        crate::expr::Literal::Null => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canceled_token_fails_fast() {
        let token = CancellationToken::new();
        token.cancel();
        assert!(matches!(check_not_canceled(&token), Err(DriverError::Canceled)));
    }

    #[test]
    fn fresh_token_passes() {
        let token = CancellationToken::new();
        assert!(check_not_canceled(&token).is_ok());
    }

    #[test]
    fn into_value_round_trips_through_from_value() {
        assert_eq!(i64::from_value(&42i64.into_value()).unwrap(), 42);
        assert_eq!(String::from_value(&"hi".into_value()).unwrap(), "hi");
        assert_eq!(Option::<i64>::from_value(&None::<i64>.into_value()).unwrap(), None);
        assert_eq!(Option::<i64>::from_value(&Some(7i64).into_value()).unwrap(), Some(7));
    }

    #[test]
    fn from_value_rejects_mismatched_variant() {
        assert!(i64::from_value(&Value::Text("x".to_string())).is_err());
    }

    #[test]
    fn value_from_literal_covers_every_variant() {
        use crate::expr::Literal;
        assert_eq!(value_from_literal(&Literal::Int(3)), Value::Int(3));
        assert_eq!(value_from_literal(&Literal::Null), Value::Null);
    }
}
