//! # repoforge-core
//!
//! Runtime support for the `repoforge` code generator: everything the
//! `#[repository]` macro needs that doesn't itself require `syn`, plus the
//! opaque driver boundary generated methods call into at runtime.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  dialect   — identifier/string quoting, paging, concat   │
//! └─────────────────────────────────────────────────────────┘
//!               │                      │
//!               ▼                      ▼
//! ┌───────────────────────┐  ┌──────────────────────────────┐
//! │ template (C4)          │  │ expr + runtime::translate (C5)│
//! │ placeholder expansion  │  │ predicate/projection AST →    │
//! │ + if/each text engine  │  │ SQL fragment + parameters      │
//! └───────────────────────┘  └──────────────────────────────┘
//!               │                      │
//!               └──────────┬───────────┘
//!                          ▼
//!          ┌───────────────────────────────┐
//!          │ runtime (C8 support)           │
//!          │ Connection/Statement/Row/Value │
//!          └───────────────────────────────┘
//! ```
//!
//! `name_mapper` (C2) and `attrs` (C9 shared enums) sit beside these,
//! consumed by both this crate's own modules and by `repoforge-macros`.

/// Re-exported so generated repository impls can write
/// `#[repoforge_core::async_trait]` without the consuming crate declaring
/// its own `async-trait` dependency.
pub use async_trait::async_trait;

/// Re-exported so generated method bodies can write
/// `#[repoforge_core::tracing::instrument(...)]` without the consuming
/// crate declaring its own `tracing` dependency.
pub use tracing;

/// Re-exported so a generated repository struct can guard its connection
/// behind `::repoforge_core::tokio::sync::Mutex<C>` without the consuming
/// crate declaring its own `tokio` dependency.
pub use tokio;

pub mod attrs;
pub mod config;
pub mod dialect;
pub mod entity;
pub mod expr;
pub mod hash;
pub mod name_mapper;
pub mod runtime;
pub mod template;
pub mod token;

pub mod prelude {
    pub use crate::attrs::{OperationKind, ParameterDescriptor, ParameterSource, ReturnShapeKind, SelectRefinement, SqlSource};
    pub use crate::dialect::{Dialect, SqlDialect};
    pub use crate::entity::{ColumnDescriptor, Entity};
    pub use crate::expr::{AggregateKind, BinaryOp, Expr, Literal, MethodCall, UnaryOp};
    pub use crate::runtime::translate::{BoundParam, ExpressionToSql, OrderDirection, Rendered, TranslateError};
    pub use crate::runtime::{
        check_not_canceled, with_open_connection, Connection, DriverError, FromRow, FromValue, IntoValue, Row, Statement, ToColumnValues, Value,
    };
}
