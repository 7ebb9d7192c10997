//! # repoforge
//!
//! Annotate a trait with `#[repository(dialect = ...)]` and every method
//! becomes a generated SQL call: the Operation Inferrer picks Select/Insert/
//! Update/Delete/Batch* from the method name or an explicit attribute, the
//! Type Analyzer reads the return shape, and the Emitter wires a prepared
//! statement through the [`runtime`] driver boundary.
//!
//! ```ignore
//! use repoforge::prelude::*;
//!
//! #[derive(SqlEntity)]
//! struct User {
//!     #[identity]
//!     id: i64,
//!     name: String,
//!     email: String,
//! }
//!
//! #[repository(dialect = SqlServer)]
//! trait UserRepository {
//!     async fn get_by_id(&self, id: i64) -> Option<User>;
//!     async fn create(&self, user: User) -> i64;
//! }
//! ```

pub use repoforge_core::*;
pub use repoforge_macros::{repository, SqlEntity};

pub mod prelude {
    pub use repoforge_core::prelude::*;
    pub use repoforge_macros::{repository, SqlEntity};
}
