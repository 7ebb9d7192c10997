//! Minimal description of a generated-code entity, as seen by runtime
//! components that need a table name and a column list without depending on
//! the macro crate that discovers them.
//!
//! `#[derive(SqlEntity)]` (in `repoforge-macros`) implements this for the
//! user's struct; everything in this crate only ever sees the trait.

/// One readable/writable column on an [`Entity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub member_name: &'static str,
    pub column_name: &'static str,
    pub is_identity: bool,
    pub is_nullable: bool,
}

pub trait Entity {
    /// Name-mapped, override-aware table name.
    fn table_name() -> &'static str;

    /// All readable properties, in declaration order.
    fn columns() -> &'static [ColumnDescriptor];

    /// The identity column, if any (`is_identity` on exactly one descriptor
    /// in well-formed entities).
    fn identity_column() -> Option<&'static str> {
        Self::columns().iter().find(|c| c.is_identity).map(|c| c.column_name)
    }

    fn non_identity_columns() -> Vec<&'static str> {
        Self::columns().iter().filter(|c| !c.is_identity).map(|c| c.column_name).collect()
    }
}
