//! Per-run cache of expanded templates, keyed by the full set of inputs
//! that can change the rendered SQL — text, dialect, table, and column
//! shape. Reusable across methods that happen to share a SQL template
//! string; scoped to one generation run, never process-wide (§5).

use std::collections::HashMap;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::dialect::Dialect;
use crate::entity::ColumnDescriptor;
use crate::hash::compute_hash;

use super::placeholder::{Expansion, TemplateError};

#[derive(Serialize)]
struct CacheKeyInput<'a> {
    text: &'a str,
    dialect: &'static str,
    table_name: &'a str,
    columns: Vec<(&'a str, &'a str, bool)>,
}

/// Single-writer-safe per-run cache. A `Mutex` is enough here: entries are
/// computed once and read many times, and generation runs are not expected
/// to contend heavily on this lock.
#[derive(Default)]
pub struct TemplateCache {
    entries: Mutex<HashMap<String, Expansion>>,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached expansion for this exact `(text, dialect, table,
    /// columns)` combination, computing and storing it on first use.
    pub fn get_or_expand(
        &self,
        text: &str,
        dialect: Dialect,
        table_name: &str,
        columns: &[ColumnDescriptor],
        method_params: &[&str],
    ) -> Result<Expansion, TemplateError> {
        let key_input = CacheKeyInput {
            text,
            dialect: dialect_name(dialect),
            table_name,
            columns: columns.iter().map(|c| (c.member_name, c.column_name, c.is_identity)).collect(),
        };
        let key = compute_hash(&key_input).unwrap_or_else(|_| text.to_string());

        if let Some(cached) = self.entries.lock().expect("template cache poisoned").get(&key) {
            return Ok(cached.clone());
        }

        let expansion = super::expand_placeholders(text, dialect, table_name, columns, method_params)?;
        self.entries.lock().expect("template cache poisoned").insert(key, expansion.clone());
        Ok(expansion)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("template cache poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

static GLOBAL_CACHE: Lazy<TemplateCache> = Lazy::new(TemplateCache::new);

/// A process-lifetime cache shared by every generated method. Generated
/// code has no "one generation run" to scope a cache to the way the
/// compiler plugin this was modeled on does — a `static` is the closest
/// Rust analogue, and entries are still keyed on the full
/// `(text, dialect, table, columns)` tuple so distinct call sites never
/// collide.
pub fn template_cache() -> &'static TemplateCache {
    &GLOBAL_CACHE
}

fn dialect_name(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::MySql => "mysql",
        Dialect::SqlServer => "sqlserver",
        Dialect::Postgresql => "postgresql",
        Dialect::Oracle => "oracle",
        Dialect::Db2 => "db2",
        Dialect::Sqlite => "sqlite",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols() -> Vec<ColumnDescriptor> {
        vec![ColumnDescriptor { member_name: "Id", column_name: "id", is_identity: true, is_nullable: false }]
    }

    #[test]
    fn same_key_is_served_from_cache() {
        let cache = TemplateCache::new();
        let first = cache.get_or_expand("{{table}}", Dialect::SqlServer, "user", &cols(), &[]).unwrap();
        assert_eq!(cache.len(), 1);
        let second = cache.get_or_expand("{{table}}", Dialect::SqlServer, "user", &cols(), &[]).unwrap();
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn different_dialect_is_a_different_entry() {
        let cache = TemplateCache::new();
        cache.get_or_expand("{{table}}", Dialect::SqlServer, "user", &cols(), &[]).unwrap();
        cache.get_or_expand("{{table}}", Dialect::MySql, "user", &cols(), &[]).unwrap();
        assert_eq!(cache.len(), 2);
    }
}
