//! `repoforge.toml` — an optional per-crate configuration file read at
//! macro-expansion time, scaled down from the ambient TOML-plus-`${VAR}`
//! configuration idiom used elsewhere in this stack. Per-repository
//! attributes always win; this file only supplies a default when a
//! repository omits `dialect(...)`.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadError(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseError(PathBuf, toml::de::Error),
    #[error("missing environment variable: {0}")]
    MissingEnvVar(String),
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct RepoforgeConfig {
    /// Default dialect name (`mysql`, `sqlserver`, `postgresql`, `oracle`,
    /// `db2`, `sqlite`) used when a repository has no `dialect(...)`.
    pub default_dialect: Option<String>,
    /// Override the default snake_case name mapping with an explicit table
    /// prefix applied to every discovered entity.
    pub table_prefix: Option<String>,
}

impl RepoforgeConfig {
    /// Read `repoforge.toml` next to the invoking crate's `Cargo.toml`
    /// (`CARGO_MANIFEST_DIR` at macro-expansion time). Returns the default
    /// (empty) configuration when the file is absent — this is optional
    /// ambient config, not a hard requirement.
    pub fn load_from_manifest_dir() -> Result<Self, ConfigError> {
        let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap_or_default();
        let path = Path::new(&manifest_dir).join("repoforge.toml");
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::from_file(&path)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|e| ConfigError::ReadError(path.to_path_buf(), e))?;
        let expanded = expand_env_vars(&raw)?;
        toml::from_str(&expanded).map_err(|e| ConfigError::ParseError(path.to_path_buf(), e))
    }
}

/// Expand `${VAR}` references in `s`, failing if a referenced variable is
/// unset. `$VAR` without braces is left untouched — repoforge.toml values
/// are usually dialect names and prefixes, not shell-style paths, so only
/// the braced form is supported.
pub fn expand_env_vars(s: &str) -> Result<String, ConfigError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut var_name = String::new();
            for ch in chars.by_ref() {
                if ch == '}' {
                    break;
                }
                var_name.push(ch);
            }
            let value = env::var(&var_name).map_err(|_| ConfigError::MissingEnvVar(var_name.clone()))?;
            result.push_str(&value);
        } else {
            result.push(c);
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_braced_var() {
        env::set_var("REPOFORGE_TEST_VAR", "mysql");
        assert_eq!(expand_env_vars("${REPOFORGE_TEST_VAR}").unwrap(), "mysql");
        env::remove_var("REPOFORGE_TEST_VAR");
    }

    #[test]
    fn missing_var_fails() {
        let err = expand_env_vars("${REPOFORGE_DOES_NOT_EXIST}").unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(_)));
    }

    #[test]
    fn absent_file_yields_default_config() {
        env::remove_var("CARGO_MANIFEST_DIR");
        let cfg = RepoforgeConfig::load_from_manifest_dir().unwrap();
        assert_eq!(cfg, RepoforgeConfig::default());
    }
}
