//! Per-phase diagnostics, aggregated into one type the outer macro can turn
//! into a `compile_error!` at the call site that caused it (§7's
//! "diagnostics, abort generation for that method only").

use proc_macro2::Span;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("#[repository] target `{0}` is not a trait")]
    TargetNotInterface(String),
    #[error("conflicting dialect: class specifies `{class}`, method specifies `{method}`")]
    AmbiguousDialect { class: String, method: String },
    #[error("no connection field or constructor parameter of the connection abstraction was found")]
    MissingConnection,
}

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("`{0}` is a batch operation but has no sequence-typed parameter")]
    BatchRequiresCollection(String),
}

#[derive(Debug, Error)]
pub enum TypeError {
    #[error("could not classify the return type of `{0}`")]
    UnresolvedReturnType(String),
}

/// Aggregates every generator-side failure mode into one type so the outer
/// macro has a single place to turn an error into a `compile_error!`.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
    #[error(transparent)]
    Type(#[from] TypeError),
    #[error(transparent)]
    Template(#[from] repoforge_core::template::placeholder::TemplateError),
    #[error("{0}")]
    Syn(String),
}

impl From<syn::Error> for GeneratorError {
    fn from(err: syn::Error) -> Self {
        GeneratorError::Syn(err.to_string())
    }
}

impl GeneratorError {
    /// Render this error as the `TokenStream` a `#[proc_macro_attribute]`
    /// returns in place of its normal expansion — a single `compile_error!`
    /// anchored at `span`, per §7's "hard errors surface as ordinary compiler
    /// errors referencing the offending declaration".
    pub fn into_compile_error(self, span: Span) -> proc_macro2::TokenStream {
        let message = self.to_string();
        syn::Error::new(span, message).to_compile_error()
    }
}
