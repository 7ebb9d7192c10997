//! Proc-macro entry points for repoforge: the `#[repository(...)]` attribute
//! macro (Discovery Pass → Type Analyzer → Operation Inferrer → Emitter) and
//! the `#[derive(SqlEntity)]` companion that equips a plain struct with the
//! [`repoforge_core::entity::Entity`] and [`repoforge_core::runtime::FromRow`]
//! impls the generated repository methods call into.
//!
//! `sql_template`/`raw_sql`/`sqlx`/`table_name`/`return_inserted_id`/
//! `sql_execute_type`/`dialect` need no registration of their own: they only
//! ever appear nested inside a trait annotated with `#[repository(...)]`,
//! and an attribute macro replaces its whole input wholesale, so the
//! original (unexpanded) inner attributes never reach the compiler's own
//! attribute-legality check — `emitter::strip_recognized_attrs` removes them
//! from the re-emitted trait before it ships.

mod derive_entity;
mod discovery;
mod emitter;
mod error;
mod operation_inferrer;
mod sql_synthesis;
mod type_analyzer;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput, ItemTrait};

use discovery::RepositoryArgs;

/// `#[repository(dialect = SqlServer)] trait UserRepository { ... }` —
/// discovers the annotated trait's repository shape and emits a
/// `<Trait>Repository<C>` struct implementing it.
#[proc_macro_attribute]
pub fn repository(args: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(args as RepositoryArgs);
    let item_trait = parse_macro_input!(item as ItemTrait);

    let spec = match discovery::discover(&args, &item_trait) {
        Ok(spec) => spec,
        Err(err) => return error::GeneratorError::from(err).into_compile_error(item_trait.ident.span()).into(),
    };

    emitter::emit(&spec, &item_trait).into()
}

/// `#[derive(SqlEntity)]` — implements `Entity` and `FromRow` for a struct.
/// Recognizes `#[table_name("...")]` on the struct and `#[column("...")]`/
/// `#[identity]` on individual fields.
#[proc_macro_derive(SqlEntity, attributes(table_name, column, identity))]
pub fn derive_sql_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let struct_span = input.ident.span();

    match derive_entity::expand(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.into_compile_error(struct_span).into(),
    }
}
