//! Derive macros for rawdb
//!
//! Provides `#[derive(Record)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod attrs;
mod record;

/// Derive `Record` for a struct with named fields.
///
/// # Example
///
/// ```ignore
/// use rawdb::Record;
///
/// #[derive(Record)]
/// #[orm(table = "usuarios")]
/// struct User {
///     #[orm(id)]
///     id: String,
///     name: String,
///     #[orm(column = "email_address")]
///     email: Option<String>,
/// }
/// ```
///
/// # Attributes
///
/// - `#[orm(table = "name")]` - Table name (required)
/// - `#[orm(id)]` - Mark field as primary key
/// - `#[orm(column = "name")]` - Map field to a different column name
///
/// Every field type must implement `rawdb::ToValue` and `rawdb::FromValue`.
#[proc_macro_derive(Record, attributes(orm))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    record::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
