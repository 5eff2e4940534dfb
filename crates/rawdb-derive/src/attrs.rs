//! Parsing of struct-level and field-level `#[orm(...)]` attributes.

use syn::parse::{Parse, ParseStream};
use syn::{DeriveInput, Ident, LitStr, Result, Token};

/// Field-level options: `#[orm(id)]`, `#[orm(column = "...")]`, or both.
#[derive(Default)]
pub(crate) struct FieldAttr {
    pub is_id: bool,
    pub column: Option<String>,
}

impl Parse for FieldAttr {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut attr = FieldAttr::default();

        while !input.is_empty() {
            let ident: Ident = input.parse()?;
            if ident == "id" {
                attr.is_id = true;
            } else if ident == "column" {
                let _: Token![=] = input.parse()?;
                let value: LitStr = input.parse()?;
                attr.column = Some(value.value());
            } else {
                return Err(syn::Error::new_spanned(
                    &ident,
                    format!("unknown field attribute `{ident}`; expected `id` or `column`"),
                ));
            }

            if input.is_empty() {
                break;
            }
            let _: Token![,] = input.parse()?;
        }

        Ok(attr)
    }
}

/// Merge every `#[orm(...)]` on a field.
pub(crate) fn field_attr(field: &syn::Field) -> Result<FieldAttr> {
    let mut merged = FieldAttr::default();
    for attr in &field.attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        let parsed: FieldAttr = attr.parse_args()?;
        merged.is_id |= parsed.is_id;
        if parsed.column.is_some() {
            merged.column = parsed.column;
        }
    }
    Ok(merged)
}

/// Extract table name from struct-level `#[orm(table = "...")]` attribute.
pub(crate) fn table_name(input: &DeriveInput) -> Result<String> {
    for attr in &input.attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        let nested: syn::MetaNameValue = attr.parse_args()?;
        if nested.path.is_ident("table") {
            if let syn::Expr::Lit(syn::ExprLit {
                lit: syn::Lit::Str(lit),
                ..
            }) = &nested.value
            {
                let table = lit.value();
                if table.trim().is_empty() {
                    return Err(syn::Error::new_spanned(lit, "table name must not be empty"));
                }
                return Ok(table);
            }
            return Err(syn::Error::new_spanned(
                &nested.value,
                "expected a string literal: #[orm(table = \"table_name\")]",
            ));
        }
    }
    Err(syn::Error::new_spanned(
        input,
        "Record requires #[orm(table = \"table_name\")] attribute",
    ))
}
