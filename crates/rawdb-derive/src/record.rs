//! Record derive macro implementation

use crate::attrs::{field_attr, table_name};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Result};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let table = table_name(&input)?;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Record can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Record can only be derived for structs",
            ));
        }
    };

    let mut columns = Vec::with_capacity(fields.len());
    let mut primary_key = Vec::new();
    let mut to_values = Vec::with_capacity(fields.len());
    let mut extracts = Vec::with_capacity(fields.len());

    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let ty = &field.ty;
        let attr = field_attr(field)?;
        let column = attr.column.unwrap_or_else(|| ident.to_string());

        if columns.contains(&column) {
            return Err(syn::Error::new_spanned(
                field,
                format!("column `{column}` is mapped more than once"),
            ));
        }
        if attr.is_id {
            primary_key.push(column.clone());
        }

        to_values.push(quote! {
            (#column, ::rawdb::ToValue::to_value(&self.#ident))
        });
        extracts.push(quote! {
            #ident: fields.get_as::<#ty>(#column)?
        });
        columns.push(column);
    }

    Ok(quote! {
        impl #impl_generics ::rawdb::Record for #name #ty_generics #where_clause {
            fn table_name() -> &'static str {
                #table
            }

            fn columns() -> &'static [&'static str] {
                &[#(#columns),*]
            }

            fn primary_key() -> &'static [&'static str] {
                &[#(#primary_key),*]
            }

            fn to_values(&self) -> ::std::vec::Vec<(&'static str, ::rawdb::Value)> {
                ::std::vec![#(#to_values),*]
            }

            fn from_fields(fields: &::rawdb::FieldMap) -> ::rawdb::DbResult<Self> {
                ::std::result::Result::Ok(Self {
                    #(#extracts),*
                })
            }
        }
    })
}
