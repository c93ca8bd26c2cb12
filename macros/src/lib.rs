//! Derive macros for Courier requests
//!
//! This crate implements `courier_core::request::Request` for your request
//! types, so they can be dispatched through a mediator.
//!
//! # Available Macros
//!
//! - `#[derive(Query)]` - A read-only request; `#[query(response = T)]` is required
//! - `#[derive(Command)]` - A state-changing request; `#[command(response = T)]`
//!   is optional and defaults to `()`
//!
//! # Example
//!
//! ```ignore
//! use courier_macros::{Command, Query};
//!
//! #[derive(Query, Debug)]
//! #[query(response = Vec<TaskItem>)]
//! struct GetAllTasks;
//!
//! #[derive(Command, Debug)]
//! struct CreateTask {
//!     title: String,
//! }
//!
//! #[derive(Command, Debug)]
//! #[command(response = TaskItem)]
//! struct CompleteTask {
//!     id: TaskId,
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use proc_macro::TokenStream;
use quote::quote;
use syn::{Attribute, DeriveInput, Type, parse_macro_input, parse_quote};

/// Derive macro for queries
///
/// Implements `Request` with `Flavor = Read`.
///
/// # Attributes
///
/// - `#[query(response = T)]` - The value returned on success (required)
///
/// # Errors
///
/// This macro will produce a compile error if:
/// - The `#[query(...)]` attribute is missing
/// - The attribute contains anything other than `response = <type>`
///
/// # Example
///
/// ```ignore
/// #[derive(Query, Debug)]
/// #[query(response = Option<TaskItem>)]
/// struct FindTask {
///     id: TaskId,
/// }
/// ```
#[proc_macro_derive(Query, attributes(query))]
pub fn derive_query(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let response = match response_type(&input.attrs, "query") {
        Ok(Some(ty)) => ty,
        Ok(None) => {
            return syn::Error::new_spanned(
                &input.ident,
                "#[derive(Query)] requires #[query(response = <type>)]",
            )
            .to_compile_error()
            .into();
        }
        Err(err) => return err.to_compile_error().into(),
    };

    expand(&input, &response, &parse_quote!(::courier_core::request::Read))
}

/// Derive macro for commands
///
/// Implements `Request` with `Flavor = Write`.
///
/// # Attributes
///
/// - `#[command(response = T)]` - The value returned on success (optional,
///   defaults to `()` for commands that return nothing)
///
/// # Errors
///
/// This macro will produce a compile error if the `#[command(...)]`
/// attribute contains anything other than `response = <type>`.
///
/// # Example
///
/// ```ignore
/// #[derive(Command, Debug)]
/// struct DeleteTask {
///     id: TaskId,
/// }
///
/// #[derive(Command, Debug)]
/// #[command(response = TaskId)]
/// struct DuplicateTask {
///     id: TaskId,
/// }
/// ```
#[proc_macro_derive(Command, attributes(command))]
pub fn derive_command(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let response = match response_type(&input.attrs, "command") {
        Ok(Some(ty)) => ty,
        Ok(None) => parse_quote!(()),
        Err(err) => return err.to_compile_error().into(),
    };

    expand(&input, &response, &parse_quote!(::courier_core::request::Write))
}

fn expand(input: &DeriveInput, response: &Type, flavor: &Type) -> TokenStream {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {
        impl #impl_generics ::courier_core::request::Request for #name #ty_generics #where_clause {
            type Response = #response;
            type Flavor = #flavor;
        }
    };

    TokenStream::from(expanded)
}

/// Find `#[<attr>(response = T)]` and return `T`
fn response_type(attrs: &[Attribute], attr: &str) -> syn::Result<Option<Type>> {
    let mut response = None;

    for attribute in attrs.iter().filter(|a| a.path().is_ident(attr)) {
        attribute.parse_nested_meta(|meta| {
            if meta.path.is_ident("response") {
                if response.is_some() {
                    return Err(meta.error("duplicate `response`"));
                }
                response = Some(meta.value()?.parse::<Type>()?);
                Ok(())
            } else {
                Err(meta.error("expected `response = <type>`"))
            }
        })?;
    }

    Ok(response)
}
