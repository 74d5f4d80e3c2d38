// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Test attributes that give every test its own log file.
//!
//! Both attributes wrap the test body in a
//! [`fusegate_test_utils::TestLoggerGuard`] and expose a mutable `logger`
//! binding inside the body. The log is finalized as passed when the body
//! completes (or returns `Ok`) and as failed on `Err` or panic.

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{parse_macro_input, spanned::Spanned, ItemFn, ReturnType, Type};

/// Synchronous test with a per-test log file.
///
/// ```rust,ignore
/// #[fusegate_test_utils::logged_test]
/// fn decodes_attr() {
///     logger.log("decoding").unwrap();
/// }
/// ```
#[proc_macro_attribute]
pub fn logged_test(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return syn::Error::new(Span::call_site(), "#[logged_test] takes no arguments")
            .to_compile_error()
            .into();
    }
    let input = parse_macro_input!(item as ItemFn);
    if let Some(token) = &input.sig.asyncness {
        return syn::Error::new(
            token.span(),
            "#[logged_test] cannot wrap an async fn; use #[logged_tokio_test]",
        )
        .to_compile_error()
        .into();
    }
    expand(input, quote! { #[::core::prelude::v1::test] })
}

/// Tokio test with a per-test log file. Arguments are forwarded to `#[tokio::test]`.
#[proc_macro_attribute]
pub fn logged_tokio_test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = TokenStream2::from(attr);
    let input = parse_macro_input!(item as ItemFn);
    if input.sig.asyncness.is_none() {
        return syn::Error::new(
            input.sig.ident.span(),
            "#[logged_tokio_test] requires an async fn",
        )
        .to_compile_error()
        .into();
    }
    let harness = if args.is_empty() {
        quote! { #[::tokio::test] }
    } else {
        quote! { #[::tokio::test( #args )] }
    };
    expand(input, harness)
}

fn expand(mut input: ItemFn, harness: TokenStream2) -> TokenStream {
    input.attrs.retain(|attr| {
        attr.path()
            .get_ident()
            .map(|ident| ident != "logged_test" && ident != "logged_tokio_test")
            .unwrap_or(true)
    });

    let sig = &input.sig;
    if !sig.inputs.is_empty() {
        return syn::Error::new(sig.inputs.span(), "logged tests take no parameters")
            .to_compile_error()
            .into();
    }

    let name = sig.ident.to_string();
    let attrs = &input.attrs;
    let vis = &input.vis;
    let block = &input.block;
    let finish = finish_tokens(&sig.output);

    quote! {
        #harness
        #(#attrs)*
        #vis #sig {
            let mut __guard = ::fusegate_test_utils::TestLoggerGuard::new(#name)
                .expect("failed to create TestLogger");
            let logger = __guard.logger();
            let _ = &logger;

            let __result = #block;
            #finish
        }
    }
    .into()
}

fn returns_result(output: &ReturnType) -> bool {
    match output {
        ReturnType::Default => false,
        ReturnType::Type(_, ty) => match ty.as_ref() {
            Type::Path(path) => path
                .path
                .segments
                .last()
                .map(|segment| segment.ident == "Result")
                .unwrap_or(false),
            _ => false,
        },
    }
}

fn finish_tokens(output: &ReturnType) -> TokenStream2 {
    if returns_result(output) {
        quote! {
            match __result {
                ::std::result::Result::Ok(value) => {
                    if let Err(e) = __guard.finish_success() {
                        panic!("failed to finalize TestLogger: {}", e);
                    }
                    ::std::result::Result::Ok(value)
                }
                ::std::result::Result::Err(err) => {
                    let message = format!("{}", err);
                    if let Err(e) = __guard.finish_failure(&message) {
                        eprintln!("failed to finalize TestLogger after error: {}", e);
                    }
                    ::std::result::Result::Err(err)
                }
            }
        }
    } else {
        quote! {
            if let Err(e) = __guard.finish_success() {
                panic!("failed to finalize TestLogger: {}", e);
            }
            __result
        }
    }
}
