#![deny(rustdoc::broken_intra_doc_links, missing_docs)]

//! Replacement `#[test]` attribute that sets up logging before the test body
//! runs.

use darling::ast::NestedMeta;
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, parse_quote, ItemFn, Meta};

/// Wraps a test function so that `coil_test_log::initialize()` runs first.
///
/// Without arguments the wrapped function is a plain `#[test]`. A single
/// argument names the inner test attribute to use instead, e.g.
/// `#[test(some_runtime::test)]`.
///
/// ```rust,ignore
/// use coil_test_log::test;
///
/// #[test]
/// fn it_still_works() {
///     log::info!("logged through the test writer");
/// }
/// ```
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = match NestedMeta::parse_meta_list(attr.into()) {
        Ok(args) => args,
        Err(error) => return error.to_compile_error().into(),
    };
    let input = parse_macro_input!(item as ItemFn);

    let inner_test = match args.as_slice() {
        [] => NestedMeta::Meta(Meta::Path(parse_quote! { ::core::prelude::v1::test })),
        [inner] => inner.clone(),
        _ => {
            return syn::Error::new_spanned(
                &input.sig.ident,
                "expected at most one inner test attribute",
            )
            .to_compile_error()
            .into()
        }
    };

    wrap(&inner_test, input).into()
}

/// Moves the original body into a nested `test_impl` and calls it after
/// initializing logging. Return type and asyncness are carried over.
fn wrap(inner_test: &NestedMeta, test: ItemFn) -> TokenStream2 {
    let ItemFn {
        attrs, sig, block, ..
    } = test;
    let name = &sig.ident;
    let asyncness = &sig.asyncness;
    let output = &sig.output;
    let await_ = asyncness.map(|_| quote! { .await });

    quote! {
        #[#inner_test]
        #(#attrs)*
        #asyncness fn #name() #output {
            #asyncness fn test_impl() #output #block

            ::coil_test_log::initialize();

            test_impl()#await_
        }
    }
}
