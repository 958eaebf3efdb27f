// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use proc_macro2::TokenStream;
use syn::parse_quote;

use super::entrypoint_common::common_codegen;

#[must_use]
pub fn impl_runtime_main(args: TokenStream, item: TokenStream) -> TokenStream {
    common_codegen(args, item, false, false, parse_quote!(::dsk_rt))
}

#[cfg(not(miri))] // Insta does not work under Miri.
#[cfg(test)]
#[expect(clippy::literal_string_with_formatting_args, reason = "By design")]
mod tests {
    use insta::assert_snapshot;
    use quote::quote;

    use super::*;

    #[test]
    fn test_main() {
        let input = quote! {
            async fn main(cx: TaskContext) {
                println!("Hello, world!");
                cx::yield_now().await;
            }
        };
        let args = TokenStream::new();
        let result = impl_runtime_main(args, input);
        let result_file = syn::parse_file(&result.to_string()).unwrap();
        assert_snapshot!(prettyplease::unparse(&result_file), @r#"
        fn main() {
            let shared_state = ::std::default::Default::default();
            ::dsk_rt::Runtime::with_shared_state(shared_state)
                .expect("Failed to create runtime")
                .run(async move |cx: TaskContext| {
                    println!("Hello, world!");
                    cx::yield_now().await;
                })
        }
        "#);
    }
}
