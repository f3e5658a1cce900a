use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::{quote, quote_spanned};
use syn::spanned::Spanned;

/// Turns `fn name(context: &mut ScenarioContext) -> Result<(), stepwise::Error>` into a test that
/// builds the context with the given factory and runs the body between the scenario hooks.
#[proc_macro_attribute]
pub fn scenario_test(attrs: TokenStream, item: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(item as syn::ItemFn);
    let args = syn::parse_macro_input!(attrs as syn::AttributeArgs);

    if args.len() != 1 {
        return compile_error(
            "A context factory function should be passed to the macro",
            Span::call_site(),
        );
    }

    let context_factory;
    if let syn::NestedMeta::Meta(syn::Meta::Path(function_path)) = &args[0] {
        context_factory = function_path;
    } else {
        return compile_error(
            "The argument should be a context factory function!",
            args[0].span(),
        );
    }

    let signature = &input.sig;
    if signature.inputs.len() != 1 {
        return compile_error(
            "The scenario should take a single `&mut ScenarioContext` argument!",
            signature.span(),
        );
    }

    let attributes = &input.attrs;
    let name = &signature.ident;
    let inputs = &signature.inputs;
    let return_type = &signature.output;
    let block = &input.block;

    let output = quote! {
        #[test]
        #(#attributes)*
        fn #name() {
            fn __stepwise_scenario(#inputs) #return_type #block

            let mut __stepwise_context = match #context_factory() {
                Ok(context) => context,
                Err(e) => panic!("Scenario context couldn't be built: {}", e),
            };

            if let Err(e) = __stepwise_context.run(__stepwise_scenario) {
                panic!("Scenario failed: {}", e);
            }
        }
    };

    TokenStream::from(output)
}

fn compile_error(message: &str, span: Span) -> TokenStream {
    quote_spanned! {span=>
        compile_error!(#message);
    }
    .into()
}
