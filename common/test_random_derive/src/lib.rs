extern crate proc_macro;

use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields};

/// Derives `TestRandom` for a struct by calling `TestRandom::random_for_test` on every field.
#[proc_macro_derive(TestRandom)]
pub fn test_random_derive(input: TokenStream) -> TokenStream {
    let item: DeriveInput = syn::parse(input).unwrap();
    let name = &item.ident;
    let (impl_generics, ty_generics, where_clause) = item.generics.split_for_impl();

    let fields = match &item.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => panic!("TestRandom can only be derived for structs with named fields"),
        },
        _ => panic!("TestRandom can only be derived for structs"),
    };

    let field_names: Vec<_> = fields.iter().map(|f| f.ident.clone().unwrap()).collect();

    let output = quote! {
        impl #impl_generics crate::test_utils::TestRandom for #name #ty_generics #where_clause {
            fn random_for_test(rng: &mut impl rand::RngCore) -> Self {
                Self {
                    #(
                        #field_names: crate::test_utils::TestRandom::random_for_test(rng),
                    )*
                }
            }
        }
    };

    output.into()
}
