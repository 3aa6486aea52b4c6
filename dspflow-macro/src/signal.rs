use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, DeriveInput};

pub fn derive(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();
    let name = &ast.ident;

    let (into_value, from_value) = match &ast.data {
        syn::Data::Struct(syn::DataStruct { fields, .. }) => derive_struct(fields),
        syn::Data::Enum(_) => panic!("{name}: Signal macro is only implemented for structs"),
        syn::Data::Union(_) => panic!("{name}: Signal macro is not implemented for union type"),
    };

    let expanded = quote! {
        impl #impl_generics ::dspflow::Signal for #name #ty_generics #where_clause {
            fn into_value(self) -> ::dspflow::Value {
                #into_value
            }

            fn from_value(value: ::dspflow::Value) -> ::std::result::Result<Self, ::dspflow::ValueError> {
                #from_value
            }
        }
    };

    expanded.into()
}

fn derive_struct(fields: &syn::Fields) -> (TokenStream2, TokenStream2) {
    let len = fields.len();
    let bindings = (0..len).map(|i| format_ident!("__field_{}", i)).collect::<Vec<_>>();

    // Member accessors: `self.name` for named fields, `self.0` for tuple fields.
    let members = fields
        .iter()
        .enumerate()
        .map(|(i, f)| match &f.ident {
            Some(ident) => quote! { #ident },
            None => {
                let index = syn::Index::from(i);
                quote! { #index }
            }
        })
        .collect::<Vec<_>>();

    let into_value = quote! {
        ::dspflow::Value::Tuple(::std::vec![#(::dspflow::Signal::into_value(self.#members)),*])
    };

    let construct = match fields {
        syn::Fields::Named(_) => quote! {
            Self { #(#members: ::dspflow::Signal::from_value(#bindings)?),* }
        },
        syn::Fields::Unnamed(_) => quote! {
            Self(#(::dspflow::Signal::from_value(#bindings)?),*)
        },
        syn::Fields::Unit => quote! { Self },
    };

    let from_value = quote! {
        let [#(#bindings),*] = value.into_fields::<#len>()?;
        ::std::result::Result::Ok(#construct)
    };

    (into_value, from_value)
}
