use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{DeriveInput, Result as SynResult, Token, Type};

pub(crate) fn expand(input: DeriveInput) -> SynResult<TokenStream2> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new(
            input.generics.span(),
            "#[derive(EventPayload)] does not support generic types",
        ));
    }

    // #[payload(extends(A, B))]，可出现多次
    let mut supertypes: Vec<Type> = Vec::new();
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("payload")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("extends") {
                let content;
                syn::parenthesized!(content in meta.input);
                supertypes.extend(Punctuated::<Type, Token![,]>::parse_terminated(&content)?);
                Ok(())
            } else {
                Err(meta.error("unknown key; expected 'extends'"))
            }
        })?;
    }

    let ident = &input.ident;
    let supertypes_fn = if supertypes.is_empty() {
        quote! { ::std::vec::Vec::new }
    } else {
        quote! {
            || ::std::vec![
                #( <#supertypes as ::ddd_eventsourcing::payload::PayloadKind>::kind() ),*
            ]
        }
    };

    Ok(quote! {
        impl ::ddd_eventsourcing::payload::PayloadKind for #ident {
            fn kind() -> ::ddd_eventsourcing::payload::PayloadType {
                ::ddd_eventsourcing::payload::PayloadType::new::<Self>(#supertypes_fn)
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand_str(input: &str) -> SynResult<syn::ItemImpl> {
        let input: DeriveInput = syn::parse_str(input)?;
        syn::parse2(expand(input)?)
    }

    fn expand_error(input: &str) -> String {
        match expand_str(input) {
            Ok(_) => panic!("expected `{input}` to be rejected"),
            Err(err) => err.to_string(),
        }
    }

    #[test]
    fn implements_payload_kind() {
        let item = expand_str("#[payload(extends(A, B))] struct Placed;").unwrap();
        let (_, path, _) = item.trait_.as_ref().unwrap();
        assert_eq!(path.segments.last().unwrap().ident, "PayloadKind");
        assert_eq!(item.items.len(), 1);
    }

    #[test]
    fn rejects_generics_and_unknown_keys() {
        assert_eq!(
            expand_error("struct Wrapped<T>(T);"),
            "#[derive(EventPayload)] does not support generic types"
        );
        assert_eq!(
            expand_error("#[payload(implements(A))] struct Placed;"),
            "unknown key; expected 'extends'"
        );
    }
}
