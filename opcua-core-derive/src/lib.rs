//! `#[derive(UaEncodable)]`: generates `BinaryEncodable`/`BinaryDecodable`
//! impls for a struct by walking its fields in declaration order, the same
//! order every hand-written codec type in `opcua-core` encodes in.
//!
//! Per field:
//! - a plain field calls `Type::encode`/`Type::decode` directly (this
//!   covers `#[ua(array)]` fields too — `Vec<T>` already has a blanket
//!   `BinaryEncodable`/`BinaryDecodable` impl, so the attribute is purely
//!   documentation of intent);
//! - `#[ua(optional)]` wraps the field (expected to be `Option<T>`) with a
//!   one-byte presence flag ahead of the value.

extern crate proc_macro;

use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields};

#[proc_macro_derive(UaEncodable, attributes(ua))]
pub fn derive_ua_encodable(input: TokenStream) -> TokenStream {
    let input: DeriveInput = syn::parse(input).expect("UaEncodable only supports structs with named fields");
    let name = &input.ident;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => panic!("UaEncodable requires named fields"),
        },
        _ => panic!("UaEncodable can only be derived on structs"),
    };

    let mut encode_stmts = Vec::new();
    let mut byte_len_terms = Vec::new();
    let mut decode_stmts = Vec::new();
    let mut field_idents = Vec::new();

    for field in fields {
        let ident = field.ident.as_ref().expect("named field");
        let optional = field.attrs.iter().any(is_optional_attr);

        field_idents.push(ident.clone());

        if optional {
            encode_stmts.push(quote! {
                match &self.#ident {
                    Some(value) => {
                        true.encode(enc)?;
                        value.encode(enc)?;
                    }
                    None => {
                        false.encode(enc)?;
                    }
                }
            });
            byte_len_terms.push(quote! {
                1 + self.#ident.as_ref().map_or(0, opcua_core::codec::BinaryEncodable::byte_len)
            });
            decode_stmts.push(quote! {
                let #ident = if bool::decode(dec)? {
                    Some(opcua_core::codec::BinaryDecodable::decode(dec)?)
                } else {
                    None
                };
            });
        } else {
            encode_stmts.push(quote! {
                self.#ident.encode(enc)?;
            });
            byte_len_terms.push(quote! {
                self.#ident.byte_len()
            });
            decode_stmts.push(quote! {
                let #ident = opcua_core::codec::BinaryDecodable::decode(dec)?;
            });
        }
    }

    let expanded = quote! {
        impl opcua_core::codec::BinaryEncodable for #name {
            fn encode(&self, enc: &mut opcua_core::codec::Encoder) -> opcua_core::codec::EncodeResult<()> {
                use opcua_core::codec::BinaryEncodable;
                #(#encode_stmts)*
                Ok(())
            }

            fn byte_len(&self) -> usize {
                use opcua_core::codec::BinaryEncodable;
                0 #(+ (#byte_len_terms))*
            }
        }

        impl opcua_core::codec::BinaryDecodable for #name {
            fn decode(dec: &mut opcua_core::codec::Decoder) -> opcua_core::codec::DecodeResult<Self> {
                use opcua_core::codec::{BinaryDecodable, BinaryEncodable};
                #(#decode_stmts)*
                Ok(#name { #(#field_idents),* })
            }
        }
    };

    expanded.into()
}

fn is_optional_attr(attr: &syn::Attribute) -> bool {
    matches!(attr.interpret_meta(), Some(syn::Meta::List(list)) if list.ident == "ua"
        && list.nested.iter().any(|nested| matches!(nested, syn::NestedMeta::Meta(syn::Meta::Word(word)) if word == "optional")))
}
