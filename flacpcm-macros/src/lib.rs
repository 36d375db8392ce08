use darling::Error;
use darling::ast::NestedMeta;
use quote::quote;
use syn::{Data, DeriveInput, Fields, ItemStruct, parse_macro_input};

use proc_macro::TokenStream;

/// Serialises every field little-endian, in declaration order.
#[proc_macro_derive(ToBytes)]
pub fn derive_to_bytes(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = input.ident;

    let fields: Vec<syn::Member> = match input.data {
        Data::Struct(ref s) => match s.fields {
            Fields::Named(ref nf) => nf
                .named
                .iter()
                .filter_map(|f| f.ident.clone())
                .map(syn::Member::from)
                .collect(),
            Fields::Unnamed(ref uf) => uf
                .unnamed
                .iter()
                .enumerate()
                .map(|(i, _)| syn::Index::from(i).into())
                .collect(),
            Fields::Unit => Vec::new(),
        },
        _ => {
            return TokenStream::from(
                syn::Error::new_spanned(&name, "ToBytes can only be derived for structs")
                    .to_compile_error(),
            );
        }
    };

    let expanded = quote! {
        impl crate::byteorder::WriteBytesLe for #name {
            fn write_le(&self, dst: &mut Vec<u8>) {
                #( crate::byteorder::WriteBytesLe::write_le(&self.#fields, dst); )*
            }
        }
    };

    TokenStream::from(expanded)
}

/// Attaches a four-character RIFF chunk identifier, e.g. `#[riff_chunk(b"fmt ")]`.
#[proc_macro_attribute]
pub fn riff_chunk(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = match NestedMeta::parse_meta_list(attr.into()) {
        Ok(v) => v,
        Err(e) => {
            return TokenStream::from(Error::from(e).write_errors());
        }
    };

    let Some(first) = args.first() else {
        return TokenStream::from(Error::custom("riff_chunk expects a byte string").write_errors());
    };

    let id_bytes = match first {
        NestedMeta::Lit(syn::Lit::ByteStr(bs)) => bs.value(),
        other => {
            return TokenStream::from(
                syn::Error::new_spanned(other, "riff_chunk expects a byte string, e.g. b\"fmt \"")
                    .to_compile_error(),
            );
        }
    };

    if id_bytes.len() != 4 {
        return TokenStream::from(
            syn::Error::new_spanned(first, "riff_chunk expects 4 bytes").to_compile_error(),
        );
    }
    let id_tokens = {
        let b = id_bytes;
        quote! {[#(#b),*]}
    };

    let input = parse_macro_input!(item as ItemStruct);
    let name = &input.ident;

    let expanded = quote! {
        #input

        impl crate::container::RiffChunk for #name {
            fn chunk_id(&self) -> &[u8; 4] {
                const ID: [u8; 4] = #id_tokens;
                &ID
            }

            fn chunk_data(&self) -> Vec<u8> {
                let mut vec = Vec::new();
                crate::byteorder::WriteBytesLe::write_le(self, &mut vec);
                vec
            }
        }
    };
    TokenStream::from(expanded)
}
