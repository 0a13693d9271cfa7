extern crate proc_macro;

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, DeriveInput};

/// Implements `CallParam` for a serde-enabled struct: JSON and MessagePack
/// encodings, selected per call by the proxy's serialize type. The consuming
/// crate must depend on `courier_protocol`, `serde_json` and `rmp-serde`.
#[proc_macro_derive(CallParam)]
pub fn call_param(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let name = input.ident;

    let expanded = quote! {
        impl ::courier_protocol::CallParam for #name {
            fn into_bytes(
                &self,
                st: ::courier_protocol::SerializeType,
            ) -> ::courier_protocol::CallResult<Vec<u8>> {
                match st {
                    ::courier_protocol::SerializeType::Json => ::serde_json::to_vec(self)
                        .map_err(|err| ::courier_protocol::CallError::Codec(err.to_string())),
                    ::courier_protocol::SerializeType::MsgPack => ::rmp_serde::to_vec(self)
                        .map_err(|err| ::courier_protocol::CallError::Codec(err.to_string())),
                }
            }
            fn from_slice(
                &mut self,
                st: ::courier_protocol::SerializeType,
                data: &[u8],
            ) -> ::courier_protocol::CallResult<()> {
                match st {
                    ::courier_protocol::SerializeType::Json => {
                        let param: Self = ::serde_json::from_slice(data)
                            .map_err(|err| ::courier_protocol::CallError::Codec(err.to_string()))?;
                        *self = param;
                        Ok(())
                    }
                    ::courier_protocol::SerializeType::MsgPack => {
                        let param: Self = ::rmp_serde::from_slice(data)
                            .map_err(|err| ::courier_protocol::CallError::Codec(err.to_string()))?;
                        *self = param;
                        Ok(())
                    }
                }
            }
        }
    };

    TokenStream::from(expanded)
}
