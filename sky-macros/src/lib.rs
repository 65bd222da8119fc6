/*
 * Created on Sun Sep 13 2020
 *
 * This file is a part of Skytable
 * Skytable (formerly known as TerrabaseDB or Skybase) is a free and open-source
 * NoSQL database written by Sayan Nandan ("the Author") with the
 * vision to provide flexibility in data modelling without compromising
 * on performance, queryability or scalability.
 *
 * Copyright (c) 2020, Sayan Nandan <ohsayan@outlook.com>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

#![deny(unused_crate_dependencies)]
#![deny(unused_imports)]

//! Custom test-harness derives for the engine crate.
//!
//! ## Ghost values
//! `#[engine_test]` gives the annotated function a `engine` ghost value: a
//! freshly constructed, fully in-memory `Engine` (empty running/candidate/
//! startup, an allow-all access-control, a temp-file-backed transaction-id
//! allocator). Don't shadow it.

use proc_macro::TokenStream;
use quote::quote;
use syn::{self};

/// Rewrites a synchronous, argument-free test function into a `#[test]` that
/// is handed a fresh `engine` value constructed by
/// `crate::tests::harness::new_test_engine()`.
///
/// Unlike the async `#[dbtest]` style this crate's lineage uses for its
/// client/server integration tests, the NETCONF engine is synchronous
/// end-to-end (see `spec.md` §5), so this macro does not bootstrap a Tokio
/// runtime — it only injects the harness construction boilerplate.
#[proc_macro_attribute]
pub fn engine_test(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(item as syn::ItemFn);
    let sig = &input.sig;
    let vis = &input.vis;
    let attrs = &input.attrs;
    let body = &input.block;
    let fname = &sig.ident;

    if sig.asyncness.is_some() {
        let msg = "`engine_test` functions must not be async";
        return syn::Error::new_spanned(&sig.fn_token, msg)
            .to_compile_error()
            .into();
    }
    if !sig.inputs.is_empty() {
        let msg = "`engine_test` functions cannot accept arguments (use the `engine` ghost value)";
        return syn::Error::new_spanned(&sig.inputs, msg)
            .to_compile_error()
            .into();
    }

    let result = quote! {
        #[test]
        #(#attrs)*
        #vis fn #fname() {
            let mut engine = crate::tests::harness::new_test_engine();
            #body
        }
    };
    result.into()
}
