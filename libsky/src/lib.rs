/*
 * Created on Mon Jul 20 2020
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

//! Shared plumbing used by the engine crate and its test tooling.
//!
//! This is deliberately small: the bulk of the transaction engine lives in
//! `server`. What lives here is the handful of things that would otherwise
//! be copy-pasted into every error-taxonomy module in the engine.

pub mod util;

/// The current crate version, reported in `sysCapabilityChange` notifications.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Generates `From` impls that wrap a lower-tier error variant into a
/// higher-tier error enum's matching variant, without writing the same
/// three-line `impl From` block by hand at every tier boundary.
///
/// ```ignore
/// direct_from! {
///     TxnError => {
///         StoreError as Store
///     }
/// }
/// ```
/// expands to `impl From<StoreError> for TxnError { fn from(e: StoreError) -> Self { Self::Store(e) } }`.
#[macro_export]
macro_rules! direct_from {
    ($target:ty => {$($source:ty as $variant:ident),* $(,)?}) => {
        $(
            impl ::core::convert::From<$source> for $target {
                fn from(e: $source) -> Self {
                    Self::$variant(e)
                }
            }
        )*
    };
}
