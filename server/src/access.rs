/*
 * Created on Tue Jul 28 2026
 *
 * This file is a part of Skytable
 * Skytable (formerly known as TerrabaseDB or Skybase) is a free and open-source
 * NoSQL database written by Sayan Nandan ("the Author") with the
 * vision to provide flexibility in data modelling without compromising
 * on performance, queryability or scalability.
 *
 * Copyright (c) 2026, Sayan Nandan <ohsayan@outlook.com>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

//! Access-control policy evaluation is an external collaborator
//! (`spec.md` §1, §6): this module defines the seam the dispatcher and
//! filter engines call through, plus an allow-all reference implementation
//! for tests and for deployments that don't need per-node ACM.

use crate::value::simple::Node;

/// `rpc_allowed` (§4.4) plus the per-node read check the filter engines
/// consult before emission (§4.3: "Access control is consulted before
/// emission; denied subtrees are silently skipped").
pub trait AccessControl {
    fn rpc_allowed(&self, username: &str, operation: &str) -> bool;
    fn node_readable(&self, username: &str, node: &Node) -> bool;
}

/// The reference implementation: everyone can do everything. Real
/// deployments plug in a policy evaluator here; this crate only needs the
/// seam (`spec.md` §1 lists "access-control policy evaluation" as out of
/// scope).
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl AccessControl for AllowAll {
    fn rpc_allowed(&self, _username: &str, _operation: &str) -> bool {
        true
    }
    fn node_readable(&self, _username: &str, _node: &Node) -> bool {
        true
    }
}
