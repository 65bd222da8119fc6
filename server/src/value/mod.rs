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

//! The value tree: `spec.md` §3 describes this as an external collaborator
//! reached only through a narrow interface (clone, compare, swap-child,
//! enumerate). This module is that interface plus one concrete
//! implementation (`simple::SimpleTree`) good enough to drive every
//! scenario in §8.

pub mod simple;

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Container,
    List,
    Leaf,
    LeafList,
    Empty,
    AnyXml,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataClass {
    Config,
    State,
}

/// The effective edit operation on a node, carried in its edit-variables
/// block while a `<config>` payload is being walked (`spec.md` §3, §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOp {
    None,
    Merge,
    Replace,
    Create,
    Delete,
    Remove,
    Load,
    Commit,
}

/// The action resolved from `(edit-op, curnode-presence, node-kind, insert-op)`
/// (`spec.md` §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditAction {
    None,
    Add,
    Set,
    Move,
    Replace,
    Delete,
    DeleteDefault,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOp {
    Unordered,
    First,
    Last,
    Before,
    After,
}

impl Default for InsertOp {
    fn default() -> Self {
        InsertOp::Unordered
    }
}

/// A qualified name: local name plus an optional namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub local: String,
    pub ns: Option<String>,
}

impl QName {
    pub fn new(local: impl Into<String>, ns: Option<impl Into<String>>) -> Self {
        QName {
            local: local.into(),
            ns: ns.map(Into::into),
        }
    }

    pub fn unqualified(local: impl Into<String>) -> Self {
        QName { local: local.into(), ns: None }
    }

    /// A namespace-wildcard match (`xmlns=""`, `spec.md` §4.3): any namespace
    /// is accepted, so the comparison only looks at the local name.
    pub fn matches_wildcard_ns(&self, other: &QName) -> bool {
        self.local == other.local
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.local)
    }
}

/// The narrow interface the engine relies on (`spec.md` §3 / §6). Implemented
/// here by [`simple::Node`]; other implementations are expected to behave
/// identically with respect to these operations' postconditions.
pub trait ValueNode: fmt::Debug {
    fn kind(&self) -> NodeKind;
    fn qname(&self) -> QName;
    fn dataclass(&self) -> DataClass;
    fn is_default(&self) -> bool;
    fn set_default(&mut self, is_default: bool);
    fn leaf_value(&self) -> Option<String>;
    fn set_leaf_value(&mut self, value: Option<String>);
    fn edit_op(&self) -> EditOp;
    fn set_edit_op(&mut self, op: EditOp);
    fn insert_op(&self) -> InsertOp;
    fn insert_ref(&self) -> Option<String>;
    fn is_key_leaf(&self) -> bool;
}

/// Instance-identifier rendering for a node, used to populate `error-path`
/// when the error originates from a value node rather than wire position
/// (`spec.md` §4.1).
pub fn instance_identifier(node: &simple::Node) -> String {
    node.path()
}
