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

//! `SimpleTree`: the reference `ValueNode`/value-tree implementation.
//!
//! Nodes are `Rc<RefCell<Inner>>` with a `Weak` parent link, the usual shape
//! for an in-place-mutable tree in safe Rust (the same shape a DOM or a
//! scene graph uses). The engine only ever reaches the tree through the
//! handful of operations `spec.md` §3 lists: clone, compare, swap-child,
//! remove, add-in-order, enumerate.

use super::{DataClass, EditAction, EditOp, InsertOp, NodeKind, QName, ValueNode};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

struct Inner {
    kind: NodeKind,
    qname: QName,
    dataclass: DataClass,
    is_default: bool,
    value: Option<String>,
    /// local names of key leaves, meaningful only when `kind == List`
    keys: Vec<String>,
    children: Vec<Node>,
    parent: Option<Weak<RefCell<Inner>>>,
    edit_op: EditOp,
    insert_op: InsertOp,
    insert_ref: Option<String>,
}

/// A handle to one node in the tree. Cloning a `Node` clones the handle
/// (cheap, shares the underlying data), not the subtree — use
/// [`Node::clone_subtree`] for a deep, detached copy.
#[derive(Clone)]
pub struct Node(Rc<RefCell<Inner>>);

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.0.borrow();
        f.debug_struct("Node")
            .field("kind", &inner.kind)
            .field("qname", &inner.qname)
            .field("value", &inner.value)
            .field("children", &inner.children.len())
            .finish()
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for Node {}

impl Node {
    fn new(kind: NodeKind, qname: QName, dataclass: DataClass) -> Self {
        Node(Rc::new(RefCell::new(Inner {
            kind,
            qname,
            dataclass,
            is_default: false,
            value: None,
            keys: Vec::new(),
            children: Vec::new(),
            parent: None,
            edit_op: EditOp::None,
            insert_op: InsertOp::Unordered,
            insert_ref: None,
        })))
    }

    pub fn container(qname: QName, dataclass: DataClass) -> Self {
        Self::new(NodeKind::Container, qname, dataclass)
    }

    pub fn list_entry(qname: QName, dataclass: DataClass, keys: Vec<String>) -> Self {
        let n = Self::new(NodeKind::List, qname, dataclass);
        n.0.borrow_mut().keys = keys;
        n
    }

    pub fn leaf(qname: QName, dataclass: DataClass, value: impl Into<String>) -> Self {
        let n = Self::new(NodeKind::Leaf, qname, dataclass);
        n.0.borrow_mut().value = Some(value.into());
        n
    }

    pub fn leaf_list_entry(qname: QName, dataclass: DataClass, value: impl Into<String>) -> Self {
        let n = Self::new(NodeKind::LeafList, qname, dataclass);
        n.0.borrow_mut().value = Some(value.into());
        n
    }

    pub fn empty(qname: QName, dataclass: DataClass) -> Self {
        Self::new(NodeKind::Empty, qname, dataclass)
    }

    pub fn any_xml(qname: QName, dataclass: DataClass, raw: impl Into<String>) -> Self {
        let n = Self::new(NodeKind::AnyXml, qname, dataclass);
        n.0.borrow_mut().value = Some(raw.into());
        n
    }

    pub fn kind(&self) -> NodeKind {
        self.0.borrow().kind
    }
    pub fn qname(&self) -> QName {
        self.0.borrow().qname.clone()
    }
    pub fn name(&self) -> String {
        self.0.borrow().qname.local.clone()
    }
    pub fn dataclass(&self) -> DataClass {
        self.0.borrow().dataclass
    }
    pub fn set_dataclass(&self, d: DataClass) {
        self.0.borrow_mut().dataclass = d;
    }
    pub fn is_default(&self) -> bool {
        self.0.borrow().is_default
    }
    pub fn set_default(&self, v: bool) {
        self.0.borrow_mut().is_default = v;
    }
    pub fn value(&self) -> Option<String> {
        self.0.borrow().value.clone()
    }
    pub fn set_value(&self, v: Option<String>) {
        self.0.borrow_mut().value = v;
    }
    pub fn edit_op(&self) -> EditOp {
        self.0.borrow().edit_op
    }
    pub fn set_edit_op(&self, op: EditOp) {
        self.0.borrow_mut().edit_op = op;
    }
    pub fn insert_op(&self) -> InsertOp {
        self.0.borrow().insert_op
    }
    pub fn set_insert(&self, op: InsertOp, reference: Option<String>) {
        let mut inner = self.0.borrow_mut();
        inner.insert_op = op;
        inner.insert_ref = reference;
    }
    pub fn insert_ref(&self) -> Option<String> {
        self.0.borrow().insert_ref.clone()
    }
    pub fn keys(&self) -> Vec<String> {
        self.0.borrow().keys.clone()
    }

    pub fn is_key_leaf(&self) -> bool {
        match self.parent() {
            Some(p) if p.kind() == NodeKind::List => p.keys().iter().any(|k| *k == self.name()),
            _ => false,
        }
    }

    pub fn parent(&self) -> Option<Node> {
        self.0.borrow().parent.as_ref().and_then(|w| w.upgrade()).map(Node)
    }

    pub fn children(&self) -> Vec<Node> {
        self.0.borrow().children.clone()
    }

    pub fn find_child(&self, qname: &QName) -> Option<Node> {
        self.children().into_iter().find(|c| &c.qname() == qname)
    }

    /// For list/leaf-list entries sharing a qname: find the sibling whose key
    /// leaves (or leaf-list value) match `key_values`.
    pub fn find_list_entry(&self, qname: &QName, key_values: &[(String, String)]) -> Option<Node> {
        self.children().into_iter().find(|c| {
            &c.qname() == qname
                && c.kind() == NodeKind::List
                && key_values.iter().all(|(k, v)| {
                    c.find_child(&QName::unqualified(k.clone()))
                        .and_then(|leaf| leaf.value())
                        .as_deref()
                        == Some(v.as_str())
                })
        })
    }

    pub fn find_leaf_list_entry(&self, qname: &QName, value: &str) -> Option<Node> {
        self.children()
            .into_iter()
            .find(|c| &c.qname() == qname && c.kind() == NodeKind::LeafList && c.value().as_deref() == Some(value))
    }

    fn set_parent(&self, parent: Option<&Node>) {
        self.0.borrow_mut().parent = parent.map(|p| Rc::downgrade(&p.0));
    }

    /// Index of `target` among this node's children, if it is one.
    pub fn child_index(&self, target: &Node) -> Option<usize> {
        self.0.borrow().children.iter().position(|c| c == target)
    }

    /// Re-inserts `child` at `idx` (clamped to the current length). Used by
    /// rollback to put a deleted node back exactly where it was.
    pub fn insert_at(&self, idx: usize, child: Node) {
        child.set_parent(Some(self));
        let mut inner = self.0.borrow_mut();
        let idx = idx.min(inner.children.len());
        inner.children.insert(idx, child);
    }

    /// Appends `child` to the end of this node's children, in "canonical
    /// order" (`spec.md` §4.2): without a schema to consult, canonical order
    /// degrades to append-at-tail, which is sufficient since every sibling
    /// set this engine manufactures is either freshly built (so insertion
    /// order already reflects intent) or list/leaf-list reordered
    /// exclusively through `insert_ordered`.
    pub fn add_child_canonical(&self, child: Node) {
        child.set_parent(Some(self));
        self.0.borrow_mut().children.push(child);
    }

    /// Places `child` according to its resolved `insert_op`/`insert_ref`
    /// among the existing siblings sharing its qname (`spec.md` §4.2: "the
    /// insert-op... and key/value attribute drive placement").
    pub fn insert_ordered(&self, child: Node, op: InsertOp, reference: Option<&Node>) {
        child.set_parent(Some(self));
        let mut inner = self.0.borrow_mut();
        match op {
            InsertOp::First => {
                let pos = inner.children.iter().position(|c| c.qname() == child.qname()).unwrap_or(0);
                inner.children.insert(pos, child);
            }
            InsertOp::Last | InsertOp::Unordered => {
                inner.children.push(child);
            }
            InsertOp::Before => {
                let pos = reference
                    .and_then(|r| inner.children.iter().position(|c| c == r))
                    .unwrap_or(inner.children.len());
                inner.children.insert(pos, child);
            }
            InsertOp::After => {
                let pos = reference
                    .and_then(|r| inner.children.iter().position(|c| c == r))
                    .map(|i| i + 1)
                    .unwrap_or(inner.children.len());
                inner.children.insert(pos, child);
            }
        }
    }

    /// Removes and returns the child equal (by handle) to `target`, if present.
    pub fn remove_child(&self, target: &Node) -> Option<Node> {
        let mut inner = self.0.borrow_mut();
        let pos = inner.children.iter().position(|c| c == target)?;
        let removed = inner.children.remove(pos);
        removed.set_parent(None);
        Some(removed)
    }

    /// Replaces `old` (which must be a current child of `self`) with `new`,
    /// keeping `new` at `old`'s index. This is the "swap one child for
    /// another in place" primitive `spec.md` §3 requires: it's what lets an
    /// undo record put the previous subtree straight back where the edited
    /// one was, rather than reconstructing sibling order from scratch.
    pub fn swap_child(&self, old: &Node, new: Node) -> Option<Node> {
        let mut inner = self.0.borrow_mut();
        let pos = inner.children.iter().position(|c| c == old)?;
        old.set_parent(None);
        new.set_parent(Some(self));
        let removed = std::mem::replace(&mut inner.children[pos], new);
        Some(removed)
    }

    /// Deep, detached (no parent) copy of this subtree.
    pub fn clone_subtree(&self) -> Node {
        let inner = self.0.borrow();
        let copy = Node::new(inner.kind, inner.qname.clone(), inner.dataclass);
        {
            let mut c = copy.0.borrow_mut();
            c.is_default = inner.is_default;
            c.value = inner.value.clone();
            c.keys = inner.keys.clone();
            c.edit_op = inner.edit_op;
            c.insert_op = inner.insert_op;
            c.insert_ref = inner.insert_ref.clone();
        }
        for child in &inner.children {
            copy.add_child_canonical(child.clone_subtree());
        }
        copy
    }

    /// Structural equality: kind, qname, leaf value, default-flag and
    /// children (recursively, in order). Transient edit-variables
    /// (`edit_op`/`insert_op`) are deliberately excluded — they describe an
    /// in-flight edit, not the datastore's content, and a post-rollback
    /// comparison must not be defeated by them (`spec.md` §8 property 2).
    pub fn struct_eq(&self, other: &Node) -> bool {
        let a = self.0.borrow();
        let b = other.0.borrow();
        if a.kind != b.kind || a.qname != b.qname || a.value != b.value || a.is_default != b.is_default {
            return false;
        }
        if a.children.len() != b.children.len() {
            return false;
        }
        a.children.iter().zip(b.children.iter()).all(|(x, y)| x.struct_eq(y))
    }

    /// Instance-identifier-style path from the root, e.g. `/top/l[k='1']/v`.
    pub fn path(&self) -> String {
        let mut segments = Vec::new();
        let mut cur = self.clone();
        loop {
            let parent = cur.parent();
            let seg = if cur.kind() == NodeKind::List {
                let preds: Vec<String> = cur
                    .keys()
                    .iter()
                    .filter_map(|k| {
                        cur.find_child(&QName::unqualified(k.clone()))
                            .and_then(|l| l.value())
                            .map(|v| format!("[{}='{}']", k, v))
                    })
                    .collect();
                format!("{}{}", cur.name(), preds.concat())
            } else {
                cur.name()
            };
            segments.push(seg);
            match parent {
                Some(p) => cur = p,
                None => break,
            }
        }
        segments.reverse();
        format!("/{}", segments.join("/"))
    }

    /// Serializes this subtree as XML. `save_filter` drops state-dataclass
    /// nodes and default-valued leaves, matching the startup/backup save
    /// filter (`spec.md` §4.7, §6).
    pub fn serialize(&self, out: &mut String, save_filter: bool) {
        let inner = self.0.borrow();
        if save_filter && inner.dataclass == DataClass::State {
            return;
        }
        if save_filter && inner.is_default {
            return;
        }
        let tag = &inner.qname.local;
        match inner.kind {
            NodeKind::Leaf | NodeKind::LeafList => {
                let v = inner.value.as_deref().unwrap_or("");
                out.push_str(&format!("<{tag}>{}</{tag}>", xml_escape(v)));
            }
            NodeKind::Empty => {
                out.push_str(&format!("<{tag}/>"));
            }
            NodeKind::AnyXml => {
                out.push_str(&format!("<{tag}>{}</{tag}>", inner.value.as_deref().unwrap_or("")));
            }
            NodeKind::Container | NodeKind::List => {
                out.push_str(&format!("<{tag}>"));
                for child in &inner.children {
                    child.serialize(out, save_filter);
                }
                out.push_str(&format!("</{tag}>"));
            }
        }
    }

    pub fn to_xml_string(&self, save_filter: bool) -> String {
        let mut s = String::new();
        self.serialize(&mut s, save_filter);
        s
    }
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

impl ValueNode for Node {
    fn kind(&self) -> NodeKind {
        Node::kind(self)
    }
    fn qname(&self) -> QName {
        Node::qname(self)
    }
    fn dataclass(&self) -> DataClass {
        Node::dataclass(self)
    }
    fn is_default(&self) -> bool {
        Node::is_default(self)
    }
    fn set_default(&mut self, is_default: bool) {
        Node::set_default(self, is_default)
    }
    fn leaf_value(&self) -> Option<String> {
        Node::value(self)
    }
    fn set_leaf_value(&mut self, value: Option<String>) {
        Node::set_value(self, value)
    }
    fn edit_op(&self) -> EditOp {
        Node::edit_op(self)
    }
    fn set_edit_op(&mut self, op: EditOp) {
        Node::set_edit_op(self, op)
    }
    fn insert_op(&self) -> InsertOp {
        Node::insert_op(self)
    }
    fn insert_ref(&self) -> Option<String> {
        Node::insert_ref(self)
    }
    fn is_key_leaf(&self) -> bool {
        Node::is_key_leaf(self)
    }
}

/// Resolves the effective `EditAction` from `(edit-op, curnode-presence,
/// node-kind, insert-op)` per `spec.md` §4.2. Pure function so the txn
/// layer and tests can exercise the resolution table directly.
pub fn resolve_action(
    edit_op: EditOp,
    curnode: Option<&Node>,
    kind: NodeKind,
    is_base_1_1: bool,
) -> Result<EditAction, &'static str> {
    match (edit_op, curnode, kind) {
        (EditOp::Merge, None, _) => Ok(EditAction::Add),
        (EditOp::Merge, Some(_), NodeKind::Leaf) => Ok(EditAction::Set),
        (EditOp::Merge, Some(_), _) => Ok(EditAction::None),
        (EditOp::Replace, None, _) => Ok(EditAction::Add),
        (EditOp::Replace, Some(_), _) => Ok(EditAction::Replace),
        (EditOp::Create, None, _) => Ok(EditAction::Add),
        (EditOp::Create, Some(cur), _) if cur.is_default() => Ok(EditAction::Replace),
        (EditOp::Create, Some(_), _) => Err("data-exists"),
        (EditOp::Delete, None, _) => Err("data-missing"),
        (EditOp::Delete, Some(_), _) => Ok(EditAction::Delete),
        (EditOp::Remove, _, _) if !is_base_1_1 => Err("unknown-element"),
        (EditOp::Remove, None, _) => Ok(EditAction::None),
        (EditOp::Remove, Some(_), _) => Ok(EditAction::Delete),
        (EditOp::Load, _, _) => Ok(EditAction::Add),
        (EditOp::Commit, _, _) => Ok(EditAction::None),
        (EditOp::None, _, _) => Ok(EditAction::None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str, val: &str) -> Node {
        Node::leaf(QName::unqualified(name), DataClass::Config, val)
    }

    #[test]
    fn swap_child_preserves_position() {
        let root = Node::container(QName::unqualified("top"), DataClass::Config);
        root.add_child_canonical(leaf("a", "1"));
        root.add_child_canonical(leaf("b", "2"));
        root.add_child_canonical(leaf("c", "3"));
        let old_b = root.find_child(&QName::unqualified("b")).unwrap();
        let new_b = leaf("b", "20");
        let removed = root.swap_child(&old_b, new_b.clone()).unwrap();
        assert_eq!(removed.value().unwrap(), "2");
        let names: Vec<_> = root.children().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(root.children()[1].value().unwrap(), "20");
        assert!(new_b.parent().is_some());
    }

    #[test]
    fn struct_eq_ignores_edit_vars() {
        let a = leaf("a", "1");
        let b = leaf("a", "1");
        b.set_edit_op(EditOp::Merge);
        assert!(a.struct_eq(&b));
        b.set_value(Some("2".into()));
        assert!(!a.struct_eq(&b));
    }

    #[test]
    fn path_forces_keys() {
        let root = Node::container(QName::unqualified("top"), DataClass::Config);
        let entry = Node::list_entry(QName::unqualified("l"), DataClass::Config, vec!["k".into()]);
        entry.add_child_canonical(leaf("k", "7"));
        entry.add_child_canonical(leaf("v", "x"));
        root.add_child_canonical(entry.clone());
        let v = entry.find_child(&QName::unqualified("v")).unwrap();
        assert_eq!(v.path(), "/top/l[k='7']/v");
    }

    #[test]
    fn resolve_action_create_exists() {
        let cur = leaf("a", "1");
        let r = resolve_action(EditOp::Create, Some(&cur), NodeKind::Leaf, true);
        assert_eq!(r, Err("data-exists"));
    }

    #[test]
    fn resolve_action_remove_requires_base_1_1() {
        let r = resolve_action(EditOp::Remove, None, NodeKind::Leaf, false);
        assert_eq!(r, Err("unknown-element"));
    }
}
