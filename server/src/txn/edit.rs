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

//! Edit-action resolution, apply and rollback (`spec.md` §4.2).

use super::{AuditRecord, Tx};
use crate::error::{TxnError, TxnResult};
use crate::value::simple::{resolve_action, Node};
use crate::value::{DataClass, EditAction, EditOp, InsertOp, NodeKind, QName};

/// One undo record per effective edit point. A tagged variant per action
/// (`spec.md` §9 Design Note) instead of the lineage's pointer-soup: each
/// variant stores exactly what its inverse needs.
#[derive(Debug, Clone)]
pub enum Undo {
    Add {
        parent: Node,
        added: Node,
    },
    Set {
        node: Node,
        old_value: Option<String>,
        old_default: bool,
    },
    Replace {
        parent: Node,
        old: Node,
        new: Node,
    },
    Delete {
        parent: Node,
        removed: Node,
        old_index: usize,
    },
    Move {
        parent: Node,
        node: Node,
        old_index: usize,
    },
}

impl Undo {
    /// Inverts this record against the live tree. Rollback is itself
    /// allowed to fail (`spec.md` §4.2); this reference engine's inverses
    /// are all structurally total given the tree invariants it maintains,
    /// so failure here only happens if the caller mutated the tree out from
    /// under the undo log — treated as an internal assertion failure.
    fn invert(&self) -> bool {
        match self {
            Undo::Add { parent, added } => parent.remove_child(added).is_some(),
            Undo::Set { node, old_value, old_default } => {
                node.set_value(old_value.clone());
                node.set_default(*old_default);
                true
            }
            Undo::Replace { parent, old, new } => parent.swap_child(new, old.clone()).is_some(),
            Undo::Delete { parent, removed, old_index } => {
                parent.insert_at(*old_index, removed.clone());
                true
            }
            Undo::Move { parent, node, old_index } => {
                if let Some(cur_idx) = parent.child_index(node) {
                    if let Some(n) = parent.remove_child(node) {
                        parent.insert_at(*old_index, n);
                        return true;
                    }
                    let _ = cur_idx;
                }
                false
            }
        }
    }
}

/// Finds the existing instance in `parent` that `newnode` edits, by qname
/// (and, for list/leaf-list entries, by key/value match).
fn find_curnode(parent: &Node, newnode: &Node) -> Option<Node> {
    let qn = newnode.qname();
    match newnode.kind() {
        NodeKind::List => {
            let key_values: Vec<(String, String)> = newnode
                .keys()
                .iter()
                .map(|k| {
                    let v = newnode
                        .find_child(&QName::unqualified(k.clone()))
                        .and_then(|l| l.value())
                        .unwrap_or_default();
                    (k.clone(), v)
                })
                .collect();
            parent.find_list_entry(&qn, &key_values)
        }
        NodeKind::LeafList => parent.find_leaf_list_entry(&qn, newnode.value().as_deref().unwrap_or("")),
        _ => parent.find_child(&qn),
    }
}

fn resolve_insert_reference(parent: &Node, qname: &QName, reference: Option<&str>, is_leaf_list: bool) -> Option<Node> {
    let reference = reference?;
    if is_leaf_list {
        parent.find_leaf_list_entry(qname, reference)
    } else {
        // `reference` is the key value for single-key lists (the common
        // case this reference engine targets; compound keys would need the
        // `key='a b'` wire syntax the dispatcher doesn't emit here).
        parent.children().into_iter().find(|c| {
            c.kind() == NodeKind::List
                && &c.qname() == qname
                && c.keys().len() == 1
                && c.find_child(&QName::unqualified(c.keys()[0].clone())).and_then(|l| l.value()).as_deref()
                    == Some(reference)
        })
    }
}

/// Applies one `<config>` node (and its descendants) against `parent`,
/// pushing undo/audit records onto `tx`. Recurses depth-first, matching the
/// lineage's per-statement validate+exec split generalized to a tree walk.
pub fn apply_recursive(tx: &mut Tx, parent: &Node, newnode: &Node, default_op: EditOp, is_base_1_1: bool) -> TxnResult<()> {
    let effective_op = if newnode.edit_op() == EditOp::None { default_op } else { newnode.edit_op() };
    let curnode = find_curnode(parent, newnode);

    // reorder-only edit: same instance already present, an insert-op is
    // requested, and no content changed underneath it.
    if let Some(cur) = &curnode {
        if newnode.insert_op() != InsertOp::Unordered
            && matches!(newnode.kind(), NodeKind::List | NodeKind::LeafList)
            && effective_op != EditOp::Delete
            && effective_op != EditOp::Remove
        {
            if let Some(old_index) = parent.child_index(cur) {
                parent.remove_child(cur);
                let is_leaf_list = newnode.kind() == NodeKind::LeafList;
                let reference = resolve_insert_reference(parent, &newnode.qname(), newnode.insert_ref().as_deref(), is_leaf_list);
                parent.insert_ordered(cur.clone(), newnode.insert_op(), reference.as_ref());
                tx.undo.push(Undo::Move {
                    parent: parent.clone(),
                    node: cur.clone(),
                    old_index,
                });
                tx.audit.push(AuditRecord { path: cur.path(), op: "move" });
            }
        }
    }

    let action = resolve_action(effective_op, curnode.as_ref(), newnode.kind(), is_base_1_1)
        .map_err(|tag| map_tag(tag))?;

    match action {
        EditAction::Add => {
            let detached = newnode.clone_subtree();
            detached.set_edit_op(EditOp::None);
            if newnode.insert_op() != InsertOp::Unordered && matches!(newnode.kind(), NodeKind::List | NodeKind::LeafList) {
                let is_leaf_list = newnode.kind() == NodeKind::LeafList;
                let reference = resolve_insert_reference(parent, &newnode.qname(), newnode.insert_ref().as_deref(), is_leaf_list);
                parent.insert_ordered(detached.clone(), newnode.insert_op(), reference.as_ref());
            } else {
                parent.add_child_canonical(detached.clone());
            }
            tx.audit.push(AuditRecord { path: detached.path(), op: "add" });
            tx.undo.push(Undo::Add { parent: parent.clone(), added: detached });
        }
        EditAction::Set => {
            let cur = curnode.expect("resolve_action(Set) implies curnode present");
            let old_value = cur.value();
            let old_default = cur.is_default();
            cur.set_value(newnode.value());
            cur.set_default(false);
            tx.audit.push(AuditRecord { path: cur.path(), op: "set" });
            tx.undo.push(Undo::Set { node: cur, old_value, old_default });
        }
        EditAction::Replace => {
            let cur = curnode.expect("resolve_action(Replace) implies curnode present");
            match newnode.kind() {
                // §9 Open Question 2: REPLACE of a complex node preserves
                // identity and recurses; leaf descendants are replaced with
                // new values, the container itself is not swapped out.
                NodeKind::Container | NodeKind::List => {
                    for child in newnode.children() {
                        apply_recursive(tx, &cur, &child, EditOp::Replace, is_base_1_1)?;
                    }
                }
                _ => {
                    let old = cur.clone_subtree();
                    let detached = newnode.clone_subtree();
                    detached.set_edit_op(EditOp::None);
                    parent.swap_child(&cur, detached.clone());
                    tx.audit.push(AuditRecord { path: detached.path(), op: "replace" });
                    tx.undo.push(Undo::Replace { parent: parent.clone(), old, new: detached });
                }
            }
        }
        EditAction::Delete | EditAction::DeleteDefault => {
            let cur = curnode.expect("resolve_action(Delete) implies curnode present");
            if let Some(old_index) = parent.child_index(&cur) {
                if let Some(removed) = parent.remove_child(&cur) {
                    tx.audit.push(AuditRecord { path: removed.path(), op: "delete" });
                    tx.undo.push(Undo::Delete { parent: parent.clone(), removed, old_index });
                }
            }
        }
        EditAction::Move => unreachable!("Move is handled by the reorder-only branch above"),
        EditAction::None => {
            if let Some(cur) = curnode {
                for child in newnode.children() {
                    apply_recursive(tx, &cur, &child, effective_op, is_base_1_1)?;
                }
            }
        }
    }
    Ok(())
}

fn map_tag(tag: &str) -> TxnError {
    match tag {
        "data-exists" => TxnError::DataExists,
        "data-missing" => TxnError::DataMissing,
        "unknown-element" => TxnError::UnknownElement, // base:1.1-gated construct on a 1.0 session
        _ => TxnError::RootCheckFailed,
    }
}

/// Rolls back every undo record in reverse apply order (`spec.md` §4.2).
/// Returns `Ok(())` if every inversion succeeded; the first failure is
/// reported but the walk continues so as much state as possible is
/// restored (mirrors `spec.md` §7: rollback failure is recorded, not
/// silently abandoned).
pub fn rollback(tx: &mut Tx) -> TxnResult<()> {
    let mut all_ok = true;
    for undo in tx.undo.iter().rev() {
        if !undo.invert() {
            all_ok = false;
            crate::registry::record_assertion_failure("rollback: undo record failed to invert");
        }
    }
    tx.undo.clear();
    if all_ok {
        Ok(())
    } else {
        Err(TxnError::RollbackFailed)
    }
}

/// Builds a detached leaf node for tests/ops callers that don't go through
/// a wire parser.
pub fn leaf(name: &str, value: &str, op: EditOp) -> Node {
    let n = Node::leaf(QName::unqualified(name), DataClass::Config, value);
    n.set_edit_op(op);
    n
}
