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

//! XPath `select` filter projection (`spec.md` §4.3): evaluate the compiled
//! expression to a node-set, then collapse it into the minimal enclosing
//! subtrees, forcing key leaves onto any list ancestor along the way.

use crate::access::AccessControl;
use crate::value::simple::Node;
use crate::value::{NodeKind, QName};
use crate::xpath::XPathProgram;

fn skeleton_copy(n: &Node) -> Node {
    match n.kind() {
        NodeKind::List => {
            let s = Node::list_entry(n.qname(), n.dataclass(), n.keys());
            for k in n.keys() {
                if let Some(kl) = n.find_child(&QName::unqualified(k)) {
                    s.add_child_canonical(kl.clone_subtree());
                }
            }
            s
        }
        _ => Node::container(n.qname(), n.dataclass()),
    }
}

fn find_matching_out_child(out_parent: &Node, real_node: &Node) -> Option<Node> {
    match real_node.kind() {
        NodeKind::List => {
            let kv: Vec<(String, String)> = real_node
                .keys()
                .iter()
                .map(|k| {
                    let v = real_node.find_child(&QName::unqualified(k.clone())).and_then(|l| l.value()).unwrap_or_default();
                    (k.clone(), v)
                })
                .collect();
            out_parent.find_list_entry(&real_node.qname(), &kv)
        }
        NodeKind::LeafList => out_parent.find_leaf_list_entry(&real_node.qname(), real_node.value().as_deref().unwrap_or("")),
        _ => out_parent.find_child(&real_node.qname()),
    }
}

fn access_filtered_clone(node: &Node, access: &dyn AccessControl, user: &str) -> Node {
    super::subtree_access_filtered_clone(node, access, user)
}

fn merge_path(out_parent: &Node, remaining: &[Node], access: &dyn AccessControl, user: &str) {
    if remaining.is_empty() {
        return;
    }
    let real_node = &remaining[0];
    let is_last = remaining.len() == 1;
    let existing = find_matching_out_child(out_parent, real_node);
    if is_last {
        if existing.is_none() {
            out_parent.add_child_canonical(access_filtered_clone(real_node, access, user));
        }
        return;
    }
    let child_out = match existing {
        Some(c) => c,
        None => {
            let s = skeleton_copy(real_node);
            out_parent.add_child_canonical(s.clone());
            s
        }
    };
    merge_path(&child_out, &remaining[1..], access, user);
}

/// Collapses an XPath node-set into the minimal tree of enclosing
/// containers/lists plus the selected nodes themselves. Returns `None` for
/// an empty node-set (`spec.md` §8 S6: `<data/>`, no error).
pub fn project(root: &Node, program: &dyn XPathProgram, access: &dyn AccessControl, user: &str) -> Option<Node> {
    let nodeset = program.evaluate(root);
    if nodeset.is_empty() {
        return None;
    }
    let out_root = skeleton_copy_root(root);
    for node in &nodeset {
        if !access.node_readable(user, node) {
            continue;
        }
        let mut chain = Vec::new();
        let mut cur = Some(node.clone());
        while let Some(n) = cur {
            chain.push(n.clone());
            cur = n.parent();
        }
        chain.reverse();
        if chain.len() > 1 {
            merge_path(&out_root, &chain[1..], access, user);
        }
    }
    Some(out_root)
}

fn skeleton_copy_root(root: &Node) -> Node {
    Node::container(root.qname(), root.dataclass())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::AllowAll;
    use crate::value::DataClass;
    use crate::xpath;

    #[test]
    fn forces_keys_along_projected_path() {
        let root = Node::container(QName::unqualified("top"), DataClass::Config);
        let entry = Node::list_entry(QName::unqualified("l"), DataClass::Config, vec!["k".into()]);
        entry.add_child_canonical(Node::leaf(QName::unqualified("k"), DataClass::Config, "1"));
        entry.add_child_canonical(Node::leaf(QName::unqualified("v"), DataClass::Config, "x"));
        root.add_child_canonical(entry);
        let prog = xpath::parse("/top/l/v").unwrap();
        let out = project(&root, &prog, &AllowAll, "u").unwrap();
        let l = out.find_child(&QName::unqualified("l")).unwrap();
        assert!(l.find_child(&QName::unqualified("k")).is_some());
        assert!(l.find_child(&QName::unqualified("v")).is_some());
    }

    #[test]
    fn empty_nodeset_projects_to_none() {
        let root = Node::container(QName::unqualified("top"), DataClass::Config);
        let prog = xpath::parse("/no/such").unwrap();
        assert!(project(&root, &prog, &AllowAll, "u").is_none());
    }
}
