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

//! Filter engines (C3, `spec.md` §4.3): the two interchangeable kinds a
//! request's `<filter>` element can carry. Both are read-only projections
//! over the live value tree — neither ever mutates the target.

pub mod select;
pub mod subtree;

use crate::access::AccessControl;
use crate::value::simple::Node;
use crate::xpath::{self, XPathProgram};
pub use subtree::FilterNode;

/// The filter attached to a `get`/`get-config` request, already bound to a
/// session's protocol version at request-validation time (`spec.md` §4.3:
/// "The expression string is pre-parsed at request-validation time").
pub enum Filter {
    Subtree(Vec<FilterNode>),
    XPath(Box<dyn XPathProgram>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValidateError {
    /// `select` attribute missing on an `xpath`-typed filter
    MissingSelect,
    /// `select` failed to parse
    BadSelect,
}

/// Parses and binds a wire-level filter description. `raw_xpath` is `None`
/// for a subtree filter (the skeleton tree is already built by the caller)
/// and `Some(expr)` for an `xpath`-typed filter's `select` attribute.
pub fn bind(subtree: Option<Vec<FilterNode>>, raw_xpath: Option<&str>) -> Result<Option<Filter>, FilterValidateError> {
    match (subtree, raw_xpath) {
        (Some(nodes), None) => Ok(Some(Filter::Subtree(nodes))),
        (None, Some(expr)) => {
            if expr.trim().is_empty() {
                return Err(FilterValidateError::MissingSelect);
            }
            let prog = xpath::parse(expr).map_err(|_| FilterValidateError::BadSelect)?;
            Ok(Some(Filter::XPath(Box::new(prog))))
        }
        (None, None) => Ok(None),
        (Some(_), Some(_)) => Err(FilterValidateError::BadSelect),
    }
}

/// Evaluates a bound filter against `root`, returning the projected output
/// tree (wrapped at the caller's document root) or `None` when nothing
/// matched (`spec.md` §8 S6: empty `<data/>`, not an error).
pub fn evaluate(filter: &Filter, root: &Node, access: &dyn AccessControl, user: &str, base_1_1: bool) -> Option<Node> {
    match filter {
        Filter::Subtree(nodes) => {
            let projected = subtree::eval_subtree(nodes, root, access, user, base_1_1);
            if projected.is_empty() {
                None
            } else {
                let out = Node::container(root.qname(), root.dataclass());
                for p in projected {
                    out.add_child_canonical(p);
                }
                Some(out)
            }
        }
        Filter::XPath(prog) => select::project(root, prog.as_ref(), access, user),
    }
}

/// Shared access-filtered deep-clone used by both filter engines (denied
/// descendants are dropped, never surfaced as an error — `spec.md` §4.3).
pub(crate) fn subtree_access_filtered_clone(node: &Node, access: &dyn AccessControl, user: &str) -> Node {
    subtree::access_filtered_clone(node, access, user)
}

/// The "no `<filter>` supplied" case (`spec.md` §4.5 `get`/`get-config`):
/// the whole datastore, access-filtered but otherwise unprojected.
pub fn clone_whole(root: &Node, access: &dyn AccessControl, user: &str) -> Node {
    subtree_access_filtered_clone(root, access, user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::AllowAll;
    use crate::value::{DataClass, QName};

    #[test]
    fn no_filter_means_no_projection_here() {
        // absence of a filter is handled by the caller (whole datastore is
        // emitted); `bind` with nothing supplied yields `None`.
        assert!(bind(None, None).unwrap().is_none());
    }

    #[test]
    fn xpath_without_select_is_an_error() {
        assert_eq!(bind(None, Some("")), Err(FilterValidateError::MissingSelect));
    }

    #[test]
    fn subtree_filter_idempotent_on_unchanged_tree() {
        let root = Node::container(QName::unqualified("top"), DataClass::Config);
        root.add_child_canonical(Node::leaf(QName::unqualified("a"), DataClass::Config, "1"));
        let filter = Filter::Subtree(vec![FilterNode::select(QName::unqualified("a"))]);
        let out1 = evaluate(&filter, &root, &AllowAll, "u", true).unwrap();
        let out2 = evaluate(&filter, &root, &AllowAll, "u", true).unwrap();
        assert_eq!(out1.to_xml_string(false), out2.to_xml_string(false));
    }
}
