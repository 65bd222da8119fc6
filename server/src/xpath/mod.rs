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

//! XPath expression parsing is an external collaborator (`spec.md` §1, §6).
//! This module is the `XPathProgram` seam plus a small reference
//! tokenizer/evaluator covering child steps, `//` descendant steps and
//! `[name='value']` equality predicates — enough to drive the `select`
//! filter path (§4.3) and scenario S6, *not* a claim of XPath 1.0 coverage.

use crate::value::QName;
use crate::value::simple::Node;

/// A pre-parsed XPath `select` program. The dispatcher parses the `select`
/// attribute once, at request-validation time (§4.3: "pre-parsed at
/// request-validation time; parse failure produces `missing-attribute` or
/// `invalid-value`").
pub trait XPathProgram {
    fn source(&self) -> &str;
    /// Evaluates the expression against `root`, returning the node-set it
    /// selects.
    fn evaluate(&self, root: &Node) -> Vec<Node>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone)]
struct Step {
    axis: Axis,
    name: Option<String>,
    predicate: Option<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct CompiledXPath {
    source: String,
    steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XPathParseError {
    Empty,
    BadPredicate(String),
    BadStep(String),
}

/// Parses a `select` attribute string into a [`CompiledXPath`]. Supports the
/// subset: absolute paths, `/child::name` shorthand `/name`, `//name`
/// descendant steps, and `[leaf='value']` equality predicates.
pub fn parse(expr: &str) -> Result<CompiledXPath, XPathParseError> {
    let expr = expr.trim();
    if expr.is_empty() {
        return Err(XPathParseError::Empty);
    }
    let mut steps = Vec::new();
    let mut rest = expr;
    let mut pending_axis = Axis::Child;
    while !rest.is_empty() {
        if let Some(r) = rest.strip_prefix("//") {
            pending_axis = Axis::Descendant;
            rest = r;
            continue;
        }
        if let Some(r) = rest.strip_prefix('/') {
            pending_axis = Axis::Child;
            rest = r;
            continue;
        }
        // read a name token up to '/' or '['
        let end = rest.find(['/', '[']).unwrap_or(rest.len());
        let (name_tok, remainder) = rest.split_at(end);
        let name = if name_tok == "*" { None } else { Some(name_tok.to_owned()) };
        if name_tok.is_empty() {
            return Err(XPathParseError::BadStep(rest.to_owned()));
        }
        rest = remainder;
        let mut predicate = None;
        if let Some(r) = rest.strip_prefix('[') {
            let close = r.find(']').ok_or_else(|| XPathParseError::BadPredicate(r.to_owned()))?;
            let (pred_str, after) = r.split_at(close);
            predicate = Some(parse_predicate(pred_str)?);
            rest = &after[1..]; // drop the ']'
        }
        steps.push(Step { axis: pending_axis, name, predicate });
        pending_axis = Axis::Child;
    }
    Ok(CompiledXPath { source: expr.to_owned(), steps })
}

fn parse_predicate(s: &str) -> Result<(String, String), XPathParseError> {
    let eq = s.find('=').ok_or_else(|| XPathParseError::BadPredicate(s.to_owned()))?;
    let (lhs, rhs) = s.split_at(eq);
    let rhs = &rhs[1..];
    let rhs = rhs.trim().trim_matches(|c| c == '\'' || c == '"');
    Ok((lhs.trim().to_owned(), rhs.to_owned()))
}

impl XPathProgram for CompiledXPath {
    fn source(&self) -> &str {
        &self.source
    }

    fn evaluate(&self, root: &Node) -> Vec<Node> {
        // `root` is the data root itself, not a virtual document node, so the
        // first step must be able to match `root` directly (e.g. `/top/...`
        // against a root element named `top`) rather than searching root's
        // children for a step named after the root. Every step after the
        // first searches children/descendants of the previous step's matches
        // as usual.
        let mut current = vec![root.clone()];
        for (i, step) in self.steps.iter().enumerate() {
            let mut next = Vec::new();
            for node in &current {
                let candidates: Vec<Node> = if i == 0 {
                    match step.axis {
                        Axis::Child => vec![node.clone()],
                        Axis::Descendant => {
                            let mut v = vec![node.clone()];
                            v.extend(descendants(node));
                            v
                        }
                    }
                } else {
                    match step.axis {
                        Axis::Child => node.children(),
                        Axis::Descendant => descendants(node),
                    }
                };
                for c in candidates {
                    let name_ok = step
                        .name
                        .as_ref()
                        .map(|n| QName::unqualified(n.clone()).matches_wildcard_ns(&c.qname()))
                        .unwrap_or(true);
                    if !name_ok {
                        continue;
                    }
                    let pred_ok = match &step.predicate {
                        None => true,
                        Some((leaf, val)) => c
                            .find_child(&QName::unqualified(leaf.clone()))
                            .and_then(|l| l.value())
                            .as_deref()
                            == Some(val.as_str()),
                    };
                    if pred_ok {
                        next.push(c);
                    }
                }
            }
            current = next;
        }
        current
    }
}

fn descendants(node: &Node) -> Vec<Node> {
    let mut out = Vec::new();
    for c in node.children() {
        out.push(c.clone());
        out.extend(descendants(&c));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::DataClass;

    #[test]
    fn parses_and_evaluates_simple_path() {
        let root = Node::container(QName::unqualified("top"), DataClass::Config);
        let a = Node::container(QName::unqualified("a"), DataClass::Config);
        let b = Node::leaf(QName::unqualified("b"), DataClass::Config, "1");
        a.add_child_canonical(b);
        root.add_child_canonical(a);
        let prog = parse("/top/a/b").unwrap();
        let result = prog.evaluate(&root);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].value().unwrap(), "1");
    }

    #[test]
    fn empty_result_is_not_an_error() {
        let root = Node::container(QName::unqualified("top"), DataClass::Config);
        let prog = parse("/no/such/node").unwrap();
        assert!(prog.evaluate(&root).is_empty());
    }

    #[test]
    fn rejects_empty_expression() {
        assert_eq!(parse(""), Err(XPathParseError::Empty));
    }
}
