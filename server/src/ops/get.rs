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

//! `get` / `get-config` (`spec.md` §4.5): V builds the filter and resolves
//! the source datastore; I is implicit — the reply is the filtered
//! projection, there's no separate mutation step.

use crate::dispatch::{Datastore, Message, OpResult, OpOutcome, WithDefaults};
use crate::engine::Engine;
use crate::filter::{self, Filter};
use crate::session::Session;
use crate::value::simple::Node;
use crate::value::{DataClass, NodeKind};
use chrono::{DateTime, Utc};

fn prune(node: &Node, drop_state: bool, drop_defaults: bool) {
    for child in node.children() {
        let remove = (drop_state && child.dataclass() == DataClass::State) || (drop_defaults && child.kind() == NodeKind::Leaf && child.is_default());
        if remove {
            node.remove_child(&child);
        } else {
            prune(&child, drop_state, drop_defaults);
        }
    }
}

fn project(root: &Node, filter: Option<&Filter>, engine: &Engine, session: &Session, config_only: bool, with_defaults: WithDefaults) -> Option<Node> {
    let user = session.username();
    let base_1_1 = session.protocol().is_1_1();
    let out = match filter {
        Some(f) => filter::evaluate(f, root, engine.access.as_ref(), user, base_1_1)?,
        None => filter::clone_whole(root, engine.access.as_ref(), user),
    };
    prune(&out, config_only, matches!(with_defaults, WithDefaults::Trim));
    Some(out)
}

/// **get** (`spec.md` §4.5). V: running is always readable; validate
/// `if-modified-since` against running's last-change timestamp. I: filter
/// against running (state and config data both included).
pub fn get(
    engine: &Engine,
    session: &Session,
    _msg: &mut Message,
    filter: Option<Filter>,
    with_defaults: WithDefaults,
    if_modified_since: Option<DateTime<Utc>>,
) -> OpResult {
    if let Some(since) = if_modified_since {
        if engine.running.last_change() <= since {
            return Ok(OpOutcome::Ok);
        }
    }
    let root = match engine.running.get_root() {
        Some(r) => r,
        None => return Ok(OpOutcome::Ok),
    };
    match project(&root, filter.as_ref(), engine, session, false, with_defaults) {
        Some(out) => Ok(OpOutcome::OkWithDataTimestamped(out, engine.running.last_change())),
        None => Ok(OpOutcome::Ok),
    }
}

/// **get-config** (`spec.md` §4.5): same as `get` but the source is
/// explicit and non-configuration (state) nodes are filtered out.
pub fn get_config(
    engine: &Engine,
    session: &Session,
    _msg: &mut Message,
    source: Datastore,
    filter: Option<Filter>,
    with_defaults: WithDefaults,
) -> OpResult {
    let cfg = engine.cfg(source.id());
    let root = match cfg.get_root() {
        Some(r) => r,
        None => return Ok(OpOutcome::Ok),
    };
    match project(&root, filter.as_ref(), engine, session, true, with_defaults) {
        Some(out) => Ok(OpOutcome::OkWithData(out)),
        None => Ok(OpOutcome::Ok),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::filter::FilterNode;
    use crate::session::{ProtocolVersion, Session};
    use crate::value::QName;

    fn test_engine() -> Engine {
        let dir = std::env::temp_dir().join(format!("nc-ops-get-test-{}", std::process::id()));
        Engine::new(
            EngineConfig::default(),
            dir,
            Box::new(crate::access::AllowAll),
            Box::new(crate::notify::RecordingSink::default()),
        )
    }

    fn session() -> Session {
        Session::user(1, "alice", ProtocolVersion::Base1_1)
    }

    #[test]
    fn get_config_drops_state_nodes() {
        let engine = test_engine();
        let root = Node::container(QName::unqualified("top"), DataClass::Config);
        root.add_child_canonical(Node::leaf(QName::unqualified("cfg"), DataClass::Config, "1"));
        root.add_child_canonical(Node::leaf(QName::unqualified("st"), DataClass::State, "2"));
        engine.running.swap_root(Some(root));
        let mut msg = Message { message_id: None, base_1_1: true, errors: Vec::new() };
        let outcome = get_config(&engine, &session(), &mut msg, Datastore::Running, None, WithDefaults::ReportAll).unwrap();
        let OpOutcome::OkWithData(data) = outcome else { panic!("expected data") };
        assert!(data.find_child(&QName::unqualified("cfg")).is_some());
        assert!(data.find_child(&QName::unqualified("st")).is_none());
    }

    #[test]
    fn get_keeps_state_nodes() {
        let engine = test_engine();
        let root = Node::container(QName::unqualified("top"), DataClass::Config);
        root.add_child_canonical(Node::leaf(QName::unqualified("st"), DataClass::State, "2"));
        engine.running.swap_root(Some(root));
        let mut msg = Message { message_id: None, base_1_1: true, errors: Vec::new() };
        let outcome = get(&engine, &session(), &mut msg, None, WithDefaults::ReportAll, None).unwrap();
        let OpOutcome::OkWithDataTimestamped(data, _) = outcome else { panic!("expected data") };
        assert!(data.find_child(&QName::unqualified("st")).is_some());
    }

    #[test]
    fn xpath_filter_empty_result_is_not_an_error() {
        let engine = test_engine();
        let root = Node::container(QName::unqualified("top"), DataClass::Config);
        engine.running.swap_root(Some(root));
        let filter = Filter::XPath(Box::new(crate::xpath::parse("/no/such/node").unwrap()));
        let mut msg = Message { message_id: None, base_1_1: true, errors: Vec::new() };
        let outcome = get(&engine, &session(), &mut msg, Some(filter), WithDefaults::ReportAll, None).unwrap();
        assert!(matches!(outcome, OpOutcome::Ok));
        assert!(!msg.has_errors());
        let _ = FilterNode::select(QName::unqualified("unused"));
    }
}
