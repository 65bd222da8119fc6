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

//! The literal end-to-end scenarios `spec.md` §8 lists (S1-S7), run through
//! the full `dispatch::dispatch` pipeline rather than calling an `ops::*`
//! handler directly — unlike the inline unit tests next to each module,
//! these exercise the dispatcher's phases (message-id, access, registry,
//! invoke) together with the operation itself.

use crate::dispatch::{self, Datastore, OperationRequest, TestOption, WithDefaults};
use crate::error::record::ErrorTag;
use crate::filter::{Filter, FilterNode};
use crate::notify::{ConfirmedCommitEvent, Notification};
use crate::session::{ProtocolVersion, Session};
use crate::txn::edit as txedit;
use crate::value::simple::Node;
use crate::value::{DataClass, EditOp, QName};
use crate::xpath;
use nc_macros::engine_test;

fn alice(protocol: ProtocolVersion) -> Session {
    Session::user(1, "alice", protocol)
}

/// S1: merge then commit (`spec.md` §8).
#[engine_test]
fn s1_merge_then_commit() {
    let session = alice(ProtocolVersion::Base1_1);
    let existing = Node::container(QName::unqualified("top"), DataClass::Config);
    existing.add_child_canonical(Node::leaf(QName::unqualified("a"), DataClass::Config, "1"));
    engine.candidate.swap_root(Some(existing));

    let config = Node::container(QName::unqualified("config"), DataClass::Config);
    config.add_child_canonical(txedit::leaf("a", "2", EditOp::None));
    config.add_child_canonical(txedit::leaf("b", "3", EditOp::None));

    let reply = dispatch::dispatch(
        &engine,
        &session,
        Some("1".into()),
        OperationRequest::EditConfig {
            target: Datastore::Candidate,
            default_operation: EditOp::Merge,
            test_option: TestOption::TestThenSet,
            config,
        },
    );
    assert!(reply.is_ok());
    assert!(engine.running.get_root().is_none(), "running must be unchanged by an edit against candidate");

    let reply = dispatch::dispatch(
        &engine,
        &session,
        Some("2".into()),
        OperationRequest::Commit { confirmed: false, confirm_timeout: None, persist: None, persist_id: None },
    );
    assert!(reply.is_ok());

    let running_root = engine.running.get_root().expect("commit populates running");
    assert_eq!(running_root.find_child(&QName::unqualified("a")).unwrap().value().unwrap(), "2");
    assert_eq!(running_root.find_child(&QName::unqualified("b")).unwrap().value().unwrap(), "3");

    let events = engine.notifications.lock();
    let audit = events
        .iter()
        .find_map(|n| match n {
            Notification::SysConfigChange(a) => Some(a.clone()),
            _ => None,
        })
        .expect("commit emits sysConfigChange");
    assert!(audit.iter().any(|r| r.op == "set" && r.path.ends_with("/a")));
    assert!(audit.iter().any(|r| r.op == "add" && r.path.ends_with("/b")));
}

/// S2: create-exists (`spec.md` §8).
#[engine_test]
fn s2_create_exists() {
    let session = alice(ProtocolVersion::Base1_1);
    let existing = Node::container(QName::unqualified("top"), DataClass::Config);
    existing.add_child_canonical(Node::leaf(QName::unqualified("a"), DataClass::Config, "1"));
    engine.candidate.swap_root(Some(existing.clone_subtree()));

    let config = Node::container(QName::unqualified("config"), DataClass::Config);
    config.add_child_canonical(txedit::leaf("a", "9", EditOp::Create));

    let reply = dispatch::dispatch(
        &engine,
        &session,
        Some("1".into()),
        OperationRequest::EditConfig {
            target: Datastore::Candidate,
            default_operation: EditOp::Merge,
            test_option: TestOption::TestThenSet,
            config,
        },
    );
    assert!(!reply.is_ok());
    assert!(reply.errors.iter().any(|e| e.tag == ErrorTag::DataExists));
    assert!(engine.candidate.get_root().unwrap().struct_eq(&existing));
}

/// S3: confirmed-commit timeout (`spec.md` §8, invariant 5). Uses a real
/// 1-second deadline and a real sleep — the only scenario here where the
/// passage of wall-clock time itself is the thing under test.
#[engine_test]
fn s3_confirmed_commit_timeout() {
    let session = alice(ProtocolVersion::Base1_1);
    let r0 = Node::container(QName::unqualified("top"), DataClass::Config);
    r0.add_child_canonical(Node::leaf(QName::unqualified("a"), DataClass::Config, "1"));
    engine.running.swap_root(Some(r0.clone_subtree()));
    engine.candidate.swap_root(Some(r0.clone_subtree()));

    let config = Node::container(QName::unqualified("config"), DataClass::Config);
    config.add_child_canonical(txedit::leaf("c", "7", EditOp::None));
    let reply = dispatch::dispatch(
        &engine,
        &session,
        Some("1".into()),
        OperationRequest::EditConfig {
            target: Datastore::Candidate,
            default_operation: EditOp::Merge,
            test_option: TestOption::TestThenSet,
            config,
        },
    );
    assert!(reply.is_ok());

    let reply = dispatch::dispatch(
        &engine,
        &session,
        Some("2".into()),
        OperationRequest::Commit { confirmed: true, confirm_timeout: Some(1), persist: None, persist_id: None },
    );
    assert!(reply.is_ok());
    assert!(engine.running.get_root().unwrap().find_child(&QName::unqualified("c")).is_some());
    assert!(engine.confirmed_commit.lock().is_active());

    std::thread::sleep(std::time::Duration::from_millis(1100));
    // expiry is driven on the next dispatch cycle (`spec.md` §5), not by a
    // background thread in this test.
    let _ = dispatch::dispatch(
        &engine,
        &session,
        Some("3".into()),
        OperationRequest::Get { filter: None, with_defaults: WithDefaults::ReportAll, if_modified_since: None },
    );

    assert!(!engine.confirmed_commit.lock().is_active());
    assert!(engine.running.get_root().unwrap().struct_eq(&r0));
    assert!(engine.candidate.get_root().unwrap().struct_eq(&r0));

    let events = engine.notifications.lock();
    assert!(events.iter().any(|n| matches!(n, Notification::SysConfirmedCommit(ConfirmedCommitEvent::Start))));
    assert!(events.iter().any(|n| matches!(n, Notification::SysConfirmedCommit(ConfirmedCommitEvent::Timeout))));
}

/// S4: cancel-commit with the wrong persist-id (`spec.md` §8).
#[engine_test]
fn s4_cancel_commit_wrong_persist_id() {
    let session = alice(ProtocolVersion::Base1_1);
    let r0 = Node::container(QName::unqualified("top"), DataClass::Config);
    engine.running.swap_root(Some(r0.clone_subtree()));
    engine.candidate.swap_root(Some(r0.clone_subtree()));

    let reply = dispatch::dispatch(
        &engine,
        &session,
        Some("1".into()),
        OperationRequest::Commit { confirmed: true, confirm_timeout: Some(600), persist: Some("foo".into()), persist_id: None },
    );
    assert!(reply.is_ok());
    assert!(engine.confirmed_commit.lock().is_active());

    let reply = dispatch::dispatch(
        &engine,
        &session,
        Some("2".into()),
        OperationRequest::CancelCommit { persist_id: Some("bar".into()) },
    );
    assert!(!reply.is_ok());
    assert!(reply.errors.iter().any(|e| e.tag == ErrorTag::InvalidValue));
    assert!(engine.confirmed_commit.lock().is_active(), "a wrong persist-id must not cancel the active commit");
}

/// S5: subtree filter with keys (`spec.md` §8): a filter that names a list's
/// value leaf but not its key leaf still forces the key onto the output.
#[engine_test]
fn s5_subtree_filter_with_keys() {
    let session = alice(ProtocolVersion::Base1_1);
    let root = Node::container(QName::unqualified("top"), DataClass::Config);
    for (k, v) in [("1", "a"), ("2", "b")] {
        let entry = Node::list_entry(QName::unqualified("l"), DataClass::Config, vec!["k".into()]);
        entry.add_child_canonical(Node::leaf(QName::unqualified("k"), DataClass::Config, k));
        entry.add_child_canonical(Node::leaf(QName::unqualified("v"), DataClass::Config, v));
        root.add_child_canonical(entry);
    }
    engine.running.swap_root(Some(root));

    let filter = Filter::Subtree(vec![FilterNode::container(
        QName::unqualified("l"),
        vec![FilterNode::select(QName::unqualified("v"))],
    )]);
    let reply = dispatch::dispatch(
        &engine,
        &session,
        Some("1".into()),
        OperationRequest::Get { filter: Some(filter), with_defaults: WithDefaults::ReportAll, if_modified_since: None },
    );
    assert!(reply.is_ok());
    let data = reply.data.expect("matching entries project data");
    let entries = data.children();
    assert_eq!(entries.len(), 2);
    for entry in &entries {
        assert!(entry.find_child(&QName::unqualified("k")).is_some(), "key leaf must be forced onto the output");
        assert!(entry.find_child(&QName::unqualified("v")).is_some());
    }
}

/// S6: xpath filter with an empty result (`spec.md` §8): `<data/>`, not an
/// error.
#[engine_test]
fn s6_xpath_filter_empty_result() {
    let session = alice(ProtocolVersion::Base1_1);
    let root = Node::container(QName::unqualified("top"), DataClass::Config);
    engine.running.swap_root(Some(root));

    let filter = Filter::XPath(Box::new(xpath::parse("/no/such/node").unwrap()));
    let reply = dispatch::dispatch(
        &engine,
        &session,
        Some("1".into()),
        OperationRequest::Get { filter: Some(filter), with_defaults: WithDefaults::ReportAll, if_modified_since: None },
    );
    assert!(reply.is_ok());
    assert!(reply.data.is_none());
}

/// S7: a session may not kill itself (`spec.md` §8).
#[engine_test]
fn s7_kill_self_is_rejected() {
    let session = alice(ProtocolVersion::Base1_1);
    let reply = dispatch::dispatch(
        &engine,
        &session,
        Some("1".into()),
        OperationRequest::KillSession { target_session: session.id() },
    );
    assert!(!reply.is_ok());
    assert!(reply.errors.iter().any(|e| e.tag == ErrorTag::InvalidValue));
}

/// Invariant 7: base:1.1-gated constructs are rejected on a base:1.0
/// session — `cancel-commit` itself, and `persist`/`persist-id` on `commit`.
#[engine_test]
fn invariant7_base_1_0_gating() {
    let session = alice(ProtocolVersion::Base1_0);
    let r0 = Node::container(QName::unqualified("top"), DataClass::Config);
    engine.running.swap_root(Some(r0.clone_subtree()));
    engine.candidate.swap_root(Some(r0));

    let reply = dispatch::dispatch(
        &engine,
        &session,
        Some("1".into()),
        OperationRequest::Commit { confirmed: false, confirm_timeout: None, persist: Some("foo".into()), persist_id: None },
    );
    assert!(!reply.is_ok(), "persist requires base:1.1");

    let reply = dispatch::dispatch(&engine, &session, Some("2".into()), OperationRequest::CancelCommit { persist_id: None });
    assert!(!reply.is_ok(), "cancel-commit requires base:1.1");

    let config = Node::container(QName::unqualified("config"), DataClass::Config);
    config.add_child_canonical(txedit::leaf("a", "", EditOp::Remove));
    let reply = dispatch::dispatch(
        &engine,
        &session,
        Some("3".into()),
        OperationRequest::EditConfig {
            target: Datastore::Candidate,
            default_operation: EditOp::Merge,
            test_option: TestOption::TestThenSet,
            config,
        },
    );
    assert!(!reply.is_ok(), "remove requires base:1.1");
    assert!(
        reply.errors.iter().any(|e| e.tag == ErrorTag::UnknownElement),
        "a remove edit on a base:1.0 session must surface as unknown-element on the wire, not access-denied"
    );
}
