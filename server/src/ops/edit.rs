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

//! `edit-config` (`spec.md` §4.5): the one operation that runs the full
//! apply -> root-check -> commit-or-rollback cycle on a single datastore.

use super::{ensure_root, map_txn_err};
use crate::config::ValidateCapability;
use crate::dispatch::{Datastore, Message, OpOutcome, OpResult, TestOption};
use crate::engine::Engine;
use crate::error::record::{self, ErrorTag, Layer};
use crate::session::Session;
use crate::txn::{edit as txedit, EditType, Tx};
use crate::value::simple::Node;
use crate::value::EditOp;

fn datastore_editable(engine: &Engine, target: Datastore) -> bool {
    match target {
        Datastore::Running => engine.config.capabilities.writable_running,
        Datastore::Candidate => engine.config.capabilities.candidate,
        Datastore::Startup => false,
    }
}

/// **edit-config** (`spec.md` §4.5).
pub fn edit_config(
    engine: &Engine,
    session: &Session,
    msg: &mut Message,
    target: Datastore,
    default_operation: EditOp,
    test_option: TestOption,
    config: Node,
) -> OpResult {
    if !datastore_editable(engine, target) {
        msg.push(record::error(
            Layer::Application,
            ErrorTag::OperationNotSupported,
            format!("{} is not an edit-config target under this server's capabilities", target.id().name()),
            None,
        ));
        return Err(());
    }
    if test_option == TestOption::Set && !matches!(engine.config.capabilities.validate, ValidateCapability::V1_1) {
        msg.push(record::error(
            Layer::Rpc,
            ErrorTag::OperationNotSupported,
            "test-option 'set' requires the :validate:1.1 capability",
            None,
        ));
        return Err(());
    }

    let cfg = engine.cfg(target.id());
    if !cfg.ok_to_write(session.id()) {
        msg.push(record::error(
            Layer::Protocol,
            ErrorTag::LockDenied,
            format!("{} is locked by another session or has an in-progress transaction", target.id().name()),
            None,
        ));
        return Err(());
    }

    // root-check is forced iff the target is running, or the target is
    // candidate with test-then-set (`spec.md` §4.5).
    let need_root_check = matches!(target, Datastore::Running) || (matches!(target, Datastore::Candidate) && test_option == TestOption::TestThenSet);

    let mut tx = match Tx::begin(cfg, &engine.txid, EditType::Partial, need_root_check, false) {
        Ok(tx) => tx,
        Err(e) => {
            msg.push(map_txn_err(e));
            return Err(());
        }
    };

    let had_root = cfg.get_root().is_some();
    let root = ensure_root(cfg);
    let base_1_1 = session.protocol().is_1_1();
    let mut apply_err = None;
    for child in config.children() {
        if let Err(e) = txedit::apply_recursive(&mut tx, &root, &child, default_operation, base_1_1) {
            apply_err = Some(e);
            break;
        }
    }

    let check_errors = if apply_err.is_none() && tx.flags.rootcheck { crate::txn::root_check(&root) } else { Vec::new() };
    let test_only = test_option == TestOption::TestOnly;
    let must_rollback = apply_err.is_some() || !check_errors.is_empty() || test_only;

    if must_rollback {
        let rollback_res = txedit::rollback(&mut tx);
        tx.end(cfg, false);
        if rollback_res.is_err() {
            msg.push(record::error(Layer::Application, ErrorTag::RollbackFailed, "rollback of edit-config failed", None));
            return Err(());
        }
        if let Some(e) = apply_err {
            msg.push(map_txn_err(e));
            return Err(());
        }
        for e in check_errors {
            msg.push(e);
        }
        if msg.has_errors() {
            return Err(());
        }
        // test-only, no errors: NO_ERR with nothing applied.
        return Ok(OpOutcome::Ok);
    }

    if matches!(target, Datastore::Candidate) {
        engine.pending_audit.lock().extend(tx.audit.iter().cloned());
    }
    tx.end(cfg, true);
    if !had_root {
        cfg.swap_root(Some(root.clone()));
    }
    cfg.set_dirty(true);
    cfg.update_last_change_timestamp();

    // "If running is the target and the server has no persistent startup,
    // immediately persist running to disk" (`spec.md` §4.5).
    if matches!(target, Datastore::Running) && !engine.config.capabilities.startup {
        if cfg.persist_to_file(&engine.config.startup_filespec).is_err() {
            crate::registry::record_assertion_failure("edit-config: immediate persist-to-disk of running failed");
        }
    }

    Ok(OpOutcome::Ok)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::session::ProtocolVersion;
    use crate::value::{DataClass, QName};

    fn test_engine() -> Engine {
        let dir = std::env::temp_dir().join(format!("nc-ops-edit-test-{}", std::process::id()));
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

    fn leaf(name: &str, val: &str, op: EditOp) -> Node {
        let n = Node::leaf(QName::unqualified(name), DataClass::Config, val);
        n.set_edit_op(op);
        n
    }

    /// S1 merge then commit (`spec.md` §8): candidate `<top><a>1</a></top>`,
    /// `edit-config` merges `<a>2</a><b>3</b>` in.
    #[test]
    fn s1_merge_updates_and_adds() {
        let engine = test_engine();
        let existing = Node::container(QName::unqualified("top"), DataClass::Config);
        existing.add_child_canonical(Node::leaf(QName::unqualified("a"), DataClass::Config, "1"));
        engine.candidate.swap_root(Some(existing));

        let config = Node::container(QName::unqualified("config"), DataClass::Config);
        config.add_child_canonical(leaf("a", "2", EditOp::None));
        config.add_child_canonical(leaf("b", "3", EditOp::None));

        let mut msg = Message { message_id: None, base_1_1: true, errors: Vec::new() };
        edit_config(&engine, &session(), &mut msg, Datastore::Candidate, EditOp::Merge, TestOption::TestThenSet, config).unwrap();

        let root = engine.candidate.get_root().unwrap();
        assert_eq!(root.find_child(&QName::unqualified("a")).unwrap().value().unwrap(), "2");
        assert_eq!(root.find_child(&QName::unqualified("b")).unwrap().value().unwrap(), "3");
    }

    /// S2 create-exists (`spec.md` §8): `create` on an existing instance
    /// fails with `data-exists` and leaves candidate untouched.
    #[test]
    fn s2_create_exists_rolls_back() {
        let engine = test_engine();
        let existing = Node::container(QName::unqualified("top"), DataClass::Config);
        existing.add_child_canonical(Node::leaf(QName::unqualified("a"), DataClass::Config, "1"));
        engine.candidate.swap_root(Some(existing.clone_subtree()));

        let config = Node::container(QName::unqualified("config"), DataClass::Config);
        config.add_child_canonical(leaf("a", "9", EditOp::Create));

        let mut msg = Message { message_id: None, base_1_1: true, errors: Vec::new() };
        let result = edit_config(&engine, &session(), &mut msg, Datastore::Candidate, EditOp::Merge, TestOption::TestThenSet, config);
        assert!(result.is_err());
        assert!(msg.errors.iter().any(|e| e.tag == ErrorTag::DataExists));
        assert!(engine.candidate.get_root().unwrap().struct_eq(&existing));
    }

    #[test]
    fn test_only_never_mutates() {
        let engine = test_engine();
        let config = Node::container(QName::unqualified("config"), DataClass::Config);
        config.add_child_canonical(leaf("a", "1", EditOp::None));

        let mut msg = Message { message_id: None, base_1_1: true, errors: Vec::new() };
        edit_config(&engine, &session(), &mut msg, Datastore::Candidate, EditOp::Merge, TestOption::TestOnly, config).unwrap();
        assert!(engine.candidate.get_root().is_none());
    }
}
