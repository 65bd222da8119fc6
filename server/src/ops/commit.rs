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

//! `validate` / `commit` / `cancel-commit` / `discard-changes` (`spec.md`
//! §4.5-§4.6): the candidate-lifecycle operations, including the
//! confirmed-commit state machine transitions.

use super::{copy_delete::resolve_source_node, map_store_err, map_txn_err};
use crate::confirmed_commit;
use crate::dispatch::{self, ConfigEndpoint, Message, OpOutcome, OpResult};
use crate::engine::Engine;
use crate::error::record::{self, ErrorTag, Layer};
use crate::notify::{ConfirmedCommitEvent, Notification};
use crate::session::Session;
use crate::txn::{EditType, Tx};

/// **validate** (`spec.md` §4.5): rejects unless `:validate` is supported.
/// `validate-all` server policy (load vs commit top-op) has no observable
/// effect here since this crate has no schema-driven top-op distinction to
/// apply it to — `delete_dead_nodes` and `root_check` run the same way
/// either way; the policy field is still threaded through `EngineConfig`
/// for a schema-aware caller to read.
pub fn validate(engine: &Engine, session: &Session, msg: &mut Message, source: ConfigEndpoint) -> OpResult {
    if !dispatch::validate_capability_enabled(engine.config.capabilities.validate) {
        msg.push(record::error(Layer::Rpc, ErrorTag::OperationNotSupported, "'validate' requires the :validate capability", None));
        return Err(());
    }

    let backing = match &source {
        ConfigEndpoint::Datastore(d) => Some(engine.cfg(d.id())),
        _ => None,
    };
    let tx_guard = match backing {
        Some(cfg) => match Tx::begin(cfg, &engine.txid, EditType::Full, true, true) {
            Ok(tx) => Some((cfg, tx)),
            Err(e) => {
                msg.push(map_txn_err(e));
                return Err(());
            }
        },
        None => None,
    };

    let node = match resolve_source_node(engine, &source) {
        Ok(n) => n,
        Err(e) => {
            if let Some((cfg, tx)) = tx_guard {
                tx.end(cfg, false);
            }
            msg.push(e);
            return Err(());
        }
    };

    crate::txn::delete_dead_nodes(&node, |_| false);
    let errors = crate::txn::root_check(&node);

    if let Some((cfg, tx)) = tx_guard {
        tx.end(cfg, errors.is_empty());
    }

    if !errors.is_empty() {
        for e in errors {
            msg.push(e);
        }
        return Err(());
    }
    Ok(OpOutcome::Ok)
}

/// **commit** (`spec.md` §4.5-§4.6). Folds validate and invoke into one
/// pass: capability/authorization checks, a full-edit `commitcheck`
/// transaction that root-checks candidate, then the confirmed-commit state
/// transition the presence of `confirmed` and the controller's current
/// state select between (start / extend / plain / finish).
pub fn commit(
    engine: &Engine,
    session: &Session,
    msg: &mut Message,
    confirmed: bool,
    confirm_timeout: Option<u32>,
    persist: Option<String>,
    persist_id: Option<String>,
) -> OpResult {
    if !dispatch::target_mode_allows_candidate(engine.config.target_mode) {
        msg.push(record::error(
            Layer::Application,
            ErrorTag::OperationNotSupported,
            "this server's target mode does not use a candidate datastore",
            None,
        ));
        return Err(());
    }
    if (persist.is_some() || persist_id.is_some()) && !session.protocol().is_1_1() {
        msg.push(record::error(Layer::Rpc, ErrorTag::UnknownElement, "'persist'/'persist-id' require base:1.1", None));
        return Err(());
    }

    let mut cc = engine.confirmed_commit.lock();
    if !cc.persist_id_matches(persist_id.as_deref()) {
        msg.push(record::error(
            Layer::Application,
            ErrorTag::InvalidValue,
            "persist-id does not match the active persistent confirmed-commit",
            None,
        ));
        return Err(());
    }
    let finishing_active = cc.is_active();
    if finishing_active && !cc.authorized(session.id(), persist_id.as_deref()) {
        msg.push(record::error(
            Layer::Protocol,
            ErrorTag::AccessDenied,
            "only the originating session (or a matching persist-id) may act on an active confirmed-commit",
            None,
        ));
        return Err(());
    }

    if !engine.running.ok_to_write(session.id()) || !engine.candidate.ok_to_write(session.id()) {
        msg.push(record::error(
            Layer::Protocol,
            ErrorTag::LockDenied,
            "candidate or running is locked by another session or has an in-progress transaction",
            None,
        ));
        return Err(());
    }

    let mut tx = match Tx::begin(&engine.candidate, &engine.txid, EditType::Full, true, false) {
        Ok(tx) => tx,
        Err(e) => {
            msg.push(map_txn_err(e));
            return Err(());
        }
    };
    tx.flags.commitcheck = true;

    let candidate_root = engine.candidate.get_root();
    let errors = candidate_root.as_ref().map(crate::txn::root_check).unwrap_or_default();
    if !errors.is_empty() {
        tx.end(&engine.candidate, false);
        for e in errors {
            msg.push(e);
        }
        return Err(());
    }

    let timeout = confirm_timeout.map(u64::from).unwrap_or(engine.config.default_confirm_timeout_secs);
    let backup_path = engine.config.resolve_backup_path();

    // Entering *active*: `persist` (not `persist-id`) is the new id this
    // confirmed-commit registers under, so later sessions can match it via
    // `persist-id` (`spec.md` §4.6). The backup must capture running's
    // content from *before* this commit applies, so it has to run before
    // the swap below.
    if confirmed && !finishing_active {
        if let Err(e) = confirmed_commit::begin(&mut cc, &engine.running, session.id(), persist.clone(), timeout, backup_path) {
            tx.end(&engine.candidate, false);
            msg.push(map_store_err(e));
            return Err(());
        }
    }

    let new_running_root = candidate_root.as_ref().map(|r| r.clone_subtree());
    engine.running.swap_root(new_running_root);
    engine.running.update_last_change_timestamp();
    tx.end(&engine.candidate, true);
    engine.candidate.set_dirty(false);

    let event = if confirmed && finishing_active {
        confirmed_commit::extend(&mut cc, timeout);
        Some(ConfirmedCommitEvent::Extend)
    } else if confirmed {
        Some(ConfirmedCommitEvent::Start)
    } else if finishing_active {
        if confirmed_commit::finish(&mut cc, &engine.running, &engine.config.startup_filespec).is_err() {
            crate::registry::record_assertion_failure("commit: failed to persist running to NV-store while finishing a confirmed-commit");
        }
        Some(ConfirmedCommitEvent::Complete)
    } else {
        if !engine.config.capabilities.startup && engine.running.persist_to_file(&engine.config.startup_filespec).is_err() {
            crate::registry::record_assertion_failure("commit: immediate persist-to-disk of running failed");
        }
        None
    };
    drop(cc);

    let audit = std::mem::take(&mut *engine.pending_audit.lock());
    let mut sink = engine.notify.lock();
    sink.notify(Notification::SysConfigChange(audit));
    if let Some(ev) = event {
        sink.notify(Notification::SysConfirmedCommit(ev));
    }

    Ok(OpOutcome::Ok)
}

/// **cancel-commit** (`spec.md` §4.5): base:1.1 only, target mode must use
/// candidate, a confirmed-commit must be active and the caller authorized.
pub fn cancel_commit(engine: &Engine, session: &Session, msg: &mut Message, persist_id: Option<String>) -> OpResult {
    if !session.protocol().is_1_1() {
        msg.push(record::error(Layer::Rpc, ErrorTag::UnknownElement, "cancel-commit requires base:1.1", None));
        return Err(());
    }
    if !dispatch::target_mode_allows_candidate(engine.config.target_mode) {
        msg.push(record::error(
            Layer::Application,
            ErrorTag::OperationNotSupported,
            "this server's target mode does not use a candidate datastore",
            None,
        ));
        return Err(());
    }

    let mut cc = engine.confirmed_commit.lock();
    if !cc.is_active() {
        msg.push(record::error(Layer::Application, ErrorTag::OperationFailed, "no confirmed-commit is active", None));
        return Err(());
    }
    if !cc.persist_id_matches(persist_id.as_deref()) {
        msg.push(record::error(Layer::Application, ErrorTag::InvalidValue, "persist-id does not match the active confirmed-commit", None));
        return Err(());
    }
    if !cc.authorized(session.id(), persist_id.as_deref()) {
        msg.push(record::error(
            Layer::Protocol,
            ErrorTag::AccessDenied,
            "only the originating session (or a matching persist-id) may cancel this confirmed-commit",
            None,
        ));
        return Err(());
    }

    let mut sink = engine.notify.lock();
    confirmed_commit::cancel_or_timeout(&mut cc, &engine.running, &engine.candidate, sink.as_mut(), ConfirmedCommitEvent::Cancel);
    drop(sink);
    drop(cc);
    engine.pending_audit.lock().clear();
    Ok(OpOutcome::Ok)
}

/// **discard-changes** (`spec.md` §4.5): target mode must use candidate,
/// candidate must be writable by this session. If candidate has drifted
/// from running (`dirty`), copy running back over it — and with it, the
/// uncommitted edits that drift represents, so the audit queue they fed is
/// dropped too.
pub fn discard_changes(engine: &Engine, session: &Session, msg: &mut Message) -> OpResult {
    if !dispatch::target_mode_allows_candidate(engine.config.target_mode) {
        msg.push(record::error(
            Layer::Application,
            ErrorTag::OperationNotSupported,
            "this server's target mode does not use a candidate datastore",
            None,
        ));
        return Err(());
    }
    if !engine.candidate.ok_to_write(session.id()) {
        msg.push(record::error(
            Layer::Protocol,
            ErrorTag::LockDenied,
            "candidate is locked by another session or has an in-progress transaction",
            None,
        ));
        return Err(());
    }
    if engine.candidate.dirty() {
        engine.candidate.fill_from(&engine.running);
        engine.pending_audit.lock().clear();
    }
    Ok(OpOutcome::Ok)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Capabilities, EngineConfig, TargetMode, ValidateCapability};
    use crate::session::ProtocolVersion;
    use crate::value::simple::Node;
    use crate::value::{DataClass, EditOp, QName};

    fn test_engine() -> Engine {
        let dir = std::env::temp_dir().join(format!("nc-ops-commit-test-{}", std::process::id()));
        let mut cfg = EngineConfig::default();
        cfg.backup_path_override = Some(
            std::env::temp_dir()
                .join(format!("nc-ops-commit-backup-{}.xml", std::process::id()))
                .to_string_lossy()
                .to_string(),
        );
        cfg.startup_filespec = std::env::temp_dir()
            .join(format!("nc-ops-commit-startup-{}.xml", std::process::id()))
            .to_string_lossy()
            .to_string();
        Engine::new(cfg, dir, Box::new(crate::access::AllowAll), Box::new(crate::notify::RecordingSink::default()))
    }

    fn session() -> Session {
        Session::user(1, "alice", ProtocolVersion::Base1_1)
    }

    fn leaf(name: &str, val: &str) -> Node {
        let n = Node::leaf(QName::unqualified(name), DataClass::Config, val);
        n.set_edit_op(EditOp::None);
        n
    }

    /// S1 (`spec.md` §8): merge into candidate, then `commit` copies it
    /// into running.
    #[test]
    fn s1_commit_copies_candidate_into_running() {
        let engine = test_engine();
        let config = Node::container(QName::unqualified("config"), DataClass::Config);
        config.add_child_canonical(leaf("a", "2"));
        config.add_child_canonical(leaf("b", "3"));
        let mut msg = Message { message_id: None, base_1_1: true, errors: Vec::new() };
        crate::ops::edit::edit_config(
            &engine,
            &session(),
            &mut msg,
            crate::dispatch::Datastore::Candidate,
            EditOp::Merge,
            crate::dispatch::TestOption::TestThenSet,
            config,
        )
        .unwrap();

        let mut msg2 = Message { message_id: None, base_1_1: true, errors: Vec::new() };
        commit(&engine, &session(), &mut msg2, false, None, None, None).unwrap();

        let running = engine.running.get_root().unwrap();
        assert_eq!(running.find_child(&QName::unqualified("a")).unwrap().value().unwrap(), "2");
        assert_eq!(running.find_child(&QName::unqualified("b")).unwrap().value().unwrap(), "3");
    }

    /// S4 (`spec.md` §8): wrong persist-id on `cancel-commit` while a
    /// persistent confirmed-commit is active leaves it untouched.
    #[test]
    fn s4_cancel_commit_wrong_persist_id_is_rejected() {
        let engine = test_engine();
        let mut msg = Message { message_id: None, base_1_1: true, errors: Vec::new() };
        commit(&engine, &session(), &mut msg, true, Some(600), Some("foo".to_owned()), None).unwrap();
        assert!(engine.confirmed_commit.lock().is_active());

        let mut msg2 = Message { message_id: None, base_1_1: true, errors: Vec::new() };
        let result = cancel_commit(&engine, &session(), &mut msg2, Some("bar".to_owned()));
        assert!(result.is_err());
        assert!(msg2.errors.iter().any(|e| e.tag == ErrorTag::InvalidValue));
        assert!(engine.confirmed_commit.lock().is_active());
    }

    #[test]
    fn cancel_commit_restores_running() {
        let engine = test_engine();
        let r0 = Node::container(QName::unqualified("top"), DataClass::Config);
        r0.add_child_canonical(Node::leaf(QName::unqualified("a"), DataClass::Config, "1"));
        engine.running.swap_root(Some(r0.clone_subtree()));
        engine.candidate.swap_root(Some(r0.clone_subtree()));

        let config = Node::container(QName::unqualified("config"), DataClass::Config);
        config.add_child_canonical(leaf("c", "7"));
        let mut msg = Message { message_id: None, base_1_1: true, errors: Vec::new() };
        crate::ops::edit::edit_config(
            &engine,
            &session(),
            &mut msg,
            crate::dispatch::Datastore::Candidate,
            EditOp::Merge,
            crate::dispatch::TestOption::TestThenSet,
            config,
        )
        .unwrap();

        let mut msg2 = Message { message_id: None, base_1_1: true, errors: Vec::new() };
        commit(&engine, &session(), &mut msg2, true, Some(600), None, None).unwrap();
        assert!(engine.running.get_root().unwrap().find_child(&QName::unqualified("c")).is_some());

        let mut msg3 = Message { message_id: None, base_1_1: true, errors: Vec::new() };
        cancel_commit(&engine, &session(), &mut msg3, None).unwrap();
        assert!(engine.running.get_root().unwrap().struct_eq(&r0));
        assert!(!engine.confirmed_commit.lock().is_active());
    }

    #[test]
    fn discard_changes_reverts_dirty_candidate() {
        let engine = test_engine();
        let r0 = Node::container(QName::unqualified("top"), DataClass::Config);
        engine.running.swap_root(Some(r0.clone_subtree()));
        engine.candidate.swap_root(Some(r0.clone_subtree()));

        let config = Node::container(QName::unqualified("config"), DataClass::Config);
        config.add_child_canonical(leaf("x", "1"));
        let mut msg = Message { message_id: None, base_1_1: true, errors: Vec::new() };
        crate::ops::edit::edit_config(
            &engine,
            &session(),
            &mut msg,
            crate::dispatch::Datastore::Candidate,
            EditOp::Merge,
            crate::dispatch::TestOption::TestThenSet,
            config,
        )
        .unwrap();
        assert!(engine.candidate.dirty());

        let mut msg2 = Message { message_id: None, base_1_1: true, errors: Vec::new() };
        discard_changes(&engine, &session(), &mut msg2).unwrap();
        assert!(engine.candidate.get_root().unwrap().find_child(&QName::unqualified("x")).is_none());
    }

    #[test]
    fn validate_rejected_without_capability() {
        let mut caps = Capabilities::default();
        caps.validate = ValidateCapability::None;
        let mut cfg = EngineConfig::default();
        cfg.capabilities = caps;
        cfg.target_mode = TargetMode::CandidateAndRunning;
        let dir = std::env::temp_dir().join(format!("nc-ops-commit-test2-{}", std::process::id()));
        let engine = Engine::new(cfg, dir, Box::new(crate::access::AllowAll), Box::new(crate::notify::RecordingSink::default()));
        let mut msg = Message { message_id: None, base_1_1: true, errors: Vec::new() };
        let result = validate(&engine, &session(), &mut msg, ConfigEndpoint::Datastore(crate::dispatch::Datastore::Running));
        assert!(result.is_err());
    }
}
