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

//! `copy-config` / `delete-config` / `load-config` (`spec.md` §4.5).

use super::{ensure_root, map_txn_err, write_node_to_file};
use crate::config::StartupErrorPolicy;
use crate::datastore::CfgId;
use crate::dispatch::{ConfigEndpoint, Datastore, LoadMode, Message, OpOutcome, OpResult};
use crate::engine::Engine;
use crate::error::record::{self, ErrorRecord, ErrorTag, Layer};
use crate::session::Session;
use crate::txn::{edit as txedit, EditType, Tx};
use crate::value::simple::Node;
use crate::value::EditOp;

/// Resolves a `copy-config`/`validate` source to a detached subtree. A
/// `url` source is rejected outright: reading one back needs an XML parser
/// this crate doesn't own (`spec.md` §1, §6).
pub(crate) fn resolve_source_node(engine: &Engine, source: &ConfigEndpoint) -> Result<Node, ErrorRecord> {
    match source {
        ConfigEndpoint::Datastore(d) => Ok(ensure_root(engine.cfg(d.id())).clone_subtree()),
        ConfigEndpoint::Inline(n) => Ok(n.clone_subtree()),
        ConfigEndpoint::Url(_) => Err(record::error(
            Layer::Application,
            ErrorTag::OperationNotSupported,
            "a url-sourced <config> requires an external XML parser",
            None,
        )),
    }
}

/// **copy-config** (`spec.md` §4.5). Copy to running is rejected (clients
/// use `edit-config` instead), as is url→url and a datastore copied onto
/// itself.
pub fn copy_config(engine: &Engine, session: &Session, msg: &mut Message, source: ConfigEndpoint, target: ConfigEndpoint) -> OpResult {
    if matches!(target, ConfigEndpoint::Datastore(Datastore::Running)) {
        msg.push(record::error(
            Layer::Application,
            ErrorTag::OperationNotSupported,
            "copy-config to running is not supported; use edit-config instead",
            None,
        ));
        return Err(());
    }
    if matches!(target, ConfigEndpoint::Inline(_)) {
        msg.push(record::error(Layer::Rpc, ErrorTag::BadElement, "an inline <config> is not a valid copy-config destination", None));
        return Err(());
    }
    if matches!((&source, &target), (ConfigEndpoint::Url(_), ConfigEndpoint::Url(_))) {
        msg.push(record::error(Layer::Application, ErrorTag::OperationNotSupported, "url-to-url copy-config is not supported", None));
        return Err(());
    }
    if let (ConfigEndpoint::Datastore(s), ConfigEndpoint::Datastore(t)) = (&source, &target) {
        if s.id() == t.id() {
            msg.push(record::error(Layer::Rpc, ErrorTag::InvalidValue, "copy-config source and destination must differ", None));
            return Err(());
        }
    }

    let source_node = match resolve_source_node(engine, &source) {
        Ok(n) => n,
        Err(e) => {
            msg.push(e);
            return Err(());
        }
    };

    match target {
        ConfigEndpoint::Datastore(Datastore::Startup) => copy_into_cfg(engine, session, msg, CfgId::Startup, source_node, true),
        ConfigEndpoint::Datastore(Datastore::Candidate) => copy_into_cfg(engine, session, msg, CfgId::Candidate, source_node, false),
        ConfigEndpoint::Url(u) => {
            let path = match super::resolve_file_url(engine, &u) {
                Ok(p) => p,
                Err(e) => {
                    msg.push(e);
                    return Err(());
                }
            };
            if write_node_to_file(&source_node, &path).is_err() {
                msg.push(record::error(Layer::Application, ErrorTag::OperationFailed, "failed to write destination URL file", None));
                return Err(());
            }
            Ok(OpOutcome::Ok)
        }
        ConfigEndpoint::Datastore(Datastore::Running) | ConfigEndpoint::Inline(_) => unreachable!("rejected above"),
    }
}

/// Shared `startup`/`candidate` destination path: a full-edit transaction
/// root-checks the incoming tree, then swaps it in wholesale (a REPLACE of
/// the whole datastore, per `spec.md` §4.5).
fn copy_into_cfg(engine: &Engine, session: &Session, msg: &mut Message, id: CfgId, source_node: Node, persist: bool) -> OpResult {
    let cfg = engine.cfg(id);
    if !cfg.ok_to_write(session.id()) {
        msg.push(record::error(
            Layer::Protocol,
            ErrorTag::LockDenied,
            format!("{} is locked by another session or has an in-progress transaction", id.name()),
            None,
        ));
        return Err(());
    }
    let tx = match Tx::begin(cfg, &engine.txid, EditType::Full, true, false) {
        Ok(tx) => tx,
        Err(e) => {
            msg.push(map_txn_err(e));
            return Err(());
        }
    };
    let errors = crate::txn::root_check(&source_node);
    if !errors.is_empty() {
        tx.end(cfg, false);
        for e in errors {
            msg.push(e);
        }
        return Err(());
    }
    if persist && write_node_to_file(&source_node, &engine.config.startup_filespec).is_err() {
        tx.end(cfg, false);
        msg.push(record::error(Layer::Application, ErrorTag::OperationFailed, "failed to write startup configuration file", None));
        return Err(());
    }
    cfg.swap_root(Some(source_node));
    tx.end(cfg, true);
    cfg.set_dirty(!persist);
    cfg.update_last_change_timestamp();
    Ok(OpOutcome::Ok)
}

/// **delete-config** (`spec.md` §4.5): only `startup` and `url` are valid
/// targets; `candidate`/`running` are rejected.
pub fn delete_config(engine: &Engine, session: &Session, msg: &mut Message, target: ConfigEndpoint) -> OpResult {
    match target {
        ConfigEndpoint::Datastore(Datastore::Startup) => {
            let cfg = engine.cfg(CfgId::Startup);
            if !cfg.ok_to_write(session.id()) {
                msg.push(record::error(
                    Layer::Protocol,
                    ErrorTag::LockDenied,
                    "startup is locked by another session or has an in-progress transaction",
                    None,
                ));
                return Err(());
            }
            match std::fs::remove_file(&engine.config.startup_filespec) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(_) => {
                    msg.push(record::error(Layer::Application, ErrorTag::OperationFailed, "failed to delete startup configuration file", None));
                    return Err(());
                }
            }
            cfg.swap_root(None);
            cfg.set_dirty(false);
            cfg.update_last_change_timestamp();
            Ok(OpOutcome::Ok)
        }
        ConfigEndpoint::Url(u) => {
            let path = match super::resolve_file_url(engine, &u) {
                Ok(p) => p,
                Err(e) => {
                    msg.push(e);
                    return Err(());
                }
            };
            match std::fs::remove_file(&path) {
                Ok(()) => Ok(OpOutcome::Ok),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(OpOutcome::Ok),
                Err(_) => {
                    msg.push(record::error(Layer::Application, ErrorTag::OperationFailed, "failed to delete destination URL file", None));
                    Err(())
                }
            }
        }
        ConfigEndpoint::Datastore(_) | ConfigEndpoint::Inline(_) => {
            msg.push(record::error(
                Layer::Application,
                ErrorTag::OperationNotSupported,
                "only startup and url may be deleted; candidate and running are rejected",
                None,
            ));
            Err(())
        }
    }
}

/// **load-config** (internal-only, `spec.md` §4.5): boot-time
/// startup→running load (`LoadMode::Boot`, top-op LOAD) or a confirmed-
/// commit/backup restore (`LoadMode::Restore`, top-op REPLACE). Rejects
/// anything but the synthetic session; never wire-dispatched
/// (`dispatch::registry::supported` always returns `false` for it).
pub fn load_config(engine: &Engine, session: &Session, msg: &mut Message, config: Node, mode: LoadMode) -> OpResult {
    if !session.is_synthetic() {
        msg.push(record::error(
            Layer::Protocol,
            ErrorTag::AccessDenied,
            "load-config is internal-only and may not be invoked by a user session",
            None,
        ));
        return Err(());
    }

    let cfg = &engine.running;
    let default_op = match mode {
        LoadMode::Boot => EditOp::Load,
        LoadMode::Restore => EditOp::Replace,
    };
    let mut tx = match Tx::begin(cfg, &engine.txid, EditType::Full, true, false) {
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
        if let Err(e) = txedit::apply_recursive(&mut tx, &root, &child, default_op, base_1_1) {
            apply_err = Some(e);
            break;
        }
    }
    let check_errors = if apply_err.is_none() { crate::txn::root_check(&root) } else { Vec::new() };
    let failed = apply_err.is_some() || !check_errors.is_empty();

    if failed && matches!(engine.config.startup_error_policy, StartupErrorPolicy::Stop) {
        let rollback_res = txedit::rollback(&mut tx);
        tx.end(cfg, false);
        if rollback_res.is_err() {
            msg.push(record::error(Layer::Application, ErrorTag::RollbackFailed, "rollback of load-config failed", None));
        }
        if let Some(e) = apply_err {
            msg.push(map_txn_err(e));
        }
        for e in check_errors {
            msg.push(e);
        }
        crate::registry::poison();
        return Err(());
    }

    if failed {
        log::warn!("load-config validation failed; continuing per startup-error=continue policy");
    }

    tx.end(cfg, true);
    if !had_root {
        cfg.swap_root(Some(root.clone()));
    }
    cfg.set_dirty(false);
    cfg.update_last_change_timestamp();
    Ok(OpOutcome::Ok)
}
