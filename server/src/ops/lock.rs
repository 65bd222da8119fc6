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

//! `lock` / `unlock` / `close-session` / `kill-session` (`spec.md` §4.5).

use super::map_store_err;
use crate::dispatch::{Datastore, Message, OpOutcome, OpResult};
use crate::engine::Engine;
use crate::error::record::{self, ErrorTag, Layer};
use crate::session::{Session, SessionId};

pub fn lock(engine: &Engine, session: &Session, msg: &mut Message, target: Datastore) -> OpResult {
    let cfg = engine.cfg(target.id());
    if !cfg.ok_to_lock() {
        msg.push(record::error(
            Layer::Protocol,
            ErrorTag::LockDenied,
            format!("{} is already locked or has an in-progress transaction", target.id().name()),
            None,
        ));
        return Err(());
    }
    match cfg.lock(session.id()) {
        Ok(()) => Ok(OpOutcome::Ok),
        Err(e) => {
            msg.push(map_store_err(e));
            Err(())
        }
    }
}

pub fn unlock(engine: &Engine, session: &Session, msg: &mut Message, target: Datastore) -> OpResult {
    let cfg = engine.cfg(target.id());
    if !cfg.ok_to_unlock(session.id()) {
        msg.push(record::error(
            Layer::Protocol,
            ErrorTag::LockDenied,
            format!("session does not hold the lock on {}", target.id().name()),
            None,
        ));
        return Err(());
    }
    match cfg.unlock(session.id()) {
        Ok(()) => Ok(OpOutcome::Ok),
        Err(e) => {
            msg.push(map_store_err(e));
            Err(())
        }
    }
}

/// Releases every lock this session holds across the three datastores
/// (`spec.md` §4.5: `close-session` terminates the session and implicitly
/// releases its locks — actual session teardown is the transport layer's
/// job, this crate only owns the datastore-side bookkeeping).
pub fn close_session(engine: &Engine, session: &Session, _msg: &mut Message) -> OpResult {
    release_locks_held_by(engine, session.id());
    Ok(OpOutcome::Ok)
}

/// `kill-session` (`spec.md` §4.5, §8 S7): a session may not kill itself.
pub fn kill_session(engine: &Engine, session: &Session, msg: &mut Message, target_session: SessionId) -> OpResult {
    if target_session == session.id() {
        msg.push(record::error(
            Layer::Rpc,
            ErrorTag::InvalidValue,
            "a session cannot kill itself",
            None,
        ));
        return Err(());
    }
    release_locks_held_by(engine, target_session);
    Ok(OpOutcome::Ok)
}

fn release_locks_held_by(engine: &Engine, sid: SessionId) {
    for cfg in [&engine.running, &engine.candidate, &engine.startup] {
        if cfg.lock_holder() == sid {
            let _ = cfg.unlock(sid);
        }
    }
}
