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

//! Datastore facade (C7, `spec.md` §4.7): lock bits, last-change timestamp,
//! dirty flag, root swap and startup persistence for one of
//! {running, candidate, startup}. Grounded on `registry/mod.rs`'s global
//! atomics, generalized from one process-wide flag to a per-datastore
//! lock-bit/timestamp pair, plus the lineage's `serde_yaml`-config-file save
//! idiom adapted to XML (`spec.md` §6 dictates the startup/backup file
//! format, not YAML).

use crate::error::{StoreError, StoreResult};
use crate::session::SessionId;
use crate::value::simple::Node;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CfgId {
    Running,
    Candidate,
    Startup,
}

impl CfgId {
    pub fn name(self) -> &'static str {
        match self {
            CfgId::Running => "running",
            CfgId::Candidate => "candidate",
            CfgId::Startup => "startup",
        }
    }
}

struct CfgState {
    root: Option<Node>,
    /// 0 when idle; invariant: at most one non-zero transaction-id per
    /// datastore at any time (`spec.md` §3).
    cur_txid: u64,
    last_committed_txid: u64,
    /// 0 = unlocked
    lock_holder: SessionId,
    last_change: DateTime<Utc>,
    dirty: bool,
}

/// One of {running, candidate, startup}.
pub struct Cfg {
    pub id: CfgId,
    pub source_url: Option<String>,
    state: RwLock<CfgState>,
}

impl Cfg {
    pub fn new(id: CfgId, source_url: Option<String>) -> Self {
        Cfg {
            id,
            source_url,
            state: RwLock::new(CfgState {
                root: None,
                cur_txid: 0,
                last_committed_txid: 0,
                lock_holder: SessionId::NONE,
                last_change: Utc::now(),
                dirty: false,
            }),
        }
    }

    pub fn ok_to_read(&self) -> bool {
        true
    }

    /// A write is allowed when no other session holds the lock and the
    /// datastore is idle (`spec.md` §3, §5: "the invariant `cur_txid != 0`
    /// implies a write is in progress").
    pub fn ok_to_write(&self, sid: SessionId) -> bool {
        let s = self.state.read();
        (s.lock_holder.is_none() || s.lock_holder == sid) && s.cur_txid == 0
    }

    pub fn ok_to_lock(&self) -> bool {
        let s = self.state.read();
        s.lock_holder.is_none() && s.cur_txid == 0
    }

    pub fn ok_to_unlock(&self, sid: SessionId) -> bool {
        self.state.read().lock_holder == sid
    }

    pub fn lock(&self, sid: SessionId) -> StoreResult<()> {
        let mut s = self.state.write();
        if !s.lock_holder.is_none() || s.cur_txid != 0 {
            return Err(StoreError::LockDenied);
        }
        s.lock_holder = sid;
        log::info!("{} locked by session {}", self.id.name(), sid);
        Ok(())
    }

    pub fn unlock(&self, sid: SessionId) -> StoreResult<()> {
        let mut s = self.state.write();
        if s.lock_holder != sid {
            return Err(StoreError::NotLockHolder);
        }
        s.lock_holder = SessionId::NONE;
        log::info!("{} unlocked by session {}", self.id.name(), sid);
        Ok(())
    }

    pub fn lock_holder(&self) -> SessionId {
        self.state.read().lock_holder
    }

    pub fn cur_txid(&self) -> u64 {
        self.state.read().cur_txid
    }

    pub fn last_committed_txid(&self) -> u64 {
        self.state.read().last_committed_txid
    }

    /// Marks the datastore as owning transaction `id`. Fails with `in-use`
    /// semantics (as a `bool`; the caller maps to `TxnError::InUse`) when a
    /// transaction is already in flight.
    pub fn begin_txn(&self, id: u64) -> bool {
        let mut s = self.state.write();
        if s.cur_txid != 0 {
            return false;
        }
        s.cur_txid = id;
        true
    }

    /// Ends the in-flight transaction. `committed` advances
    /// `last_committed_txid` to `id` and bumps the last-change timestamp;
    /// a rolled-back transaction just clears `cur_txid`.
    pub fn end_txn(&self, id: u64, committed: bool) {
        let mut s = self.state.write();
        debug_assert_eq!(s.cur_txid, id, "end_txn id mismatch");
        s.cur_txid = 0;
        if committed {
            s.last_committed_txid = id;
            s.last_change = Utc::now();
        }
    }

    pub fn get_root(&self) -> Option<Node> {
        self.state.read().root.clone()
    }

    /// Swaps in `newroot`, returning the previous root (the caller is
    /// responsible for freeing/retaining it per the undo discipline).
    pub fn swap_root(&self, newroot: Option<Node>) -> Option<Node> {
        let mut s = self.state.write();
        std::mem::replace(&mut s.root, newroot)
    }

    pub fn update_last_change_timestamp(&self) {
        self.state.write().last_change = Utc::now();
    }

    pub fn last_change(&self) -> DateTime<Utc> {
        self.state.read().last_change
    }

    pub fn dirty(&self) -> bool {
        self.state.read().dirty
    }

    pub fn set_dirty(&self, dirty: bool) {
        self.state.write().dirty = dirty;
    }

    /// Replaces candidate's root with a deep copy of running's root
    /// (`fill_candidate_from_running`, used by discard-changes and by
    /// confirmed-commit restore).
    pub fn fill_from(&self, other: &Cfg) {
        let newroot = other.get_root().map(|r| r.clone_subtree());
        self.swap_root(newroot);
        self.set_dirty(false);
        self.update_last_change_timestamp();
    }

    /// Serializes the root to `path` as XML, applying the save filter
    /// (state data and default-valued leaves excluded, `spec.md` §4.7).
    pub fn persist_to_file(&self, path: &str) -> StoreResult<()> {
        let root = self.get_root();
        let body = root.as_ref().map(|r| r.to_xml_string(true)).unwrap_or_default();
        let doc = format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{body}\n");
        fs::write(path, doc).map_err(|_| StoreError::Io)
    }

    pub fn load_from_file(&self, path: &str, root_factory: impl FnOnce(&str) -> Option<Node>) -> StoreResult<()> {
        if !Path::new(path).exists() {
            return Ok(());
        }
        let contents = fs::read_to_string(path).map_err(|_| StoreError::Io)?;
        let root = root_factory(&contents);
        self.swap_root(root);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_writer_guard() {
        let cfg = Cfg::new(CfgId::Candidate, None);
        assert!(cfg.begin_txn(1));
        assert!(!cfg.begin_txn(2));
        cfg.end_txn(1, true);
        assert_eq!(cfg.last_committed_txid(), 1);
        assert!(cfg.begin_txn(2));
    }

    #[test]
    fn lock_discipline() {
        let cfg = Cfg::new(CfgId::Running, None);
        let sid = SessionId(7);
        assert!(cfg.ok_to_lock());
        cfg.lock(sid).unwrap();
        assert!(!cfg.ok_to_lock());
        assert!(cfg.unlock(SessionId(8)).is_err());
        cfg.unlock(sid).unwrap();
        assert!(cfg.ok_to_lock());
    }
}
