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

//! Undo log and transaction control block (C2, `spec.md` §4.2).
//!
//! Grounded on `engine/txn/mod.rs` + `gns.rs` (`TransactionResult`,
//! `JournalAdapter`-style crash-safe id discipline) and
//! `engine/fractal/drivers.rs` (`Mutex`-wrapped journal handle, reused here
//! for the transaction-id file). The undo record itself re-architects the
//! lineage's pointer-soup (`newnode`/`newnode_marker`/`curnode_clone`/
//! `free_curnode`) into a tagged variant per action (`spec.md` §9 Design
//! Note): each variant stores exactly the fields that action's inverse
//! needs, so there's no ambiguous ownership flag to get wrong.

pub mod edit;

use crate::datastore::{Cfg, CfgId};
use crate::error::{TxnError, TxnResult};
use crate::value::simple::Node;
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};

/// Monotonic, crash-safe 64-bit transaction-id allocator (`spec.md` §4.2).
/// Zero is reserved for "no transaction"; the on-disk file is updated
/// synchronously because the engine treats the id as running's version tag
/// immediately after commit. Losing the write after a crash can cause a
/// previously-used id to be reused — documented in `spec.md` §4.2 as
/// acceptable.
pub struct TxIdAllocator {
    path: PathBuf,
    counter: Mutex<u64>,
}

impl TxIdAllocator {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let initial = fs::read_to_string(&path)
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .unwrap_or(0);
        TxIdAllocator {
            path,
            counter: Mutex::new(initial),
        }
    }

    /// Allocates the next id, skipping 0 on wraparound, and persists it
    /// synchronously before returning.
    pub fn alloc(&self) -> TxnResult<u64> {
        let mut counter = self.counter.lock();
        let mut next = counter.wrapping_add(1);
        if next == 0 {
            next = 1;
        }
        fs::write(&self.path, format!("{next}\n")).map_err(|_| TxnError::Store(crate::error::StoreError::Io))?;
        *counter = next;
        Ok(next)
    }

    pub fn current(&self) -> u64 {
        *self.counter.lock()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditType {
    Full,
    Partial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseResult {
    Skipped,
    Ok,
    Failed,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TxFlags {
    pub rootcheck: bool,
    pub commitcheck: bool,
    pub is_validate: bool,
    pub start_bad: bool,
}

/// Per-effective-edit audit entry, queued in apply order and emitted as one
/// `sysConfigChange` notification after a successful commit (`spec.md` §3,
/// §6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    pub path: String,
    pub op: &'static str,
}

/// The transaction control block (`spec.md` §3). Owned by the in-flight
/// request; transferred to the confirmed-commit controller for deferred
/// cleanup when the commit is a confirmed one.
pub struct Tx {
    pub id: u64,
    pub cfg: CfgId,
    pub edit_type: EditType,
    pub flags: TxFlags,
    pub apply_res: PhaseResult,
    pub commit_res: PhaseResult,
    pub rollback_res: PhaseResult,
    pub undo: Vec<edit::Undo>,
    pub audit: Vec<AuditRecord>,
    pub dead_nodes: Vec<Node>,
}

impl Tx {
    /// `new_transaction` (`spec.md` §4.2): fails with `in-use` if the
    /// datastore already has a current transaction, allocates an id and
    /// writes it into the datastore otherwise.
    pub fn begin(
        cfg: &Cfg,
        allocator: &TxIdAllocator,
        edit_type: EditType,
        need_root_check: bool,
        is_validate: bool,
    ) -> TxnResult<Tx> {
        if cfg.cur_txid() != 0 {
            return Err(TxnError::InUse);
        }
        let id = allocator.alloc()?;
        if !cfg.begin_txn(id) {
            // lost a race between the check above and here; surface as in-use
            return Err(TxnError::InUse);
        }
        Ok(Tx {
            id,
            cfg: cfg.id,
            edit_type,
            flags: TxFlags {
                rootcheck: need_root_check,
                commitcheck: false,
                is_validate,
                start_bad: false,
            },
            apply_res: PhaseResult::Skipped,
            commit_res: PhaseResult::Skipped,
            rollback_res: PhaseResult::Skipped,
            undo: Vec::new(),
            audit: Vec::new(),
            dead_nodes: Vec::new(),
        })
    }

    pub fn end(&self, cfg: &Cfg, committed: bool) {
        cfg.end_txn(self.id, committed);
    }
}

/// The one schema-free constraint the root-checker can enforce without a
/// YANG module loader (external per `spec.md` §1): no two list entries
/// sharing a qname under the same parent may carry identical key-leaf
/// values. This stands in for the "unique" category of `spec.md` §4.2's
/// checked-constraint list; min/max-elements, must, when, mandatory-choice
/// and instance-required all need schema metadata this crate doesn't own
/// and are therefore hooks (`DeadNodePredicate`) rather than built-in
/// checks — see `DESIGN.md`.
pub fn root_check(root: &Node) -> Vec<crate::error::record::ErrorRecord> {
    let mut errors = Vec::new();
    check_unique_recursive(root, &mut errors);
    errors
}

fn check_unique_recursive(node: &Node, errors: &mut Vec<crate::error::record::ErrorRecord>) {
    use crate::value::NodeKind;
    let children = node.children();
    let mut seen: Vec<(String, Vec<(String, String)>)> = Vec::new();
    for c in &children {
        if c.kind() == NodeKind::List {
            let keyvals: Vec<(String, String)> = c
                .keys()
                .iter()
                .map(|k| {
                    let v = c
                        .find_child(&crate::value::QName::unqualified(k.clone()))
                        .and_then(|l| l.value())
                        .unwrap_or_default();
                    (k.clone(), v)
                })
                .collect();
            let sig = (c.name(), keyvals.clone());
            if seen.contains(&sig) {
                errors.push(crate::error::record::unique_violation(
                    c.path(),
                    keyvals.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join(","),
                ));
            } else {
                seen.push(sig);
            }
        }
        check_unique_recursive(c, errors);
    }
}

/// Removes dead nodes (`spec.md` §4.5 `validate`: "run delete-dead-nodes,
/// marking nodes whose when-conditions are false"). Without a `when`-aware
/// schema this crate accepts an explicit predicate instead; callers that
/// have no notion of conditional nodes pass a predicate that never matches.
pub fn delete_dead_nodes(root: &Node, is_dead: impl Fn(&Node) -> bool + Copy) -> Vec<Node> {
    let mut removed = Vec::new();
    let children = root.children();
    for c in children {
        if is_dead(&c) {
            if let Some(gone) = root.remove_child(&c) {
                removed.push(gone);
            }
        } else {
            removed.extend(delete_dead_nodes(&c, is_dead));
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastore::CfgId;

    #[test]
    fn allocator_skips_zero_and_persists() {
        let dir = std::env::temp_dir().join(format!("nc-txid-{}", std::process::id()));
        let _ = std::fs::remove_file(&dir);
        let alloc = TxIdAllocator::new(&dir);
        let a = alloc.alloc().unwrap();
        let b = alloc.alloc().unwrap();
        assert!(a >= 1 && b > a);
        let alloc2 = TxIdAllocator::new(&dir);
        assert_eq!(alloc2.current(), b);
        let _ = std::fs::remove_file(&dir);
    }

    #[test]
    fn single_writer_rule() {
        let cfg = Cfg::new(CfgId::Candidate, None);
        let dir = std::env::temp_dir().join(format!("nc-txid-test2-{}", std::process::id()));
        let _ = std::fs::remove_file(&dir);
        let alloc = TxIdAllocator::new(&dir);
        let tx1 = Tx::begin(&cfg, &alloc, EditType::Partial, false, false).unwrap();
        let err = Tx::begin(&cfg, &alloc, EditType::Partial, false, false).unwrap_err();
        assert_eq!(err, TxnError::InUse);
        tx1.end(&cfg, true);
        let _ = std::fs::remove_file(&dir);
    }
}
