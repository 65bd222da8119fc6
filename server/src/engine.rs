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

//! The engine: the single owned state object threading the datastores,
//! the transaction-id allocator and the confirmed-commit block through the
//! dispatcher (`spec.md` §9 Design Note: "Global transaction-id counter and
//! confirmed-commit block become a single owned state object ... not
//! process-wide statics. Tests can instantiate independent engines.").

use crate::access::AccessControl;
use crate::confirmed_commit::ConfirmedCommit;
use crate::config::EngineConfig;
use crate::datastore::{Cfg, CfgId};
use crate::notify::NotificationSink;
use crate::txn::{AuditRecord, TxIdAllocator};
use parking_lot::Mutex;

/// One running instance of the transaction engine. Owns every piece of
/// state `spec.md` §5 says must not be process-wide: the three datastores,
/// the transaction-id allocator, and the confirmed-commit control block.
pub struct Engine {
    pub config: EngineConfig,
    pub running: Cfg,
    pub candidate: Cfg,
    pub startup: Cfg,
    pub txid: TxIdAllocator,
    pub access: Box<dyn AccessControl + Send + Sync>,
    pub notify: Mutex<Box<dyn NotificationSink + Send>>,
    pub confirmed_commit: Mutex<ConfirmedCommit>,
    /// Audit entries accumulated by `edit-config` against candidate since
    /// the last `commit`, flushed as one `sysConfigChange` notification
    /// when `commit` succeeds (`spec.md` §3: "queued per effective edit;
    /// consumed by change-notification emission after a successful
    /// commit" — since a `Tx`'s own audit queue dies with it at `end()`,
    /// this is where it accumulates across the RPCs between two commits).
    pub pending_audit: Mutex<Vec<AuditRecord>>,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        txid_path: impl AsRef<std::path::Path>,
        access: Box<dyn AccessControl + Send + Sync>,
        notify: Box<dyn NotificationSink + Send>,
    ) -> Self {
        Engine {
            config,
            running: Cfg::new(CfgId::Running, None),
            candidate: Cfg::new(CfgId::Candidate, None),
            startup: Cfg::new(CfgId::Startup, None),
            txid: TxIdAllocator::new(txid_path),
            access,
            notify: Mutex::new(notify),
            confirmed_commit: Mutex::new(ConfirmedCommit::default()),
            pending_audit: Mutex::new(Vec::new()),
        }
    }

    pub fn cfg(&self, id: CfgId) -> &Cfg {
        match id {
            CfgId::Running => &self.running,
            CfgId::Candidate => &self.candidate,
            CfgId::Startup => &self.startup,
        }
    }

    /// Boot-time load: startup -> running, following `spec.md` §4.5
    /// `load-config` used as "internal, boot-time startup->running load".
    pub fn boot_load(&self, root_factory: impl Fn(&str) -> Option<crate::value::simple::Node>) {
        let path = self.config.startup_filespec.clone();
        match self.startup.load_from_file(&path, &root_factory) {
            Ok(()) => {
                let root = self.startup.get_root().map(|r| r.clone_subtree());
                self.running.swap_root(root.clone());
                self.candidate.swap_root(root);
                log::info!("loaded startup configuration from '{path}'");
            }
            Err(e) => {
                log::error!("failed to load startup configuration from '{path}': {e}");
                match self.config.startup_error_policy {
                    crate::config::StartupErrorPolicy::Stop => {
                        crate::registry::poison();
                    }
                    crate::config::StartupErrorPolicy::Continue => {}
                }
            }
        }
    }
}
