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

//! Notifications the engine emits (`spec.md` §6). The notification bus
//! itself (subscription, delivery to sessions) is external; this module is
//! the in-process event sink seam plus a `Vec`-backed reference sink that
//! tests assert against.

use crate::txn::AuditRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmedCommitEvent {
    Start,
    Extend,
    Complete,
    Cancel,
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// emitted once per module load; the module loader is external, so this
    /// crate never raises it itself but keeps the variant so C6/C7 callers
    /// that share a sink with a module loader compile against one enum.
    SysCapabilityChange,
    /// carries the audit queue after a successful commit (§4.2, §6)
    SysConfigChange(Vec<AuditRecord>),
    SysConfirmedCommit(ConfirmedCommitEvent),
}

pub trait NotificationSink {
    fn notify(&mut self, n: Notification);
}

/// Reference sink: appends to a `Vec` so tests can assert on exactly what
/// fired and in what order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<Notification>,
}

impl NotificationSink for RecordingSink {
    fn notify(&mut self, n: Notification) {
        match &n {
            Notification::SysConfigChange(edits) => {
                log::info!("sysConfigChange: {} edit(s)", edits.len());
            }
            Notification::SysConfirmedCommit(ev) => {
                log::info!("sysConfirmedCommit: {:?}", ev);
            }
            Notification::SysCapabilityChange => {
                log::info!("sysCapabilityChange");
            }
        }
        self.events.push(n);
    }
}
