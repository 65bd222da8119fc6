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

//! Builds the `engine` ghost value `nc_macros::engine_test` hands to every
//! annotated test: a fresh, fully in-memory [`Engine`] plus the
//! notifications it has emitted so far, so a scenario can assert on what
//! fired without the production [`crate::notify::RecordingSink`] having to
//! grow test-only introspection of its own.

use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::notify::{Notification, NotificationSink};
use parking_lot::Mutex;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Mirrors every notification it receives into a shared log, in addition to
/// the same logging [`crate::notify::RecordingSink`] does.
struct DualSink {
    events: Arc<Mutex<Vec<Notification>>>,
}

impl NotificationSink for DualSink {
    fn notify(&mut self, n: Notification) {
        match &n {
            Notification::SysConfigChange(edits) => log::info!("sysConfigChange: {} edit(s)", edits.len()),
            Notification::SysConfirmedCommit(ev) => log::info!("sysConfirmedCommit: {ev:?}"),
            Notification::SysCapabilityChange => log::info!("sysCapabilityChange"),
        }
        self.events.lock().push(n);
    }
}

/// A fresh [`Engine`] plus everything it has notified so far. `Deref`s to
/// `Engine` so call sites read exactly as they would against a bare engine;
/// `notifications` is the one thing a bare `Engine` doesn't expose.
pub struct TestEngine {
    engine: Engine,
    pub notifications: Arc<Mutex<Vec<Notification>>>,
}

impl Deref for TestEngine {
    type Target = Engine;
    fn deref(&self) -> &Engine {
        &self.engine
    }
}

pub fn new_test_engine() -> TestEngine {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!("nc-engine-test-{}-{n}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("create test harness scratch directory");

    let mut config = EngineConfig::default();
    config.backup_path_override = Some(dir.join("running-backup.xml").to_string_lossy().into_owned());
    config.startup_filespec = dir.join("startup-cfg.xml").to_string_lossy().into_owned();
    config.data_directory = dir.to_string_lossy().into_owned();

    let events = Arc::new(Mutex::new(Vec::new()));
    let engine = Engine::new(
        config,
        dir.join("txid.state"),
        Box::new(crate::access::AllowAll),
        Box::new(DualSink { events: Arc::clone(&events) }),
    );
    TestEngine { engine, notifications: events }
}
