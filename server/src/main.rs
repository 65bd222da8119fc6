/*
 * Created on Thu Jul 02 2020
 *
 * This file is a part of Skytable
 * Skytable (formerly known as TerrabaseDB or Skybase) is a free and open-source
 * NoSQL database written by Sayan Nandan ("the Author") with the
 * vision to provide flexibility in data modelling without compromising
 * on performance, queryability or scalability.
 *
 * Copyright (c) 2020, Sayan Nandan <ohsayan@outlook.com>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

//! # netconfd
//!
//! The NETCONF transaction engine this crate implements (`spec.md` §1) does
//! not own session transport/framing, the YANG module loader, or an XPath
//! parser — those are external collaborators bound in through the seams in
//! `access`, `notify`, `value` and `xpath`. What this binary owns is the
//! engine's process lifecycle: load configuration, boot the datastores from
//! the startup file, keep the confirmed-commit timer ticking while the
//! process is up, and persist `running` back to disk on shutdown.

use env_logger::Builder;
use std::env;
use std::fs;
use std::io::Write;
use std::path;
use std::process;
use std::sync::Arc;
use std::thread;
use std::time;
use tokio::signal;
use tokio::sync::broadcast;

mod access;
mod config;
mod confirmed_commit;
mod datastore;
mod dispatch;
mod engine;
mod error;
mod filter;
mod notify;
mod ops;
mod registry;
mod session;
mod txn;
mod value;
mod xpath;

#[cfg(test)]
mod tests;

use config::EngineConfig;
use engine::Engine;

const PID_FILE: &str = ".netconfd_pid";

fn main() {
    Builder::new()
        .parse_filters(&env::var("NC_LOG").unwrap_or_else(|_| "info".to_owned()))
        .init();

    let pid_file = run_pre_startup_tasks();
    let config = load_config();
    log::info!("netconfd v{} starting up", ncommon::VERSION);

    let txid_path = path::Path::new(&config.data_directory).join("txid.state");
    let engine = Arc::new(Engine::new(
        config,
        txid_path,
        Box::new(access::AllowAll),
        Box::new(notify::RecordingSink::default()),
    ));
    engine.boot_load(startup_root_factory);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("netconfd")
        .enable_all()
        .build()
        .unwrap();
    runtime.block_on(run(Arc::clone(&engine)));
    drop(runtime);

    log::info!("stopped driving confirmed-commit expiry; persisting running before exit");
    loop {
        match engine.running.persist_to_file(&engine.config.startup_filespec) {
            Ok(()) => {
                log::info!("successfully persisted running configuration to disk");
                break;
            }
            Err(e) => {
                log::error!("failed to persist running configuration ({e}); retrying in 10s");
            }
        }
        thread::sleep(time::Duration::from_secs(10));
    }

    drop(pid_file);
    if let Err(e) = fs::remove_file(PID_FILE) {
        log::error!("shutdown failure: failed to remove pid file: {e}");
        process::exit(0x100);
    }
    log::info!("goodbye");
}

/// Drives the confirmed-commit timer and waits for a shutdown signal — the
/// same `tokio::select! { tick => ..., terminator => break }` shape the
/// lineage's `bgsave_scheduler` uses for its own periodic background task.
async fn run(engine: Arc<Engine>) {
    let (terminator_tx, _) = broadcast::channel::<()>(1);
    let mut ticker_terminator = terminator_tx.subscribe();
    let ticker = tokio::spawn(async move {
        let mut interval = tokio::time::interval(time::Duration::from_secs(1));
        loop {
            tokio::select! {
                _ = interval.tick() => confirmed_commit::drive_expiry(&engine),
                _ = ticker_terminator.recv() => break,
            }
        }
    });

    if let Err(e) = signal::ctrl_c().await {
        log::error!("failed to listen for shutdown signal: {e}");
    }
    log::info!("received shutdown signal, stopping");
    let _ = terminator_tx.send(());
    let _ = ticker.await;
}

/// Parses the startup datastore's file contents into a root value-node. The
/// wire/file XML parser is an external collaborator this crate does not own
/// (`spec.md` §1: "YANG module loader/parser"); a real deployment wires a
/// real parser in here. A non-empty file with no parser available is logged
/// and treated as absent, so `StartupErrorPolicy` still gets to decide what
/// happens next.
fn startup_root_factory(contents: &str) -> Option<value::simple::Node> {
    if contents.trim().is_empty() {
        return None;
    }
    log::warn!("startup file is non-empty but this binary has no XML parser wired in; booting with an empty root");
    None
}

fn load_config() -> EngineConfig {
    match env::var("NC_CONFIG") {
        Ok(path) => match fs::read_to_string(&path) {
            Ok(contents) => match EngineConfig::from_yaml(&contents) {
                Ok(cfg) => {
                    log::info!("using configuration from '{path}'");
                    cfg
                }
                Err(e) => {
                    log::error!("failed to parse configuration file '{path}': {e}");
                    process::exit(0x100);
                }
            },
            Err(e) => {
                log::error!("failed to read configuration file '{path}': {e}");
                process::exit(0x100);
            }
        },
        Err(_) => {
            log::warn!("NC_CONFIG not set; using default configuration");
            EngineConfig::default()
        }
    }
}

/// On startup, check if a `.netconfd_pid` file already exists; if it does,
/// another process is using this data directory. Otherwise claim it by
/// writing our own PID.
fn run_pre_startup_tasks() -> fs::File {
    let path = path::Path::new(PID_FILE);
    if path.exists() {
        let pid = fs::read_to_string(path).unwrap_or_else(|_| "unknown".to_owned());
        log::error!("startup failure: another process with PID {pid} is using this data directory");
        process::exit(0x100);
    }
    let mut file = match fs::OpenOptions::new().create(true).write(true).truncate(true).open(PID_FILE) {
        Ok(f) => f,
        Err(e) => {
            log::error!("startup failure: failed to open pid file: {e}");
            process::exit(0x100);
        }
    };
    if let Err(e) = file.write_all(process::id().to_string().as_bytes()) {
        log::error!("startup failure: failed to write to pid file: {e}");
        process::exit(0x100);
    }
    file
}
