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

//! Operation handlers (C5, `spec.md` §4.5): one module per related group of
//! standard NETCONF operations, each following the same validate-then-
//! invoke split the dispatcher's phases expect. Grounded on the lineage's
//! `engine/core/{ddl_misc,dcl,exec}.rs` validate+exec split per statement
//! kind.

pub mod commit;
pub mod copy_delete;
pub mod edit;
pub mod get;
pub mod lock;

use crate::datastore::Cfg;
use crate::engine::Engine;
use crate::error::record::{self, ErrorRecord, ErrorTag, Layer};
use crate::error::{StoreError, TxnError};
use crate::value::simple::Node;
use crate::value::{DataClass, QName};

/// The synthetic top-level container every datastore root stands in for when
/// nothing has been loaded into it yet. Without a schema to derive the real
/// module-level container name from, an empty datastore still needs *some*
/// node to hang the first edit's children off (`spec.md` §3: "root value-node
/// (may be empty)" — empty, not absent).
pub(crate) const DATASTORE_ROOT_NAME: &str = "top";

/// Returns the datastore's current root, or a freshly built detached empty
/// one if none exists yet. The fresh root is *not* attached to `cfg` here —
/// callers only swap it in once the edit that populates it actually commits,
/// so a rolled-back edit against an empty datastore leaves it exactly as
/// empty (`None`) as it started (`spec.md` §8 property 2: undo correctness).
pub(crate) fn ensure_root(cfg: &Cfg) -> Node {
    cfg.get_root().unwrap_or_else(|| Node::container(QName::unqualified(DATASTORE_ROOT_NAME), DataClass::Config))
}

/// Serialises `node` to `path` as a standalone XML document (used by
/// `copy-config` writing to `startup`/`url` destinations, distinct from
/// [`Cfg::persist_to_file`] which always persists the `Cfg`'s own root).
pub(crate) fn write_node_to_file(node: &Node, path: &str) -> std::io::Result<()> {
    let doc = format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}\n", node.to_xml_string(true));
    std::fs::write(path, doc)
}

pub(crate) fn map_store_err(e: StoreError) -> ErrorRecord {
    use StoreError::*;
    match e {
        Io => record::error(Layer::Application, ErrorTag::OperationFailed, "I/O error accessing persisted configuration", None),
        BadUrl => record::error(Layer::Rpc, ErrorTag::InvalidValue, "invalid file:// URL", None),
        LockDenied => record::error(Layer::Protocol, ErrorTag::LockDenied, "datastore is locked by another session", None),
        NotLockHolder => record::error(Layer::Protocol, ErrorTag::LockDenied, "session does not hold this lock", None),
        ConfirmedCommitActive => record::error(Layer::Application, ErrorTag::InUse, "a confirmed-commit is already active", None),
    }
}

pub(crate) fn map_txn_err(e: TxnError) -> ErrorRecord {
    use TxnError::*;
    match e {
        InUse => record::error(Layer::Application, ErrorTag::InUse, "datastore already has a transaction in progress", None),
        CfgNotFound => record::error(Layer::Application, ErrorTag::OperationFailed, "datastore not found", None),
        DataExists => record::error(Layer::Application, ErrorTag::DataExists, "create operation found an existing instance", None),
        DataMissing => record::error(Layer::Application, ErrorTag::DataMissing, "delete operation found no existing instance", None),
        RootCheckFailed => record::error(Layer::Application, ErrorTag::OperationFailed, "root-check failed", None),
        RollbackFailed => record::error(Layer::Application, ErrorTag::RollbackFailed, "rollback failed", None),
        MissingInstance => record::error(
            Layer::Application,
            ErrorTag::DataMissing,
            "insert operation referenced a nonexistent sibling instance",
            None,
        ),
        UniqueViolation => record::error(Layer::Application, ErrorTag::OperationFailed, "unique constraint violated", None),
        AccessDenied => record::error(Layer::Protocol, ErrorTag::AccessDenied, "datastore not writable by this session", None),
        ResourceDenied => record::error(Layer::Application, ErrorTag::ResourceDenied, "resource exhausted", None),
        UnknownElement => record::error(Layer::Rpc, ErrorTag::UnknownElement, "'remove' requires base:1.1", None),
        Store(se) => map_store_err(se),
    }
}

/// Resolves a `file://` URL to a path under the server's data directory
/// (`spec.md` §6): after scheme-stripping, `;`, path separators and
/// whitespace in the remainder are rejected, and the result is joined
/// under `engine.config.data_directory` — never interpreted as an absolute
/// path, so a `file://../../etc/passwd`-style traversal attempt is caught
/// by the separator check before it ever reaches `fs`.
pub fn resolve_file_url(engine: &Engine, url: &str) -> Result<String, ErrorRecord> {
    let rest = match url.strip_prefix("file://") {
        Some(r) => r,
        None => {
            return Err(record::error(
                Layer::Application,
                ErrorTag::OperationNotSupported,
                format!("unsupported URL scheme in '{url}'"),
                None,
            ))
        }
    };
    if rest.is_empty() || rest.contains(';') || rest.contains('/') || rest.contains('\\') || rest.chars().any(|c| c.is_whitespace()) {
        return Err(record::error(
            Layer::Application,
            ErrorTag::InvalidValue,
            format!("'{url}' is not a valid file:// URL (must name a plain file in the data directory)"),
            None,
        ));
    }
    Ok(format!("{}/{}", engine.config.data_directory.trim_end_matches('/'), rest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    fn test_engine() -> Engine {
        let dir = std::env::temp_dir().join(format!("nc-ops-mod-test-{}", std::process::id()));
        Engine::new(
            EngineConfig::default(),
            dir,
            Box::new(crate::access::AllowAll),
            Box::new(crate::notify::RecordingSink::default()),
        )
    }

    #[test]
    fn rejects_path_traversal() {
        let engine = test_engine();
        assert!(resolve_file_url(&engine, "file://../etc/passwd").is_err());
    }

    #[test]
    fn resolves_plain_filename() {
        let engine = test_engine();
        let resolved = resolve_file_url(&engine, "file://backup.xml").unwrap();
        assert!(resolved.ends_with("/backup.xml"));
    }
}
