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

//! Internal, three-tier error taxonomy for the engine.
//!
//! `EngineError` is never sent over the wire as-is; [`crate::error::record::ErrorRecord`]
//! is built from one plus call-site context. See `error::record` for that split.

pub mod record;

pub type RpcResult<T> = Result<T, RpcError>;
pub type TxnResult<T> = Result<T, TxnError>;
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[repr(u8)]
/// Errors raised while parsing or binding an incoming `<rpc>`
pub enum RpcError {
    /// no `message-id` attribute and strict-mode requires one
    MissingMessageId,
    /// operation name not found in the registry, or unsupported by capabilities
    UnknownOperation,
    /// trailing XML content after `</rpc>`
    TrailingJunk,
    /// input tree failed schema validation (types, ranges, required attrs)
    SchemaInvalid,
    /// `rpc_allowed` refused the operation for this user
    AccessDenied,
    /// base:1.1-only construct used on a base:1.0 session
    ProtocolNotEnabled,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[repr(u8)]
/// Errors raised while validating or applying a transaction
pub enum TxnError {
    /// the target datastore already has a transaction in flight
    InUse,
    /// the named datastore does not exist
    CfgNotFound,
    /// `create` found an existing, non-default instance
    DataExists,
    /// `delete` found no existing instance
    DataMissing,
    /// root-check (cardinality/unique/must/when/mandatory) failed
    RootCheckFailed,
    /// rollback of a partially-applied edit itself failed
    RollbackFailed,
    /// an edit referenced an instance-identifier with no matching instance
    MissingInstance,
    /// a unique constraint across sibling instances was violated
    UniqueViolation,
    /// the datastore is not writable by this session (lock held elsewhere, or read-only target)
    AccessDenied,
    /// resource exhaustion (too many pending edits, etc.)
    ResourceDenied,
    /// a base:1.1-gated construct (e.g. `remove`) was used on a base:1.0 session
    UnknownElement,
    #[allow(dead_code)]
    Store(StoreError),
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[repr(u8)]
/// I/O, persistence and lock-contention errors
pub enum StoreError {
    /// underlying file I/O failed (startup/backup/url/txid file)
    Io,
    /// a `file://` URL resolved outside the data directory, or used a disallowed scheme
    BadUrl,
    /// the datastore is locked by another session
    LockDenied,
    /// this session does not hold the lock it is trying to release
    NotLockHolder,
    /// a confirmed-commit is already active
    ConfirmedCommitActive,
}

ncommon::direct_from! {
    TxnError => {
        StoreError as Store
    }
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}
impl std::fmt::Display for TxnError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}
impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}
impl std::error::Error for RpcError {}
impl std::error::Error for TxnError {}
impl std::error::Error for StoreError {}
