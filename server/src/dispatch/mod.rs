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

//! RPC dispatcher (C4, `spec.md` §4.4): PARSE -> VALIDATE -> INVOKE -> REPLY
//! -> POST_REPLY for one incoming `<rpc>`.
//!
//! The wire-level XML tokenizer/framer is external to this crate
//! (`spec.md` §1: "session transport and framing"), so `OperationRequest`
//! below stands in for "an `<rpc>` already bound to its operation and
//! parsed into a typed payload" — the PARSE phase's own job (consuming raw
//! XML into this shape) lives in that external layer, same as every other
//! module in this crate treats the value tree and filter trees as already
//! structured rather than raw markup.

pub mod registry;

use crate::config::{ConfirmedCommitCapability, TargetMode, ValidateCapability};
use crate::engine::Engine;
use crate::error::record::{self, ErrorRecord, ErrorTag, Layer};
use crate::filter::Filter;
use crate::session::Session;
use crate::value::simple::Node;
use crate::value::EditOp;
use chrono::{DateTime, Utc};

pub const NS_BASE: &str = "urn:ietf:params:xml:ns:netconf:base:1.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithDefaults {
    /// explicit tagging per RFC 6243; this reference engine treats all
    /// three "explicit"/"trim"/"report-all" values as "include everything
    /// as stored" except `Trim`, which additionally drops default leaves.
    Explicit,
    Trim,
    ReportAll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestOption {
    TestThenSet,
    Set,
    TestOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datastore {
    Running,
    Candidate,
    Startup,
}

impl Datastore {
    pub fn id(self) -> crate::datastore::CfgId {
        match self {
            Datastore::Running => crate::datastore::CfgId::Running,
            Datastore::Candidate => crate::datastore::CfgId::Candidate,
            Datastore::Startup => crate::datastore::CfgId::Startup,
        }
    }
}

/// A `copy-config`/`validate` source or destination: any of the three
/// datastores, a `file://` URL, or an inline `<config>` (`spec.md` §4.5).
pub enum ConfigEndpoint {
    Datastore(Datastore),
    Url(String),
    Inline(Node),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// boot-time startup -> running load
    Boot,
    /// confirmed-commit/backup -> running restore
    Restore,
}

/// One bound, already-parsed NETCONF operation (`spec.md` §4.4-§4.5).
pub enum OperationRequest {
    Get {
        filter: Option<Filter>,
        with_defaults: WithDefaults,
        if_modified_since: Option<DateTime<Utc>>,
    },
    GetConfig {
        source: Datastore,
        filter: Option<Filter>,
        with_defaults: WithDefaults,
    },
    EditConfig {
        target: Datastore,
        default_operation: EditOp,
        test_option: TestOption,
        config: Node,
    },
    CopyConfig {
        source: ConfigEndpoint,
        target: ConfigEndpoint,
    },
    DeleteConfig {
        target: ConfigEndpoint,
    },
    Lock {
        target: Datastore,
    },
    Unlock {
        target: Datastore,
    },
    CloseSession,
    KillSession {
        target_session: crate::session::SessionId,
    },
    Validate {
        source: ConfigEndpoint,
    },
    Commit {
        confirmed: bool,
        confirm_timeout: Option<u32>,
        persist: Option<String>,
        persist_id: Option<String>,
    },
    CancelCommit {
        persist_id: Option<String>,
    },
    DiscardChanges,
    /// internal-only: never produced by wire parsing, only by
    /// [`crate::engine::Engine::boot_load`] and confirmed-commit restore.
    LoadConfig {
        config: Node,
        mode: LoadMode,
    },
}

impl OperationRequest {
    /// `(namespace, local-name)` this request binds to in the registry.
    pub fn name(&self) -> (&'static str, &'static str) {
        use OperationRequest::*;
        let local = match self {
            Get { .. } => "get",
            GetConfig { .. } => "get-config",
            EditConfig { .. } => "edit-config",
            CopyConfig { .. } => "copy-config",
            DeleteConfig { .. } => "delete-config",
            Lock { .. } => "lock",
            Unlock { .. } => "unlock",
            CloseSession => "close-session",
            KillSession { .. } => "kill-session",
            Validate { .. } => "validate",
            Commit { .. } => "commit",
            CancelCommit { .. } => "cancel-commit",
            DiscardChanges => "discard-changes",
            LoadConfig { .. } => "load-config",
        };
        (NS_BASE, local)
    }
}

/// The in-flight message object (`spec.md` §4.4): accumulates errors across
/// every phase; owns nothing else, since the transaction (if any) lives on
/// [`crate::txn::Tx`] instead.
pub struct Message {
    pub message_id: Option<String>,
    pub base_1_1: bool,
    pub errors: Vec<ErrorRecord>,
}

impl Message {
    pub fn push(&mut self, e: ErrorRecord) {
        self.errors.push(e);
    }
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

pub struct RpcReply {
    pub message_id: Option<String>,
    pub errors: Vec<ErrorRecord>,
    pub data: Option<Node>,
    pub last_modified: Option<DateTime<Utc>>,
}

impl RpcReply {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// What an operation's INVOKE phase produced, before the REPLY phase turns
/// it into wire shape.
pub enum OpOutcome {
    Ok,
    OkWithData(Node),
    OkWithDataTimestamped(Node, DateTime<Utc>),
}

/// `Err(())` means VALIDATE or INVOKE already pushed the relevant errors
/// onto `msg`; the dispatcher stops there rather than double-reporting.
pub type OpResult = Result<OpOutcome, ()>;

/// Runs the five phases for one request and returns the `<rpc-reply>` to
/// send back on the session (`spec.md` §4.4).
pub fn dispatch(engine: &Engine, session: &Session, message_id: Option<String>, request: OperationRequest) -> RpcReply {
    let mut msg = Message {
        message_id: message_id.clone(),
        base_1_1: session.protocol().is_1_1(),
        errors: Vec::new(),
    };

    // confirmed-commit timer is checked on a periodic external tick *and*
    // on every dispatch cycle (`spec.md` §5).
    crate::confirmed_commit::drive_expiry(engine);

    if message_id.is_none() && engine.config.strict_message_id {
        msg.push(record::missing_attribute("message-id", None));
        // processing continues regardless (`spec.md` §4.4)
    }

    let (ns, local) = request.name();
    if !engine.access.rpc_allowed(session.username(), local) {
        msg.push(record::error(Layer::Rpc, ErrorTag::AccessDenied, format!("'{local}' denied for this user"), None));
        return reply(msg, None);
    }

    if !registry::supported(engine, ns, local) {
        msg.push(record::error(
            Layer::Rpc,
            ErrorTag::OperationNotSupported,
            format!("'{local}' is not supported by this server's capability set"),
            None,
        ));
        return reply(msg, None);
    }

    let outcome = invoke(engine, session, &mut msg, request);
    match outcome {
        Ok(o) => reply(msg, Some(o)),
        Err(()) => reply(msg, None),
    }
}

fn invoke(engine: &Engine, session: &Session, msg: &mut Message, request: OperationRequest) -> OpResult {
    use crate::ops;
    match request {
        OperationRequest::Get { filter, with_defaults, if_modified_since } => {
            ops::get::get(engine, session, msg, filter, with_defaults, if_modified_since)
        }
        OperationRequest::GetConfig { source, filter, with_defaults } => {
            ops::get::get_config(engine, session, msg, source, filter, with_defaults)
        }
        OperationRequest::EditConfig { target, default_operation, test_option, config } => {
            ops::edit::edit_config(engine, session, msg, target, default_operation, test_option, config)
        }
        OperationRequest::CopyConfig { source, target } => ops::copy_delete::copy_config(engine, session, msg, source, target),
        OperationRequest::DeleteConfig { target } => ops::copy_delete::delete_config(engine, session, msg, target),
        OperationRequest::Lock { target } => ops::lock::lock(engine, session, msg, target),
        OperationRequest::Unlock { target } => ops::lock::unlock(engine, session, msg, target),
        OperationRequest::CloseSession => ops::lock::close_session(engine, session, msg),
        OperationRequest::KillSession { target_session } => ops::lock::kill_session(engine, session, msg, target_session),
        OperationRequest::Validate { source } => ops::commit::validate(engine, session, msg, source),
        OperationRequest::Commit { confirmed, confirm_timeout, persist, persist_id } => {
            ops::commit::commit(engine, session, msg, confirmed, confirm_timeout, persist, persist_id)
        }
        OperationRequest::CancelCommit { persist_id } => ops::commit::cancel_commit(engine, session, msg, persist_id),
        OperationRequest::DiscardChanges => ops::commit::discard_changes(engine, session, msg),
        OperationRequest::LoadConfig { config, mode } => ops::copy_delete::load_config(engine, session, msg, config, mode),
    }
}

fn reply(msg: Message, outcome: Option<OpOutcome>) -> RpcReply {
    let (data, last_modified) = match outcome {
        Some(OpOutcome::Ok) | None => (None, None),
        Some(OpOutcome::OkWithData(n)) => (Some(n), None),
        Some(OpOutcome::OkWithDataTimestamped(n, t)) => (Some(n), Some(t)),
    };
    RpcReply {
        message_id: msg.message_id,
        errors: msg.errors,
        data,
        last_modified,
    }
}

/// `rejects unless capability supported` helper shared by `validate` and
/// `commit` (`spec.md` §4.5).
pub(crate) fn validate_capability_enabled(cap: ValidateCapability) -> bool {
    !matches!(cap, ValidateCapability::None)
}

pub(crate) fn confirmed_commit_capability_enabled(cap: ConfirmedCommitCapability) -> bool {
    !matches!(cap, ConfirmedCommitCapability::None)
}

pub(crate) fn confirmed_commit_requires_base_1_1(cap: ConfirmedCommitCapability) -> bool {
    matches!(cap, ConfirmedCommitCapability::V1_1)
}

pub(crate) fn target_mode_allows_candidate(mode: TargetMode) -> bool {
    matches!(mode, TargetMode::CandidateOnly | TargetMode::CandidateAndRunning)
}
