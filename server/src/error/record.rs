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

//! Wire-facing `<rpc-error>` records (C1, `spec.md` §4.1).
//!
//! An [`ErrorRecord`] is always built *from* an [`super::EngineError`]-ish
//! failure plus call-site context (session, message header, the XML/value
//! node that the error is about). The two stay separate types: an internal
//! `Result` can carry an owned subtree to roll back, something a wire record
//! never needs.

use crate::session::SessionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Transport,
    Rpc,
    Protocol,
    Application,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// The wire error-tag taxonomy (`spec.md` §4.1). `MalformedMessage` is
/// `base:1.1` only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorTag {
    InUse,
    InvalidValue,
    TooBig,
    MissingAttribute,
    BadAttribute,
    UnknownAttribute,
    MissingElement,
    BadElement,
    UnknownElement,
    UnknownNamespace,
    AccessDenied,
    LockDenied,
    ResourceDenied,
    RollbackFailed,
    DataExists,
    DataMissing,
    OperationNotSupported,
    OperationFailed,
    MalformedMessage,
}

impl ErrorTag {
    pub fn wire_name(self) -> &'static str {
        use ErrorTag::*;
        match self {
            InUse => "in-use",
            InvalidValue => "invalid-value",
            TooBig => "too-big",
            MissingAttribute => "missing-attribute",
            BadAttribute => "bad-attribute",
            UnknownAttribute => "unknown-attribute",
            MissingElement => "missing-element",
            BadElement => "bad-element",
            UnknownElement => "unknown-element",
            UnknownNamespace => "unknown-namespace",
            AccessDenied => "access-denied",
            LockDenied => "lock-denied",
            ResourceDenied => "resource-denied",
            RollbackFailed => "rollback-failed",
            DataExists => "data-exists",
            DataMissing => "data-missing",
            OperationNotSupported => "operation-not-supported",
            OperationFailed => "operation-failed",
            MalformedMessage => "malformed-message",
        }
    }

    /// The numeric status code rendered as `app-tag` when the caller supplies none.
    pub fn status_code(self) -> u32 {
        self as u32
    }
}

/// What the error-path was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamNodeType {
    /// error-path was derived from a wire XML node (its document position)
    Xml,
    /// error-path was derived from a value-tree node (instance identifier)
    Value,
}

/// A single typed `<error-info>` child. Ordering within the record's list is
/// wire-significant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorInfoItem {
    BadAttribute(String),
    BadElement(String),
    BadNamespace(String),
    SessionId(SessionId),
    /// free-form `(local-name, value)` pair for everything else
    Other(String, String),
}

#[derive(Debug, Clone)]
pub struct ErrorRecord {
    pub layer: Layer,
    pub severity: Severity,
    pub tag: ErrorTag,
    pub app_tag: Option<String>,
    pub error_path: Option<String>,
    pub message: String,
    pub info: Vec<ErrorInfoItem>,
}

impl ErrorRecord {
    pub fn app_tag_rendered(&self) -> String {
        self.app_tag
            .clone()
            .unwrap_or_else(|| self.tag.status_code().to_string())
    }
}

/// Builds one `ErrorRecord` and would append it to the in-flight message's
/// error queue (§4.1: "Each call produces one `Error` appended to the
/// message's error queue"). The queue itself is owned by the dispatcher's
/// message object (`crate::dispatch::Message`); this function is the single
/// place that knows how to turn call-site context into a wire record.
#[allow(clippy::too_many_arguments)]
pub fn record_error(
    layer: Layer,
    tag: ErrorTag,
    message: impl Into<String>,
    error_path: Option<String>,
    param_node_type: ParamNodeType,
    severity: Severity,
    info: Vec<ErrorInfoItem>,
) -> ErrorRecord {
    let _ = param_node_type; // kept for call-site documentation; path is precomputed by the caller
    ErrorRecord {
        layer,
        severity,
        tag,
        app_tag: None,
        error_path,
        message: message.into(),
        info,
    }
}

pub fn error(layer: Layer, tag: ErrorTag, message: impl Into<String>, path: Option<String>) -> ErrorRecord {
    record_error(layer, tag, message, path, ParamNodeType::Value, Severity::Error, Vec::new())
}

pub fn warning(layer: Layer, tag: ErrorTag, message: impl Into<String>) -> ErrorRecord {
    record_error(layer, tag, message, None, ParamNodeType::Value, Severity::Warning, Vec::new())
}

/// `missing-instance` style insert error (`spec.md` §4.1: "insert errors").
pub fn insert_missing_instance(path: String, key_or_value: String) -> ErrorRecord {
    let mut rec = error(
        Layer::Application,
        ErrorTag::DataMissing,
        "insert operation referenced a nonexistent sibling instance",
        Some(path),
    );
    rec.info.push(ErrorInfoItem::Other("missing-instance".into(), key_or_value));
    rec
}

pub fn unique_violation(path: String, leaf: String) -> ErrorRecord {
    let mut rec = error(
        Layer::Application,
        ErrorTag::OperationFailed,
        "unique constraint violated",
        Some(path),
    );
    rec.info.push(ErrorInfoItem::Other("non-unique".into(), leaf));
    rec
}

pub fn bad_attribute(attr: &str, element_path: Option<String>) -> ErrorRecord {
    let mut rec = error(Layer::Rpc, ErrorTag::BadAttribute, format!("bad attribute '{attr}'"), element_path);
    rec.info.push(ErrorInfoItem::BadAttribute(attr.to_owned()));
    rec
}

pub fn unknown_attribute(attr: &str, element_path: Option<String>) -> ErrorRecord {
    let mut rec = error(Layer::Rpc, ErrorTag::UnknownAttribute, format!("unknown attribute '{attr}'"), element_path);
    rec.info.push(ErrorInfoItem::BadAttribute(attr.to_owned()));
    rec
}

pub fn missing_attribute(attr: &str, element_path: Option<String>) -> ErrorRecord {
    let mut rec = error(Layer::Rpc, ErrorTag::MissingAttribute, format!("missing attribute '{attr}'"), element_path);
    rec.info.push(ErrorInfoItem::BadAttribute(attr.to_owned()));
    rec
}
