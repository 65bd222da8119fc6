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

//! Session identity as seen by the engine. Transport/authentication live
//! outside this crate (`spec.md` §1); what the engine needs is just enough
//! identity to enforce locks, access control and confirmed-commit ownership.

/// `0` is reserved to mean "no session" (`spec.md` §3: datastore lock-holder
/// 0 = unlocked; the backup-restore path loads under session-id 0 to bypass
/// access control).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(pub u64);

impl SessionId {
    pub const NONE: SessionId = SessionId(0);
    pub const INTERNAL: SessionId = SessionId(0);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolVersion {
    Base1_0,
    Base1_1,
}

impl ProtocolVersion {
    pub fn is_1_1(self) -> bool {
        matches!(self, ProtocolVersion::Base1_1)
    }
}

/// A session as the engine sees it. The `Synthetic` variant replaces the
/// lineage's "dummy session" `void*`/sentinel-id convention
/// (`spec.md` §9 Design Note): `load-config` matches on this variant
/// exhaustively instead of comparing a session id against a magic constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    User {
        id: SessionId,
        username: String,
        protocol: ProtocolVersion,
    },
    /// Used only for boot-time startup->running load and backup->running
    /// restore (`spec.md` §4.5 load-config, §4.6). Bypasses access control
    /// and holds no locks.
    Synthetic,
}

impl Session {
    pub fn id(&self) -> SessionId {
        match self {
            Session::User { id, .. } => *id,
            Session::Synthetic => SessionId::INTERNAL,
        }
    }

    pub fn username(&self) -> &str {
        match self {
            Session::User { username, .. } => username,
            Session::Synthetic => "$internal",
        }
    }

    pub fn protocol(&self) -> ProtocolVersion {
        match self {
            Session::User { protocol, .. } => *protocol,
            // the internal loader always has the fullest feature set available
            Session::Synthetic => ProtocolVersion::Base1_1,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self, Session::Synthetic)
    }

    pub fn user(id: u64, username: impl Into<String>, protocol: ProtocolVersion) -> Self {
        Session::User {
            id: SessionId(id),
            username: username.into(),
            protocol,
        }
    }
}
