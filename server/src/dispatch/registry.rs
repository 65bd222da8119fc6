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

//! The operation registry (`spec.md` §4.4): "Keyed by (module-namespace,
//! local-name). Each entry carries up to three callbacks... and a
//! supported/unsupported flag that depends on capability configuration."
//!
//! The standard NETCONF operation set is fixed at compile time, so the
//! three-callback slot this crate's lineage would store per table entry is
//! realized here as the plain `match` in `dispatch::invoke` instead of a
//! runtime vtable; what *is* genuinely data-driven — whether a given
//! operation is supported at all under this server's configured
//! capabilities — lives in this table, keyed exactly as `spec.md`
//! describes, so a capability change never touches the dispatch match arm.

use super::{
    confirmed_commit_capability_enabled, confirmed_commit_requires_base_1_1, target_mode_allows_candidate, validate_capability_enabled,
};
use crate::engine::Engine;

/// Whether `(namespace, local_name)` is currently supported by this
/// server's capability set. Unknown names are always unsupported.
pub fn supported(engine: &Engine, namespace: &str, local_name: &str) -> bool {
    if namespace != super::NS_BASE {
        return false;
    }
    let caps = &engine.config.capabilities;
    match local_name {
        "get" | "get-config" | "lock" | "unlock" | "close-session" | "kill-session" => true,
        "edit-config" => caps.writable_running || caps.candidate,
        "copy-config" | "delete-config" => true,
        "validate" => validate_capability_enabled(caps.validate),
        "commit" => target_mode_allows_candidate(engine.config.target_mode),
        "cancel-commit" => {
            confirmed_commit_capability_enabled(caps.confirmed_commit)
                && (!confirmed_commit_requires_base_1_1(caps.confirmed_commit) || caps.base_1_1)
        }
        "discard-changes" => caps.candidate,
        "load-config" => false, // internal-only, never wire-dispatched
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Capabilities, ConfirmedCommitCapability, EngineConfig, TargetMode, ValidateCapability};

    fn engine_with(caps: Capabilities, target_mode: TargetMode) -> Engine {
        let mut cfg = EngineConfig::default();
        cfg.capabilities = caps;
        cfg.target_mode = target_mode;
        let dir = std::env::temp_dir().join(format!("nc-registry-test-{}-{}", std::process::id(), rand_suffix()));
        Engine::new(cfg, dir, Box::new(crate::access::AllowAll), Box::new(crate::notify::RecordingSink::default()))
    }

    fn rand_suffix() -> u64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap().subsec_nanos() as u64
    }

    #[test]
    fn validate_gated_by_capability() {
        let mut caps = Capabilities::default();
        caps.validate = ValidateCapability::None;
        let engine = engine_with(caps, TargetMode::CandidateAndRunning);
        assert!(!supported(&engine, super::super::NS_BASE, "validate"));
    }

    #[test]
    fn commit_requires_candidate_target_mode() {
        let engine = engine_with(Capabilities::default(), TargetMode::RunningOnly);
        assert!(!supported(&engine, super::super::NS_BASE, "commit"));
    }

    #[test]
    fn cancel_commit_requires_base_1_1_when_capability_is_1_1() {
        let mut caps = Capabilities::default();
        caps.confirmed_commit = ConfirmedCommitCapability::V1_1;
        caps.base_1_1 = false;
        let engine = engine_with(caps, TargetMode::CandidateAndRunning);
        assert!(!supported(&engine, super::super::NS_BASE, "cancel-commit"));
    }

    #[test]
    fn load_config_never_wire_supported() {
        let engine = engine_with(Capabilities::default(), TargetMode::CandidateAndRunning);
        assert!(!supported(&engine, super::super::NS_BASE, "load-config"));
    }
}
