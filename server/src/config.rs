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

//! Ambient configuration (`spec.md` §10.3). A narrow slice of knobs the core
//! reads through getters, following the lineage's `serde_yaml`-backed
//! `ConfigurationSet`/`cfgfile` split between compiled-in defaults and a
//! file override. This is deliberately *not* a CLI-flag parser — `spec.md`
//! §1 puts the config file loader/CLI out of scope as an external
//! collaborator; a real deployment builds an `EngineConfig` and hands it to
//! the engine.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetMode {
    RunningOnly,
    CandidateOnly,
    CandidateAndRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartupErrorPolicy {
    Stop,
    Continue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidateAllPolicy {
    /// `<validate>` root-checks with top-op LOAD
    Load,
    /// `<validate>` root-checks with top-op COMMIT
    Commit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidateCapability {
    None,
    V1_0,
    V1_1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfirmedCommitCapability {
    None,
    V1_0,
    V1_1,
}

/// Server capabilities that gate behaviour (`spec.md` §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capabilities {
    pub writable_running: bool,
    pub candidate: bool,
    pub startup: bool,
    pub url: bool,
    pub validate: ValidateCapability,
    pub confirmed_commit: ConfirmedCommitCapability,
    pub base_1_1: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Capabilities {
            writable_running: true,
            candidate: true,
            startup: true,
            url: true,
            validate: ValidateCapability::V1_1,
            confirmed_commit: ConfirmedCommitCapability::V1_1,
            base_1_1: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub capabilities: Capabilities,
    pub target_mode: TargetMode,
    pub startup_error_policy: StartupErrorPolicy,
    pub validate_all_policy: ValidateAllPolicy,
    /// default `confirm-timeout`, seconds (§4.6 default 600)
    pub default_confirm_timeout_secs: u64,
    /// explicit `<backup>` filespec override; if `None`, resolution falls
    /// back to `$NC_HOME/data` then `$HOME/.yuma` (§4.6)
    pub backup_path_override: Option<String>,
    /// strict-mode: a missing `message-id` is an error, but processing
    /// continues so the client still gets a reply (§4.4)
    pub strict_message_id: bool,
    /// directory `file://` URLs resolve relative to (§6)
    pub data_directory: String,
    /// filespec the startup datastore persists to (§4.7)
    pub startup_filespec: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            capabilities: Capabilities::default(),
            target_mode: TargetMode::CandidateAndRunning,
            startup_error_policy: StartupErrorPolicy::Stop,
            validate_all_policy: ValidateAllPolicy::Commit,
            default_confirm_timeout_secs: 600,
            backup_path_override: None,
            strict_message_id: true,
            data_directory: ".".to_owned(),
            startup_filespec: "startup-cfg.xml".to_owned(),
        }
    }
}

impl EngineConfig {
    /// Parses a YAML configuration file's contents, following the
    /// lineage's `serde_yaml`-based loader.
    pub fn from_yaml(s: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(s)
    }

    /// Backup filespec resolution order (§4.6): explicit override, then
    /// `$NC_HOME/data`, then `$HOME/.yuma`.
    pub fn resolve_backup_path(&self) -> String {
        if let Some(p) = &self.backup_path_override {
            return p.clone();
        }
        if let Ok(home) = std::env::var("NC_HOME") {
            return format!("{home}/data/running-backup.xml");
        }
        if let Ok(home) = std::env::var("HOME") {
            return format!("{home}/.yuma/running-backup.xml");
        }
        "running-backup.xml".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_fully_permissive() {
        let cfg = EngineConfig::default();
        assert!(cfg.capabilities.candidate);
        assert_eq!(cfg.default_confirm_timeout_secs, 600);
    }

    #[test]
    fn backup_path_prefers_override() {
        let mut cfg = EngineConfig::default();
        cfg.backup_path_override = Some("/tmp/explicit-backup.xml".into());
        assert_eq!(cfg.resolve_backup_path(), "/tmp/explicit-backup.xml");
    }
}
