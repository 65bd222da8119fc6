/*
 * Created on Tue Jul 28 2026
 *
 * This file is a part of Skytable
 * Skytable (formerly known as TerrabaseDB or Skybase) is a free and open-source
 * NoSQL database written by Sayan Nandan ("the Author") with the
 * vision to provide flexibility in data modelling without compromising
 * on performance, queryability or scalability.
 *
 * Copyright (c) 2021, Sayan Nandan <ohsayan@outlook.com>
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

//! # System-wide registry
//!
//! Global, process-wide engine state that doesn't belong to any one
//! datastore: the overall health flag the original `GLOBAL_STATE` atomic
//! tracked, and the bounded internal-assertion error stack `spec.md` §7
//! describes ("Internal errors detected by assertions are recorded to a
//! bounded error stack and, when logging is disabled, deferred for later
//! printing; they never silently discard the offending operation").

use core::sync::atomic::{AtomicBool, Ordering};
use parking_lot::Mutex;

const ORD_ACQ: Ordering = Ordering::Acquire;
const ORD_REL: Ordering = Ordering::Release;

static GLOBAL_STATE: AtomicBool = AtomicBool::new(true);

pub fn state_okay() -> bool {
    GLOBAL_STATE.load(ORD_ACQ)
}

pub fn poison() {
    GLOBAL_STATE.store(false, ORD_REL)
}

pub fn unpoison() {
    GLOBAL_STATE.store(true, ORD_REL)
}

/// Caps how many internal-assertion failures the bounded stack retains
/// before it starts dropping the oldest entry to make room for the newest.
const ERROR_STACK_CAP: usize = 256;

static ERROR_STACK: Mutex<Vec<String>> = Mutex::new(Vec::new());

/// Records an internal assertion failure. When `log::log_enabled!` is false
/// for the `error` level the message is only retained here for later
/// printing (`drain_deferred`); otherwise it's logged immediately too.
pub fn record_assertion_failure(message: impl Into<String>) {
    let message = message.into();
    if log::log_enabled!(log::Level::Error) {
        log::error!("internal assertion failure: {message}");
    }
    let mut stack = ERROR_STACK.lock();
    if stack.len() >= ERROR_STACK_CAP {
        stack.remove(0);
    }
    stack.push(message);
}

/// Drains and returns everything recorded since the last drain, in the
/// order they were recorded.
pub fn drain_deferred() -> Vec<String> {
    let mut stack = ERROR_STACK.lock();
    std::mem::take(&mut *stack)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poison_roundtrip() {
        assert!(state_okay());
        poison();
        assert!(!state_okay());
        unpoison();
        assert!(state_okay());
    }

    #[test]
    fn error_stack_caps_and_drains() {
        drain_deferred();
        for i in 0..(ERROR_STACK_CAP + 10) {
            record_assertion_failure(format!("failure {i}"));
        }
        let drained = drain_deferred();
        assert_eq!(drained.len(), ERROR_STACK_CAP);
        assert!(drained.last().unwrap().contains(&(ERROR_STACK_CAP + 9).to_string()));
        assert!(drain_deferred().is_empty());
    }
}
