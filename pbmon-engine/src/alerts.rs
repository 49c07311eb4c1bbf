//! Alert deduplication.
//!
//! Every poll hands the full batch of currently outstanding errors to
//! [`AlertDeduplicator::process`]. An identity is announced the first time it
//! shows up, stays silent while it keeps showing up, and is forgotten as soon
//! as a batch no longer contains it, so a recurrence is announced again.
//!
//! Each [`ErrorKind`] keeps its own identity set: a server that is both
//! offline and over its resource limits is tracked twice, independently.

use std::collections::HashSet;
use std::fmt::Write as _;

use pbmon_domain::{ErrorKind, ErrorRecord};
use tracing::debug;

use crate::markup::rewrite_markers;

/// Placeholder for metrics or details the collector did not supply.
const MISSING: &str = "-";

// =============================================================================
// Alert State
// =============================================================================

/// Identities already announced, one set per error kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertState {
    offline: HashSet<String>,
    system: HashSet<String>,
    instance: HashSet<String>,
}

impl AlertState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    fn set(&self, kind: ErrorKind) -> &HashSet<String> {
        match kind {
            ErrorKind::Offline => &self.offline,
            ErrorKind::System => &self.system,
            ErrorKind::Instance => &self.instance,
        }
    }

    fn set_mut(&mut self, kind: ErrorKind) -> &mut HashSet<String> {
        match kind {
            ErrorKind::Offline => &mut self.offline,
            ErrorKind::System => &mut self.system,
            ErrorKind::Instance => &mut self.instance,
        }
    }

    /// Whether `identity` has already been announced for `kind`.
    pub fn contains(&self, kind: ErrorKind, identity: &str) -> bool {
        self.set(kind).contains(identity)
    }

    /// Number of announced identities for `kind`.
    pub fn len(&self, kind: ErrorKind) -> usize {
        self.set(kind).len()
    }

    /// True when nothing is outstanding in any kind.
    pub fn is_empty(&self) -> bool {
        self.offline.is_empty() && self.system.is_empty() && self.instance.is_empty()
    }

    /// Sorted identities for `kind`.
    pub fn identities(&self, kind: ErrorKind) -> Vec<String> {
        let mut ids: Vec<String> = self.set(kind).iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Record `identity`; returns false if it was already present.
    fn insert(&mut self, kind: ErrorKind, identity: &str) -> bool {
        self.set_mut(kind).insert(identity.to_string())
    }

    /// Keep only identities present in `batch` for their own kind.
    fn retain_present(&mut self, batch: &[ErrorRecord]) {
        for kind in [ErrorKind::Offline, ErrorKind::System, ErrorKind::Instance] {
            let present: HashSet<&str> = batch
                .iter()
                .filter(|record| record.kind == kind)
                .map(|record| record.identity.as_str())
                .collect();
            self.set_mut(kind).retain(|id| present.contains(id.as_str()));
        }
    }
}

// =============================================================================
// Alert Deduplicator
// =============================================================================

/// Turns successive error batches into "report once while active" alerts.
#[derive(Debug, Default)]
pub struct AlertDeduplicator {
    state: AlertState,
}

impl AlertDeduplicator {
    /// Create a deduplicator with nothing announced yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current announced identities.
    pub fn state(&self) -> &AlertState {
        &self.state
    }

    /// Process one poll's batch.
    ///
    /// Returns the alert text for newly seen identities with color markers
    /// rewritten, or `None` if there is nothing new to say.
    pub fn process(&mut self, batch: &[ErrorRecord]) -> Option<String> {
        let mut message = String::new();

        for record in batch {
            if self.state.insert(record.kind, &record.identity) {
                format_line(&mut message, record);
            }
        }

        self.state.retain_present(batch);

        debug!(
            offline = self.state.len(ErrorKind::Offline),
            system = self.state.len(ErrorKind::System),
            instance = self.state.len(ErrorKind::Instance),
            "Alert state after cycle"
        );

        let message = rewrite_markers(&message);
        if message.is_empty() {
            None
        } else {
            Some(message)
        }
    }
}

fn format_line(out: &mut String, record: &ErrorRecord) {
    let or_missing = |value: Option<&str>| value.unwrap_or(MISSING).to_string();

    // Writing into a String cannot fail.
    let _ = match record.kind {
        ErrorKind::Offline => writeln!(out, "Server: *{}* is offline", record.server),
        ErrorKind::System => writeln!(
            out,
            "Server: {} Instance: system Mem: {} CPU: {} Swap: {} Disk: {}",
            record.server,
            or_missing(record.mem()),
            or_missing(record.cpu()),
            or_missing(record.swap()),
            or_missing(record.disk()),
        ),
        ErrorKind::Instance => writeln!(
            out,
            "Server: {} Instance: {} Mem: {} CPU: {} Error: {} Traceback: {}",
            record.server,
            record.identity,
            or_missing(record.mem()),
            or_missing(record.cpu()),
            or_missing(record.error.as_deref()),
            or_missing(record.traceback.as_deref()),
        ),
    };
}

// =============================================================================
// Tests
// =============================================================================
