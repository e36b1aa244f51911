//! Always-act classification.
//!
//! Two inputs claim a file regardless of duplicate status: an exclusion rule
//! with a `discard!` or `erase!` action (tagged at scan time), and an owning
//! directory whose *policy* is `discard!` or `erase!` (every file in such a
//! directory is matched). A match rides alongside the duplicate
//! classification; the executor gives it precedence.

use std::fmt;

use crate::config::{Policy, RuleAction, ScanDirectory};
use crate::scanner::FileRecord;

/// Action a matched file will receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchAction {
    /// Move to the platform trash.
    Discard,
    /// Delete permanently.
    Erase,
}

impl fmt::Display for MatchAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discard => write!(f, "discard!"),
            Self::Erase => write!(f, "erase!"),
        }
    }
}

/// A record claimed by an always-act rule or directory policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchedFile {
    /// Index into the scan record list.
    pub record: usize,
    pub action: MatchAction,
}

/// Classify every record against the always-act inputs.
///
/// The scan-time rule tag wins over the directory policy when both apply.
#[must_use]
pub fn classify_matches(
    records: &[FileRecord],
    directories: &[ScanDirectory],
) -> Vec<MatchedFile> {
    let mut matches = Vec::new();
    for (index, record) in records.iter().enumerate() {
        let action = match record.rule_match {
            Some(RuleAction::Discard) => Some(MatchAction::Discard),
            Some(RuleAction::Erase) => Some(MatchAction::Erase),
            Some(RuleAction::Skip) | None => match directories[record.dir_index].policy {
                Policy::Discard => Some(MatchAction::Discard),
                Policy::Erase => Some(MatchAction::Erase),
                _ => None,
            },
        };
        if let Some(action) = action {
            log::debug!("Matched {} for {}", record.path.display(), action);
            matches.push(MatchedFile {
                record: index,
                action,
            });
        }
    }
    matches
}
