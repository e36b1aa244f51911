//! Hash grouping of scan records.
//!
//! # Overview
//!
//! Grouping is purely digest-driven: two records land in the same
//! [`DuplicateGroup`] exactly when their BLAKE3 hashes are equal. Rule-matched
//! records and records whose hash failed never participate. Groups hold
//! indices into the scan record list rather than owning copies, so the
//! resolver and executor all talk about the same records.
//!
//! Member lists are sorted by path and the group list by reclaimable bytes,
//! which makes the output independent of walk order.

use std::collections::HashMap;

use crate::scanner::{hash_to_hex, FileRecord, Hash};

/// Records sharing one content hash.
#[derive(Debug, Clone)]
pub struct DuplicateGroup {
    /// BLAKE3 digest shared by every member.
    pub hash: Hash,
    /// Size in bytes of each member.
    pub size: u64,
    /// Indices into the scan record list, sorted by path.
    pub members: Vec<usize>,
}

impl DuplicateGroup {
    /// Number of records in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Number of redundant copies (total minus the one worth keeping).
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.members.len().saturating_sub(1)
    }

    /// Bytes reclaimable if every redundant copy were removed.
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        self.size * self.duplicate_count() as u64
    }

    /// Hash as a hexadecimal string.
    #[must_use]
    pub fn hash_hex(&self) -> String {
        hash_to_hex(&self.hash)
    }
}

/// Statistics from the grouping pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupingStats {
    /// Hashed records considered for grouping.
    pub candidates: usize,
    /// Records whose content occurred exactly once.
    pub unique_files: usize,
    /// Groups with two or more members.
    pub duplicate_groups: usize,
    /// Records inside duplicate groups.
    pub duplicate_files: usize,
    /// Total reclaimable bytes across all groups.
    pub wasted_bytes: u64,
}

/// Group hashed records by content digest.
///
/// Only groups with two or more members are returned; singleton content is
/// counted in the stats and dropped.
#[must_use]
pub fn group_by_hash(records: &[FileRecord]) -> (Vec<DuplicateGroup>, GroupingStats) {
    let mut by_hash: HashMap<Hash, Vec<usize>> = HashMap::new();
    let mut stats = GroupingStats::default();

    for (index, record) in records.iter().enumerate() {
        if record.rule_match.is_some() {
            continue;
        }
        let Some(hash) = record.hash else { continue };
        stats.candidates += 1;
        by_hash.entry(hash).or_default().push(index);
    }

    let mut groups: Vec<DuplicateGroup> = Vec::new();
    for (hash, mut members) in by_hash {
        if members.len() < 2 {
            stats.unique_files += 1;
            continue;
        }
        members.sort_by(|&a, &b| records[a].path.cmp(&records[b].path));
        let size = records[members[0]].size;
        stats.duplicate_groups += 1;
        stats.duplicate_files += members.len();
        stats.wasted_bytes += size * (members.len() as u64 - 1);
        groups.push(DuplicateGroup {
            hash,
            size,
            members,
        });
    }

    // Largest reclaimable waste first; the hash breaks ties so the order is
    // stable across runs.
    groups.sort_by(|a, b| {
        b.wasted_space()
            .cmp(&a.wasted_space())
            .then_with(|| a.hash.cmp(&b.hash))
    });

    log::info!(
        "Grouping complete: {} candidates, {} duplicate groups ({} files, {} reclaimable)",
        stats.candidates,
        stats.duplicate_groups,
        stats.duplicate_files,
        bytesize::ByteSize(stats.wasted_bytes)
    );

    (groups, stats)
}
