//! Kept-record selection for duplicate groups.
//!
//! # Overview
//!
//! Every group of two or more identical files resolves to at most one kept
//! record. Directory priority decides the winner; ties at the top priority
//! break deterministically: when every tied record's directory sets the
//! `rename` flag the oldest copy wins (the flag marks directories holding
//! renamed copies of the same logical file, where the oldest is the
//! original), and any remaining tie falls back to lexicographic path order.
//! Scan order never participates, so resolution is stable across runs and
//! platforms.
//!
//! The `keep` policy is an absolute veto that outranks priority: when a
//! group mixes `keep` and non-`keep` members, the retained copy always comes
//! from the `keep` side, and the non-`keep` members are dispatched under
//! their own directories' policies. Copies held by a *different* `keep`
//! directory than the kept record cannot be acted on either way and are
//! reported as an unresolved conflict; a group confined to one `keep`
//! directory is no conflict at all, its extras simply stay put.

use crate::config::{Policy, ScanDirectory};
use crate::scanner::FileRecord;

use super::groups::DuplicateGroup;

/// Outcome of resolving one duplicate group.
///
/// All slots are indices into the scan record list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupResolution {
    /// Record left untouched on disk; `None` when the members are spread
    /// across several keep directories and none may be marked.
    pub kept: Option<usize>,
    /// Records dispatched under their own directory's policy.
    pub duplicates: Vec<usize>,
    /// Keep-protected records that are not the kept one; reported as
    /// conflicts and never acted on.
    pub vetoed: Vec<usize>,
}

impl GroupResolution {
    /// `true` when the group could not mark a kept record.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.kept.is_none()
    }
}

/// Resolve a single group against the directory table.
#[must_use]
pub fn resolve_group(
    group: &DuplicateGroup,
    records: &[FileRecord],
    directories: &[ScanDirectory],
) -> GroupResolution {
    let keep_members: Vec<usize> = group
        .members
        .iter()
        .copied()
        .filter(|&index| directories[records[index].dir_index].policy == Policy::Keep)
        .collect();

    // A group wholly inside a single keep directory still resolves: the
    // extras dispatch under `keep` and stay put. Spanning several keep
    // directories protects every copy, so no kept record can be marked.
    if !keep_members.is_empty() && keep_members.len() == group.members.len() {
        let first_dir = records[keep_members[0]].dir_index;
        if keep_members
            .iter()
            .any(|&index| records[index].dir_index != first_dir)
        {
            log::warn!(
                "Unresolved conflict: all {} copies of {} are spread across keep directories",
                group.members.len(),
                group.hash_hex()
            );
            return GroupResolution {
                kept: None,
                duplicates: Vec::new(),
                vetoed: group.members.clone(),
            };
        }
    }

    let kept = if keep_members.is_empty() {
        priority_winner(&group.members, records, directories)
    } else {
        // The veto outranks priority: the retained copy comes from the
        // keep side even when another directory ranks higher.
        priority_winner(&keep_members, records, directories)
    };
    let kept_dir = records[kept].dir_index;

    let mut duplicates = Vec::new();
    let mut vetoed = Vec::new();
    for &index in &group.members {
        if index == kept {
            continue;
        }
        let dir_index = records[index].dir_index;
        if directories[dir_index].policy == Policy::Keep && dir_index != kept_dir {
            log::warn!(
                "Conflict: {} is keep-protected but {} already retains this content",
                records[index].path.display(),
                records[kept].path.display()
            );
            vetoed.push(index);
        } else {
            duplicates.push(index);
        }
    }

    GroupResolution {
        kept: Some(kept),
        duplicates,
        vetoed,
    }
}

/// Resolve every group; the result is parallel to `groups`.
#[must_use]
pub fn resolve_groups(
    groups: &[DuplicateGroup],
    records: &[FileRecord],
    directories: &[ScanDirectory],
) -> Vec<GroupResolution> {
    let resolutions: Vec<GroupResolution> = groups
        .iter()
        .map(|group| resolve_group(group, records, directories))
        .collect();

    let conflicts = resolutions.iter().filter(|r| r.is_conflict()).count();
    if conflicts > 0 {
        log::warn!("{conflicts} duplicate group(s) left unresolved by keep protection");
    }
    resolutions
}

/// Highest-priority candidate, with deterministic tie-breaks.
fn priority_winner(
    candidates: &[usize],
    records: &[FileRecord],
    directories: &[ScanDirectory],
) -> usize {
    debug_assert!(!candidates.is_empty());

    let mut top_priority = i64::MIN;
    let mut tied: Vec<usize> = Vec::new();
    for &index in candidates {
        let priority = directories[records[index].dir_index].priority;
        if priority > top_priority {
            top_priority = priority;
            tied.clear();
            tied.push(index);
        } else if priority == top_priority {
            tied.push(index);
        }
    }

    let mut winner = tied[0];
    if tied
        .iter()
        .all(|&index| directories[records[index].dir_index].rename)
    {
        // Renamed-copy directories: the oldest copy is the original.
        for &index in &tied[1..] {
            let candidate = (records[index].modified, &records[index].path);
            let best = (records[winner].modified, &records[winner].path);
            if candidate < best {
                winner = index;
            }
        }
    } else {
        for &index in &tied[1..] {
            if records[index].path < records[winner].path {
                winner = index;
            }
        }
    }
    winner
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::path::PathBuf;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    use crate::config::CompiledFilter;

    use super::*;

    fn make_dir(priority: i64, policy: Policy, rename: bool) -> ScanDirectory {
        ScanDirectory {
            root: PathBuf::from("/"),
            priority,
            max_depth: usize::MAX,
            policy,
            rename,
            skip_subdirs: HashSet::new(),
            include_hidden: false,
            rules: CompiledFilter::default(),
        }
    }

    fn make_record(path: &str, dir_index: usize, mtime_secs: u64) -> FileRecord {
        FileRecord {
            path: PathBuf::from(path),
            dir_index,
            size: 100,
            modified: UNIX_EPOCH + Duration::from_secs(mtime_secs),
            hash: Some([7u8; 32]),
            cache_hit: false,
            rule_match: None,
        }
    }

    fn make_group(records: &[FileRecord]) -> DuplicateGroup {
        let mut members: Vec<usize> = (0..records.len()).collect();
        members.sort_by(|&a, &b| records[a].path.cmp(&records[b].path));
        DuplicateGroup {
            hash: [7u8; 32],
            size: 100,
            members,
        }
    }

    // ==================== Priority Tests ====================

    #[test]
    fn test_higher_priority_wins() {
        let dirs = vec![
            make_dir(2, Policy::Trash, false),
            make_dir(1, Policy::Trash, false),
        ];
        let records = vec![
            make_record("/a/file.txt", 0, 100),
            make_record("/b/file.txt", 1, 100),
        ];
        let resolution = resolve_group(&make_group(&records), &records, &dirs);

        assert_eq!(resolution.kept, Some(0));
        assert_eq!(resolution.duplicates, vec![1]);
        assert!(resolution.vetoed.is_empty());
    }

    #[test]
    fn test_priority_tie_uses_path_order() {
        let dirs = vec![make_dir(0, Policy::Trash, false)];
        let records = vec![
            make_record("/data/zzz.txt", 0, 50),
            make_record("/data/aaa.txt", 0, 100),
        ];
        let resolution = resolve_group(&make_group(&records), &records, &dirs);

        // Without the rename flag the mtime is irrelevant.
        assert_eq!(resolution.kept, Some(1));
        assert_eq!(resolution.duplicates, vec![0]);
    }

    #[test]
    fn test_rename_tie_prefers_oldest() {
        let dirs = vec![make_dir(0, Policy::Trash, true)];
        let records = vec![
            make_record("/data/aaa.txt", 0, 200),
            make_record("/data/zzz.txt", 0, 100),
        ];
        let resolution = resolve_group(&make_group(&records), &records, &dirs);

        assert_eq!(resolution.kept, Some(1));
        assert_eq!(resolution.duplicates, vec![0]);
    }

    #[test]
    fn test_rename_mtime_tie_falls_to_path() {
        let dirs = vec![make_dir(0, Policy::Trash, true)];
        let records = vec![
            make_record("/data/bbb.txt", 0, 100),
            make_record("/data/aaa.txt", 0, 100),
        ];
        let resolution = resolve_group(&make_group(&records), &records, &dirs);

        assert_eq!(resolution.kept, Some(1));
    }

    #[test]
    fn test_mixed_rename_flags_use_path_order() {
        let dirs = vec![
            make_dir(0, Policy::Trash, true),
            make_dir(0, Policy::Trash, false),
        ];
        let records = vec![
            make_record("/a/old.txt", 0, 10),
            make_record("/a/new.txt", 1, 999),
        ];
        let resolution = resolve_group(&make_group(&records), &records, &dirs);

        // One directory without the flag disables the mtime rule.
        assert_eq!(resolution.kept, Some(1));
    }

    // ==================== Keep-Veto Tests ====================

    #[test]
    fn test_keep_veto_overrides_priority() {
        let dirs = vec![
            make_dir(0, Policy::Keep, false),
            make_dir(5, Policy::Delete, false),
        ];
        let records = vec![
            make_record("/keep1/report.pdf", 0, 100),
            make_record("/work/report.pdf", 1, 100),
        ];
        let resolution = resolve_group(&make_group(&records), &records, &dirs);

        // The keep copy is retained; the higher-priority copy is dispatched
        // under its own delete policy.
        assert_eq!(resolution.kept, Some(0));
        assert_eq!(resolution.duplicates, vec![1]);
        assert!(resolution.vetoed.is_empty());
    }

    #[test]
    fn test_all_keep_is_unresolved_conflict() {
        let dirs = vec![
            make_dir(0, Policy::Keep, false),
            make_dir(3, Policy::Keep, false),
        ];
        let records = vec![
            make_record("/keep1/photo.jpg", 0, 100),
            make_record("/keep2/photo.jpg", 1, 100),
        ];
        let resolution = resolve_group(&make_group(&records), &records, &dirs);

        assert!(resolution.is_conflict());
        assert_eq!(resolution.kept, None);
        assert!(resolution.duplicates.is_empty());
        assert_eq!(resolution.vetoed.len(), 2);
    }

    #[test]
    fn test_other_keep_directory_is_vetoed() {
        let dirs = vec![
            make_dir(2, Policy::Keep, false),
            make_dir(1, Policy::Keep, false),
            make_dir(9, Policy::Trash, false),
        ];
        let records = vec![
            make_record("/keep1/doc.txt", 0, 100),
            make_record("/keep2/doc.txt", 1, 100),
            make_record("/work/doc.txt", 2, 100),
        ];
        let resolution = resolve_group(&make_group(&records), &records, &dirs);

        assert_eq!(resolution.kept, Some(0));
        assert_eq!(resolution.vetoed, vec![1]);
        assert_eq!(resolution.duplicates, vec![2]);
    }

    #[test]
    fn test_same_keep_directory_extra_copy_is_duplicate() {
        let dirs = vec![make_dir(0, Policy::Keep, false)];
        let records = vec![
            make_record("/keep/a.txt", 0, 100),
            make_record("/keep/b.txt", 0, 100),
        ];
        let resolution = resolve_group(&make_group(&records), &records, &dirs);

        // The sibling copy dispatches under the keep policy (a no-op), it is
        // not a conflict.
        assert_eq!(resolution.kept, Some(0));
        assert_eq!(resolution.duplicates, vec![1]);
        assert!(resolution.vetoed.is_empty());
    }

    // ==================== Determinism Tests ====================

    #[test]
    fn test_resolution_ignores_member_order() {
        let dirs = vec![make_dir(0, Policy::Trash, false)];
        let records = vec![
            make_record("/data/c.txt", 0, 1),
            make_record("/data/a.txt", 0, 2),
            make_record("/data/b.txt", 0, 3),
        ];

        let forward = DuplicateGroup {
            hash: [7u8; 32],
            size: 100,
            members: vec![0, 1, 2],
        };
        let reversed = DuplicateGroup {
            hash: [7u8; 32],
            size: 100,
            members: vec![2, 1, 0],
        };

        let a = resolve_group(&forward, &records, &dirs);
        let b = resolve_group(&reversed, &records, &dirs);
        assert_eq!(a.kept, b.kept);
        assert_eq!(a.kept, Some(1));
    }

    #[test]
    fn test_resolve_groups_is_parallel_to_input() {
        let dirs = vec![make_dir(0, Policy::Trash, false)];
        let records = vec![
            make_record("/data/a.txt", 0, 1),
            make_record("/data/b.txt", 0, 1),
        ];
        let groups = vec![make_group(&records)];
        let resolutions = resolve_groups(&groups, &records, &dirs);

        assert_eq!(resolutions.len(), 1);
        assert_eq!(resolutions[0].kept, Some(0));
    }

    #[test]
    fn test_fresh_mtime_does_not_beat_priority() {
        let dirs = vec![
            make_dir(1, Policy::Trash, true),
            make_dir(0, Policy::Trash, true),
        ];
        let records = vec![
            make_record("/a/file.txt", 0, SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_secs()),
            make_record("/b/file.txt", 1, 1),
        ];
        let resolution = resolve_group(&make_group(&records), &records, &dirs);

        // Priority decides before any mtime comparison.
        assert_eq!(resolution.kept, Some(0));
    }
}
