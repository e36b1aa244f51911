//! Duplicate grouping, resolution, and always-act matching.
//!
//! # Architecture
//!
//! - [`groups`]: digest grouping of scan records
//! - [`resolver`]: kept-record selection (priority, tie-breaks, keep-veto)
//! - [`matcher`]: always-act classification riding alongside the groups
//!
//! All three stages run after the scanner's barrier and only read the
//! record list; they produce index-based classifications the executor
//! turns into filesystem actions.

pub mod groups;
pub mod matcher;
pub mod resolver;

pub use groups::{group_by_hash, DuplicateGroup, GroupingStats};
pub use matcher::{classify_matches, MatchAction, MatchedFile};
pub use resolver::{resolve_group, resolve_groups, GroupResolution};
