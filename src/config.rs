//! Configuration model, loading, and validation.
//!
//! dupewarden is driven by a TOML file describing the directories to sweep,
//! their relative priority, per-directory policies, and filter rules. The
//! file is loaded through figment with layered precedence:
//!
//! 1. Built-in defaults
//! 2. The config file (`--config`, `DUPEWARDEN_CONFIG`, the platform config
//!    directory, then `./dupewarden.toml`)
//! 3. `DUPEWARDEN_*` environment variables (`__` separates nesting, e.g.
//!    `DUPEWARDEN_GENERAL__DRY_RUN=true`)
//! 4. CLI flags (applied by the caller after loading)
//!
//! Deserialized values stay raw strings where the on-disk syntax is richer
//! than a primitive (sizes like `"250MB"`, ages like `"30d"`, glob/regex
//! patterns). [`Config::compile`] turns the raw model into a
//! [`ResolvedConfig`] with canonical roots and compiled matchers, failing
//! fast on anything malformed; configuration errors abort before any scan.
//!
//! # Example
//!
//! ```toml
//! [general]
//! default_policy = "prompt"
//!
//! [[directories]]
//! path = "/data/archive"
//! priority = 10
//! policy = "keep"
//!
//! [[directories]]
//! path = "~/Downloads"
//! priority = 1
//! policy = "trash"
//! rename = true
//! skip_subdirs = ["node_modules"]
//!
//! [directories.filter]
//! min_size = "1KiB"
//!
//! [[directories.filter.exclude]]
//! ext = ".part"
//! action = "discard!"
//! ```

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, SystemTime};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Errors raised while locating, parsing, or validating the configuration.
///
/// All of these are fatal: the run aborts before any directory is scanned.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No configuration file was found at any candidate location.
    #[error("no configuration file found (searched: {searched})")]
    NotFound { searched: String },

    /// The file exists but could not be parsed or merged.
    #[error("invalid configuration: {0}")]
    Parse(#[from] Box<figment::Error>),

    /// `[[directories]]` is empty.
    #[error("configuration lists no directories to sweep")]
    NoDirectories,

    /// A configured directory does not exist or is not accessible.
    #[error("configured directory {path:?} is not usable: {source}")]
    BadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A configured path exists but is not a directory.
    #[error("configured path {path:?} is not a directory")]
    NotADirectory { path: PathBuf },

    /// An exclude rule is structurally invalid.
    #[error("invalid exclude rule in {scope}: {reason}")]
    BadRule { scope: String, reason: String },

    /// A glob or regex pattern failed to compile.
    #[error("invalid pattern {pattern:?} in {scope}: {reason}")]
    BadPattern {
        scope: String,
        pattern: String,
        reason: String,
    },

    /// A size string such as `min_size` could not be parsed.
    #[error("invalid size {value:?} in {scope}: {reason}")]
    BadSize {
        scope: String,
        value: String,
        reason: String,
    },

    /// An age string such as `max_age` could not be parsed.
    #[error("invalid age {value:?} in {scope}: {reason}")]
    BadAge {
        scope: String,
        value: String,
        reason: String,
    },
}

// ==================== Policy ====================

/// Disposition for a directory's files.
///
/// The first five apply to non-kept duplicates; `Discard` (`discard!`) and
/// `Erase` (`erase!`) are always-act policies that dispose of every matching
/// file regardless of duplicate status. The executor matches exhaustively on
/// this enum, so an unhandled policy is a compile error, not a runtime one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Policy {
    /// Never act on this directory's files; an absolute veto in resolution.
    #[serde(rename = "keep")]
    Keep,
    /// Ask for confirmation, then delete on an affirmative answer.
    #[serde(rename = "prompt")]
    Prompt,
    /// Replace duplicates with hardlinks to the kept copy.
    #[serde(rename = "hardlink")]
    Hardlink,
    /// Move duplicates to the platform trash.
    #[serde(rename = "trash")]
    Trash,
    /// Permanently delete duplicates.
    #[serde(rename = "delete")]
    Delete,
    /// Trash every matching file, duplicate or not (`discard!`).
    #[serde(rename = "discard!")]
    Discard,
    /// Permanently delete every matching file, duplicate or not (`erase!`).
    #[serde(rename = "erase!")]
    Erase,
}

const POLICY_NAMES: [&str; 7] = [
    "keep",
    "prompt",
    "hardlink",
    "trash",
    "delete",
    "discard!",
    "erase!",
];

impl Policy {
    /// The configuration spelling of this policy.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Keep => "keep",
            Self::Prompt => "prompt",
            Self::Hardlink => "hardlink",
            Self::Trash => "trash",
            Self::Delete => "delete",
            Self::Discard => "discard!",
            Self::Erase => "erase!",
        }
    }

    /// True for the always-act policies (`discard!`, `erase!`).
    #[must_use]
    pub fn is_always_act(self) -> bool {
        matches!(self, Self::Discard | Self::Erase)
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Policy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "keep" => Ok(Self::Keep),
            "prompt" => Ok(Self::Prompt),
            "hardlink" => Ok(Self::Hardlink),
            "trash" => Ok(Self::Trash),
            "delete" => Ok(Self::Delete),
            "discard!" => Ok(Self::Discard),
            "erase!" => Ok(Self::Erase),
            other => Err(match suggest_policy(other) {
                Some(candidate) => {
                    format!("unknown policy {other:?}, did you mean {candidate:?}?")
                }
                None => format!(
                    "unknown policy {other:?} (expected one of: {})",
                    POLICY_NAMES.join(", ")
                ),
            }),
        }
    }
}

impl<'de> Deserialize<'de> for Policy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Closest known policy name, if it is close enough to be a likely typo.
fn suggest_policy(input: &str) -> Option<&'static str> {
    POLICY_NAMES
        .iter()
        .map(|name| (*name, strsim::jaro_winkler(input, name)))
        .filter(|(_, score)| *score > 0.72)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(name, _)| name)
}

// ==================== Raw (serde) model ====================

/// Top-level configuration as deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub general: GeneralConfig,
    /// Filter rules applied to every directory in addition to its own.
    pub filter: FilterConfig,
    pub directories: Vec<DirectoryConfig>,
}

/// Global settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneralConfig {
    /// Policy for directories that do not set their own.
    pub default_policy: Policy,
    /// Follow symbolic links while walking. Off by default.
    pub follow_symlinks: bool,
    /// Report would-be actions without touching the filesystem.
    pub dry_run: bool,
    /// Cache snapshot location. Defaults to the platform cache directory.
    pub cache_file: Option<PathBuf>,
    /// Worker threads for hashing. 0 lets the pool size itself to the CPU.
    pub threads: usize,
    /// Files at or above this size are hashed via memory mapping.
    pub large_file_threshold: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_policy: Policy::Prompt,
            follow_symlinks: false,
            dry_run: false,
            cache_file: None,
            threads: 4,
            large_file_threshold: "64MiB".to_string(),
        }
    }
}

/// One swept directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DirectoryConfig {
    /// Directory root. A leading `~/` expands to the home directory.
    pub path: PathBuf,
    /// Higher priority wins duplicate resolution. Default 0.
    pub priority: i64,
    /// Recursion: `true` (unlimited), `false` (top level only), or a number
    /// of subdirectory levels.
    pub subdirs: Recurse,
    /// Disposition for this directory's files; defaults to
    /// `general.default_policy`.
    pub policy: Option<Policy>,
    /// Tie-break flag: among equal-priority duplicates the oldest copy is
    /// kept, and after trash/delete actions the kept copy's mtime is bumped
    /// to the newest removed sibling's.
    pub rename: bool,
    /// Directory names pruned wherever they appear under the root.
    pub skip_subdirs: Vec<String>,
    /// Scan dotfiles and dot-directories. Off by default.
    pub include_hidden: bool,
    /// Rules applied to this directory's files.
    pub filter: FilterConfig,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            priority: 0,
            subdirs: Recurse::Flag(true),
            policy: None,
            rename: false,
            skip_subdirs: Vec::new(),
            include_hidden: false,
            filter: FilterConfig::default(),
        }
    }
}

/// Recursion control: a bare bool or an explicit depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Recurse {
    Flag(bool),
    Depth(u32),
}

impl Recurse {
    /// Maximum walk depth, where 1 means the root's own entries only.
    #[must_use]
    pub fn max_depth(self) -> usize {
        match self {
            Self::Flag(false) => 1,
            Self::Flag(true) => usize::MAX,
            Self::Depth(n) => (n as usize).saturating_add(1),
        }
    }
}

/// Filter rules for a directory (or the global rule set).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterConfig {
    /// Exclude rules, evaluated in order; the first match wins.
    pub exclude: Vec<ExcludeRule>,
    /// Only consider files at least this large (e.g. `"4KiB"`).
    pub min_size: Option<String>,
    /// Only consider files at most this large.
    pub max_size: Option<String>,
    /// Only consider files at least this old (e.g. `"30d"`).
    pub min_age: Option<String>,
    /// Only consider files at most this old.
    pub max_age: Option<String>,
}

/// A single exclude rule: exactly one of `name`, `ext`, or `regex`.
///
/// A plain rule (`action = "skip"`, the default) omits matching files
/// entirely. `discard!`/`erase!` rules additionally dispose of the file: it
/// never joins a duplicate group, but the always-act classifier sees it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExcludeRule {
    /// Glob matched against the file name (`"*.iso"`).
    pub name: Option<String>,
    /// Extension match, leading dot optional, case-insensitive (`".tmp"`).
    pub ext: Option<String>,
    /// Regular expression matched against the file name.
    pub regex: Option<String>,
    /// What to do with matching files.
    pub action: RuleAction,
}

/// Outcome of an exclude rule match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleAction {
    /// Omit the file from the run entirely.
    #[default]
    #[serde(rename = "skip")]
    Skip,
    /// Omit from duplicate grouping and move to trash.
    #[serde(rename = "discard!")]
    Discard,
    /// Omit from duplicate grouping and permanently delete.
    #[serde(rename = "erase!")]
    Erase,
}

// ==================== Compiled model ====================

/// Validated configuration with canonical roots and compiled matchers.
#[derive(Debug)]
pub struct ResolvedConfig {
    pub directories: Vec<ScanDirectory>,
    /// Global rules, applied to every file in addition to its directory's.
    pub global_rules: CompiledFilter,
    pub follow_symlinks: bool,
    pub dry_run: bool,
    pub cache_file: Option<PathBuf>,
    pub threads: usize,
    pub large_file_threshold: u64,
}

/// A directory ready to walk.
#[derive(Debug)]
pub struct ScanDirectory {
    /// Canonical root path.
    pub root: PathBuf,
    pub priority: i64,
    pub max_depth: usize,
    pub policy: Policy,
    pub rename: bool,
    pub skip_subdirs: HashSet<String>,
    pub include_hidden: bool,
    pub rules: CompiledFilter,
}

/// Compiled filter set.
#[derive(Debug, Default)]
pub struct CompiledFilter {
    exclude: Vec<CompiledRule>,
    min_size: Option<u64>,
    max_size: Option<u64>,
    min_age: Option<Duration>,
    max_age: Option<Duration>,
}

#[derive(Debug)]
struct CompiledRule {
    matcher: RuleMatcher,
    action: RuleAction,
}

#[derive(Debug)]
enum RuleMatcher {
    Name(glob::Pattern),
    Extension(String),
    Regex(regex::Regex),
}

impl RuleMatcher {
    fn matches(&self, file_name: &str) -> bool {
        match self {
            Self::Name(pattern) => pattern.matches(file_name),
            Self::Extension(ext) => Path::new(file_name)
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase() == *ext)
                .unwrap_or(false),
            Self::Regex(re) => re.is_match(file_name),
        }
    }
}

impl CompiledFilter {
    /// First exclude rule matching `file_name`, if any.
    #[must_use]
    pub fn exclude_action(&self, file_name: &str) -> Option<RuleAction> {
        self.exclude
            .iter()
            .find(|rule| rule.matcher.matches(file_name))
            .map(|rule| rule.action)
    }

    /// Whether `size` passes the size bounds.
    #[must_use]
    pub fn size_ok(&self, size: u64) -> bool {
        if let Some(min) = self.min_size {
            if size < min {
                return false;
            }
        }
        if let Some(max) = self.max_size {
            if size > max {
                return false;
            }
        }
        true
    }

    /// Whether a file modified at `mtime` passes the age bounds, measured
    /// against `now`. A timestamp in the future counts as age zero.
    #[must_use]
    pub fn age_ok(&self, mtime: SystemTime, now: SystemTime) -> bool {
        if self.min_age.is_none() && self.max_age.is_none() {
            return true;
        }
        let age = now.duration_since(mtime).unwrap_or(Duration::ZERO);
        if let Some(min) = self.min_age {
            if age < min {
                return false;
            }
        }
        if let Some(max) = self.max_age {
            if age > max {
                return false;
            }
        }
        true
    }

    /// True when no rule or bound is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exclude.is_empty()
            && self.min_size.is_none()
            && self.max_size.is_none()
            && self.min_age.is_none()
            && self.max_age.is_none()
    }
}

// ==================== Loading ====================

const QUALIFIER: &str = "io";
const ORGANIZATION: &str = "dupewarden";
const APPLICATION: &str = "dupewarden";

/// Locate the configuration file.
///
/// Checks, in order: the explicit override, `DUPEWARDEN_CONFIG`, the
/// platform config directory, then `./dupewarden.toml`.
///
/// # Errors
///
/// [`ConfigError::NotFound`] listing the candidates when none exists.
pub fn find_config_file(overridden: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = overridden {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(ConfigError::NotFound {
            searched: path.display().to_string(),
        });
    }

    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Ok(env_path) = std::env::var("DUPEWARDEN_CONFIG") {
        candidates.push(PathBuf::from(env_path));
    }
    if let Some(dirs) = directories::ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION) {
        candidates.push(dirs.config_dir().join("dupewarden.toml"));
    }
    candidates.push(PathBuf::from("dupewarden.toml"));

    for candidate in &candidates {
        if candidate.is_file() {
            log::debug!("using configuration file {}", candidate.display());
            return Ok(candidate.clone());
        }
    }

    let searched = candidates
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    Err(ConfigError::NotFound { searched })
}

/// Default cache snapshot location in the platform cache directory.
#[must_use]
pub fn default_cache_path() -> Option<PathBuf> {
    directories::ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
        .map(|dirs| dirs.cache_dir().join("cache.json"))
}

impl Config {
    /// Load configuration from `path`, layered with defaults and
    /// `DUPEWARDEN_*` environment variables.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] when the file or environment cannot be merged
    /// into the model.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("DUPEWARDEN_").split("__"));
        let config: Config = figment.extract().map_err(Box::new)?;
        Ok(config)
    }

    /// Validate and compile into a [`ResolvedConfig`].
    ///
    /// Canonicalizes every directory root, compiles glob/regex rules, and
    /// parses size/age strings.
    ///
    /// # Errors
    ///
    /// Any structural problem: no directories, a missing root, an invalid
    /// pattern, or a malformed size/age string.
    pub fn compile(&self) -> Result<ResolvedConfig, ConfigError> {
        if self.directories.is_empty() {
            return Err(ConfigError::NoDirectories);
        }

        let mut directories = Vec::with_capacity(self.directories.len());
        for dir in &self.directories {
            let expanded = expand_home(&dir.path);
            let root =
                std::fs::canonicalize(&expanded).map_err(|source| ConfigError::BadDirectory {
                    path: expanded.clone(),
                    source,
                })?;
            if !root.is_dir() {
                return Err(ConfigError::NotADirectory { path: root });
            }

            let scope = format!("directory {}", dir.path.display());
            directories.push(ScanDirectory {
                root,
                priority: dir.priority,
                max_depth: dir.subdirs.max_depth(),
                policy: dir.policy.unwrap_or(self.general.default_policy),
                rename: dir.rename,
                skip_subdirs: dir.skip_subdirs.iter().cloned().collect(),
                include_hidden: dir.include_hidden,
                rules: compile_filter(&dir.filter, &scope)?,
            });
        }

        let global_rules = compile_filter(&self.filter, "global filter")?;
        let large_file_threshold =
            parse_size(&self.general.large_file_threshold).map_err(|reason| {
                ConfigError::BadSize {
                    scope: "general.large_file_threshold".to_string(),
                    value: self.general.large_file_threshold.clone(),
                    reason,
                }
            })?;

        Ok(ResolvedConfig {
            directories,
            global_rules,
            follow_symlinks: self.general.follow_symlinks,
            dry_run: self.general.dry_run,
            cache_file: self.general.cache_file.clone(),
            threads: self.general.threads,
            large_file_threshold,
        })
    }
}

fn compile_filter(filter: &FilterConfig, scope: &str) -> Result<CompiledFilter, ConfigError> {
    let mut exclude = Vec::with_capacity(filter.exclude.len());
    for rule in &filter.exclude {
        exclude.push(compile_rule(rule, scope)?);
    }

    let parse_bound = |value: &Option<String>, field: &str| -> Result<Option<u64>, ConfigError> {
        value
            .as_deref()
            .map(|raw| {
                parse_size(raw).map_err(|reason| ConfigError::BadSize {
                    scope: format!("{scope}.{field}"),
                    value: raw.to_string(),
                    reason,
                })
            })
            .transpose()
    };
    let parse_age_bound =
        |value: &Option<String>, field: &str| -> Result<Option<Duration>, ConfigError> {
            value
                .as_deref()
                .map(|raw| {
                    parse_age(raw).map_err(|reason| ConfigError::BadAge {
                        scope: format!("{scope}.{field}"),
                        value: raw.to_string(),
                        reason,
                    })
                })
                .transpose()
        };

    Ok(CompiledFilter {
        exclude,
        min_size: parse_bound(&filter.min_size, "min_size")?,
        max_size: parse_bound(&filter.max_size, "max_size")?,
        min_age: parse_age_bound(&filter.min_age, "min_age")?,
        max_age: parse_age_bound(&filter.max_age, "max_age")?,
    })
}

fn compile_rule(rule: &ExcludeRule, scope: &str) -> Result<CompiledRule, ConfigError> {
    let set = [
        rule.name.is_some(),
        rule.ext.is_some(),
        rule.regex.is_some(),
    ]
    .iter()
    .filter(|present| **present)
    .count();
    if set != 1 {
        return Err(ConfigError::BadRule {
            scope: scope.to_string(),
            reason: "exactly one of `name`, `ext`, `regex` must be set".to_string(),
        });
    }

    let matcher = if let Some(name) = &rule.name {
        RuleMatcher::Name(glob::Pattern::new(name).map_err(|e| ConfigError::BadPattern {
            scope: scope.to_string(),
            pattern: name.clone(),
            reason: e.to_string(),
        })?)
    } else if let Some(ext) = &rule.ext {
        RuleMatcher::Extension(ext.trim_start_matches('.').to_lowercase())
    } else {
        let raw = rule.regex.as_deref().unwrap_or_default();
        RuleMatcher::Regex(regex::Regex::new(raw).map_err(|e| ConfigError::BadPattern {
            scope: scope.to_string(),
            pattern: raw.to_string(),
            reason: e.to_string(),
        })?)
    };

    Ok(CompiledRule {
        matcher,
        action: rule.action,
    })
}

/// Expand a leading `~/` to the user's home directory.
fn expand_home(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(base) = directories::BaseDirs::new() {
            return base.home_dir().join(stripped);
        }
    }
    path.to_path_buf()
}

// ==================== String parsers ====================

/// Parse a human-readable size string into bytes.
///
/// Supports decimal (KB/MB/GB/TB) and binary (KiB/MiB/GiB/TiB) suffixes,
/// plus bare `K`/`M`/`G`/`T` as decimal. Case-insensitive.
///
/// # Example
///
/// ```
/// use dupewarden::config::parse_size;
///
/// assert_eq!(parse_size("1024").unwrap(), 1024);
/// assert_eq!(parse_size("1KB").unwrap(), 1000);
/// assert_eq!(parse_size("1KiB").unwrap(), 1024);
/// ```
///
/// # Errors
///
/// Returns an error message for an empty string, an invalid number, or an
/// unknown suffix.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("size cannot be empty".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("invalid number: {num_str:?}"))?;
    if num < 0.0 {
        return Err("size cannot be negative".to_string());
    }

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1_073_741_824,
        "TB" | "T" => 1_000_000_000_000,
        "TIB" => 1_099_511_627_776,
        _ => return Err(format!("unknown size suffix: {suffix:?}")),
    };

    Ok((num * multiplier as f64) as u64)
}

/// Parse a human-readable age string into a duration.
///
/// Suffixes: `s`, `m` (minutes), `h`, `d`, `w`, `mo` (30 days), `y`
/// (365 days). A bare number means seconds.
///
/// # Errors
///
/// Returns an error message for an empty string, an invalid number, or an
/// unknown suffix.
pub fn parse_age(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("age cannot be empty".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_lowercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("invalid number: {num_str:?}"))?;
    if num < 0.0 {
        return Err("age cannot be negative".to_string());
    }

    let seconds_per_unit: f64 = match suffix.as_str() {
        "" | "s" => 1.0,
        "m" => 60.0,
        "h" => 3_600.0,
        "d" => 86_400.0,
        "w" => 604_800.0,
        "mo" => 2_592_000.0,
        "y" => 31_536_000.0,
        _ => return Err(format!("unknown age suffix: {suffix:?}")),
    };

    Ok(Duration::from_secs_f64(num * seconds_per_unit))
}
