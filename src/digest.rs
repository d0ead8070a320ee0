//! Record of generated files, used to clean up after the previous run
//!
//! The digest is a plain text file under the output root with one
//! output-relative path per line. Before a commit, every path it lists is
//! deleted, and any directory left empty by a deletion is pruned, climbing up
//! until a non-empty directory or the output root. After a commit, the digest
//! is rewritten with the paths that were just written.

use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::SproutError;
use crate::walker;

/// Digest file name used when none is given
pub const DEFAULT_DIGEST_FILE: &str = "digest.txt";

/// Paths written by a previous run, relative to the output root
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Digest {
    entries: Vec<String>,
}

impl Digest {
    /// Parse newline-delimited digest text, ignoring blank lines
    ///
    /// Entries are kept verbatim apart from a trailing `\r`, so names with
    /// leading or trailing spaces survive.
    pub fn parse(text: &str) -> Self {
        let entries = text
            .lines()
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Self { entries }
    }

    /// Build a digest from written paths, sorted
    pub fn from_paths<'p>(paths: impl IntoIterator<Item = &'p Path>) -> Self {
        let mut entries: Vec<String> = paths.into_iter().map(entry_for).collect();
        entries.sort();
        entries.dedup();
        Self { entries }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn push(&mut self, entry: impl Into<String>) {
        self.entries.push(entry.into());
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialized form, one path per line
    pub fn to_text(&self) -> String {
        let mut text = self.entries.join("\n");
        if !text.is_empty() {
            text.push('\n');
        }
        text
    }
}

/// Result of deleting a list of entries
#[derive(Debug, Default)]
pub struct Cleanup {
    /// Files and directories removed, relative to the output root
    pub removed: Vec<PathBuf>,
    pub errors: Vec<SproutError>,
}

/// Reads, applies and rewrites the digest for one output root
#[derive(Debug, Clone)]
pub struct DigestTracker {
    output_root: PathBuf,
    digest_path: PathBuf,
    track_self: bool,
}

impl DigestTracker {
    /// `digest_path` is relative to `output_root`
    pub fn new(output_root: impl Into<PathBuf>, digest_path: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            digest_path: digest_path.into(),
            track_self: true,
        }
    }

    /// Whether a previous digest lists itself for deletion (default true)
    pub fn with_track_self(mut self, track_self: bool) -> Self {
        self.track_self = track_self;
        self
    }

    /// Digest path relative to the output root
    pub fn digest_path(&self) -> &Path {
        &self.digest_path
    }

    /// Full path of the digest file
    pub fn digest_file(&self) -> PathBuf {
        self.output_root.join(&self.digest_path)
    }

    /// Read the previous digest; `None` on a first run
    pub fn read(&self) -> Result<Option<Digest>, SproutError> {
        let path = self.digest_file();
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no digest at {}", path.display());
                return Ok(None);
            }
            Err(e) => return Err(SproutError::filesystem("read digest", path, e)),
        };

        let mut digest = Digest::parse(&text);
        if self.track_self {
            digest.push(entry_for(&self.digest_path));
        }
        Ok(Some(digest))
    }

    /// Delete every entry and prune directories left empty
    ///
    /// A failure to delete the entry itself is an error (an entry that is
    /// already gone is not). Failures while pruning parents just stop the
    /// climb, since they mean the directory still has other contents.
    pub fn cleanup(&self, entries: &[String]) -> Cleanup {
        let mut cleanup = Cleanup::default();

        for entry in entries {
            let relative = match safe_relative(entry) {
                Ok(relative) => relative,
                Err(e) => {
                    cleanup.errors.push(e);
                    continue;
                }
            };

            let full_path = self.output_root.join(&relative);
            match fs::remove_file(&full_path) {
                Ok(()) => {
                    info!("delete digest entry {}", full_path.display());
                    cleanup.removed.push(relative.clone());
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!("digest entry {} already removed", full_path.display());
                }
                Err(e) => {
                    cleanup
                        .errors
                        .push(SproutError::filesystem("remove digest entry", full_path, e));
                    continue;
                }
            }

            let mut parent = relative.parent();
            while let Some(dir) = parent.filter(|d| !d.as_os_str().is_empty()) {
                let full_dir = self.output_root.join(dir);
                if fs::remove_dir(&full_dir).is_err() {
                    break;
                }
                info!("delete empty directory {}", full_dir.display());
                cleanup.removed.push(dir.to_path_buf());
                parent = dir.parent();
            }
        }

        cleanup
    }

    /// Every non-hidden file currently under the output root, except `keep`
    pub fn existing_entries(&self, keep: &[PathBuf]) -> Vec<String> {
        walker::walk(&self.output_root)
            .into_iter()
            .filter(|path| !keep.contains(path))
            .map(|path| entry_for(&path))
            .collect()
    }

    /// Write a new digest listing `written`
    pub fn persist<'p>(&self, written: impl IntoIterator<Item = &'p Path>) -> Result<(), SproutError> {
        let digest = Digest::from_paths(written);
        let path = self.digest_file();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| SproutError::filesystem("create directory", parent, e))?;
        }
        fs::write(&path, digest.to_text())
            .map_err(|e| SproutError::filesystem("write digest", path, e))
    }
}

/// Digest entries always use `/` separators
fn entry_for(path: &Path) -> String {
    if path.to_str().is_none() {
        warn!(
            "{} is not valid UTF-8; its digest entry will not match it on cleanup",
            path.display()
        );
    }
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Only plain relative paths below the output root may be deleted
fn safe_relative(entry: &str) -> Result<PathBuf, SproutError> {
    let path = Path::new(entry);
    let mut relative = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(SproutError::UnsafeDigestEntry {
                    entry: entry.to_string(),
                    reason: "contains '..'".to_string(),
                })
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(SproutError::UnsafeDigestEntry {
                    entry: entry.to_string(),
                    reason: "is absolute".to_string(),
                })
            }
        }
    }
    Ok(relative)
}
