//! Recursive file discovery for template trees

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Entries whose base name starts with this marker are skipped
const HIDDEN_MARKER: char = '.';

fn is_hidden(entry: &DirEntry) -> bool {
    // The root is always walked, even when given as "." or "./x"
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with(HIDDEN_MARKER))
}

fn relative_to(root: &Path, entry: &DirEntry) -> Option<PathBuf> {
    entry.path().strip_prefix(root).ok().map(Path::to_path_buf)
}

/// List every regular file under `root`, relative to `root`
///
/// Hidden entries (and everything beneath a hidden directory) are skipped.
/// Entries are visited in file-name order, so the result is deterministic.
/// Unreadable entries are logged and skipped; a missing root yields an empty
/// list.
pub fn walk(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if is_hidden(entry) {
                debug!("skipping hidden entry {}", entry.path().display());
                return false;
            }
            true
        });

    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_file() => {
                if let Some(path) = relative_to(root, &entry) {
                    files.push(path);
                }
            }
            Ok(_) => {}
            Err(e) => warn!("error walking {}: {}", root.display(), e),
        }
    }
    files
}

/// List every file under `root` whose base name equals `name`
///
/// Unlike [`walk`], hidden entries are searched too.
pub fn find_by_name(root: &Path, name: &str) -> Vec<PathBuf> {
    WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("error walking {}: {}", root.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == name)
        .filter_map(|entry| relative_to(root, &entry))
        .collect()
}
