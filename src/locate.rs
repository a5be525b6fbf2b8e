//! Binary discovery inside an extracted tree.
//!
//! Release archives place the executable anywhere from the top level to a
//! few directories deep. The locator walks the tree with an explicit queue
//! (no recursion, so hostile archive depth cannot overflow the stack): at
//! each directory every regular file is checked for an exact base-name
//! match before any subdirectory is visited, so the shallowest match
//! always wins. Same-depth ties follow directory listing order.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Find the first regular file named exactly `target_name` under `root`.
///
/// Returns `None` if no such file exists anywhere in the subtree.
/// Unreadable directories are skipped rather than failing the search.
pub fn find_binary(target_name: &str, root: &Path) -> Option<PathBuf> {
    let mut queue = VecDeque::from([root.to_path_buf()]);
    while let Some(dir) = queue.pop_front() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) => {
                debug!(dir = %dir.display(), error = %err, "skipping unreadable directory");
                continue;
            }
        };

        let mut subdirs = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(_) => continue,
            };
            if file_type.is_dir() {
                subdirs.push(path);
            } else if path.is_file() && entry.file_name() == target_name {
                return Some(path);
            }
        }
        queue.extend(subdirs);
    }
    None
}
