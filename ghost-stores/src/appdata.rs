/*!
Bounded walk over application data directories looking for an identity in
file names and structured document contents.
*/

use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::documents::{self, DocumentKind};
use crate::error::{StoreError, StoreResult};
use crate::fsops::{self, Removal};
use crate::preserve::PreservationRules;
use crate::text::{bytes_contain_ignore_case, contains_ignore_case};

/// Extensions of databases searched as raw bytes. Property lists and JSON
/// are parsed instead, see [`documents`].
const DATABASE_EXTENSIONS: &[&str] = &["db", "sqlite", "sqlite3"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Match {
    /// The file or directory name contains the identity.
    Name,
    /// A structured document mentions the identity at these key paths. Raw
    /// database matches carry no key paths.
    Content(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub path: PathBuf,
    pub is_dir: bool,
    pub found: Match,
    /// Covered by a preservation rule. Only names are checked under such
    /// paths, contents are never read.
    pub preserved: bool,
}

#[derive(Debug, Default)]
pub struct WalkReport {
    pub hits: Vec<Hit>,
    /// Directories or files that could not be read.
    pub unreadable: Vec<(PathBuf, String)>,
}

pub struct Walker<'a> {
    rules: &'a PreservationRules,
    excluded: Vec<PathBuf>,
    max_depth: usize,
    max_file_bytes: u64,
}

impl<'a> Walker<'a> {
    pub fn new(rules: &'a PreservationRules, max_depth: usize, max_file_bytes: u64) -> Self {
        Self {
            rules,
            excluded: Vec::new(),
            max_depth,
            max_file_bytes,
        }
    }

    /// Skip `path` and everything beneath it.
    pub fn exclude(mut self, path: PathBuf) -> Self {
        self.excluded.push(path);
        self
    }

    pub fn walk(&self, roots: &[PathBuf], identity: &str) -> WalkReport {
        let mut report = WalkReport::default();
        for root in roots {
            if self.is_excluded(root) {
                continue;
            }
            debug!("Walking {}", root.display());
            self.visit_dir(root, 1, identity, &mut report);
        }
        report
    }

    fn is_excluded(&self, path: &Path) -> bool {
        self.excluded.iter().any(|excluded| path.starts_with(excluded))
    }

    fn visit_dir(&self, dir: &Path, depth: usize, identity: &str, report: &mut WalkReport) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return,
            Err(e) => {
                warn!("Cannot read {}: {}", dir.display(), e);
                report.unreadable.push((dir.to_path_buf(), e.to_string()));
                return;
            }
        };

        let mut paths: Vec<PathBuf> = entries.filter_map(Result::ok).map(|entry| entry.path()).collect();
        paths.sort();

        for path in paths {
            if self.is_excluded(&path) {
                continue;
            }
            let metadata = match fs::symlink_metadata(&path) {
                Ok(metadata) => metadata,
                Err(e) => {
                    report.unreadable.push((path, e.to_string()));
                    continue;
                }
            };
            if metadata.file_type().is_symlink() {
                continue;
            }
            self.visit_entry(path, &metadata, depth, identity, report);
        }
    }

    fn visit_entry(
        &self,
        path: PathBuf,
        metadata: &Metadata,
        depth: usize,
        identity: &str,
        report: &mut WalkReport,
    ) {
        let preserved = self.rules.is_preserved(&path);
        let name_matches = path
            .file_name()
            .is_some_and(|name| contains_ignore_case(&name.to_string_lossy(), identity));

        if name_matches {
            // The whole entry goes, unless something inside it must stay.
            // A tree that cannot be fully read counts as preserved.
            let preserved = preserved
                || (metadata.is_dir() && !matches!(fsops::preserved_beneath(self.rules, &path), Ok(None)));
            report.hits.push(Hit {
                path,
                is_dir: metadata.is_dir(),
                found: Match::Name,
                preserved,
            });
            return;
        }

        if metadata.is_dir() {
            if depth < self.max_depth {
                self.visit_dir(&path, depth + 1, identity, report);
            }
            return;
        }

        if preserved || metadata.len() > self.max_file_bytes {
            return;
        }
        match content_match(&path, identity) {
            Ok(Some(found)) => report.hits.push(Hit {
                path,
                is_dir: false,
                found,
                preserved: false,
            }),
            Ok(None) => {}
            Err(e) => debug!("Skipping {}: {}", path.display(), e),
        }
    }
}

fn is_database(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| DATABASE_EXTENSIONS.iter().any(|db| ext.eq_ignore_ascii_case(db)))
}

/// Whether the structured document at `path` still mentions `identity`.
/// Files that are neither documents nor databases never match.
pub fn content_match(path: &Path, identity: &str) -> StoreResult<Option<Match>> {
    if DocumentKind::of(path).is_some() {
        let key_paths = documents::search_file(path, identity)?;
        return Ok((!key_paths.is_empty()).then_some(Match::Content(key_paths)));
    }
    if is_database(path) {
        let bytes = fs::read(path).map_err(|e| StoreError::io(path, e))?;
        return Ok(bytes_contain_ignore_case(&bytes, identity.as_bytes()).then_some(Match::Content(Vec::new())));
    }
    Ok(None)
}

/// Remove an entry found by name, after checking the name still matches.
pub fn remove_named(rules: &PreservationRules, path: &Path, identity: &str) -> StoreResult<Removal> {
    let still_named = path
        .file_name()
        .is_some_and(|name| contains_ignore_case(&name.to_string_lossy(), identity));
    if !still_named {
        return Err(StoreError::Malformed {
            what: "application data path",
            detail: format!("{} does not name the identity", path.display()),
        });
    }
    fsops::remove_tree(rules, path)
}
