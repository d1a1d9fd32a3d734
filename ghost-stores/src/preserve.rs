/*!
Preservation rules: path patterns that must never be deleted, whatever they
contain.

Evaluation is purely lexical and fail-closed. Anything that cannot be judged
with certainty (relative paths, `..` components, names that are not UTF-8)
counts as preserved.
*/

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use crate::error::{StoreError, StoreResult};

/// Password database formats whose files are never touched.
const PASSWORD_DATABASE_EXTENSIONS: &[&str] = &["kdbx", "opvault", "agilekeychain", "1pif", "1pux"];

/// Version control metadata directories.
const VCS_DIRECTORIES: &[&str] = &[".git", ".svn", ".hg"];

/// Roots of synced file trees, relative to the home directory. Removing a
/// file there removes it from every synced device.
const CLOUD_SYNC_ROOTS: &[&str] = &[
    "Library/Mobile Documents",
    "Library/CloudStorage",
    "Dropbox",
    "Google Drive",
    "OneDrive",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreservationRule {
    /// Any path with a component ending in `.<ext>`, e.g. `kdbx`. Bundles
    /// stored as directories protect everything inside them.
    Extension(String),
    /// Any path with a component named exactly this, e.g. `.git`.
    Component(String),
    /// Any path at or beneath this absolute directory.
    Root(PathBuf),
}

impl PreservationRule {
    /// Parse a user supplied pattern.
    ///
    /// * `*.ext` protects an extension
    /// * `name/` protects a directory name anywhere in a path
    /// * `~/dir` or `/abs/dir` protects a whole tree
    pub fn parse(pattern: &str, home: &Path) -> StoreResult<Self> {
        let malformed = |detail: &str| StoreError::Malformed {
            what: "preservation pattern",
            detail: format!("{pattern:?}: {detail}"),
        };

        let pattern = pattern.trim();
        if let Some(ext) = pattern.strip_prefix("*.") {
            if ext.is_empty() || ext.contains('/') {
                return Err(malformed("extension must be a bare suffix"));
            }
            return Ok(PreservationRule::Extension(ext.to_ascii_lowercase()));
        }
        if let Some(rest) = pattern.strip_prefix("~/") {
            if rest.is_empty() {
                return Err(malformed("refusing to preserve the whole home directory by accident"));
            }
            return Ok(PreservationRule::Root(home.join(rest.trim_end_matches('/'))));
        }
        if pattern.starts_with('/') {
            return Ok(PreservationRule::Root(PathBuf::from(pattern.trim_end_matches('/'))));
        }
        if let Some(name) = pattern.strip_suffix('/') {
            if name.is_empty() || name.contains('/') {
                return Err(malformed("directory name must not contain '/'"));
            }
            return Ok(PreservationRule::Component(name.to_string()));
        }
        Err(malformed("expected `*.ext`, `name/`, `~/path` or an absolute path"))
    }

    fn matches(&self, path: &Path) -> Option<bool> {
        match self {
            PreservationRule::Extension(ext) => {
                let suffix = format!(".{ext}");
                for name in component_names(path) {
                    let name = name.to_str()?.as_bytes();
                    if name.len() > suffix.len()
                        && name[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix.as_bytes())
                    {
                        return Some(true);
                    }
                }
                Some(false)
            }
            PreservationRule::Component(dir) => {
                for name in component_names(path) {
                    if name.to_str()?.eq_ignore_ascii_case(dir) {
                        return Some(true);
                    }
                }
                Some(false)
            }
            PreservationRule::Root(root) => {
                if !root.is_absolute() {
                    return None;
                }
                let mut candidate = path.components();
                for expected in root.components() {
                    match candidate.next() {
                        Some(actual) => {
                            let (Some(actual), Some(expected)) =
                                (actual.as_os_str().to_str(), expected.as_os_str().to_str())
                            else {
                                return None;
                            };
                            if !actual.eq_ignore_ascii_case(expected) {
                                return Some(false);
                            }
                        }
                        None => return Some(false),
                    }
                }
                Some(true)
            }
        }
    }
}

fn component_names(path: &Path) -> impl Iterator<Item = &OsStr> {
    path.components().filter_map(|component| match component {
        Component::Normal(name) => Some(name),
        _ => None,
    })
}

/// The immutable rule list for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreservationRules {
    rules: Vec<PreservationRule>,
}

impl PreservationRules {
    /// Built-in rules, with cloud sync roots resolved against `home`.
    pub fn builtin(home: &Path) -> Self {
        let mut rules: Vec<PreservationRule> = PASSWORD_DATABASE_EXTENSIONS
            .iter()
            .map(|ext| PreservationRule::Extension(ext.to_string()))
            .collect();
        rules.extend(
            VCS_DIRECTORIES
                .iter()
                .map(|dir| PreservationRule::Component(dir.to_string())),
        );
        rules.extend(
            CLOUD_SYNC_ROOTS
                .iter()
                .map(|root| PreservationRule::Root(home.join(root))),
        );
        Self { rules }
    }

    /// Add user supplied patterns. Built-in rules cannot be removed.
    pub fn with_patterns<S: AsRef<str>>(mut self, patterns: &[S], home: &Path) -> StoreResult<Self> {
        for pattern in patterns {
            self.rules.push(PreservationRule::parse(pattern.as_ref(), home)?);
        }
        Ok(self)
    }

    pub fn rules(&self) -> &[PreservationRule] {
        &self.rules
    }

    /// Whether `path` must be left alone. Paths that cannot be judged are
    /// treated as preserved.
    pub fn is_preserved(&self, path: &Path) -> bool {
        if path.as_os_str().is_empty() || !path.is_absolute() {
            return true;
        }
        if path
            .components()
            .any(|component| matches!(component, Component::ParentDir | Component::CurDir))
        {
            return true;
        }
        self.rules
            .iter()
            .any(|rule| rule.matches(path).unwrap_or(true))
    }
}

/// Free-function form of [`PreservationRules::is_preserved`].
pub fn is_preserved(path: &Path, rules: &PreservationRules) -> bool {
    rules.is_preserved(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> PreservationRules {
        PreservationRules::builtin(Path::new("/Users/me"))
    }

    #[test]
    fn test_password_database_extension_is_preserved() {
        let rules = rules();
        assert!(rules.is_preserved(Path::new(
            "/Users/me/Library/Application Support/Vault/user@example.com.kdbx"
        )));
        assert!(rules.is_preserved(Path::new("/Users/me/Documents/Work.KDBX")));
        assert!(rules.is_preserved(Path::new(
            "/Users/me/Library/1Password.opvault/default/profile.js"
        )));
    }

    #[test]
    fn test_vcs_metadata_is_preserved() {
        let rules = rules();
        assert!(rules.is_preserved(Path::new("/Users/me/src/app/.git/config")));
        assert!(rules.is_preserved(Path::new("/Users/me/src/app/.hg")));
        assert!(!rules.is_preserved(Path::new("/Users/me/src/app/.github/CODEOWNERS")));
    }

    #[test]
    fn test_cloud_roots_are_preserved_case_insensitively() {
        let rules = rules();
        assert!(rules.is_preserved(Path::new("/Users/me/Dropbox/user@example.com/notes.txt")));
        assert!(rules.is_preserved(Path::new("/users/ME/library/mobile documents/x")));
        assert!(rules.is_preserved(Path::new("/Users/me/Library/CloudStorage")));
        assert!(!rules.is_preserved(Path::new("/Users/me/DropboxOld/file")));
    }

    #[test]
    fn test_unrelated_paths_are_not_preserved() {
        let rules = rules();
        assert!(!rules.is_preserved(Path::new(
            "/Users/me/Library/Application Support/Google/Chrome/Profile 1"
        )));
        assert!(!rules.is_preserved(Path::new("/Users/me/.ssh/id_ed25519")));
    }

    #[test]
    fn test_ambiguous_paths_fail_closed() {
        let rules = rules();
        assert!(rules.is_preserved(Path::new("")));
        assert!(rules.is_preserved(Path::new("relative/path")));
        assert!(rules.is_preserved(Path::new("/Users/me/.ssh/../Dropbox/x")));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_names_fail_closed() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let rules = rules();
        let path = Path::new("/Users/me").join(OsStr::from_bytes(b"caf\xe9"));
        assert!(rules.is_preserved(&path));
    }

    #[test]
    fn test_user_patterns_extend_builtin_rules() {
        let home = Path::new("/Users/me");
        let rules = PreservationRules::builtin(home)
            .with_patterns(&["*.kdb", "~/Work/", "node_modules/", "/Volumes/Backup"], home)
            .unwrap();

        assert!(rules.is_preserved(Path::new("/Users/me/old.kdb")));
        assert!(rules.is_preserved(Path::new("/Users/me/Work/contacts.json")));
        assert!(rules.is_preserved(Path::new("/Users/me/app/node_modules/pkg")));
        assert!(rules.is_preserved(Path::new("/Volumes/Backup/mail")));
        assert!(rules.is_preserved(Path::new("/Users/me/x.kdbx")));
    }

    #[test]
    fn test_malformed_patterns_are_rejected() {
        let home = Path::new("/Users/me");
        assert!(PreservationRule::parse("*.", home).is_err());
        assert!(PreservationRule::parse("~/", home).is_err());
        assert!(PreservationRule::parse("plain", home).is_err());
        assert!(PreservationRule::parse("a/b/", home).is_err());
    }

    #[test]
    fn test_relative_root_rule_preserves_everything() {
        let rules = PreservationRules::builtin(Path::new("relative-home"));
        assert!(rules.is_preserved(Path::new("/Users/me/.ssh/id_rsa")));
    }
}
