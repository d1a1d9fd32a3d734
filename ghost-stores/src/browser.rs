/*!
Chromium-family browser profiles.

All supported browsers share one on-disk layout: a data root under
`~/Library/Application Support` containing `Local State` (JSON) and one
directory per profile, each holding `Preferences` (JSON) and `Login Data`
(SQLite).
*/

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::fsops;
use crate::preserve::PreservationRules;
use crate::snapshot::Snapshot;
use crate::text::contains_ignore_case;

const PREFERENCES: &str = "Preferences";
const LOGIN_DATA: &str = "Login Data";
const LOCAL_STATE: &str = "Local State";

/// Profiles the browser manages itself and that never belong to a person.
const INTERNAL_PROFILES: &[&str] = &["System Profile", "Guest Profile"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Browser {
    Chrome,
    ChromeBeta,
    Chromium,
    Edge,
    Brave,
    Vivaldi,
    Arc,
}

impl Browser {
    pub const ALL: [Browser; 7] = [
        Browser::Chrome,
        Browser::ChromeBeta,
        Browser::Chromium,
        Browser::Edge,
        Browser::Brave,
        Browser::Vivaldi,
        Browser::Arc,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Browser::Chrome => "Chrome",
            Browser::ChromeBeta => "Chrome Beta",
            Browser::Chromium => "Chromium",
            Browser::Edge => "Edge",
            Browser::Brave => "Brave",
            Browser::Vivaldi => "Vivaldi",
            Browser::Arc => "Arc",
        }
    }

    /// Application bundle name, used to find its process and to quit it.
    pub fn application(&self) -> &'static str {
        match self {
            Browser::Chrome => "Google Chrome",
            Browser::ChromeBeta => "Google Chrome Beta",
            Browser::Chromium => "Chromium",
            Browser::Edge => "Microsoft Edge",
            Browser::Brave => "Brave Browser",
            Browser::Vivaldi => "Vivaldi",
            Browser::Arc => "Arc",
        }
    }

    fn relative_root(&self) -> &'static str {
        match self {
            Browser::Chrome => "Google/Chrome",
            Browser::ChromeBeta => "Google/Chrome Beta",
            Browser::Chromium => "Chromium",
            Browser::Edge => "Microsoft Edge",
            Browser::Brave => "BraveSoftware/Brave-Browser",
            Browser::Vivaldi => "Vivaldi",
            Browser::Arc => "Arc/User Data",
        }
    }

    /// The browser's data root for the user whose home is `home`.
    pub fn data_root(&self, home: &Path) -> PathBuf {
        home.join("Library/Application Support").join(self.relative_root())
    }
}

/// Why a profile is considered to belong to an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Evidence {
    /// The identity is the profile's signed-in (sync) account.
    AccountSync,
    /// A saved password uses the identity as its username.
    SavedCredential,
    /// The identity appears somewhere in the `Preferences` document.
    PreferencesText,
}

impl Evidence {
    pub fn describe(&self) -> &'static str {
        match self {
            Evidence::AccountSync => "signed-in account",
            Evidence::SavedCredential => "saved password",
            Evidence::PreferencesText => "mentioned in preferences",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub browser: Browser,
    /// Directory name inside the data root, e.g. `Default` or `Profile 2`.
    pub dir_name: String,
    /// Name shown in the browser's profile picker.
    pub display_name: String,
    pub path: PathBuf,
}

impl Profile {
    fn preferences_path(&self) -> PathBuf {
        self.path.join(PREFERENCES)
    }

    fn login_data_path(&self) -> PathBuf {
        self.path.join(LOGIN_DATA)
    }

    /// Decide whether this profile belongs to `identity`.
    ///
    /// Any single hit is enough, including a bare mention anywhere in the
    /// preferences text. This is deliberately recall over precision: a
    /// profile that mentions the account at all is treated as that
    /// account's profile.
    pub fn evidence(&self, identity: &str) -> StoreResult<Option<Evidence>> {
        let preferences = match fs::read_to_string(self.preferences_path()) {
            Ok(text) => Some(text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(StoreError::io(self.preferences_path(), e)),
        };

        if let Some(text) = &preferences {
            match serde_json::from_str::<Value>(text) {
                Ok(document) if signed_in_as(&document, identity) => {
                    return Ok(Some(Evidence::AccountSync));
                }
                Ok(_) => {}
                Err(e) => debug!("{} is not valid JSON: {}", self.preferences_path().display(), e),
            }
        }

        let login_error = match self.has_saved_login(identity) {
            Ok(true) => return Ok(Some(Evidence::SavedCredential)),
            Ok(false) => None,
            Err(e) => {
                warn!("Could not read saved logins of {} {}: {}", self.browser.name(), self.display_name, e);
                Some(e)
            }
        };

        if preferences
            .as_deref()
            .is_some_and(|text| contains_ignore_case(text, identity))
        {
            return Ok(Some(Evidence::PreferencesText));
        }

        match login_error {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }

    fn has_saved_login(&self, identity: &str) -> StoreResult<bool> {
        let path = self.login_data_path();
        if !path.exists() {
            return Ok(false);
        }
        let snapshot = Snapshot::of(&path)?;
        if !snapshot.has_table("logins")? {
            return Ok(false);
        }
        let count: i64 = snapshot.connection().query_row(
            "SELECT COUNT(*) FROM logins WHERE username_value = ?1 COLLATE NOCASE",
            [identity],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

fn signed_in_as(preferences: &Value, identity: &str) -> bool {
    let accounts = preferences
        .get("account_info")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|account| account.get("email").and_then(Value::as_str));
    let last_username = preferences
        .pointer("/google/services/last_username")
        .and_then(Value::as_str);

    accounts
        .chain(last_username)
        .any(|email| email.eq_ignore_ascii_case(identity))
}

/// Profiles under one browser's data root. An absent root is an empty list.
pub fn profiles(browser: Browser, root: &Path) -> StoreResult<Vec<Profile>> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StoreError::io(root, e)),
    };
    let names = profile_names(root);

    let mut profiles = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StoreError::io(root, e))?;
        let path = entry.path();
        let Some(dir_name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if INTERNAL_PROFILES.contains(&dir_name.as_str()) || !path.join(PREFERENCES).is_file() {
            continue;
        }
        let display_name = names
            .as_ref()
            .and_then(|cache| cache.pointer(&format!("/{}/name", escape_pointer(&dir_name))))
            .and_then(Value::as_str)
            .unwrap_or(dir_name.as_str())
            .to_string();
        profiles.push(Profile {
            browser,
            dir_name,
            display_name,
            path,
        });
    }
    profiles.sort_by(|a, b| a.dir_name.cmp(&b.dir_name));
    Ok(profiles)
}

/// Load a single profile again, e.g. to re-verify it before deletion.
/// `None` when the profile is gone; errors reading the data root are returned.
pub fn profile_at(browser: Browser, path: &Path) -> StoreResult<Option<Profile>> {
    let Some(root) = path.parent() else {
        return Ok(None);
    };
    Ok(profiles(browser, root)?
        .into_iter()
        .find(|profile| profile.path == path))
}

/// `profile.info_cache` from `Local State`, if readable.
fn profile_names(root: &Path) -> Option<Value> {
    let text = fs::read_to_string(root.join(LOCAL_STATE)).ok()?;
    let mut state: Value = serde_json::from_str(&text).ok()?;
    state.pointer_mut("/profile/info_cache").map(Value::take)
}

fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Drop a removed profile from the profile picker cache in `Local State`.
/// Returns whether the document changed.
pub fn forget_profile(rules: &PreservationRules, root: &Path, dir_name: &str) -> StoreResult<bool> {
    let path = root.join(LOCAL_STATE);
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(StoreError::io(&path, e)),
    };
    let mut state: Value = serde_json::from_str(&text)?;

    let removed = state
        .pointer_mut("/profile/info_cache")
        .and_then(Value::as_object_mut)
        .and_then(|cache| cache.remove(dir_name))
        .is_some();
    if !removed {
        return Ok(false);
    }

    fsops::rewrite_file(rules, &path, &serde_json::to_vec(&state)?)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;
    use serde_json::json;
    use tempfile::TempDir;

    const IDENTITY: &str = "user@example.com";

    fn make_profile(root: &Path, dir: &str, preferences: &Value) -> PathBuf {
        let path = root.join(dir);
        fs::create_dir_all(&path).unwrap();
        fs::write(path.join(PREFERENCES), preferences.to_string()).unwrap();
        path
    }

    fn add_login(profile: &Path, username: &str) {
        let conn = Connection::open(profile.join(LOGIN_DATA)).unwrap();
        conn.execute_batch("CREATE TABLE IF NOT EXISTS logins (origin_url TEXT, username_value TEXT)")
            .unwrap();
        conn.execute(
            "INSERT INTO logins VALUES ('https://example.com', ?1)",
            [username],
        )
        .unwrap();
    }

    fn profile(root: &Path, dir: &str) -> Profile {
        profile_at(Browser::Chrome, &root.join(dir)).unwrap().unwrap()
    }

    #[test]
    fn test_profiles_lists_real_profiles_with_picker_names() {
        let root = TempDir::new().unwrap();
        make_profile(root.path(), "Default", &json!({}));
        make_profile(root.path(), "Profile 1", &json!({}));
        make_profile(root.path(), "System Profile", &json!({}));
        fs::create_dir_all(root.path().join("Crashpad")).unwrap();
        fs::write(
            root.path().join(LOCAL_STATE),
            json!({"profile": {"info_cache": {"Profile 1": {"name": "Work"}}}}).to_string(),
        )
        .unwrap();

        let found = profiles(Browser::Chrome, root.path()).unwrap();
        let names: Vec<_> = found.iter().map(|p| (p.dir_name.as_str(), p.display_name.as_str())).collect();
        assert_eq!(names, vec![("Default", "Default"), ("Profile 1", "Work")]);
    }

    #[test]
    fn test_absent_root_has_no_profiles() {
        let root = TempDir::new().unwrap();
        assert!(profiles(Browser::Brave, &root.path().join("missing")).unwrap().is_empty());
    }

    #[test]
    fn test_account_sync_evidence() {
        let root = TempDir::new().unwrap();
        make_profile(
            root.path(),
            "Default",
            &json!({"account_info": [{"email": "User@Example.com", "gaia": "1"}]}),
        );
        assert_eq!(
            profile(root.path(), "Default").evidence(IDENTITY).unwrap(),
            Some(Evidence::AccountSync)
        );
    }

    #[test]
    fn test_saved_credential_evidence() {
        let root = TempDir::new().unwrap();
        let path = make_profile(root.path(), "Default", &json!({}));
        add_login(&path, "USER@example.com");
        assert_eq!(
            profile(root.path(), "Default").evidence(IDENTITY).unwrap(),
            Some(Evidence::SavedCredential)
        );
    }

    #[test]
    fn test_any_mention_in_preferences_is_evidence() {
        let root = TempDir::new().unwrap();
        make_profile(
            root.path(),
            "Default",
            &json!({"autofill": {"last_seen": "user@example.com"}}),
        );
        assert_eq!(
            profile(root.path(), "Default").evidence(IDENTITY).unwrap(),
            Some(Evidence::PreferencesText)
        );
    }

    #[test]
    fn test_unrelated_profile_has_no_evidence() {
        let root = TempDir::new().unwrap();
        let path = make_profile(
            root.path(),
            "Default",
            &json!({"account_info": [{"email": "other@example.com"}]}),
        );
        add_login(&path, "other@example.com");
        assert_eq!(profile(root.path(), "Default").evidence(IDENTITY).unwrap(), None);
    }

    #[test]
    fn test_forget_profile_edits_local_state() {
        let root = TempDir::new().unwrap();
        let rules = PreservationRules::builtin(root.path());
        fs::write(
            root.path().join(LOCAL_STATE),
            json!({"profile": {"info_cache": {"Default": {}, "Profile 1": {"name": "Work"}}}}).to_string(),
        )
        .unwrap();

        assert!(forget_profile(&rules, root.path(), "Profile 1").unwrap());
        assert!(!forget_profile(&rules, root.path(), "Profile 1").unwrap());

        let state: Value =
            serde_json::from_str(&fs::read_to_string(root.path().join(LOCAL_STATE)).unwrap()).unwrap();
        assert!(state.pointer("/profile/info_cache/Default").is_some());
        assert!(state.pointer("/profile/info_cache/Profile 1").is_none());
    }

    #[test]
    fn test_data_roots() {
        let home = Path::new("/Users/me");
        assert_eq!(
            Browser::Chrome.data_root(home),
            PathBuf::from("/Users/me/Library/Application Support/Google/Chrome")
        );
        assert_eq!(
            Browser::Arc.data_root(home),
            PathBuf::from("/Users/me/Library/Application Support/Arc/User Data")
        );
    }
}
