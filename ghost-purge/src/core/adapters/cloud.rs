/*!
Cloud sync clients signed in as the identity. Their settings are only
reported: signing out has to happen in the client itself.
*/

use std::path::{Path, PathBuf};

use ghost_stores::documents;
use tracing::{debug, info};

use super::misrouted;
use crate::core::{
    adapter::{AdapterContext, ItemOutcome, ScanReport, StoreAdapter},
    identity::Identity,
    ledger::ErrorRecord,
    occurrence::{AdapterKind, Location, Occurrence},
};

/// A preference document of one sync client.
#[derive(Debug, Clone)]
pub struct CloudDocument {
    pub service: &'static str,
    pub path: PathBuf,
    pub sign_out: &'static str,
}

const ICLOUD: &str = "In System Settings, select your name and choose Sign Out";
const ONEDRIVE: &str = "In OneDrive, open Settings > Account and choose Unlink this Mac";
const DROPBOX: &str = "In Dropbox, open Settings > Account and choose Unlink";
const GOOGLE_DRIVE: &str = "In Google Drive, open Settings > Preferences and choose Disconnect account";

pub fn documents(home: &Path) -> Vec<CloudDocument> {
    [
        ("iCloud", "Library/Preferences/MobileMeAccounts.plist", ICLOUD),
        ("OneDrive", "Library/Preferences/com.microsoft.OneDrive-mac.plist", ONEDRIVE),
        (
            "OneDrive",
            "Library/Containers/com.microsoft.OneDrive-mac/Data/Library/Preferences/com.microsoft.OneDrive-mac.plist",
            ONEDRIVE,
        ),
        ("Dropbox", ".dropbox/info.json", DROPBOX),
        ("Google Drive", "Library/Preferences/com.google.drivefs.settings.plist", GOOGLE_DRIVE),
    ]
    .into_iter()
    .map(|(service, relative, sign_out)| CloudDocument {
        service,
        path: home.join(relative),
        sign_out,
    })
    .collect()
}

pub struct CloudConfigAdapter {
    documents: Vec<CloudDocument>,
}

impl CloudConfigAdapter {
    pub fn new(home: &Path) -> Self {
        Self {
            documents: documents(home),
        }
    }

    fn sign_out_hint(&self, path: &Path) -> &'static str {
        self.documents
            .iter()
            .find(|document| document.path == path)
            .map_or("Sign out in the sync client's settings", |document| document.sign_out)
    }
}

impl StoreAdapter for CloudConfigAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::CloudConfig
    }

    fn scan(&self, identity: &Identity, _ctx: &AdapterContext) -> ScanReport {
        let mut report = ScanReport::default();
        for document in &self.documents {
            if !document.path.exists() {
                continue;
            }
            match documents::search_file(&document.path, identity.as_str()) {
                Ok(key_paths) if key_paths.is_empty() => {
                    debug!("{} does not mention the identity", document.path.display());
                }
                Ok(key_paths) => report.occurrences.push(Occurrence::new(
                    AdapterKind::CloudConfig,
                    Location::CloudDocument {
                        service: document.service,
                        path: document.path.clone(),
                        key_paths,
                    },
                )),
                Err(e) => report
                    .warnings
                    .push(format!("could not read {} settings: {e}", document.service)),
            }
        }
        report
    }

    fn delete(&self, identity: &Identity, occurrences: &[Occurrence], _ctx: &AdapterContext) -> Vec<ItemOutcome> {
        occurrences
            .iter()
            .map(|occurrence| {
                let Location::CloudDocument { service, path, .. } = &occurrence.location else {
                    return ItemOutcome::failed(occurrence, misrouted(occurrence));
                };
                let still_signed_in = documents::search_file(path, identity.as_str())
                    .map(|key_paths| !key_paths.is_empty())
                    .unwrap_or_else(|e| !e.is_not_found());
                if !still_signed_in {
                    info!("{} is no longer signed in as the identity", service);
                    return ItemOutcome::deleted(occurrence);
                }
                ItemOutcome::failed(
                    occurrence,
                    ErrorRecord::new(
                        format!("{service} is still signed in as {identity}"),
                        self.sign_out_hint(path),
                    ),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::adapter::DeletionOutcome;
    use crate::core::testing::home_context;
    use std::fs;

    #[test]
    fn test_signed_in_client_is_reported_for_manual_sign_out() {
        let (home, rules, confirmer) = home_context();
        let ctx = AdapterContext {
            home: home.path(),
            rules: &rules,
            confirm: &confirmer,
        };
        let info = home.path().join(".dropbox/info.json");
        fs::create_dir_all(info.parent().unwrap()).unwrap();
        fs::write(&info, r#"{"personal": {"email": "user@example.com", "path": "/Users/me/Dropbox"}}"#).unwrap();

        let adapter = CloudConfigAdapter::new(home.path());
        let identity = Identity::parse("user@example.com").unwrap();
        let occurrences = adapter.scan(&identity, &ctx).occurrences;
        assert_eq!(occurrences.len(), 1);
        assert_eq!(occurrences[0].tag(), "cloud-config:Dropbox:info.json");

        let outcomes = adapter.delete(&identity, &occurrences, &ctx);
        assert_eq!(outcomes[0].outcome, DeletionOutcome::Failed);
        assert_eq!(outcomes[0].error.as_ref().unwrap().remediation, DROPBOX);
        assert!(info.exists());

        fs::remove_file(&info).unwrap();
        let outcomes = adapter.delete(&identity, &occurrences, &ctx);
        assert_eq!(outcomes[0].outcome, DeletionOutcome::Deleted);
    }
}
