/*!
Application support data. Entries named after the identity are removed;
documents that merely mention it are reported for the owning application to
clean up.
*/

use std::path::{Component, Path, PathBuf};

use ghost_stores::StoreError;
use ghost_stores::appdata::{self, Hit, Match, Walker};
use ghost_stores::browser::Browser;
use tracing::info;

use super::cloud;
use super::misrouted;
use crate::core::{
    adapter::{AdapterContext, ItemOutcome, ScanReport, StoreAdapter},
    identity::Identity,
    ledger::ErrorRecord,
    occurrence::{AdapterKind, Location, Occurrence},
};

/// Roots scanned by other adapters, which the walk must not enter.
pub fn owned_elsewhere(home: &Path) -> Vec<PathBuf> {
    let mut owned: Vec<PathBuf> = Browser::ALL.iter().map(|browser| browser.data_root(home)).collect();
    owned.extend(
        ["Library/Mail", "Library/Accounts", ".ssh"]
            .iter()
            .map(|relative| home.join(relative)),
    );
    owned.extend(cloud::documents(home).into_iter().map(|document| document.path));
    owned
}

pub struct AppDataAdapter {
    roots: Vec<PathBuf>,
    excluded: Vec<PathBuf>,
    max_depth: usize,
    max_file_bytes: u64,
}

impl AppDataAdapter {
    pub fn new(roots: Vec<PathBuf>, excluded: Vec<PathBuf>, max_depth: usize, max_file_bytes: u64) -> Self {
        Self {
            roots,
            excluded,
            max_depth,
            max_file_bytes,
        }
    }

    /// The application a path belongs to: the first directory below its
    /// root, e.g. `Slack` or `com.tinyspeck.slackmacgap`.
    fn owner(&self, path: &Path) -> Option<String> {
        self.roots.iter().find_map(|root| {
            match path.strip_prefix(root).ok()?.components().next()? {
                Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
                _ => None,
            }
        })
    }

    fn delete_named(&self, identity: &Identity, occurrence: &Occurrence, hit: &Hit, ctx: &AdapterContext) -> ItemOutcome {
        match appdata::remove_named(ctx.rules, &hit.path, identity.as_str()) {
            Ok(_) => ItemOutcome::deleted(occurrence),
            Err(StoreError::Preserved(_)) => ItemOutcome::preserved(occurrence),
            Err(e) => ItemOutcome::failed(
                occurrence,
                ErrorRecord::from_store(
                    &format!("Deleting {}", hit.path.display()),
                    &e,
                    format!("Quit the application that owns it and delete {} by hand", hit.path.display()),
                ),
            ),
        }
    }

    fn report_content(&self, identity: &Identity, occurrence: &Occurrence, hit: &Hit) -> ItemOutcome {
        let key_paths = match appdata::content_match(&hit.path, identity.as_str()) {
            Ok(Some(Match::Content(key_paths))) => key_paths,
            Ok(_) => {
                info!("{} no longer mentions the identity", hit.path.display());
                return ItemOutcome::deleted(occurrence);
            }
            Err(e) if e.is_not_found() => {
                info!("{} is already absent", hit.path.display());
                return ItemOutcome::deleted(occurrence);
            }
            Err(e) => {
                return ItemOutcome::failed(
                    occurrence,
                    ErrorRecord::from_store(&format!("Reading {}", hit.path.display()), &e, "Check the file's permissions"),
                );
            }
        };

        let owner = self.owner(&hit.path).unwrap_or_else(|| "the owning application".to_string());
        let location = if key_paths.is_empty() {
            String::new()
        } else {
            format!(" at {}", key_paths.join(", "))
        };
        ItemOutcome::failed(
            occurrence,
            ErrorRecord::new(
                format!("{} mentions the identity{location} and cannot be edited safely", hit.path.display()),
                format!("Sign out of or remove the account in {owner}"),
            ),
        )
    }
}

impl StoreAdapter for AppDataAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::AppData
    }

    fn scan(&self, identity: &Identity, ctx: &AdapterContext) -> ScanReport {
        let walker = self
            .excluded
            .iter()
            .cloned()
            .fold(Walker::new(ctx.rules, self.max_depth, self.max_file_bytes), Walker::exclude);
        let walk = walker.walk(&self.roots, identity.as_str());

        let mut warnings = Vec::new();
        if let Some((first, reason)) = walk.unreadable.first() {
            warnings.push(format!(
                "{} location(s) could not be read, e.g. {}: {}",
                walk.unreadable.len(),
                first.display(),
                reason
            ));
        }
        ScanReport {
            occurrences: walk
                .hits
                .into_iter()
                .map(|hit| Occurrence::new(AdapterKind::AppData, Location::AppData(hit)))
                .collect(),
            warnings,
        }
    }

    fn delete(&self, identity: &Identity, occurrences: &[Occurrence], ctx: &AdapterContext) -> Vec<ItemOutcome> {
        occurrences
            .iter()
            .map(|occurrence| match &occurrence.location {
                Location::AppData(hit) if hit.preserved => ItemOutcome::preserved(occurrence),
                Location::AppData(hit) => match hit.found {
                    Match::Name => self.delete_named(identity, occurrence, hit, ctx),
                    Match::Content(_) => self.report_content(identity, occurrence, hit),
                },
                _ => ItemOutcome::failed(occurrence, misrouted(occurrence)),
            })
            .collect()
    }
}
