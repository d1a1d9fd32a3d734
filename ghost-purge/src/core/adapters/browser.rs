/*!
Chromium-family browser profiles. A profile that belongs to the identity is
removed whole, after the browser has quit.
*/

use std::path::{Path, PathBuf};

use ghost_stores::StoreError;
use ghost_stores::browser::{self, Browser, Profile};
use ghost_stores::fsops::{self, Removal};
use tracing::{debug, info, warn};

use super::QuitPolicy;
use super::misrouted;
use crate::core::{
    adapter::{AdapterContext, ItemOutcome, ScanReport, StoreAdapter},
    identity::Identity,
    ledger::ErrorRecord,
    occurrence::{AdapterKind, Location, Occurrence},
};

pub struct BrowserAdapter<'a> {
    browser: Browser,
    root: PathBuf,
    quit: QuitPolicy<'a>,
}

impl<'a> BrowserAdapter<'a> {
    pub fn new(browser: Browser, home: &Path, quit: QuitPolicy<'a>) -> Self {
        Self {
            browser,
            root: browser.data_root(home),
            quit,
        }
    }

    fn remove_by_hand(&self, profile: &Profile) -> String {
        format!(
            "Remove the profile in {} (Settings > You and Google > Delete), or delete {}",
            self.browser.application(),
            profile.path.display()
        )
    }

    fn delete_profile(&self, identity: &Identity, occurrence: &Occurrence, profile: &Profile, ctx: &AdapterContext) -> ItemOutcome {
        let recheck = browser::profile_at(self.browser, &profile.path).and_then(|current| match current {
            Some(current) => current.evidence(identity.as_str()),
            None => Ok(None),
        });
        match recheck {
            Ok(None) => {
                info!("{} is already absent or no longer mentions the identity", occurrence.tag());
                return ItemOutcome::deleted(occurrence);
            }
            Ok(Some(_)) => {}
            Err(e) => {
                return ItemOutcome::failed(
                    occurrence,
                    ErrorRecord::from_store(&format!("Re-checking {}", occurrence.tag()), &e, self.remove_by_hand(profile)),
                );
            }
        }

        match fsops::remove_tree(ctx.rules, &profile.path) {
            Ok(removal) => {
                if removal == Removal::Removed {
                    info!("Deleted {}", occurrence.tag());
                }
                match browser::forget_profile(ctx.rules, &self.root, &profile.dir_name) {
                    Ok(_) => {}
                    Err(e) => warn!("Could not update the {} profile list: {}", self.browser.name(), e),
                }
                ItemOutcome::deleted(occurrence)
            }
            Err(StoreError::Preserved(_)) => ItemOutcome::preserved(occurrence),
            Err(e) => ItemOutcome::failed(
                occurrence,
                ErrorRecord::from_store(&format!("Deleting {}", occurrence.tag()), &e, self.remove_by_hand(profile)),
            ),
        }
    }
}

impl StoreAdapter for BrowserAdapter<'_> {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Browser(self.browser)
    }

    fn scan(&self, identity: &Identity, _ctx: &AdapterContext) -> ScanReport {
        let profiles = match browser::profiles(self.browser, &self.root) {
            Ok(profiles) => profiles,
            Err(e) => return ScanReport::warning(format!("could not list profiles: {e}")),
        };
        debug!("{} has {} profiles", self.browser.name(), profiles.len());

        let mut report = ScanReport::default();
        for profile in profiles {
            match profile.evidence(identity.as_str()) {
                Ok(Some(evidence)) => report.occurrences.push(Occurrence::new(
                    self.kind(),
                    Location::BrowserProfile { profile, evidence },
                )),
                Ok(None) => {}
                Err(e) => report
                    .warnings
                    .push(format!("could not read profile {}: {e}", profile.display_name)),
            }
        }
        report
    }

    fn delete(&self, identity: &Identity, occurrences: &[Occurrence], ctx: &AdapterContext) -> Vec<ItemOutcome> {
        if let Err(record) = self.quit.ensure_quit(self.browser.application(), "its profiles", ctx) {
            // One decision, one record: the other profiles are declined with it.
            let mut record = Some(record);
            return occurrences
                .iter()
                .map(|occurrence| ItemOutcome::declined(occurrence, record.take()))
                .collect();
        }

        occurrences
            .iter()
            .map(|occurrence| match &occurrence.location {
                Location::BrowserProfile { profile, .. } => self.delete_profile(identity, occurrence, profile, ctx),
                _ => ItemOutcome::failed(occurrence, misrouted(occurrence)),
            })
            .collect()
    }
}
