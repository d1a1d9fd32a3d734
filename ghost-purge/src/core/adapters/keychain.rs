/*!
Passwords and certificates in the login keychain.
*/

use ghost_stores::StoreError;
use ghost_stores::command::CommandRunner;
use ghost_stores::fsops::Removal;
use ghost_stores::keychain::{self, Keychain};
use tracing::{debug, info};

use super::misrouted;
use crate::core::{
    adapter::{AdapterContext, ItemOutcome, ScanReport, StoreAdapter},
    identity::Identity,
    ledger::ErrorRecord,
    occurrence::{AdapterKind, Location, Occurrence},
};

pub struct KeychainAdapter<R: CommandRunner> {
    keychain: Keychain<R>,
}

impl<R: CommandRunner> KeychainAdapter<R> {
    pub fn new(runner: R) -> Self {
        Self {
            keychain: Keychain::new(runner),
        }
    }

    fn delete_one(&self, identity: &Identity, occurrence: &Occurrence) -> ItemOutcome {
        match &occurrence.location {
            Location::KeychainItem(item) => {
                match self.keychain.contains(item) {
                    Ok(false) => {
                        info!("{} is already absent", occurrence.tag());
                        return ItemOutcome::deleted(occurrence);
                    }
                    Ok(true) => {}
                    // Deleting is still worth a try; it reports absence itself.
                    Err(e) => debug!("Could not re-read the keychain: {}", e),
                }
                match self.keychain.delete_item(item) {
                    Ok(removal) => deleted(occurrence, removal),
                    Err(e) => ItemOutcome::failed(
                        occurrence,
                        ErrorRecord::from_store(
                            &format!("Deleting {}", occurrence.tag()),
                            &e,
                            format!("Run `{}`", keychain::manual_delete_command(item)),
                        ),
                    ),
                }
            }
            Location::Certificate(certificate) => {
                let listed = self.keychain.certificates_for(identity.as_str()).map(|current| {
                    current
                        .iter()
                        .any(|listed| listed.sha1.eq_ignore_ascii_case(&certificate.sha1))
                });
                match listed {
                    Ok(false) => {
                        info!("{} is already absent", occurrence.tag());
                        return ItemOutcome::deleted(occurrence);
                    }
                    Ok(true) => {}
                    // The hash names exactly one certificate, so deleting stays safe.
                    Err(e) => debug!("Could not re-list certificates: {}", e),
                }
                match self.keychain.delete_certificate(certificate) {
                    Ok(removal) => deleted(occurrence, removal),
                    Err(e) => ItemOutcome::failed(
                        occurrence,
                        ErrorRecord::from_store(
                            &format!("Deleting {}", occurrence.tag()),
                            &e,
                            format!("Run `security delete-certificate -Z {}`", certificate.sha1),
                        ),
                    ),
                }
            }
            _ => ItemOutcome::failed(occurrence, misrouted(occurrence)),
        }
    }
}

fn deleted(occurrence: &Occurrence, removal: Removal) -> ItemOutcome {
    match removal {
        Removal::Removed => info!("Deleted {}", occurrence.tag()),
        Removal::AlreadyAbsent => info!("{} is already absent", occurrence.tag()),
    }
    ItemOutcome::deleted(occurrence)
}

impl<R: CommandRunner> StoreAdapter for KeychainAdapter<R> {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Keychain
    }

    fn scan(&self, identity: &Identity, _ctx: &AdapterContext) -> ScanReport {
        let mut report = ScanReport::default();

        match self.keychain.items_for(identity.as_str()) {
            Ok(items) => report.occurrences.extend(
                items
                    .into_iter()
                    .map(|item| Occurrence::new(AdapterKind::Keychain, Location::KeychainItem(item))),
            ),
            Err(e @ StoreError::CommandUnavailable { .. }) => {
                return ScanReport::warning(format!("keychain not scanned: {e}"));
            }
            Err(e) => report.warnings.push(format!("could not list keychain items: {e}")),
        }

        match self.keychain.certificates_for(identity.as_str()) {
            Ok(certificates) => report.occurrences.extend(
                certificates
                    .into_iter()
                    .map(|certificate| Occurrence::new(AdapterKind::Keychain, Location::Certificate(certificate))),
            ),
            Err(e) => report.warnings.push(format!("could not list certificates: {e}")),
        }
        report
    }

    fn delete(&self, identity: &Identity, occurrences: &[Occurrence], _ctx: &AdapterContext) -> Vec<ItemOutcome> {
        occurrences
            .iter()
            .map(|occurrence| self.delete_one(identity, occurrence))
            .collect()
    }
}
