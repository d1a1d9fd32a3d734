/*!
Internet Accounts. Reported only: the account database belongs to the
system and is edited through System Settings.
*/

use std::path::{Path, PathBuf};

use ghost_stores::accounts::AccountStore;
use tracing::info;

use super::misrouted;
use crate::core::{
    adapter::{AdapterContext, ItemOutcome, ScanReport, StoreAdapter},
    identity::Identity,
    ledger::ErrorRecord,
    occurrence::{AdapterKind, Location, Occurrence},
};

pub struct SystemAccountsAdapter {
    home: PathBuf,
}

impl SystemAccountsAdapter {
    pub fn new(home: &Path) -> Self {
        Self {
            home: home.to_path_buf(),
        }
    }
}

impl StoreAdapter for SystemAccountsAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::SystemAccounts
    }

    fn scan(&self, identity: &Identity, _ctx: &AdapterContext) -> ScanReport {
        let Some(store) = AccountStore::locate(&self.home) else {
            return ScanReport::default();
        };
        match store.accounts_for(identity.as_str()) {
            Ok(accounts) => ScanReport {
                occurrences: accounts
                    .into_iter()
                    .map(|account| {
                        Occurrence::new(
                            AdapterKind::SystemAccounts,
                            Location::SystemAccount {
                                database: store.path().to_path_buf(),
                                account,
                            },
                        )
                    })
                    .collect(),
                warnings: Vec::new(),
            },
            Err(e) => ScanReport::warning(format!("could not read Internet Accounts: {e}")),
        }
    }

    fn delete(&self, identity: &Identity, occurrences: &[Occurrence], _ctx: &AdapterContext) -> Vec<ItemOutcome> {
        // Re-read once; accounts removed since the scan are done.
        let remaining = AccountStore::locate(&self.home).map(|store| store.accounts_for(identity.as_str()));

        occurrences
            .iter()
            .map(|occurrence| {
                let Location::SystemAccount { account, .. } = &occurrence.location else {
                    return ItemOutcome::failed(occurrence, misrouted(occurrence));
                };
                let still_present = match &remaining {
                    None => false,
                    Some(Ok(accounts)) => accounts.iter().any(|current| current.id == account.id),
                    Some(Err(_)) => true,
                };
                if !still_present {
                    info!("{} has been removed", occurrence.tag());
                    return ItemOutcome::deleted(occurrence);
                }
                ItemOutcome::failed(
                    occurrence,
                    ErrorRecord::new(
                        format!("The {} account for {} must be removed by hand", account.label(), identity),
                        "Open System Settings > Internet Accounts, select the account and remove it",
                    ),
                )
            })
            .collect()
    }
}
