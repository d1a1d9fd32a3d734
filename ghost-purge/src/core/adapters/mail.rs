/*!
Apple Mail accounts and their cached mailboxes.
*/

use std::path::{Path, PathBuf};

use ghost_stores::StoreError;
use ghost_stores::fsops;
use ghost_stores::mail::{MAIL_APPLICATION, MailAccount, MailStore};
use tracing::info;

use super::QuitPolicy;
use super::misrouted;
use crate::core::{
    adapter::{AdapterContext, ItemOutcome, ScanReport, StoreAdapter},
    identity::Identity,
    ledger::ErrorRecord,
    occurrence::{AdapterKind, Location, Occurrence},
};

const REMOVE_IN_MAIL: &str = "Remove the account in Mail > Settings > Accounts";

pub struct MailAdapter<'a> {
    home: PathBuf,
    quit: QuitPolicy<'a>,
}

impl<'a> MailAdapter<'a> {
    pub fn new(home: &Path, quit: QuitPolicy<'a>) -> Self {
        Self {
            home: home.to_path_buf(),
            quit,
        }
    }

    fn delete_account(
        &self,
        store: &MailStore,
        identity: &Identity,
        occurrence: &Occurrence,
        account: &MailAccount,
        ctx: &AdapterContext,
    ) -> ItemOutcome {
        let failed = |e: StoreError| {
            ItemOutcome::failed(
                occurrence,
                ErrorRecord::from_store(&format!("Deleting {}", occurrence.tag()), &e, REMOVE_IN_MAIL),
            )
        };

        let current = match store.accounts() {
            Ok(accounts) => accounts.into_iter().find(|current| current.id == account.id),
            Err(e) => return failed(e),
        };
        if let Some(current) = &current {
            if !current.has_address(identity.as_str()) {
                info!("{} no longer uses the identity", occurrence.tag());
                return ItemOutcome::deleted(occurrence);
            }
        }

        // Mailboxes first: if that fails the account entry stays, and a
        // re-run finds the account again.
        if let Some(mailbox) = &account.mailbox {
            match fsops::remove_tree(ctx.rules, mailbox) {
                Ok(_) => {}
                Err(StoreError::Preserved(_)) => return ItemOutcome::preserved(occurrence),
                Err(e) => return failed(e),
            }
        }
        if current.is_some() {
            match store.remove_account(ctx.rules, &account.id) {
                Ok(_) => info!("Deleted {}", occurrence.tag()),
                Err(StoreError::Preserved(_)) => return ItemOutcome::preserved(occurrence),
                Err(e) => return failed(e),
            }
        }
        ItemOutcome::deleted(occurrence)
    }
}

impl StoreAdapter for MailAdapter<'_> {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Mail
    }

    fn scan(&self, identity: &Identity, _ctx: &AdapterContext) -> ScanReport {
        let store = match MailStore::locate(&self.home) {
            Ok(Some(store)) => store,
            Ok(None) => return ScanReport::default(),
            Err(e) => return ScanReport::warning(format!("could not open Mail data: {e}")),
        };
        let accounts = match store.accounts() {
            Ok(accounts) => accounts,
            Err(e) => return ScanReport::warning(format!("could not read Mail accounts: {e}")),
        };

        ScanReport {
            occurrences: accounts
                .into_iter()
                .filter(|account| account.has_address(identity.as_str()))
                .map(|account| {
                    Occurrence::new(
                        AdapterKind::Mail,
                        Location::MailAccount {
                            accounts: store.accounts_path(),
                            account,
                        },
                    )
                })
                .collect(),
            warnings: Vec::new(),
        }
    }

    fn delete(&self, identity: &Identity, occurrences: &[Occurrence], ctx: &AdapterContext) -> Vec<ItemOutcome> {
        if let Err(record) = self.quit.ensure_quit(MAIL_APPLICATION, "its account list", ctx) {
            let mut record = Some(record);
            return occurrences
                .iter()
                .map(|occurrence| ItemOutcome::declined(occurrence, record.take()))
                .collect();
        }

        let store = match MailStore::locate(&self.home) {
            Ok(Some(store)) => store,
            // Mail data vanished since the scan: nothing is left to delete.
            Ok(None) => return occurrences.iter().map(ItemOutcome::deleted).collect(),
            Err(e) => {
                return occurrences
                    .iter()
                    .map(|occurrence| {
                        ItemOutcome::failed(
                            occurrence,
                            ErrorRecord::from_store("Opening Mail data", &e, REMOVE_IN_MAIL),
                        )
                    })
                    .collect();
            }
        };

        occurrences
            .iter()
            .map(|occurrence| match &occurrence.location {
                Location::MailAccount { account, .. } => {
                    self.delete_account(&store, identity, occurrence, account, ctx)
                }
                _ => ItemOutcome::failed(occurrence, misrouted(occurrence)),
            })
            .collect()
    }
}
