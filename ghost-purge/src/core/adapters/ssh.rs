/*!
SSH key pairs labelled with the identity, and client configuration blocks
that mention it.
*/

use std::path::Path;

use ghost_stores::StoreError;
use ghost_stores::ssh::{self, KeyPair, SshDir};
use tracing::info;

use super::misrouted;
use crate::core::{
    adapter::{AdapterContext, ItemOutcome, ScanReport, StoreAdapter},
    identity::Identity,
    ledger::ErrorRecord,
    occurrence::{AdapterKind, Location, Occurrence},
};

pub struct SshAdapter {
    dir: SshDir,
}

impl SshAdapter {
    pub fn new(home: &Path) -> Self {
        Self {
            dir: SshDir::new(home),
        }
    }

    fn delete_key(&self, identity: &Identity, occurrence: &Occurrence, pair: &KeyPair, ctx: &AdapterContext) -> ItemOutcome {
        match ssh::read_public_key(&pair.public) {
            Ok(Some(current)) if current.mentions(identity.as_str()) => {}
            Ok(_) => {
                info!("{} no longer mentions the identity", occurrence.tag());
                return ItemOutcome::deleted(occurrence);
            }
            Err(e) if e.is_not_found() => {
                info!("{} is already absent", occurrence.tag());
                return ItemOutcome::deleted(occurrence);
            }
            Err(e) => {
                return ItemOutcome::failed(
                    occurrence,
                    ErrorRecord::from_store(&format!("Reading {}", occurrence.tag()), &e, "Check the permissions of ~/.ssh"),
                );
            }
        }

        let prompt = format!(
            "Delete SSH key {} ({})? Servers that trust it will no longer accept you.",
            pair.name(),
            pair.comment
        );
        if !ctx.confirm.confirm(&prompt) {
            info!("Keeping {} at the user's request", occurrence.tag());
            return ItemOutcome::declined(occurrence, None);
        }

        match ssh::remove_key_pair(ctx.rules, pair) {
            Ok(_) => ItemOutcome::deleted(occurrence),
            Err(StoreError::Preserved(_)) => ItemOutcome::preserved(occurrence),
            Err(e) => ItemOutcome::failed(
                occurrence,
                ErrorRecord::from_store(
                    &format!("Deleting {}", occurrence.tag()),
                    &e,
                    format!("Delete {} and its private key by hand", pair.public.display()),
                ),
            ),
        }
    }

    fn delete_host_block(&self, identity: &Identity, occurrence: &Occurrence, header: &str, ctx: &AdapterContext) -> ItemOutcome {
        match self.dir.remove_host_block(ctx.rules, header, identity.as_str()) {
            Ok(true) => {
                info!("Deleted {}", occurrence.tag());
                ItemOutcome::deleted(occurrence)
            }
            Ok(false) => {
                info!("{} is already absent", occurrence.tag());
                ItemOutcome::deleted(occurrence)
            }
            Err(StoreError::Preserved(_)) => ItemOutcome::preserved(occurrence),
            Err(e) => ItemOutcome::failed(
                occurrence,
                ErrorRecord::from_store(
                    &format!("Editing {}", self.dir.config_path().display()),
                    &e,
                    format!("Remove the `{header}` block from ~/.ssh/config by hand"),
                ),
            ),
        }
    }
}

impl StoreAdapter for SshAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Ssh
    }

    fn scan(&self, identity: &Identity, _ctx: &AdapterContext) -> ScanReport {
        let mut report = ScanReport::default();

        match self.dir.key_pairs() {
            Ok(pairs) => report.occurrences.extend(
                pairs
                    .into_iter()
                    .filter(|pair| pair.mentions(identity.as_str()))
                    .map(|pair| Occurrence::new(AdapterKind::Ssh, Location::SshKey(pair))),
            ),
            Err(e) => report.warnings.push(format!("could not list keys: {e}")),
        }

        match self.dir.host_blocks() {
            Ok(blocks) => report.occurrences.extend(
                blocks
                    .into_iter()
                    .filter(|block| block.mentions(identity.as_str()))
                    .map(|block| {
                        Occurrence::new(
                            AdapterKind::Ssh,
                            Location::SshHostBlock {
                                config: self.dir.config_path(),
                                header: block.header,
                            },
                        )
                    }),
            ),
            Err(e) => report.warnings.push(format!("could not read ~/.ssh/config: {e}")),
        }
        report
    }

    fn delete(&self, identity: &Identity, occurrences: &[Occurrence], ctx: &AdapterContext) -> Vec<ItemOutcome> {
        occurrences
            .iter()
            .map(|occurrence| match &occurrence.location {
                Location::SshKey(pair) => self.delete_key(identity, occurrence, pair, ctx),
                Location::SshHostBlock { header, .. } => self.delete_host_block(identity, occurrence, header, ctx),
                _ => ItemOutcome::failed(occurrence, misrouted(occurrence)),
            })
            .collect()
    }
}
