/*!
Deletion phase: hands each adapter its own occurrences, in category order,
and accounts for every one of them.
*/

use tracing::{info, warn};

use crate::core::{
    adapter::{AdapterContext, DeletionOutcome, ItemOutcome, StoreAdapter},
    identity::Identity,
    ledger::{ErrorLedger, ErrorRecord},
    occurrence::Occurrence,
    orchestrator::LocationTrail,
};

/// Delete everything in `trail`. Never stops early; every failure lands in
/// `ledger` and every occurrence gets exactly one outcome.
pub fn execute(
    adapters: &[Box<dyn StoreAdapter + '_>],
    identity: &Identity,
    trail: &LocationTrail,
    ctx: &AdapterContext,
    ledger: &mut ErrorLedger,
) -> Vec<ItemOutcome> {
    let mut ordered: Vec<&dyn StoreAdapter> = adapters.iter().map(|adapter| adapter.as_ref()).collect();
    ordered.sort_by_key(|adapter| adapter.kind());

    let mut outcomes = Vec::new();
    for adapter in ordered {
        let kind = adapter.kind();
        let occurrences = trail.for_kind(kind);
        if occurrences.is_empty() {
            continue;
        }

        let (preserved, deletable): (Vec<Occurrence>, Vec<Occurrence>) = occurrences
            .into_iter()
            .partition(|occurrence| occurrence.paths().iter().any(|path| ctx.rules.is_preserved(path)));
        for occurrence in &preserved {
            info!("Keeping {}: protected by a preservation rule", occurrence.tag());
            outcomes.push(ItemOutcome::preserved(occurrence));
        }
        if deletable.is_empty() {
            continue;
        }

        info!("Deleting {} {} occurrences", deletable.len(), kind.label());
        let mut reported = adapter.delete(identity, &deletable, ctx);
        for occurrence in &deletable {
            let outcome = match reported.iter().position(|item| &item.occurrence == occurrence) {
                Some(index) => reported.swap_remove(index),
                None => ItemOutcome::failed(
                    occurrence,
                    ErrorRecord::new(
                        format!("{}: no result was reported for this item", occurrence.tag()),
                        "Re-run ghost-purge; if it is still listed, remove it by hand",
                    ),
                ),
            };
            outcomes.push(outcome);
        }
        for stray in reported {
            warn!("{} reported an outcome for an item it was not given: {}", kind.label(), stray.occurrence.tag());
        }
    }

    for outcome in &outcomes {
        match (&outcome.outcome, &outcome.error) {
            (_, Some(error)) => ledger.push(error.clone()),
            (DeletionOutcome::Failed, None) => ledger.push(ErrorRecord::new(
                format!("{}: deletion failed", outcome.occurrence.tag()),
                "Remove it by hand",
            )),
            _ => {}
        }
    }
    outcomes
}
