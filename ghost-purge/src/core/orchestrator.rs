/*!
Runs every adapter's scan for one identity and merges the results.
*/

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::core::{
    adapter::{AdapterContext, StoreAdapter},
    identity::Identity,
    occurrence::{AdapterKind, Category, Occurrence},
};

/// Every occurrence of one run, in discovery order, without duplicates.
#[derive(Debug, Default, Clone)]
pub struct LocationTrail {
    occurrences: Vec<Occurrence>,
}

impl LocationTrail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `occurrence` unless an equal one is already recorded. Returns
    /// whether it was added.
    pub fn push(&mut self, occurrence: Occurrence) -> bool {
        if self.occurrences.contains(&occurrence) {
            return false;
        }
        self.occurrences.push(occurrence);
        true
    }

    pub fn len(&self) -> usize {
        self.occurrences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occurrences.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Occurrence> {
        self.occurrences.iter()
    }

    pub fn for_kind(&self, kind: AdapterKind) -> Vec<Occurrence> {
        self.occurrences
            .iter()
            .filter(|occurrence| occurrence.kind == kind)
            .cloned()
            .collect()
    }

    pub fn count(&self, category: Category) -> usize {
        self.occurrences
            .iter()
            .filter(|occurrence| occurrence.category() == category)
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanWarning {
    pub adapter: AdapterKind,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct Discovery {
    pub trail: LocationTrail,
    pub warnings: Vec<ScanWarning>,
}

pub struct Orchestrator<'a> {
    adapters: Vec<Box<dyn StoreAdapter + 'a>>,
    show_progress: bool,
}

impl<'a> Orchestrator<'a> {
    /// Adapters are kept in category order, browsers in product order.
    pub fn new(mut adapters: Vec<Box<dyn StoreAdapter + 'a>>) -> Self {
        adapters.sort_by_key(|adapter| adapter.kind());
        Self {
            adapters,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn adapters(&self) -> &[Box<dyn StoreAdapter + 'a>] {
        &self.adapters
    }

    fn spinner(&self) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner} Scanning {msg}") {
            spinner.set_style(style);
        }
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner
    }

    pub fn discover(&self, identity: &Identity, ctx: &AdapterContext) -> Discovery {
        let mut discovery = Discovery::default();
        let spinner = self.spinner();

        for adapter in &self.adapters {
            let kind = adapter.kind();
            spinner.set_message(kind.label());
            let report = adapter.scan(identity, ctx);
            debug!(
                "{} reported {} occurrences and {} warnings",
                kind.label(),
                report.occurrences.len(),
                report.warnings.len()
            );

            for occurrence in report.occurrences {
                if occurrence.kind != kind {
                    warn!("{} reported an occurrence for {}, ignoring it", kind.label(), occurrence.kind.label());
                    continue;
                }
                discovery.trail.push(occurrence);
            }
            for message in report.warnings {
                warn!("{}: {}", kind.label(), message);
                discovery.warnings.push(ScanWarning {
                    adapter: kind,
                    message,
                });
            }
        }

        spinner.finish_and_clear();
        info!("Discovered {} occurrences of {}", discovery.trail.len(), identity);
        discovery
    }
}
