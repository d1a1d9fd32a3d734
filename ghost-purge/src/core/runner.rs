/*!
One purge run, start to finish: discover, preview, ask once, delete, report.
*/

use std::io::{self, Write};
use std::time::Instant;

use console::style;
use tracing::info;

use crate::core::{
    adapter::AdapterContext,
    executor,
    identity::Identity,
    ledger::ErrorLedger,
    orchestrator::{Orchestrator, ScanWarning},
    preview::{Preview, build_preview},
    report::{Report, RunEnd},
};

/// The preview shown to the user, if any, and how the run ended.
#[derive(Debug)]
pub struct RunOutcome {
    pub preview: Option<Preview>,
    pub end: RunEnd,
}

/// Run a purge of `identity`, writing everything meant for the user to `out`.
/// With `dry_run` the run stops after the preview.
pub fn run(
    orchestrator: &Orchestrator,
    identity: &Identity,
    ctx: &AdapterContext,
    dry_run: bool,
    out: &mut dyn Write,
) -> io::Result<RunOutcome> {
    let started = Instant::now();
    let discovery = orchestrator.discover(identity, ctx);

    if discovery.trail.is_empty() {
        writeln!(out, "No traces of {identity} were found.")?;
        write_warnings(out, &discovery.warnings)?;
        return Ok(RunOutcome {
            preview: None,
            end: RunEnd::NothingFound,
        });
    }

    let preview = build_preview(&discovery.trail);
    writeln!(out, "{}", style(format!("Traces of {identity}:")).bold())?;
    writeln!(out, "{preview}")?;
    write_warnings(out, &discovery.warnings)?;

    if dry_run {
        writeln!(out, "\nDry run: nothing was deleted.")?;
        return Ok(RunOutcome {
            preview: Some(preview),
            end: RunEnd::DryRun,
        });
    }

    let prompt = format!(
        "Delete {} item(s) belonging to {identity}? This cannot be undone.",
        preview.total()
    );
    if !ctx.confirm.confirm(&prompt) {
        info!("Purge of {} cancelled at the confirmation prompt", identity);
        writeln!(out, "Cancelled: nothing was deleted.")?;
        return Ok(RunOutcome {
            preview: Some(preview),
            end: RunEnd::Cancelled,
        });
    }

    let mut ledger = ErrorLedger::new();
    let outcomes = executor::execute(orchestrator.adapters(), identity, &discovery.trail, ctx, &mut ledger);
    let report = Report::new(started.elapsed(), outcomes, discovery.warnings, ledger);
    info!(
        "Purge of {} finished: {} deleted, {} failed, {} problems recorded",
        identity,
        report.tally.deleted,
        report.tally.failed,
        report.ledger.len()
    );

    writeln!(out)?;
    write!(out, "{report}")?;
    Ok(RunOutcome {
        preview: Some(preview),
        end: RunEnd::Completed(report),
    })
}

fn write_warnings(out: &mut dyn Write, warnings: &[ScanWarning]) -> io::Result<()> {
    if warnings.is_empty() {
        return Ok(());
    }
    writeln!(out, "\n{}", style("Some stores could not be fully scanned:").yellow())?;
    for warning in warnings {
        writeln!(out, "  {}: {}", warning.adapter.label(), warning.message)?;
    }
    Ok(())
}
