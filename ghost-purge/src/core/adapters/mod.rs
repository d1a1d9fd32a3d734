/*!
One adapter per store. [`standard_adapters`] builds the full set for a run.
*/

pub mod app_data;
pub mod browser;
pub mod cloud;
pub mod keychain;
pub mod mail;
pub mod ssh;
pub mod system_accounts;

use std::path::Path;
use std::time::Duration;

use ghost_stores::browser::Browser;
use ghost_stores::command::CommandRunner;
use ghost_stores::process::{self, ProcessControl};
use tracing::info;

use crate::core::{
    adapter::{AdapterContext, StoreAdapter},
    config::PurgeConfig,
    ledger::ErrorRecord,
    occurrence::Occurrence,
};

/// Every adapter, with the system capabilities they need.
pub fn standard_adapters<'a>(
    config: &PurgeConfig,
    home: &Path,
    runner: &'a dyn CommandRunner,
    processes: &'a dyn ProcessControl,
) -> Vec<Box<dyn StoreAdapter + 'a>> {
    let quit = QuitPolicy {
        processes,
        ceiling: config.quit_timeout(),
        interval: config.poll_interval(),
    };

    let mut adapters: Vec<Box<dyn StoreAdapter + 'a>> = vec![Box::new(keychain::KeychainAdapter::new(runner))];
    for browser in Browser::ALL {
        adapters.push(Box::new(browser::BrowserAdapter::new(browser, home, quit)));
    }
    adapters.push(Box::new(mail::MailAdapter::new(home, quit)));
    adapters.push(Box::new(app_data::AppDataAdapter::new(
        config.app_data_roots(home),
        app_data::owned_elsewhere(home),
        config.app_data.max_depth,
        config.app_data.max_file_bytes,
    )));
    adapters.push(Box::new(ssh::SshAdapter::new(home)));
    adapters.push(Box::new(system_accounts::SystemAccountsAdapter::new(home)));
    adapters.push(Box::new(cloud::CloudConfigAdapter::new(home)));
    adapters
}

/// Record for an occurrence handed to an adapter that does not own its
/// location type.
pub(crate) fn misrouted(occurrence: &Occurrence) -> ErrorRecord {
    ErrorRecord::new(
        format!("{} was routed to the wrong store", occurrence.tag()),
        "Re-run ghost-purge and report this as a bug if it persists",
    )
}

/// How to get an application that holds a store open to quit.
#[derive(Clone, Copy)]
pub struct QuitPolicy<'a> {
    pub processes: &'a dyn ProcessControl,
    pub ceiling: Duration,
    pub interval: Duration,
}

impl QuitPolicy<'_> {
    /// Make sure `application` is not running, asking the user before
    /// quitting it. `Err` means it is still running, and says why.
    pub fn ensure_quit(&self, application: &str, holds: &str, ctx: &AdapterContext) -> Result<(), ErrorRecord> {
        if !self.processes.is_running(application) {
            return Ok(());
        }

        let remediation = format!("Quit {application} yourself, then re-run ghost-purge");
        let prompt = format!("{application} is running and holds {holds} open. Quit {application} now?");
        if !ctx.confirm.confirm(&prompt) {
            return Err(ErrorRecord::new(
                format!("{application} was left running, so {holds} could not be removed"),
                remediation,
            ));
        }

        if let Err(e) = self.processes.request_quit(application) {
            return Err(ErrorRecord::new(
                format!("Could not ask {application} to quit: {e}"),
                remediation,
            ));
        }
        if !process::wait_for_exit(self.processes, application, self.ceiling, self.interval) {
            return Err(ErrorRecord::new(
                format!("{application} did not quit within {}s", self.ceiling.as_secs()),
                remediation,
            ));
        }
        info!("{} has quit", application);
        Ok(())
    }
}
