/*!
Console and file logging.

The console shows warnings unless `RUST_LOG` says otherwise. Every run also
writes a debug log to its own timestamped file, so a purge can be audited
afterwards.
*/

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;
use tracing::{debug, warn};
use tracing_subscriber::{EnvFilter, Layer, filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber. Returns the log file, or `None` when it
/// could not be opened and only the console is logged to.
pub fn init(log_dir: &Path) -> Option<PathBuf> {
    let console = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")));

    let (file_layer, opened) = match open_log_file(log_dir) {
        Ok((path, file)) => (
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(LevelFilter::DEBUG),
            ),
            Ok(path),
        ),
        Err(e) => (None, Err(e)),
    };

    tracing_subscriber::registry().with(console).with(file_layer).init();

    match opened {
        Ok(path) => {
            debug!("Logging to {}", path.display());
            Some(path)
        }
        Err(e) => {
            warn!("Cannot write a log file in {}, logging to the console only: {}", log_dir.display(), e);
            None
        }
    }
}

fn log_file_name() -> String {
    format!("ghost-purge-{}.log", Local::now().format("%Y%m%d-%H%M%S"))
}

fn open_log_file(log_dir: &Path) -> io::Result<(PathBuf, File)> {
    fs::create_dir_all(log_dir)?;
    let path = log_dir.join(log_file_name());
    let file = File::create(&path)?;
    Ok((path, file))
}
