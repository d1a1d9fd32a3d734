/*!
Detecting and quitting the applications that hold a store open.
*/

use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::command::{CommandRunner, SystemRunner};
use crate::error::StoreResult;

pub trait ProcessControl {
    /// Whether the application's main executable is running.
    fn is_running(&self, application: &str) -> bool;

    /// Ask the application to quit. Returns once the request is delivered,
    /// not once the process is gone.
    fn request_quit(&self, application: &str) -> StoreResult<()>;
}

impl<P: ProcessControl + ?Sized> ProcessControl for &P {
    fn is_running(&self, application: &str) -> bool {
        (**self).is_running(application)
    }

    fn request_quit(&self, application: &str) -> StoreResult<()> {
        (**self).request_quit(application)
    }
}

/// `pgrep` to detect, AppleScript to quit.
pub struct SystemProcesses<R: CommandRunner = SystemRunner> {
    runner: R,
}

impl SystemProcesses<SystemRunner> {
    pub fn new() -> Self {
        Self {
            runner: SystemRunner,
        }
    }
}

impl Default for SystemProcesses<SystemRunner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: CommandRunner> SystemProcesses<R> {
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }
}

impl<R: CommandRunner> ProcessControl for SystemProcesses<R> {
    fn is_running(&self, application: &str) -> bool {
        // Match the bundle's main executable path; `pgrep -x` compares the
        // process name, which macOS truncates to 16 bytes.
        let pattern = format!("/{application}.app/Contents/MacOS/");
        match self.runner.run("pgrep", &["-f", &pattern]) {
            Ok(output) => output.success(),
            Err(e) => {
                debug!("pgrep unavailable, assuming {} is not running: {}", application, e);
                false
            }
        }
    }

    fn request_quit(&self, application: &str) -> StoreResult<()> {
        let script = format!(
            "tell application \"{}\" to quit",
            application.replace('\\', "\\\\").replace('"', "\\\"")
        );
        info!("Asking {} to quit", application);
        self.runner.run("osascript", &["-e", &script])?.check("osascript")?;
        Ok(())
    }
}

/// Poll until `application` is gone or `ceiling` elapses. Returns whether it
/// exited in time.
pub fn wait_for_exit<P: ProcessControl + ?Sized>(
    processes: &P,
    application: &str,
    ceiling: Duration,
    interval: Duration,
) -> bool {
    let started = Instant::now();
    loop {
        if !processes.is_running(application) {
            debug!("{} exited after {:?}", application, started.elapsed());
            return true;
        }
        if started.elapsed() >= ceiling {
            return false;
        }
        thread::sleep(interval.min(ceiling.saturating_sub(started.elapsed())));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandOutput;
    use std::cell::{Cell, RefCell};

    struct CountdownProcess {
        polls_until_exit: Cell<u32>,
    }

    impl ProcessControl for CountdownProcess {
        fn is_running(&self, _application: &str) -> bool {
            let left = self.polls_until_exit.get();
            if left == 0 {
                return false;
            }
            self.polls_until_exit.set(left - 1);
            true
        }

        fn request_quit(&self, _application: &str) -> StoreResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_wait_returns_once_process_exits() {
        let process = CountdownProcess {
            polls_until_exit: Cell::new(3),
        };
        assert!(wait_for_exit(
            &process,
            "Google Chrome",
            Duration::from_secs(5),
            Duration::from_millis(1)
        ));
    }

    #[test]
    fn test_wait_gives_up_at_ceiling() {
        let process = CountdownProcess {
            polls_until_exit: Cell::new(u32::MAX),
        };
        assert!(!wait_for_exit(
            &process,
            "Google Chrome",
            Duration::from_millis(20),
            Duration::from_millis(5)
        ));
    }

    struct Recorder {
        calls: RefCell<Vec<(String, Vec<String>)>>,
        status: i32,
    }

    impl CommandRunner for Recorder {
        fn run(&self, program: &str, args: &[&str]) -> StoreResult<CommandOutput> {
            self.calls.borrow_mut().push((
                program.to_string(),
                args.iter().map(|arg| arg.to_string()).collect(),
            ));
            Ok(CommandOutput {
                status: Some(self.status),
                ..CommandOutput::default()
            })
        }
    }

    #[test]
    fn test_system_processes_commands() {
        let recorder = Recorder {
            calls: RefCell::new(Vec::new()),
            status: 0,
        };
        let processes = SystemProcesses::with_runner(&recorder);

        assert!(processes.is_running("Brave Browser"));
        processes.request_quit("Brave Browser").unwrap();

        let calls = recorder.calls.borrow();
        assert_eq!(calls[0].0, "pgrep");
        assert_eq!(calls[0].1, vec!["-f", "/Brave Browser.app/Contents/MacOS/"]);
        assert_eq!(calls[1].0, "osascript");
        assert_eq!(calls[1].1[1], "tell application \"Brave Browser\" to quit");
    }

    #[test]
    fn test_pgrep_no_match_means_not_running() {
        let recorder = Recorder {
            calls: RefCell::new(Vec::new()),
            status: 1,
        };
        assert!(!SystemProcesses::with_runner(&recorder).is_running("Arc"));
    }
}
