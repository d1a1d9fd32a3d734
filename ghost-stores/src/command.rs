/*!
Seam over external programs (`security`, `pgrep`, `osascript`) so stores that
only expose a command surface can be driven by fakes in tests.
*/

use std::io;
use std::process::Command;

use tracing::debug;

use crate::error::{StoreError, StoreResult};

/// Captured result of one program invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit status; `None` when the program was killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Turn a non-zero exit into [`StoreError::CommandFailed`].
    pub fn check(self, program: &str) -> StoreResult<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(StoreError::CommandFailed {
                program: program.to_string(),
                status: self.status.unwrap_or(-1),
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

pub trait CommandRunner {
    /// Run `program` with `args` and capture its output. A non-zero exit is
    /// not an error at this level; a missing program is.
    fn run(&self, program: &str, args: &[&str]) -> StoreResult<CommandOutput>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, program: &str, args: &[&str]) -> StoreResult<CommandOutput> {
        (**self).run(program, args)
    }
}

/// Runs real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> StoreResult<CommandOutput> {
        debug!("Running {} {:?}", program, args);
        let output = Command::new(program).args(args).output().map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                StoreError::CommandUnavailable {
                    program: program.to_string(),
                    source: e,
                }
            } else {
                StoreError::io(program, e)
            }
        })?;

        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
