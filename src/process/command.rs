use std::process::Stdio;
use std::time::Duration;

use log::{debug, trace};
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;

use crate::process::{ProcessError, ProcessResult};

/// Command wrapper for process execution
#[derive(Debug, Clone)]
pub struct Command {
    /// Program to execute
    program: String,

    /// Arguments to pass to the program
    args: Vec<String>,
}

impl Command {
    /// Create a new command
    pub fn new<S: Into<String>>(program: S) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Run the command to completion and return its stdout.
    ///
    /// The child is killed when `limit` elapses before it exits.
    pub async fn output(&self, limit: Duration) -> ProcessResult<String> {
        debug!("Running command: {} {:?}", self.program, self.args);

        let mut cmd = TokioCommand::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn()?;
        let output = match timeout(limit, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => return Err(ProcessError::Timeout(limit)),
        };

        if !output.status.success() {
            return Err(ProcessError::NonZeroExit {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        trace!("[{}] stdout: {} bytes", self.program, stdout.len());
        Ok(stdout)
    }
}
