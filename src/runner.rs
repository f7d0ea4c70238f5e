//! External process execution: spawn a tool, wait for it, capture its output.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{HealthError, Result};

/// A fully specified tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Appended as `-p <port>` when set.
    pub port: Option<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            port: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn port(mut self, port: Option<u16>) -> Self {
        self.port = port.map(|p| p.to_string());
        self
    }

    /// Final argument vector passed to the process.
    pub fn argv(&self) -> Vec<String> {
        let mut argv = self.args.clone();
        if let Some(port) = &self.port {
            argv.push("-p".to_string());
            argv.push(port.clone());
        }
        argv
    }
}

impl std::fmt::Display for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in self.argv() {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    /// stdout followed by stderr, the text the parsers search.
    pub fn combined(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Seam between the parsers and the operating system.
#[async_trait::async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `invocation` to completion. Non-zero exit is an error.
    async fn run(&self, invocation: &Invocation) -> Result<ProcessOutput>;
}

/// Runs tools found on `PATH` through `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    timeout: Option<Duration>,
}

impl SystemRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

#[async_trait::async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ProcessOutput> {
        info!(command = %invocation, "starting process");

        let mut cmd = tokio::process::Command::new(&invocation.program);
        cmd.args(invocation.argv()).kill_on_drop(true);

        let pending = cmd.output();
        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, pending).await {
                Ok(res) => res,
                Err(_) => {
                    warn!(program = %invocation.program, ?limit, "process timed out, killing");
                    return Err(HealthError::ProcessTimeout {
                        program: invocation.program.clone(),
                        timeout: limit,
                    });
                }
            },
            None => pending.await,
        };

        let out = result.map_err(|e| {
            warn!(program = %invocation.program, error = %e, "failed to launch process");
            HealthError::ProcessExecutionFailed {
                program: invocation.program.clone(),
                code: None,
                output: format!("failed to launch: {}", e),
            }
        })?;

        let output = ProcessOutput {
            exit_code: out.status.code(),
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
        };
        debug!(program = %invocation.program, output = %output.combined(), "process output");

        if !out.status.success() {
            warn!(program = %invocation.program, code = ?output.exit_code, "process exited unsuccessfully");
            return Err(HealthError::ProcessExecutionFailed {
                program: invocation.program.clone(),
                code: output.exit_code,
                output: output.combined(),
            });
        }

        info!(program = %invocation.program, "process completed");
        Ok(output)
    }
}
