//! Shared helpers for integration tests.
#![allow(dead_code)]

use std::sync::Mutex;

use network_health::config::BackendConfig;
use network_health::error::{HealthError, Result};
use network_health::runner::{CommandRunner, Invocation, ProcessOutput};

pub const LINUX_PING: &str = "PING 192.168.1.1 (192.168.1.1) 56(84) bytes of data.
64 bytes from 192.168.1.1: icmp_seq=1 ttl=64 time=1.21 ms
64 bytes from 192.168.1.1: icmp_seq=2 ttl=64 time=0.984 ms
64 bytes from 192.168.1.1: icmp_seq=3 ttl=64 time=1.05 ms

--- 192.168.1.1 ping statistics ---
3 packets transmitted, 3 received, 0% packet loss, time 2003ms
rtt min/avg/max/mdev = 0.984/1.081/1.210/0.095 ms
";

pub const IPERF_OUTPUT: &str = "------------------------------------------------------------
Client connecting to 192.168.1.20, TCP port 5001
TCP window size: 0.08 MByte (default)
------------------------------------------------------------
[  3] local 192.168.1.10 port 40112 connected with 192.168.1.20 port 5001
[ ID] Interval       Transfer     Bandwidth
[  3]  0.00-10.0 sec  120 MBytes  12.0 MBytes/sec
";

/// Replies to each invocation by program name and records what it was asked
/// to run.
pub struct CannedRunner {
    replies: Vec<(&'static str, std::result::Result<&'static str, i32>)>,
    pub calls: Mutex<Vec<Invocation>>,
}

impl CannedRunner {
    pub fn new() -> Self {
        Self {
            replies: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// `program` prints `stdout` and exits 0.
    pub fn reply(mut self, program: &'static str, stdout: &'static str) -> Self {
        self.replies.push((program, Ok(stdout)));
        self
    }

    /// `program` exits with `code`.
    pub fn fail(mut self, program: &'static str, code: i32) -> Self {
        self.replies.push((program, Err(code)));
        self
    }

    pub fn recorded(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl CommandRunner for CannedRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ProcessOutput> {
        self.calls.lock().unwrap().push(invocation.clone());
        match self.replies.iter().find(|(p, _)| *p == invocation.program) {
            Some((_, Ok(stdout))) => Ok(ProcessOutput {
                exit_code: Some(0),
                stdout: stdout.to_string(),
                stderr: String::new(),
            }),
            Some((_, Err(code))) => Err(HealthError::ProcessExecutionFailed {
                program: invocation.program.clone(),
                code: Some(*code),
                output: String::new(),
            }),
            None => Err(HealthError::ProcessExecutionFailed {
                program: invocation.program.clone(),
                code: None,
                output: "failed to launch: No such file or directory".to_string(),
            }),
        }
    }
}

/// Backend settings pointing at a mock server.
pub fn backend_config(server_uri: &str) -> BackendConfig {
    BackendConfig {
        base_url: format!("{}/api", server_uri),
        timeout_secs: 5,
        ..BackendConfig::default()
    }
}
