//! In-memory fakes for process execution (testing only)
//!
//! Provides `FakeRunner`, a scripted [`ProcessRunner`] that satisfies the
//! trait contract without spawning any processes. Responses are keyed by the
//! rendered command line; unscripted commands succeed with empty output.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::error::Result;
use crate::process::{CommandLine, CommandOutput, ProcessRunner};

/// Scripted, recording process runner.
#[derive(Debug, Default)]
pub struct FakeRunner {
    responses: Mutex<HashMap<String, VecDeque<CommandOutput>>>,
    calls: Mutex<Vec<String>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for a rendered command line. Multiple responses for
    /// the same command are returned in FIFO order.
    pub fn on(&self, command: impl Into<String>, output: CommandOutput) {
        let mut responses = self.responses.lock().unwrap();
        responses.entry(command.into()).or_default().push_back(output);
    }

    /// Queue a successful response with the given stdout.
    pub fn succeed_with(&self, command: impl Into<String>, stdout: &str) {
        self.on(
            command,
            CommandOutput {
                status: 0,
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
        );
    }

    /// Queue a failing response with the given status and stderr.
    pub fn fail_with(&self, command: impl Into<String>, status: i32, stderr: &str) {
        self.on(
            command,
            CommandOutput {
                status,
                stdout: String::new(),
                stderr: stderr.to_string(),
            },
        );
    }

    /// Every command executed so far, in order, rendered as strings.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Whether any executed command contains the given fragment.
    pub fn ran(&self, fragment: &str) -> bool {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .any(|call| call.contains(fragment))
    }
}

impl ProcessRunner for FakeRunner {
    fn run(&self, command: &CommandLine) -> Result<()> {
        self.capture_checked(command).map(|_| ())
    }

    fn status(&self, command: &CommandLine) -> Result<i32> {
        Ok(self.capture(command)?.status)
    }

    fn capture(&self, command: &CommandLine) -> Result<CommandOutput> {
        let rendered = command.to_string();
        self.calls.lock().unwrap().push(rendered.clone());
        let mut responses = self.responses.lock().unwrap();
        if let Some(queue) = responses.get_mut(&rendered) {
            if let Some(output) = queue.pop_front() {
                return Ok(output);
            }
        }
        Ok(CommandOutput::default())
    }
}
