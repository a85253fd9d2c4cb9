//! Command-backed collaborator.
//!
//! Spawns a configured argv, feeds the rendered prompt over stdin, and
//! reads the completion from stdout. The command is killed once the
//! request's timeout elapses; non-zero exits and unparseable output are
//! surfaced as errors for the engine's retry/degrade policy.

use std::process::Command;

use anyhow::{Result, anyhow};
use tracing::{debug, instrument, warn};

use crate::io::process::run_command_with_timeout;
use crate::llm::{AnnotateRequest, Collaborator, GenerateRequest, RawAnnotation, parse, prompt};

#[derive(Debug, Clone)]
pub struct CommandCollaborator {
    command: Vec<String>,
    output_limit_bytes: usize,
}

impl CommandCollaborator {
    pub fn new(command: Vec<String>, output_limit_bytes: usize) -> Self {
        Self {
            command,
            output_limit_bytes,
        }
    }

    #[instrument(skip_all, fields(command = %self.command[0], timeout_secs = request_timeout.as_secs()))]
    fn complete(&self, prompt_text: &str, request_timeout: std::time::Duration) -> Result<String> {
        let mut cmd = Command::new(&self.command[0]);
        cmd.args(&self.command[1..]);

        let output = run_command_with_timeout(
            cmd,
            Some(prompt_text.as_bytes()),
            request_timeout,
            self.output_limit_bytes,
        )?;

        if output.timed_out {
            warn!("collaborator command timed out");
            return Err(anyhow!(
                "collaborator '{}' timed out after {:?}",
                self.command[0],
                request_timeout
            ));
        }
        if !output.status.success() {
            warn!(exit_code = ?output.status.code(), "collaborator command failed");
            return Err(anyhow!(
                "collaborator '{}' failed with status {:?}: {}",
                self.command[0],
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        debug!(bytes = output.stdout.len(), "collaborator replied");
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Collaborator for CommandCollaborator {
    fn generate(&self, request: &GenerateRequest) -> Result<Vec<String>> {
        let prompt_text = prompt::render_branch(request);
        let reply = self.complete(&prompt_text, request.timeout)?;
        parse::parse_summaries(&reply)
    }

    fn annotate(&self, request: &AnnotateRequest) -> Result<RawAnnotation> {
        let prompt_text = prompt::render_annotate(request);
        let reply = self.complete(&prompt_text, request.timeout)?;
        parse::parse_annotation(&reply)
    }
}
