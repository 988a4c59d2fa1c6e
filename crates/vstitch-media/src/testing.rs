//! Scripted `CommandRunner` for tests that must not depend on FFmpeg.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::command::{CommandInvocation, CommandRunner};
use crate::error::{MediaError, MediaResult};

/// Pretends to be FFmpeg/FFprobe.
///
/// - `ffprobe` returns the configured probe output
/// - `ffmpeg -version` returns a banner
/// - any other `ffmpeg` call writes a small file at its output path (the
///   last argument); concat manifests are captured before they are consumed
/// - any call with an argument containing the `failing_on` needle fails
/// - any call with an argument containing the `timing_out_on` needle
///   returns `Timeout`, as a killed process would
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    calls: Mutex<Vec<CommandInvocation>>,
    manifests: Mutex<Vec<String>>,
    probe_output: String,
    fail_on: Option<String>,
    timeout_on: Option<(String, u64)>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self {
            probe_output: "10.000000\n".to_string(),
            ..Self::default()
        }
    }

    pub fn with_probe_output(mut self, output: impl Into<String>) -> Self {
        self.probe_output = output.into();
        self
    }

    /// Fail every invocation that has an argument containing `needle`.
    pub fn failing_on(mut self, needle: impl Into<String>) -> Self {
        self.fail_on = Some(needle.into());
        self
    }

    /// Time out every invocation that has an argument containing `needle`.
    pub fn timing_out_on(mut self, needle: impl Into<String>, secs: u64) -> Self {
        self.timeout_on = Some((needle.into(), secs));
        self
    }

    /// Every invocation seen so far, in call order.
    pub fn invocations(&self) -> Vec<CommandInvocation> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Contents of every concat manifest handed to FFmpeg.
    pub fn manifests(&self) -> Vec<String> {
        self.manifests.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, invocation: &CommandInvocation) -> MediaResult<String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(invocation.clone());
        }

        if let Some(needle) = &self.fail_on {
            if invocation.args.iter().any(|a| a.contains(needle.as_str())) {
                return Err(MediaError::command_failed(
                    invocation.program.clone(),
                    Some(1),
                    format!("scripted failure on {}", needle),
                ));
            }
        }

        if let Some((needle, secs)) = &self.timeout_on {
            if invocation.args.iter().any(|a| a.contains(needle.as_str())) {
                return Err(MediaError::Timeout(*secs));
            }
        }

        match invocation.program.as_str() {
            "ffprobe" => Ok(self.probe_output.clone()),
            "ffmpeg" if invocation.args.iter().any(|a| a == "-version") => {
                Ok("ffmpeg version 6.1-scripted\n".to_string())
            }
            "ffmpeg" => {
                if invocation.args.iter().any(|a| a == "concat") {
                    let manifest = invocation
                        .args
                        .iter()
                        .position(|a| a == "-i")
                        .and_then(|i| invocation.args.get(i + 1));
                    if let Some(manifest) = manifest {
                        let content = tokio::fs::read_to_string(manifest).await?;
                        if let Ok(mut manifests) = self.manifests.lock() {
                            manifests.push(content);
                        }
                    }
                }
                if let Some(output) = invocation.args.last() {
                    tokio::fs::write(output, b"scripted media").await?;
                }
                Ok(String::new())
            }
            other => Err(MediaError::command_failed(other, Some(127), "unknown program")),
        }
    }
}
