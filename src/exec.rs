//! Shell command execution boundary
//!
//! Every external invocation (package steps, the file collector, the pango
//! module query) goes through [`CommandRunner`], so orchestration logic can
//! be tested against a scripted fake instead of a real shell.

use crate::error::Result;
use std::path::Path;
use std::process::{Command, Stdio};

/// Result of one shell invocation
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub code: i32,
    pub stdout: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Captured stdout split into lines
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.stdout.lines()
    }
}

/// Narrow process-execution seam: script in, exit code and stdout out
pub trait CommandRunner {
    fn run(&self, script: &str, env: &[(String, String)], cwd: &Path) -> Result<CommandOutput>;
}

/// Production runner: hands the script to `sh -c`
///
/// The script arrives fully templated; no further interpretation happens
/// here. Stderr is inherited so toolchain noise reaches the user directly.
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    fn run(&self, script: &str, env: &[(String, String)], cwd: &Path) -> Result<CommandOutput> {
        tracing::debug!("sh -c {:?} (cwd: {})", script, cwd.display());

        let output = Command::new("sh")
            .arg("-c")
            .arg(script)
            .current_dir(cwd)
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stderr(Stdio::inherit())
            .output()?;

        Ok(CommandOutput {
            // Signal deaths have no exit code; treat them as failures
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        })
    }
}
