use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use thiserror::Error;
use tokio::process::Command;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to launch `{program}`: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{program}` exited with {status}")]
    Exit { program: String, status: ExitStatus },
}

/// An external command, run to completion with its output forwarded to
/// tracing.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: String,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_owned());
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Runs the command and waits for it. A non-zero exit is an error.
    pub async fn run(&self) -> Result<(), ProcessError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }

        info!(program = %self.program, args = ?self.args, cwd = ?self.cwd, "Launching tool");
        let output = command.output().await.map_err(|source| {
            error!(error = ?source, program = %self.program, "Failed to launch tool process");
            ProcessError::Launch {
                program: self.program.clone(),
                source,
            }
        })?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            info!(program = %self.program, "{line}");
        }
        for line in String::from_utf8_lossy(&output.stderr).lines() {
            warn!(program = %self.program, "{line}");
        }

        if output.status.success() {
            info!(program = %self.program, status = ?output.status, "Tool finished");
            Ok(())
        } else {
            error!(program = %self.program, status = ?output.status, "Tool exited with non-zero code");
            Err(ProcessError::Exit {
                program: self.program.clone(),
                status: output.status,
            })
        }
    }
}
