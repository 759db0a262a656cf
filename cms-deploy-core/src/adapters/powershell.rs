use async_trait::async_trait;
use std::path::Path;
use tracing::info;

use super::process::ToolCommand;
use crate::contract::{ScriptArg, ScriptHost, ToolError};

/// [`ScriptHost`] that runs `.ps1` files through a PowerShell executable
/// (`powershell` on Windows, `pwsh` elsewhere).
pub struct PowerShellHost {
    program: String,
}

impl PowerShellHost {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, script: &Path, args: &[ScriptArg]) -> ToolCommand {
        let mut cmd = ToolCommand::new(&self.program)
            .arg("-NoProfile")
            .arg("-NonInteractive")
            .arg("-ExecutionPolicy")
            .arg("Bypass")
            .arg("-File")
            .arg(script);
        for arg in args {
            cmd = cmd.arg(format!("-{}", arg.name)).arg(&arg.value);
        }
        cmd
    }
}

impl Default for PowerShellHost {
    fn default() -> Self {
        if cfg!(windows) {
            Self::new("powershell")
        } else {
            Self::new("pwsh")
        }
    }
}

#[async_trait]
impl ScriptHost for PowerShellHost {
    async fn run_script(&self, script: &Path, args: &[ScriptArg]) -> Result<(), ToolError> {
        let names: Vec<&str> = args.iter().map(|a| a.name.as_str()).collect();
        info!(script = %script.display(), args = ?names, "Running deployment script");
        self.command(script, args).run().await?;
        Ok(())
    }
}
