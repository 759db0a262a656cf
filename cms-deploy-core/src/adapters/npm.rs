use async_trait::async_trait;
use std::path::Path;
use tracing::info;

use super::process::ToolCommand;
use crate::contract::{NpmLogLevel, PackageManager, ToolError};

/// [`PackageManager`] backed by the `npm` CLI.
pub struct NpmCli {
    program: String,
}

impl NpmCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for NpmCli {
    fn default() -> Self {
        if cfg!(windows) {
            Self::new("npm.cmd")
        } else {
            Self::new("npm")
        }
    }
}

#[async_trait]
impl PackageManager for NpmCli {
    async fn install(&self, dir: &Path, log_level: NpmLogLevel) -> Result<(), ToolError> {
        info!(dir = %dir.display(), "npm install");
        ToolCommand::new(&self.program)
            .arg("install")
            .arg("--loglevel")
            .arg(log_level.as_str())
            .current_dir(dir)
            .run()
            .await?;
        Ok(())
    }

    async fn run_script(
        &self,
        dir: &Path,
        script: &str,
        log_level: NpmLogLevel,
    ) -> Result<(), ToolError> {
        info!(dir = %dir.display(), script, "npm run");
        ToolCommand::new(&self.program)
            .arg("run")
            .arg(script)
            .arg("--loglevel")
            .arg(log_level.as_str())
            .current_dir(dir)
            .run()
            .await?;
        Ok(())
    }
}
