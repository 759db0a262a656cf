use async_trait::async_trait;
use std::path::Path;
use tracing::info;

use super::process::ToolCommand;
use crate::contract::{Compiler, ToolError};

/// [`Compiler`] backed by the `dotnet` CLI.
pub struct DotnetCompiler {
    program: String,
}

impl DotnetCompiler {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn restore_command(&self, project: &Path, configuration: &str) -> ToolCommand {
        ToolCommand::new(&self.program)
            .arg("restore")
            .arg(project)
            .arg(format!("/p:Configuration={configuration}"))
    }

    fn publish_command(&self, project: &Path, configuration: &str, output: &Path) -> ToolCommand {
        ToolCommand::new(&self.program)
            .arg("publish")
            .arg(project)
            .arg("--configuration")
            .arg(configuration)
            .arg("--output")
            .arg(output)
    }

    fn web_publish_command(
        &self,
        project: &Path,
        configuration: &str,
        destination: &Path,
    ) -> ToolCommand {
        let mut publish_url = destination.as_os_str().to_owned();
        publish_url.push(std::path::MAIN_SEPARATOR_STR);
        let mut publish_url_arg = std::ffi::OsString::from("/p:PublishUrl=");
        publish_url_arg.push(publish_url);

        ToolCommand::new(&self.program)
            .arg("msbuild")
            .arg(project)
            .arg("/restore")
            .arg("/m")
            .arg("/v:minimal")
            .arg(format!("/p:Configuration={configuration}"))
            .arg("/p:DeployOnBuild=true")
            .arg("/p:DeployDefaultTarget=WebPublish")
            .arg("/p:WebPublishMethod=FileSystem")
            .arg("/p:DeleteExistingFiles=false")
            .arg(publish_url_arg)
    }
}

impl Default for DotnetCompiler {
    fn default() -> Self {
        Self::new("dotnet")
    }
}

#[async_trait]
impl Compiler for DotnetCompiler {
    async fn restore(&self, project: &Path, configuration: &str) -> Result<(), ToolError> {
        info!(project = %project.display(), configuration, "Restoring project");
        self.restore_command(project, configuration).run().await?;
        Ok(())
    }

    async fn publish(
        &self,
        project: &Path,
        configuration: &str,
        output: &Path,
    ) -> Result<(), ToolError> {
        info!(project = %project.display(), output = %output.display(), "Publishing project");
        self.publish_command(project, configuration, output).run().await?;
        Ok(())
    }

    async fn web_publish(
        &self,
        project: &Path,
        configuration: &str,
        destination: &Path,
    ) -> Result<(), ToolError> {
        info!(
            project = %project.display(),
            destination = %destination.display(),
            "Web-publishing project"
        );
        self.web_publish_command(project, configuration, destination)
            .run()
            .await?;
        Ok(())
    }
}
