//! Wires the default adapters into a [`Toolchain`].

use cms_deploy_core::adapters::{
    DocumentXmlEditor, DotnetCompiler, LocalFileOps, NpmCli, PowerShellHost, ReqwestHttpClient,
    XdtTransformTool,
};
use cms_deploy_core::contract::Toolchain;
use tracing::debug;

use crate::load_config::ToolsSection;

pub fn build_toolchain(tools: &ToolsSection) -> Toolchain {
    debug!(?tools, "Building toolchain");
    Toolchain {
        compiler: Box::new(
            tools
                .dotnet
                .as_deref()
                .map(DotnetCompiler::new)
                .unwrap_or_default(),
        ),
        files: Box::new(LocalFileOps),
        xml: Box::new(DocumentXmlEditor),
        transforms: Box::new(
            tools
                .xdt
                .as_deref()
                .map(XdtTransformTool::new)
                .unwrap_or_default(),
        ),
        scripts: Box::new(
            tools
                .powershell
                .as_deref()
                .map(PowerShellHost::new)
                .unwrap_or_default(),
        ),
        http: Box::new(ReqwestHttpClient::default()),
        packages: Box::new(tools.npm.as_deref().map(NpmCli::new).unwrap_or_default()),
    }
}
