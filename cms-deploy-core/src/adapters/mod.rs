//! Default adapters: the concrete tools behind each [`crate::contract`] trait.
//!
//! Process-backed adapters share [`process::ToolCommand`], which forwards the
//! tool's output into tracing and turns a non-zero exit into an error.

pub mod dotnet;
pub mod fs;
pub mod http;
pub mod npm;
pub mod powershell;
pub mod process;
pub mod transform;
pub mod xml;

pub use dotnet::DotnetCompiler;
pub use fs::LocalFileOps;
pub use http::ReqwestHttpClient;
pub use npm::NpmCli;
pub use powershell::PowerShellHost;
pub use transform::XdtTransformTool;
pub use xml::DocumentXmlEditor;
