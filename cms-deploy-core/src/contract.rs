//! # contract: interfaces to the external tools a deployment drives
//!
//! Every deployment task delegates its real work to one of the traits in this
//! module. The pipeline never shells out, touches the network or edits XML
//! directly, which keeps the orchestration testable: all traits are annotated
//! for `mockall`, so tests can script each tool's success or failure.
//!
//! ## Implementations
//! - Default implementations live in [`crate::adapters`].
//! - Mocks (`MockCompiler`, `MockFileOps`, ...) are exported under `cfg(test)`
//!   or the `test-export-mocks` feature.
//!
//! ## Errors
//! Adapters report failure with a boxed [`ToolError`]; tasks wrap it in
//! [`crate::error::DeployError::Tool`] together with the operation name.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

/// Error returned by every adapter.
pub type ToolError = Box<dyn std::error::Error + Send + Sync>;

/// Prefix to namespace-URI map used to resolve XPath prefixes.
pub type Namespaces = BTreeMap<String, String>;

/// A named string argument passed to a deployment script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptArg {
    pub name: String,
    pub value: String,
}

impl ScriptArg {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Verbosity passed through to the front-end package manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NpmLogLevel {
    Warn,
    Info,
}

impl NpmLogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NpmLogLevel::Warn => "warn",
            NpmLogLevel::Info => "info",
        }
    }
}

/// Compiler and package-restore tool for the solution's projects.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Compiler: Send + Sync {
    /// Restore the project's dependencies for the given build variant.
    async fn restore(&self, project: &Path, configuration: &str) -> Result<(), ToolError>;

    /// Build and publish the project into `output`.
    async fn publish(
        &self,
        project: &Path,
        configuration: &str,
        output: &Path,
    ) -> Result<(), ToolError>;

    /// File-system web publish of a web project into `destination`.
    async fn web_publish(
        &self,
        project: &Path,
        configuration: &str,
        destination: &Path,
    ) -> Result<(), ToolError>;
}

/// File-system mutations performed by copy steps.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait FileOps: Send + Sync {
    async fn ensure_dir(&self, dir: &Path) -> Result<(), ToolError>;

    /// Copy `files` into `destination`, overwriting. With `base` set, each
    /// file keeps its path relative to `base`; without it the files land
    /// flat in `destination`.
    async fn copy_files(
        &self,
        files: &[PathBuf],
        destination: &Path,
        base: Option<PathBuf>,
    ) -> Result<(), ToolError>;

    async fn copy_file(&self, from: &Path, to: &Path) -> Result<(), ToolError>;

    /// Delete a file; a file that does not exist is not an error.
    async fn delete_file(&self, file: &Path) -> Result<(), ToolError>;
}

/// Reads and rewrites single values in XML configuration files.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait XmlEditor: Send + Sync {
    /// Set every node selected by `xpath` to `value`. Fails on zero matches.
    async fn poke(
        &self,
        file: &Path,
        xpath: &str,
        value: &str,
        namespaces: &Namespaces,
    ) -> Result<(), ToolError>;

    /// Remove every node selected by `xpath`. Fails on zero matches.
    async fn remove(&self, file: &Path, xpath: &str, namespaces: &Namespaces)
        -> Result<(), ToolError>;

    /// String value of the first node selected by `xpath`.
    async fn peek(
        &self,
        file: &Path,
        xpath: &str,
        namespaces: &Namespaces,
    ) -> Result<String, ToolError>;
}

/// Merges and applies configuration transform fragments.
///
/// `exclude` entries are case-insensitive substrings of fragment file names;
/// matching fragments are skipped.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait TransformTool: Send + Sync {
    /// Combine the fragments found below `project_parent_folder` directories
    /// of `source` into one transform per configuration file in `target`.
    /// The configuration files themselves are left alone.
    async fn merge(
        &self,
        source: &Path,
        project_parent_folder: &str,
        target: &Path,
        exclude: &[String],
    ) -> Result<(), ToolError>;

    /// Apply the fragments found below `project_parent_folder` directories of
    /// `source` onto the matching files in `target`.
    async fn apply(
        &self,
        source: &Path,
        project_parent_folder: &str,
        target: &Path,
        exclude: &[String],
    ) -> Result<(), ToolError>;
}

/// Runs deployment scripts with named string arguments.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ScriptHost: Send + Sync {
    async fn run_script(&self, script: &Path, args: &[ScriptArg]) -> Result<(), ToolError>;
}

/// Minimal HTTP client for administrative endpoints of the CMS instance.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// GET `url` with the given headers, returning the body as text.
    async fn get(&self, url: &str, headers: &[(String, String)]) -> Result<String, ToolError>;
}

/// Front-end package manager.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait PackageManager: Send + Sync {
    async fn install(&self, dir: &Path, log_level: NpmLogLevel) -> Result<(), ToolError>;

    async fn run_script(
        &self,
        dir: &Path,
        script: &str,
        log_level: NpmLogLevel,
    ) -> Result<(), ToolError>;
}

/// One instance of every adapter a pipeline run may need.
pub struct Toolchain {
    pub compiler: Box<dyn Compiler>,
    pub files: Box<dyn FileOps>,
    pub xml: Box<dyn XmlEditor>,
    pub transforms: Box<dyn TransformTool>,
    pub scripts: Box<dyn ScriptHost>,
    pub http: Box<dyn HttpClient>,
    pub packages: Box<dyn PackageManager>,
}

#[cfg(any(test, feature = "test-export-mocks"))]
impl Toolchain {
    /// A toolchain of fresh mocks with no expectations set; any call fails
    /// the test. Replace individual fields to script behaviour.
    pub fn mocked() -> Self {
        Self {
            compiler: Box::new(MockCompiler::new()),
            files: Box::new(MockFileOps::new()),
            xml: Box::new(MockXmlEditor::new()),
            transforms: Box::new(MockTransformTool::new()),
            scripts: Box::new(MockScriptHost::new()),
            http: Box::new(MockHttpClient::new()),
            packages: Box::new(MockPackageManager::new()),
        }
    }
}
