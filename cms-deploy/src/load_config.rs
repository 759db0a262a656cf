/// `load_config` module: reads the deployment YAML file into a [`CliConfig`].
///
/// This is the only place where the YAML schema is parsed. Everything after it
/// works with the typed [`DeployConfig`] and [`Pipeline`] from `cms-deploy-core`.
///
/// # Schema
/// ```yaml
/// paths:            # DeployConfig, relative paths resolve against this file's directory
///   project_folder: .
///   publish_web_folder: C:\inetpub\wwwroot\cm
///   ...
/// tools:            # optional program overrides
///   dotnet: dotnet
/// scripts:          # scripts used by the default pipeline
///   unicorn_sync: scripts/Sync.ps1
///   packaging: scripts/Package.ps1
/// pipeline:         # optional, replaces the default pipeline
///   - task: copy_assemblies
///   - task: publish_yml
///     on_error: abort
/// ```
///
/// # Environment
/// `MARKETING_DEFINITIONS_API_KEY` and `CMS_INSTANCE_URL` override the
/// corresponding `paths` values when set and non-empty.
use anyhow::{anyhow, Result};
use cms_deploy_core::config::DeployConfig;
use cms_deploy_core::pipeline::{Pipeline, PipelineScripts};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};

pub const API_KEY_ENV: &str = "MARKETING_DEFINITIONS_API_KEY";
pub const INSTANCE_URL_ENV: &str = "CMS_INSTANCE_URL";

/// Program names for the process-backed adapters. Unset entries fall back to
/// the platform default of each adapter.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ToolsSection {
    pub dotnet: Option<String>,
    pub powershell: Option<String>,
    pub npm: Option<String>,
    pub xdt: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CliConfig {
    pub paths: DeployConfig,
    #[serde(default)]
    pub tools: ToolsSection,
    #[serde(default)]
    pub scripts: Option<PipelineScripts>,
    #[serde(default)]
    pub pipeline: Option<Pipeline>,
}

impl CliConfig {
    /// The configured pipeline, or the default one built from `scripts`.
    pub fn pipeline(&self) -> Result<Pipeline> {
        match (&self.pipeline, &self.scripts) {
            (Some(pipeline), _) => Ok(pipeline.clone()),
            (None, Some(scripts)) => Ok(Pipeline::default_for(scripts)),
            (None, None) => Err(anyhow!(
                "config has neither a `pipeline` nor the `scripts` needed for the default pipeline"
            )),
        }
    }
}

fn env_override(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Loads the YAML config, applies environment overrides, resolves relative
/// paths and validates the result.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow!("Failed to read config file {:?}: {}", path_ref, e));
        }
    };

    let mut config: CliConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    if let Some(key) = env_override(API_KEY_ENV) {
        info!(env = API_KEY_ENV, "Using marketing definitions API key from environment");
        config.paths.marketing_definitions_api_key = Some(key);
    }
    if let Some(url) = env_override(INSTANCE_URL_ENV) {
        info!(env = INSTANCE_URL_ENV, instance_url = %url, "Using instance URL from environment");
        config.paths.instance_url = url;
    }

    let dir = match path_ref.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let base = match std::path::absolute(dir) {
        Ok(base) => base,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to resolve config directory");
            return Err(anyhow!("Failed to resolve config directory {:?}: {}", dir, e));
        }
    };
    config.paths = config.paths.resolve_relative_to(&base);

    if let Err(e) = config.paths.validate() {
        warn!(error = %e, config_path = ?path_ref, "Config failed validation");
        return Err(e.into());
    }
    config.paths.trace_loaded();
    Ok(config)
}
