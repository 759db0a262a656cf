use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::DeployError;
use crate::fileset::clean_path;

fn default_build_configuration() -> String {
    "Debug".to_string()
}

/// Paths, flags and endpoints for one deployment run.
///
/// Built once per run and read-only afterwards. Relative paths are resolved
/// against a base directory with [`DeployConfig::resolve_relative_to`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeployConfig {
    pub project_folder: PathBuf,
    pub foundation_src_folder: PathBuf,
    pub feature_src_folder: PathBuf,
    pub project_src_folder: PathBuf,
    pub publish_web_folder: PathBuf,
    /// Secondary content-delivery web root. Empty is the same as absent.
    #[serde(default)]
    pub publish_web_folder_cd: Option<PathBuf>,
    pub publish_temp_folder: PathBuf,
    pub publish_xconnect_folder: PathBuf,
    pub publish_data_folder: PathBuf,
    pub unicorn_serialization_folder: PathBuf,
    #[serde(default)]
    pub sitecore_azure_toolkit_path: Option<PathBuf>,
    pub instance_url: String,
    #[serde(default = "default_build_configuration")]
    pub build_configuration: String,
    #[serde(default)]
    pub content_hub_enabled: bool,
    #[serde(default)]
    pub marketing_definitions_api_key: Option<String>,
}

impl DeployConfig {
    pub fn trace_loaded(&self) {
        info!(
            publish_web_folder = %self.publish_web_folder.display(),
            publish_web_folder_cd = ?self.publish_web_folder_cd,
            instance_url = %self.instance_url,
            build_configuration = %self.build_configuration,
            content_hub_enabled = self.content_hub_enabled,
            "Loaded DeployConfig"
        );
        debug!(?self, "DeployConfig loaded (full debug)");
    }

    /// Rejects configurations that would copy into an empty destination or
    /// call an empty instance URL.
    pub fn validate(&self) -> Result<(), DeployError> {
        if self.publish_web_folder.as_os_str().is_empty() {
            return Err(DeployError::Config(
                "publish_web_folder must not be empty".into(),
            ));
        }
        if self.publish_temp_folder.as_os_str().is_empty() {
            return Err(DeployError::Config(
                "publish_temp_folder must not be empty".into(),
            ));
        }
        if self.instance_url.trim().is_empty() {
            return Err(DeployError::Config("instance_url must not be empty".into()));
        }
        Ok(())
    }

    /// Joins every relative path onto `base`. Absolute paths are left alone,
    /// and so is an empty secondary web root.
    pub fn resolve_relative_to(mut self, base: &Path) -> Self {
        let join = |p: &mut PathBuf| {
            if !p.as_os_str().is_empty() && p.is_relative() {
                *p = clean_path(&base.join(&*p));
            }
        };
        join(&mut self.project_folder);
        join(&mut self.foundation_src_folder);
        join(&mut self.feature_src_folder);
        join(&mut self.project_src_folder);
        join(&mut self.publish_web_folder);
        join(&mut self.publish_temp_folder);
        join(&mut self.publish_xconnect_folder);
        join(&mut self.publish_data_folder);
        join(&mut self.unicorn_serialization_folder);
        if let Some(cd) = self.publish_web_folder_cd.as_mut() {
            join(cd);
        }
        if let Some(toolkit) = self.sitecore_azure_toolkit_path.as_mut() {
            join(toolkit);
        }
        self
    }

    /// Instance URL without a trailing slash.
    pub fn instance_base_url(&self) -> &str {
        self.instance_url.trim_end_matches('/')
    }
}

/// Source-code layer; publish and transform steps visit them in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Foundation,
    Feature,
    Project,
}

impl Layer {
    pub const ALL: [Layer; 3] = [Layer::Foundation, Layer::Feature, Layer::Project];

    pub fn src_folder<'a>(&self, config: &'a DeployConfig) -> &'a Path {
        match self {
            Layer::Foundation => &config.foundation_src_folder,
            Layer::Feature => &config.feature_src_folder,
            Layer::Project => &config.project_src_folder,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::Foundation => "foundation",
            Layer::Feature => "feature",
            Layer::Project => "project",
        }
    }
}
