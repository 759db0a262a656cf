//! Named deployment tasks.
//!
//! Each task reads the [`DeployConfig`], computes destinations and file sets,
//! and hands the real work to one adapter family of the [`Toolchain`].
//! Iterations over destinations, layers and theme folders run one after the
//! other and stop at the first failure.
//!
//! Relative paths given as task parameters (scripts, settings files, the
//! front-end root) are resolved against `project_folder`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::{DeployConfig, Layer};
use crate::contract::{Namespaces, NpmLogLevel, ScriptArg, Toolchain};
use crate::destination::resolve_destinations;
use crate::error::DeployError;
use crate::fileset::{self, pattern_under};

pub const XMLCONFIG_NAMESPACE: &str = "http://www.sitecore.net/xmlconfig/";
pub const MSBUILD_NAMESPACE: &str = "http://schemas.microsoft.com/developer/msbuild/2003";

/// Output extensions that never go to a web root through the content copy.
pub const IGNORED_OUTPUT_EXTENSIONS: [&str; 5] = [".dll", ".exe", ".pdb", ".xdt", ".yml"];

/// Build artefacts in the publish folder that must not reach a web root.
pub const IGNORED_OUTPUT_FILES: [&str; 5] = [
    "web.config",
    "build.website.deps.json",
    "build.website.exe.config",
    "build.shared.deps.json",
    "build.shared.exe.config",
];

/// Folder under the publish temp folder holding package-level transforms.
const PACKAGE_TRANSFORMS: &str = "transforms";
const MERGE_EXCLUDES: [&str; 2] = ["ssl", "azure"];
const APPLY_EXCLUDES: [&str; 1] = ["encryption"];
const DOTNET_CORE_EXCLUDES: [&str; 3] = ["ssl", "azure", "encryption"];
const NODE_MODULES: &str = "node_modules";
const UNICORN_DEFINE_XPATH: &str = "configuration/appSettings/add[@key='unicorn:define']/@value";
const CONTENT_HUB_DEFINE_XPATH: &str =
    "configuration/appSettings/add[@key='contenthub:define']/@value";
const SHARED_SECRET_XPATH: &str = "/configuration/sitecore/unicorn/authenticationProvider/SharedSecret";

fn default_parent_folder() -> String {
    "code".to_string()
}

fn default_lib_folder() -> PathBuf {
    PathBuf::from("lib")
}

fn default_frontend_root() -> PathBuf {
    PathBuf::from("FrontEnd")
}

/// A deployment task and its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum Task {
    PublishSourceProjects {
        layer: Layer,
        #[serde(default = "default_parent_folder")]
        project_parent_folder: String,
    },
    #[serde(rename = "publish_xconnect_projects")]
    PublishXConnectProjects,
    PublishCoreProject {
        project_file: PathBuf,
    },
    PublishFrontEndProject,
    CopyAssemblies,
    CopyContent,
    CopyToDestination,
    CopySitecoreLib {
        #[serde(default = "default_lib_folder")]
        destination: PathBuf,
    },
    PublishYml,
    CreateUpdatePackage {
        script: PathBuf,
    },
    GenerateDacpacs {
        script: PathBuf,
    },
    TurnOnUnicorn,
    ModifyContentHubVariable,
    ModifyPublishSettings,
    SyncUnicorn {
        script: PathBuf,
    },
    MergeAndCopyXmlTransform {
        #[serde(default = "default_parent_folder")]
        project_parent_folder: String,
    },
    ApplyXmlTransform {
        #[serde(default = "default_parent_folder")]
        project_parent_folder: String,
    },
    ApplyDotnetCoreTransforms,
    DeployMarketingDefinitions,
    ModifyUnicornSourceFolder {
        dev_settings_file: PathBuf,
        source_folder_name: String,
    },
    FrontEndNpmInstall {
        #[serde(default = "default_frontend_root")]
        frontend_root: PathBuf,
    },
    FrontEndNpmBuild {
        #[serde(default = "default_frontend_root")]
        frontend_root: PathBuf,
    },
}

impl Task {
    /// Stable snake_case name, the same one used as the `task` tag in YAML.
    pub fn kind(&self) -> &'static str {
        match self {
            Task::PublishSourceProjects { .. } => "publish_source_projects",
            Task::PublishXConnectProjects => "publish_xconnect_projects",
            Task::PublishCoreProject { .. } => "publish_core_project",
            Task::PublishFrontEndProject => "publish_front_end_project",
            Task::CopyAssemblies => "copy_assemblies",
            Task::CopyContent => "copy_content",
            Task::CopyToDestination => "copy_to_destination",
            Task::CopySitecoreLib { .. } => "copy_sitecore_lib",
            Task::PublishYml => "publish_yml",
            Task::CreateUpdatePackage { .. } => "create_update_package",
            Task::GenerateDacpacs { .. } => "generate_dacpacs",
            Task::TurnOnUnicorn => "turn_on_unicorn",
            Task::ModifyContentHubVariable => "modify_content_hub_variable",
            Task::ModifyPublishSettings => "modify_publish_settings",
            Task::SyncUnicorn { .. } => "sync_unicorn",
            Task::MergeAndCopyXmlTransform { .. } => "merge_and_copy_xml_transform",
            Task::ApplyXmlTransform { .. } => "apply_xml_transform",
            Task::ApplyDotnetCoreTransforms => "apply_dotnet_core_transforms",
            Task::DeployMarketingDefinitions => "deploy_marketing_definitions",
            Task::ModifyUnicornSourceFolder { .. } => "modify_unicorn_source_folder",
            Task::FrontEndNpmInstall { .. } => "front_end_npm_install",
            Task::FrontEndNpmBuild { .. } => "front_end_npm_build",
        }
    }

    /// Default display name; layer-specific for source publishing.
    pub fn default_name(&self) -> String {
        match self {
            Task::PublishSourceProjects { layer, .. } => {
                format!("publish_source_projects:{}", layer.as_str())
            }
            other => other.kind().to_string(),
        }
    }

    pub async fn execute(&self, config: &DeployConfig, tools: &Toolchain) -> Result<(), DeployError> {
        match self {
            Task::PublishSourceProjects {
                layer,
                project_parent_folder,
            } => publish_source_projects(config, tools, *layer, project_parent_folder).await,
            Task::PublishXConnectProjects => publish_xconnect_projects(config, tools).await,
            Task::PublishCoreProject { project_file } => {
                publish_core_project(config, tools, project_file).await
            }
            Task::PublishFrontEndProject => publish_front_end_project(config, tools).await,
            Task::CopyAssemblies => copy_assemblies(config, tools).await,
            Task::CopyContent => copy_content(config, tools).await,
            Task::CopyToDestination => copy_to_destination(config, tools).await,
            Task::CopySitecoreLib { destination } => {
                copy_sitecore_lib(config, tools, destination).await
            }
            Task::PublishYml => publish_yml(config, tools).await,
            Task::CreateUpdatePackage { script } => {
                create_update_package(config, tools, script).await
            }
            Task::GenerateDacpacs { script } => generate_dacpacs(config, tools, script).await,
            Task::TurnOnUnicorn => turn_on_unicorn(config, tools).await,
            Task::ModifyContentHubVariable => modify_content_hub_variable(config, tools).await,
            Task::ModifyPublishSettings => modify_publish_settings(config, tools).await,
            Task::SyncUnicorn { script } => sync_unicorn(config, tools, script).await,
            Task::MergeAndCopyXmlTransform {
                project_parent_folder,
            } => merge_and_copy_xml_transform(config, tools, project_parent_folder).await,
            Task::ApplyXmlTransform {
                project_parent_folder,
            } => apply_xml_transform(config, tools, project_parent_folder).await,
            Task::ApplyDotnetCoreTransforms => apply_dotnet_core_transforms(config, tools).await,
            Task::DeployMarketingDefinitions => deploy_marketing_definitions(config, tools).await,
            Task::ModifyUnicornSourceFolder {
                dev_settings_file,
                source_folder_name,
            } => {
                modify_unicorn_source_folder(config, tools, dev_settings_file, source_folder_name)
                    .await
            }
            Task::FrontEndNpmInstall { frontend_root } => {
                front_end_npm_install(config, tools, frontend_root).await
            }
            Task::FrontEndNpmBuild { frontend_root } => {
                front_end_npm_build(config, tools, frontend_root).await
            }
        }
    }
}

fn in_project(config: &DeployConfig, path: &Path) -> PathBuf {
    if path.is_relative() {
        config.project_folder.join(path)
    } else {
        path.to_path_buf()
    }
}

fn xmlconfig_namespaces() -> Namespaces {
    [("patch".to_string(), XMLCONFIG_NAMESPACE.to_string())]
        .into_iter()
        .collect()
}

fn msbuild_namespaces() -> Namespaces {
    [("ns".to_string(), MSBUILD_NAMESPACE.to_string())]
        .into_iter()
        .collect()
}

fn owned(patterns: &[&str]) -> Vec<String> {
    patterns.iter().map(|p| p.to_string()).collect()
}

fn web_config(config: &DeployConfig) -> PathBuf {
    config.publish_web_folder.join("web.config")
}

async fn web_publish_all(
    config: &DeployConfig,
    tools: &Toolchain,
    src_folder: &Path,
    project_parent_folder: &str,
    destination: &Path,
) -> Result<(), DeployError> {
    let pattern = pattern_under(src_folder, &format!("**/{project_parent_folder}/*.csproj"));
    let projects = fileset::scan(&pattern)?;
    info!(
        src = %src_folder.display(),
        destination = %destination.display(),
        projects = projects.len(),
        "Publishing projects"
    );
    for project in &projects {
        tools
            .compiler
            .web_publish(project, &config.build_configuration, destination)
            .await
            .map_err(DeployError::tool("web publish"))?;
    }
    Ok(())
}

pub async fn publish_source_projects(
    config: &DeployConfig,
    tools: &Toolchain,
    layer: Layer,
    project_parent_folder: &str,
) -> Result<(), DeployError> {
    let src_folder = layer.src_folder(config);
    for destination in resolve_destinations(config) {
        web_publish_all(config, tools, src_folder, project_parent_folder, &destination).await?;
    }
    Ok(())
}

pub async fn publish_xconnect_projects(
    config: &DeployConfig,
    tools: &Toolchain,
) -> Result<(), DeployError> {
    let xconnect = config.project_src_folder.join("xConnect");
    web_publish_all(
        config,
        tools,
        &xconnect,
        &default_parent_folder(),
        &config.publish_xconnect_folder,
    )
    .await
}

pub async fn publish_core_project(
    config: &DeployConfig,
    tools: &Toolchain,
    project_file: &Path,
) -> Result<(), DeployError> {
    let project_file = in_project(config, project_file);
    tools
        .compiler
        .restore(&project_file, &config.build_configuration)
        .await
        .map_err(DeployError::tool("restore"))?;
    tools
        .compiler
        .publish(
            &project_file,
            &config.build_configuration,
            &config.publish_temp_folder,
        )
        .await
        .map_err(DeployError::tool("publish"))
}

pub async fn publish_front_end_project(
    config: &DeployConfig,
    tools: &Toolchain,
) -> Result<(), DeployError> {
    let source = config.project_folder.join("FrontEnd");
    let destination = config
        .publish_web_folder
        .join("App_Data")
        .join("FrontEnd");
    info!(source = %source.display(), destination = %destination.display(), "Publishing front-end");

    tools
        .files
        .ensure_dir(&destination)
        .await
        .map_err(DeployError::tool("create directory"))?;

    let files: Vec<PathBuf> = fileset::scan(&pattern_under(&source, "**/*"))?
        .into_iter()
        .filter(|f| !fileset::normalize_path(f).contains(NODE_MODULES))
        .collect();
    tools
        .files
        .copy_files(&files, &destination, Some(source.clone()))
        .await
        .map_err(DeployError::tool("copy front-end files"))
}

async fn copy_assemblies_to(
    tools: &Toolchain,
    destination: &Path,
    publish_folder: &Path,
) -> Result<(), DeployError> {
    let assemblies: Vec<PathBuf> = fileset::scan(&pattern_under(publish_folder, "*.dll"))?
        .into_iter()
        .collect();
    let bin = destination.join("bin");
    tools
        .files
        .ensure_dir(&bin)
        .await
        .map_err(DeployError::tool("create directory"))?;
    info!(count = assemblies.len(), bin = %bin.display(), "Copying assemblies");
    tools
        .files
        .copy_files(&assemblies, &bin, None)
        .await
        .map_err(DeployError::tool("copy assemblies"))
}

/// Denylisted build artefacts at the top of `publish_folder`.
pub fn ignored_output_files(publish_folder: &Path) -> Vec<PathBuf> {
    IGNORED_OUTPUT_FILES
        .iter()
        .map(|name| publish_folder.join(name))
        .collect()
}

async fn copy_content_to(
    tools: &Toolchain,
    destination: &Path,
    publish_folder: &Path,
) -> Result<(), DeployError> {
    let files: Vec<PathBuf> = fileset::filter(
        &pattern_under(publish_folder, "**/*"),
        &IGNORED_OUTPUT_EXTENSIONS,
        &ignored_output_files(publish_folder),
    )?
    .into_iter()
    .collect();
    info!(count = files.len(), destination = %destination.display(), "Copying content files");
    tools
        .files
        .copy_files(&files, destination, Some(publish_folder.to_path_buf()))
        .await
        .map_err(DeployError::tool("copy content files"))
}

pub async fn copy_assemblies(config: &DeployConfig, tools: &Toolchain) -> Result<(), DeployError> {
    for destination in resolve_destinations(config) {
        copy_assemblies_to(tools, &destination, &config.publish_temp_folder).await?;
    }
    Ok(())
}

pub async fn copy_content(config: &DeployConfig, tools: &Toolchain) -> Result<(), DeployError> {
    for destination in resolve_destinations(config) {
        copy_content_to(tools, &destination, &config.publish_temp_folder).await?;
    }
    Ok(())
}

/// Assemblies then content, destination by destination.
pub async fn copy_to_destination(
    config: &DeployConfig,
    tools: &Toolchain,
) -> Result<(), DeployError> {
    for destination in resolve_destinations(config) {
        info!(destination = %destination.display(), "Copying publish output");
        copy_assemblies_to(tools, &destination, &config.publish_temp_folder).await?;
        copy_content_to(tools, &destination, &config.publish_temp_folder).await?;
    }
    Ok(())
}

pub async fn copy_sitecore_lib(
    config: &DeployConfig,
    tools: &Toolchain,
    destination: &Path,
) -> Result<(), DeployError> {
    let bin = config.publish_web_folder.join("bin");
    let files: Vec<PathBuf> = fileset::scan(&pattern_under(&bin, "Sitecore*.dll"))?
        .into_iter()
        .collect();
    let destination = in_project(config, destination);
    tools
        .files
        .ensure_dir(&destination)
        .await
        .map_err(DeployError::tool("create directory"))?;
    tools
        .files
        .copy_files(&files, &destination, None)
        .await
        .map_err(DeployError::tool("copy platform assemblies"))
}

pub async fn publish_yml(config: &DeployConfig, tools: &Toolchain) -> Result<(), DeployError> {
    let items = config.project_folder.join("items");
    let pattern = pattern_under(&items, "**/*.yml");
    let destination = config.publish_temp_folder.join("yml");
    info!(filter = %pattern, destination = %destination.display(), "Publishing serialized items");

    tools
        .files
        .ensure_dir(&destination)
        .await
        .map_err(DeployError::tool("create directory"))?;
    let files: Vec<PathBuf> = fileset::scan(&pattern)?.into_iter().collect();
    tools
        .files
        .copy_files(&files, &destination, Some(items))
        .await
        .map_err(DeployError::tool("copy serialized items"))
}

pub fn update_package_path(config: &DeployConfig) -> PathBuf {
    config
        .publish_temp_folder
        .join("update")
        .join("package.update")
}

fn path_arg(name: &str, path: &Path) -> ScriptArg {
    ScriptArg::new(name, path.to_string_lossy())
}

pub async fn create_update_package(
    config: &DeployConfig,
    tools: &Toolchain,
    script: &Path,
) -> Result<(), DeployError> {
    let args = [
        path_arg("target", &config.publish_temp_folder.join("yml")),
        path_arg("output", &update_package_path(config)),
    ];
    tools
        .scripts
        .run_script(&in_project(config, script), &args)
        .await
        .map_err(DeployError::tool("create update package"))
}

pub async fn generate_dacpacs(
    config: &DeployConfig,
    tools: &Toolchain,
    script: &Path,
) -> Result<(), DeployError> {
    let toolkit = config
        .sitecore_azure_toolkit_path
        .as_deref()
        .unwrap_or(Path::new(""));
    let args = [
        path_arg("SitecoreAzureToolkitPath", toolkit),
        path_arg("updatePackagePath", &update_package_path(config)),
        path_arg(
            "securityPackagePath",
            &config.publish_temp_folder.join("update").join("security.dacpac"),
        ),
        path_arg("destinationPath", &config.publish_data_folder),
    ];
    tools
        .scripts
        .run_script(&in_project(config, script), &args)
        .await
        .map_err(DeployError::tool("generate dacpacs"))
}

pub async fn turn_on_unicorn(config: &DeployConfig, tools: &Toolchain) -> Result<(), DeployError> {
    tools
        .xml
        .poke(
            &web_config(config),
            UNICORN_DEFINE_XPATH,
            "Enabled",
            &xmlconfig_namespaces(),
        )
        .await
        .map_err(DeployError::tool("enable unicorn"))
}

pub async fn modify_content_hub_variable(
    config: &DeployConfig,
    tools: &Toolchain,
) -> Result<(), DeployError> {
    let value = if config.content_hub_enabled {
        "Enabled"
    } else {
        "Disabled"
    };
    tools
        .xml
        .poke(
            &web_config(config),
            CONTENT_HUB_DEFINE_XPATH,
            value,
            &xmlconfig_namespaces(),
        )
        .await
        .map_err(DeployError::tool("set content hub variable"))
}

pub async fn modify_publish_settings(
    config: &DeployConfig,
    tools: &Toolchain,
) -> Result<(), DeployError> {
    let original = config.project_folder.join("publishsettings.targets");
    let user = config.project_folder.join("publishsettings.targets.user");
    tools
        .files
        .copy_file(&original, &user)
        .await
        .map_err(DeployError::tool("copy publish settings"))?;

    let namespaces = msbuild_namespaces();
    tools
        .xml
        .remove(&user, "/ns:Project/ns:Import", &namespaces)
        .await
        .map_err(DeployError::tool("remove publish settings import"))?;
    tools
        .xml
        .poke(
            &user,
            "/ns:Project/ns:PropertyGroup/ns:publishUrl",
            &config.instance_url,
            &namespaces,
        )
        .await
        .map_err(DeployError::tool("set publish url"))
}

pub async fn sync_unicorn(
    config: &DeployConfig,
    tools: &Toolchain,
    script: &Path,
) -> Result<(), DeployError> {
    let url = format!("{}/unicorn.aspx", config.instance_base_url());
    info!(url = %url, "Sync Unicorn items");

    let secret_file = config
        .publish_web_folder
        .join("App_config")
        .join("Include")
        .join("Unicorn")
        .join("Unicorn.zSharedSecret.config");
    let secret = tools
        .xml
        .peek(&secret_file, SHARED_SECRET_XPATH, &Namespaces::new())
        .await
        .map_err(DeployError::tool("read shared secret"))?;

    let args = [ScriptArg::new("secret", secret), ScriptArg::new("url", url)];
    tools
        .scripts
        .run_script(&in_project(config, script), &args)
        .await
        .map_err(DeployError::tool("sync unicorn"))
}

/// Combines the package transforms in `<temp>/transforms` and every layer's
/// transforms into per-config `.xdt` files in the primary web root.
pub async fn merge_and_copy_xml_transform(
    config: &DeployConfig,
    tools: &Toolchain,
    project_parent_folder: &str,
) -> Result<(), DeployError> {
    let exclude = owned(&MERGE_EXCLUDES);
    let target = &config.publish_web_folder;

    info!(
        source = %config.publish_temp_folder.display(),
        target = %target.display(),
        "Merging package transforms"
    );
    tools
        .transforms
        .merge(&config.publish_temp_folder, PACKAGE_TRANSFORMS, target, &exclude)
        .await
        .map_err(DeployError::tool("merge transforms"))?;

    for layer in Layer::ALL {
        let source = layer.src_folder(config);
        info!(layer = layer.as_str(), source = %source.display(), "Merging layer transforms");
        tools
            .transforms
            .merge(source, project_parent_folder, target, &exclude)
            .await
            .map_err(DeployError::tool("merge transforms"))?;
    }
    Ok(())
}

pub async fn apply_xml_transform(
    config: &DeployConfig,
    tools: &Toolchain,
    project_parent_folder: &str,
) -> Result<(), DeployError> {
    // encryption transforms stay out of IIS deployments
    let exclude = owned(&APPLY_EXCLUDES);
    for layer in Layer::ALL {
        tools
            .transforms
            .apply(
                layer.src_folder(config),
                project_parent_folder,
                &config.publish_web_folder,
                &exclude,
            )
            .await
            .map_err(DeployError::tool("apply transforms"))?;
    }
    Ok(())
}

pub async fn apply_dotnet_core_transforms(
    config: &DeployConfig,
    tools: &Toolchain,
) -> Result<(), DeployError> {
    tools
        .transforms
        .apply(
            &config.publish_temp_folder,
            PACKAGE_TRANSFORMS,
            &config.publish_web_folder,
            &owned(&DOTNET_CORE_EXCLUDES),
        )
        .await
        .map_err(DeployError::tool("apply dotnet core transforms"))
}

pub async fn deploy_marketing_definitions(
    config: &DeployConfig,
    tools: &Toolchain,
) -> Result<(), DeployError> {
    let api_key = config
        .marketing_definitions_api_key
        .as_deref()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| {
            DeployError::Config("marketing_definitions_api_key is required".into())
        })?;
    let url = format!(
        "{}/utilities/deploymarketingdefinitions.aspx?apiKey={}",
        config.instance_base_url(),
        api_key
    );
    let headers = [("Connection".to_string(), "keep-alive".to_string())];
    let body = tools
        .http
        .get(&url, &headers)
        .await
        .map_err(DeployError::tool("deploy marketing definitions"))?;
    info!(response = %body, "Marketing definitions deployed");
    Ok(())
}

pub async fn modify_unicorn_source_folder(
    config: &DeployConfig,
    tools: &Toolchain,
    dev_settings_file: &Path,
    source_folder_name: &str,
) -> Result<(), DeployError> {
    let folder = std::path::absolute(&config.unicorn_serialization_folder)
        .map_err(|e| DeployError::io(&config.unicorn_serialization_folder, e))?;
    let xpath = format!("configuration/sitecore/sc.variable[@name='{source_folder_name}']/@value");
    tools
        .xml
        .poke(
            &in_project(config, dev_settings_file),
            &xpath,
            &folder.to_string_lossy(),
            &xmlconfig_namespaces(),
        )
        .await
        .map_err(DeployError::tool("set unicorn source folder"))
}

/// Theme folders directly below `root`; folders starting with `-` are retired
/// themes and are skipped.
pub fn theme_dirs(root: &Path) -> Result<Vec<PathBuf>, DeployError> {
    let dirs = fileset::scan_dirs(&pattern_under(root, "*"))?;
    Ok(dirs
        .into_iter()
        .filter(|dir| {
            let retired = dir
                .file_name()
                .is_some_and(|n| n.to_string_lossy().starts_with('-'));
            if retired {
                warn!(dir = %dir.display(), "Skipping retired theme folder");
            }
            !retired
        })
        .collect())
}

pub async fn front_end_npm_install(
    config: &DeployConfig,
    tools: &Toolchain,
    frontend_root: &Path,
) -> Result<(), DeployError> {
    for dir in theme_dirs(&in_project(config, frontend_root))? {
        tools
            .packages
            .install(&dir, NpmLogLevel::Warn)
            .await
            .map_err(DeployError::tool("npm install"))?;

        let template = dir.join("npm-shrinkwrap.template.json");
        let shrinkwrap = dir.join("npm-shrinkwrap.json");
        tools
            .files
            .delete_file(&shrinkwrap)
            .await
            .map_err(DeployError::tool("delete shrinkwrap"))?;
        tools
            .files
            .copy_file(&template, &shrinkwrap)
            .await
            .map_err(DeployError::tool("restore shrinkwrap"))?;
    }
    Ok(())
}

pub async fn front_end_npm_build(
    config: &DeployConfig,
    tools: &Toolchain,
    frontend_root: &Path,
) -> Result<(), DeployError> {
    for dir in theme_dirs(&in_project(config, frontend_root))? {
        tools
            .packages
            .run_script(&dir, "build", NpmLogLevel::Info)
            .await
            .map_err(DeployError::tool("npm run build"))?;
    }
    Ok(())
}
