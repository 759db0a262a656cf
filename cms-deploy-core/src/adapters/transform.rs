use async_trait::async_trait;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

use super::process::ToolCommand;
use super::xml;
use crate::contract::{ToolError, TransformTool};
use crate::error::DeployError;
use crate::fileset::{clean_path, contains_any, pattern_under, scan};

const FRAGMENT_EXTENSION: &str = "xdt";

/// A transform fragment and the configuration file it applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformJob {
    pub fragment: PathBuf,
    pub target: PathBuf,
}

fn is_excluded(fragment: &Path, exclude: &[String]) -> bool {
    let name = fragment
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let patterns: Vec<&str> = exclude.iter().map(String::as_str).collect();
    contains_any(&name, &patterns)
}

/// `relative` with the trailing `.xdt` removed, joined onto `target`.
fn target_for(relative: &Path, target: &Path) -> PathBuf {
    target.join(relative.with_extension(""))
}

/// Path of `relative` after its last `project_parent_folder` component.
fn below_parent_folder<'a>(relative: &'a Path, project_parent_folder: &str) -> Option<&'a Path> {
    let components: Vec<Component> = relative.components().collect();
    let position = components.iter().rposition(|c| {
        c.as_os_str()
            .to_string_lossy()
            .eq_ignore_ascii_case(project_parent_folder)
    })?;
    let mut rest = relative;
    for component in &components[..=position] {
        rest = rest.strip_prefix(component.as_os_str()).ok()?;
    }
    Some(rest)
}

/// Fragments below `project_parent_folder` directories of `source`, mapped by
/// their path relative to that folder.
///
/// `<layer>/Accounts/code/App_Config/Include/Accounts.config.xdt` with
/// `code` as the parent folder targets `<target>/App_Config/Include/Accounts.config`.
pub fn plan_transforms(
    source: &Path,
    project_parent_folder: &str,
    target: &Path,
    exclude: &[String],
) -> Result<Vec<TransformJob>, DeployError> {
    let pattern = pattern_under(
        source,
        &format!("**/{project_parent_folder}/**/*.{FRAGMENT_EXTENSION}"),
    );
    let source = clean_path(source);
    let mut jobs = Vec::new();
    for fragment in scan(&pattern)? {
        if is_excluded(&fragment, exclude) {
            debug!(fragment = %fragment.display(), "Skipping excluded transform");
            continue;
        }
        let cleaned = clean_path(&fragment);
        let relative = cleaned.strip_prefix(&source).unwrap_or(cleaned.as_path());
        let Some(below) = below_parent_folder(relative, project_parent_folder) else {
            continue;
        };
        jobs.push(TransformJob {
            target: target_for(below, target),
            fragment,
        });
    }
    Ok(jobs)
}

/// Where the merged transform for `job` is written: the target path with
/// `.xdt` appended.
pub fn merged_path(job: &TransformJob) -> PathBuf {
    let mut path = job.target.clone().into_os_string();
    path.push(".");
    path.push(FRAGMENT_EXTENSION);
    PathBuf::from(path)
}

/// Folds one fragment into its merged transform file.
///
/// The first fragment for a target is copied as is. Later fragments have the
/// children of their document element appended to the merged document
/// element, unless that markup is already present. Returns whether the file
/// changed.
pub fn merge_fragment(job: &TransformJob) -> Result<bool, DeployError> {
    let output = merged_path(job);
    let (_, fragment) = xml::read(&job.fragment)?;

    let (had_bom, merged) = match xml::read(&output) {
        Ok((had_bom, existing)) => {
            let body = xml::root_content(&fragment, &job.fragment)?.trim();
            if body.is_empty() || existing.contains(body) {
                debug!(fragment = %job.fragment.display(), "Transform already merged");
                return Ok(false);
            }
            let merged = xml::append_to_root(&existing, &output, &format!("  {body}\n"))?;
            (had_bom, merged)
        }
        Err(DeployError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
            if let Some(parent) = output.parent() {
                fs::create_dir_all(parent).map_err(|e| DeployError::io(parent, e))?;
            }
            (false, fragment)
        }
        Err(e) => return Err(e),
    };
    xml::write(&output, had_bom, merged)?;
    debug!(fragment = %job.fragment.display(), output = %output.display(), "Merged transform");
    Ok(true)
}

/// [`TransformTool`] over XDT fragments.
///
/// `merge` combines the fragments for each configuration file into one
/// `<config>.xdt` in the target folder without touching the configuration.
/// `apply` drives an XDT command-line transformer, one fragment at a time,
/// rewriting each target configuration in place.
pub struct XdtTransformTool {
    program: String,
}

impl XdtTransformTool {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run_jobs(&self, jobs: Vec<TransformJob>) -> Result<(), ToolError> {
        for job in &jobs {
            if !job.target.is_file() {
                return Err(DeployError::Config(format!(
                    "transform {} targets missing file {}",
                    job.fragment.display(),
                    job.target.display()
                ))
                .into());
            }
            info!(
                fragment = %job.fragment.display(),
                target = %job.target.display(),
                "Applying transform"
            );
            ToolCommand::new(&self.program)
                .arg("--source")
                .arg(&job.target)
                .arg("--transform")
                .arg(&job.fragment)
                .arg("--output")
                .arg(&job.target)
                .run()
                .await?;
        }
        info!(count = jobs.len(), "Transforms applied");
        Ok(())
    }
}

impl Default for XdtTransformTool {
    fn default() -> Self {
        Self::new("dotnet-xdt")
    }
}

#[async_trait]
impl TransformTool for XdtTransformTool {
    async fn merge(
        &self,
        source: &Path,
        project_parent_folder: &str,
        target: &Path,
        exclude: &[String],
    ) -> Result<(), ToolError> {
        let jobs = plan_transforms(source, project_parent_folder, target, exclude)?;
        let mut changed = 0;
        for job in &jobs {
            if merge_fragment(job)? {
                changed += 1;
            }
        }
        info!(count = jobs.len(), changed, "Transforms merged");
        Ok(())
    }

    async fn apply(
        &self,
        source: &Path,
        project_parent_folder: &str,
        target: &Path,
        exclude: &[String],
    ) -> Result<(), ToolError> {
        let jobs = plan_transforms(source, project_parent_folder, target, exclude)?;
        self.run_jobs(jobs).await
    }
}
