use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::contract::{FileOps, ToolError};
use crate::error::DeployError;
use crate::fileset::clean_path;

/// [`FileOps`] on the local file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileOps;

fn copy_one(from: &Path, to: &Path) -> Result<(), DeployError> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|e| DeployError::io(parent, e))?;
    }
    fs::copy(from, to).map_err(|e| DeployError::io(from, e))?;
    debug!(from = %from.display(), to = %to.display(), "Copied file");
    Ok(())
}

/// Where `file` lands inside `destination`.
pub fn target_path(file: &Path, destination: &Path, base: Option<&Path>) -> Result<PathBuf, DeployError> {
    match base {
        Some(base) => {
            let file = clean_path(file);
            let relative = file.strip_prefix(clean_path(base)).map_err(|_| {
                DeployError::Config(format!(
                    "{} is not below copy base {}",
                    file.display(),
                    base.display()
                ))
            })?;
            Ok(destination.join(relative))
        }
        None => {
            let name = file.file_name().ok_or_else(|| {
                DeployError::Config(format!("{} has no file name", file.display()))
            })?;
            Ok(destination.join(name))
        }
    }
}

#[async_trait]
impl FileOps for LocalFileOps {
    async fn ensure_dir(&self, dir: &Path) -> Result<(), ToolError> {
        fs::create_dir_all(dir).map_err(|e| DeployError::io(dir, e))?;
        Ok(())
    }

    async fn copy_files(
        &self,
        files: &[PathBuf],
        destination: &Path,
        base: Option<PathBuf>,
    ) -> Result<(), ToolError> {
        for file in files {
            let target = target_path(file, destination, base.as_deref())?;
            copy_one(file, &target)?;
        }
        info!(
            count = files.len(),
            destination = %destination.display(),
            "Copied files"
        );
        Ok(())
    }

    async fn copy_file(&self, from: &Path, to: &Path) -> Result<(), ToolError> {
        copy_one(from, to)?;
        Ok(())
    }

    async fn delete_file(&self, file: &Path) -> Result<(), ToolError> {
        match fs::remove_file(file) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DeployError::io(file, e).into()),
        }
    }
}
