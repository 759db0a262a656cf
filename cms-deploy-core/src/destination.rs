//! Resolves the web roots a publish or copy step writes to.

use std::path::PathBuf;
use tracing::debug;

use crate::config::DeployConfig;

/// Primary web root first, then the content-delivery root if one is set.
pub fn resolve_destinations(config: &DeployConfig) -> Vec<PathBuf> {
    let mut destinations = vec![config.publish_web_folder.clone()];
    if let Some(cd) = config
        .publish_web_folder_cd
        .as_ref()
        .filter(|p| !p.as_os_str().is_empty())
    {
        destinations.push(cd.clone());
    }
    debug!(count = destinations.len(), ?destinations, "Resolved destinations");
    destinations
}
