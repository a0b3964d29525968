// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Specter Networks LLC

//! Resource file verification.
//!
//! Before a launch, every resource file pinned in the plugin's configuration
//! must match its SHA-256. A mismatch triggers a download from the controller
//! and a re-verify of the written bytes; offline agents fail the launch
//! instead.

use crate::context::AgentContext;
use ghost_core::{sha256_file, PluginConfig};
use std::path::Path;
use tracing::{debug, error, info};

/// Verify (and repair, when online) all resource files for `plugin`.
/// Returns whether the plugin is safe to launch.
pub(crate) async fn verify(ctx: &AgentContext, plugin: &PluginConfig) -> bool {
    let workdir = ctx.install_dir.join(&plugin.working_directory);
    if let Err(err) = std::fs::create_dir_all(&workdir) {
        error!(error = %err, "could not create plugin working directory");
        return false;
    }

    for resource in &plugin.resource_files {
        let path = workdir.join(&resource.path);
        let on_disk = match sha256_file(&path) {
            Ok(hash) => Some(hash),
            Err(err) => {
                // Not fatal yet: a missing file may be downloadable.
                error!(path = %path.display(), error = %err, "error hashing resource");
                None
            }
        };

        if on_disk.as_deref().is_some_and(|h| h.eq_ignore_ascii_case(&resource.hash)) {
            debug!(path = %resource.path, "resource file hash verified");
            continue;
        }

        let Some(sender) = &ctx.sender else {
            error!(
                path = %path.display(),
                wanted = %resource.hash,
                got = on_disk.as_deref().unwrap_or(""),
                "mismatched hashes"
            );
            return false;
        };

        info!(path = %path.display(), "resource file hash mismatch, downloading update");
        let bytes = match sender.fetch_resource(&resource.hash.to_lowercase()).await {
            Ok(bytes) => bytes,
            Err(err) => {
                error!(error = %err, "unable to retrieve new resource file");
                return false;
            }
        };

        if !write_resource(&path, &bytes) {
            return false;
        }
        info!(path = %path.display(), "new resource file written to disk");

        match sha256_file(&path) {
            Ok(hash) if hash.eq_ignore_ascii_case(&resource.hash) => {}
            Ok(hash) => {
                error!(
                    path = %path.display(),
                    wanted = %resource.hash,
                    got = %hash,
                    "mismatched hashes after download"
                );
                return false;
            }
            Err(err) => {
                error!(path = %path.display(), error = %err, "error hashing resource");
                return false;
            }
        }
    }

    true
}

fn write_resource(path: &Path, bytes: &[u8]) -> bool {
    if let Some(parent) = path.parent() {
        if let Err(err) = std::fs::create_dir_all(parent) {
            error!(dir = %parent.display(), error = %err, "could not create subdirectory");
            return false;
        }
    }
    if let Err(err) = std::fs::write(path, bytes) {
        error!(path = %path.display(), error = %err, "unable to write resource file");
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755));
    }
    true
}

#[cfg(test)]
#[path = "resources_tests.rs"]
mod tests;
