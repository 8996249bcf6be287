use async_trait::async_trait;
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::{Destination, Services, Transfer, TransferMethod};
use crate::command::{Cmd, CommandRunner};
use crate::error::{Result, RootfsError};
use crate::prompt::preset_or_ask;

/// Copy onto an NFS export mounted under a temporary mount point.
pub struct NfsTransfer {
    export: Option<String>,
    mount_root: PathBuf,
}

impl NfsTransfer {
    pub fn new(export: Option<String>, mount_root: PathBuf) -> Self {
        Self { export, mount_root }
    }

    fn mount_point(&self) -> PathBuf {
        self.mount_root.join(format!(
            "nfs_backup_{}",
            Local::now().format("%Y%m%d%H%M%S%3f")
        ))
    }
}

async fn release(runner: &dyn CommandRunner, mount_point: &Path, mounted: bool) {
    if mounted {
        if let Err(e) = runner.run(Cmd::new("umount").path_arg(mount_point)).await {
            warn!("Failed to unmount {}: {}", mount_point.display(), e);
            return;
        }
    }
    if let Err(e) = fs::remove_dir(mount_point) {
        warn!("Failed to remove {}: {}", mount_point.display(), e);
    }
}

#[async_trait]
impl Transfer for NfsTransfer {
    async fn upload(
        &self,
        archive: &Path,
        _destination: &Destination,
        services: Services<'_>,
    ) -> Result<()> {
        let export = preset_or_ask(
            self.export.as_deref(),
            services.prompter,
            "NFS export (server:/path)",
        )?;

        let mount_point = self.mount_point();
        fs::create_dir_all(&mount_point)?;
        info!("Mounting {} on {}", export, mount_point.display());

        let mount = Cmd::new("mount")
            .args(["-t", "nfs"])
            .arg(&export)
            .path_arg(&mount_point);
        if let Err(e) = services.runner.run(mount).await {
            release(services.runner, &mount_point, false).await;
            return Err(RootfsError::MountFailed {
                export,
                mount_point,
                reason: e.to_string(),
            });
        }

        let copy = Cmd::new("cp").path_arg(archive).path_arg(&mount_point);
        if let Err(e) = services.runner.run(copy).await {
            release(services.runner, &mount_point, true).await;
            return Err(RootfsError::CopyFailed {
                destination: mount_point,
                reason: e.to_string(),
            });
        }

        info!("Copied {} to {}", archive.display(), export);
        services
            .runner
            .run(Cmd::new("umount").path_arg(&mount_point))
            .await?;
        fs::remove_dir(&mount_point)?;
        Ok(())
    }

    fn method(&self) -> TransferMethod {
        TransferMethod::Nfs
    }
}
