use async_trait::async_trait;
use std::path::Path;
use tracing::info;

use super::{quote_script_arg, Destination, Services, Transfer, TransferMethod};
use crate::command::Cmd;
use crate::error::Result;

pub struct ScpTransfer;

#[async_trait]
impl Transfer for ScpTransfer {
    async fn upload(
        &self,
        archive: &Path,
        destination: &Destination,
        services: Services<'_>,
    ) -> Result<()> {
        let target = destination.remote_spec();
        info!("Uploading {} to {} via scp", archive.display(), target);
        services
            .runner
            .run(Cmd::new("scp").path_arg(archive).arg(target))
            .await?;
        Ok(())
    }

    fn method(&self) -> TransferMethod {
        TransferMethod::Scp
    }
}

pub struct RsyncTransfer;

#[async_trait]
impl Transfer for RsyncTransfer {
    async fn upload(
        &self,
        archive: &Path,
        destination: &Destination,
        services: Services<'_>,
    ) -> Result<()> {
        let target = destination.remote_spec();
        info!("Uploading {} to {} via rsync", archive.display(), target);
        services
            .runner
            .run(Cmd::new("rsync").arg("-avz").path_arg(archive).arg(target))
            .await?;
        Ok(())
    }

    fn method(&self) -> TransferMethod {
        TransferMethod::Rsync
    }
}

/// Batch mode makes sftp exit non-zero when `put` fails.
pub struct SftpTransfer;

#[async_trait]
impl Transfer for SftpTransfer {
    async fn upload(
        &self,
        archive: &Path,
        destination: &Destination,
        services: Services<'_>,
    ) -> Result<()> {
        info!(
            "Uploading {} to {} via sftp",
            archive.display(),
            destination.remote_spec()
        );
        let script = format!(
            "put {} {}\n",
            quote_script_arg(&archive.to_string_lossy())?,
            quote_script_arg(&destination.path)?
        );
        services
            .runner
            .run(
                Cmd::new("sftp")
                    .args(["-b", "-"])
                    .arg(destination.login())
                    .stdin(script),
            )
            .await?;
        Ok(())
    }

    fn method(&self) -> TransferMethod {
        TransferMethod::Sftp
    }
}
