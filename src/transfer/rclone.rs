use async_trait::async_trait;
use std::path::Path;
use tracing::info;

use super::{Destination, Services, Transfer, TransferMethod};
use crate::command::Cmd;
use crate::error::Result;
use crate::prompt::preset_or_ask;

const INSTALL_HINT: &str =
    "Install it with 'curl https://rclone.org/install.sh | sudo bash' and run 'rclone config'.";

/// Google Drive upload through an rclone remote.
///
/// The remote name and path are asked for at upload time unless preset.
pub struct RcloneTransfer {
    remote: Option<String>,
    path: Option<String>,
}

impl RcloneTransfer {
    pub fn new(remote: Option<String>, path: Option<String>) -> Self {
        Self { remote, path }
    }
}

#[async_trait]
impl Transfer for RcloneTransfer {
    async fn upload(
        &self,
        archive: &Path,
        _destination: &Destination,
        services: Services<'_>,
    ) -> Result<()> {
        services.runner.require("rclone", INSTALL_HINT)?;

        let remote = preset_or_ask(
            self.remote.as_deref(),
            services.prompter,
            "rclone remote name (e.g. gdrive)",
        )?;
        let remote = remote.trim_end_matches(':');
        let path = preset_or_ask(
            self.path.as_deref(),
            services.prompter,
            "Path on the remote",
        )?;

        let target = format!("{}:{}", remote, path);
        info!("Uploading {} to {} via rclone", archive.display(), target);
        services
            .runner
            .run(Cmd::new("rclone").arg("copy").path_arg(archive).arg(target))
            .await?;
        Ok(())
    }

    fn method(&self) -> TransferMethod {
        TransferMethod::GoogleDrive
    }
}
