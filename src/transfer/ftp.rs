use async_trait::async_trait;
use std::path::Path;
use tracing::info;

use super::{script_arg, Destination, Services, Transfer, TransferMethod};
use crate::command::Cmd;
use crate::error::{Result, RootfsError};

/// Drives the classic `ftp` client with auto-login disabled.
pub struct FtpTransfer {
    password: Option<String>,
}

impl FtpTransfer {
    pub fn new(password: Option<String>) -> Self {
        Self { password }
    }

    /// Command script fed to `ftp -n` on stdin.
    pub fn script(&self, archive: &Path, destination: &Destination) -> Result<String> {
        let file_name = archive
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                RootfsError::Config(format!("Invalid archive name: {}", archive.display()))
            })?;
        let local_dir = archive
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let login = match &self.password {
            Some(password) => format!("user {} {}", destination.user, password),
            None => format!("user {}", destination.user),
        };

        let mut script = vec![login, "binary".to_string()];
        script.push(format!("lcd {}", script_arg(&local_dir.to_string_lossy())?));
        if !destination.path.is_empty() {
            script.push(format!("cd {}", script_arg(&destination.path)?));
        }
        script.push(format!("put {}", script_arg(file_name)?));
        script.push("bye".to_string());

        Ok(script.join("\n") + "\n")
    }
}

#[async_trait]
impl Transfer for FtpTransfer {
    async fn upload(
        &self,
        archive: &Path,
        destination: &Destination,
        services: Services<'_>,
    ) -> Result<()> {
        info!(
            "Uploading {} to ftp://{}{}",
            archive.display(),
            destination.host,
            destination.path
        );
        let script = self.script(archive, destination)?;
        services
            .runner
            .run(Cmd::new("ftp").arg("-n").arg(&destination.host).stdin(script))
            .await?;
        Ok(())
    }

    fn method(&self) -> TransferMethod {
        TransferMethod::Ftp
    }
}
