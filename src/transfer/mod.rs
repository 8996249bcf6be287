//! Upload strategies.
//!
//! [`TransferMethod`] is the operator's 1-6 choice; [`Transport`] is the
//! configured strategy it maps to. Each strategy implements [`Transfer`].

mod ftp;
mod nfs;
mod rclone;
mod ssh;

pub use ftp::FtpTransfer;
pub use nfs::NfsTransfer;
pub use rclone::RcloneTransfer;
pub use ssh::{RsyncTransfer, ScpTransfer, SftpTransfer};

use async_trait::async_trait;
use std::fmt;
use std::path::Path;

use crate::command::CommandRunner;
use crate::config::TransferSettings;
use crate::error::{Result, RootfsError};
use crate::prompt::Prompter;

/// Where the archive goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub user: String,
    pub host: String,
    pub path: String,
}

impl Destination {
    /// `user@host:path`, as understood by scp and rsync.
    pub fn remote_spec(&self) -> String {
        format!("{}@{}:{}", self.user, self.host, self.path)
    }

    /// `user@host`, as understood by sftp.
    pub fn login(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferMethod {
    Scp,
    Rsync,
    Ftp,
    GoogleDrive,
    Nfs,
    Sftp,
}

impl TransferMethod {
    pub const ALL: [TransferMethod; 6] = [
        TransferMethod::Scp,
        TransferMethod::Rsync,
        TransferMethod::Ftp,
        TransferMethod::GoogleDrive,
        TransferMethod::Nfs,
        TransferMethod::Sftp,
    ];

    pub fn from_selector(selector: &str) -> Result<Self> {
        let trimmed = selector.trim();
        trimmed
            .parse::<u8>()
            .ok()
            .and_then(Self::from_number)
            .ok_or_else(|| RootfsError::InvalidMethod(trimmed.to_string()))
    }

    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(TransferMethod::Scp),
            2 => Some(TransferMethod::Rsync),
            3 => Some(TransferMethod::Ftp),
            4 => Some(TransferMethod::GoogleDrive),
            5 => Some(TransferMethod::Nfs),
            6 => Some(TransferMethod::Sftp),
            _ => None,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            TransferMethod::Scp => 1,
            TransferMethod::Rsync => 2,
            TransferMethod::Ftp => 3,
            TransferMethod::GoogleDrive => 4,
            TransferMethod::Nfs => 5,
            TransferMethod::Sftp => 6,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TransferMethod::Scp => "SCP",
            TransferMethod::Rsync => "rsync",
            TransferMethod::Ftp => "FTP",
            TransferMethod::GoogleDrive => "Google Drive (rclone)",
            TransferMethod::Nfs => "NFS",
            TransferMethod::Sftp => "SFTP",
        }
    }
}

impl fmt::Display for TransferMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Remote parameters collected once, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    pub destination: Destination,
    pub method: TransferMethod,
}

/// Double-quote `value` for an sftp or ftp command script, escaping `\`
/// and `"`. Line breaks would start a new command and are rejected.
pub fn quote_script_arg(value: &str) -> Result<String> {
    if value.contains(['\n', '\r']) {
        return Err(RootfsError::UnsafeScriptArgument(value.to_string()));
    }
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    Ok(quoted)
}

/// Like [`quote_script_arg`], but plain words are left bare.
pub fn script_arg(value: &str) -> Result<String> {
    if value.is_empty() || value.contains(|c: char| c.is_whitespace() || c == '"' || c == '\\') {
        quote_script_arg(value)
    } else {
        Ok(value.to_string())
    }
}

/// Collaborators a strategy may need while uploading.
#[derive(Clone, Copy)]
pub struct Services<'a> {
    pub runner: &'a dyn CommandRunner,
    pub prompter: &'a dyn Prompter,
}

#[async_trait]
pub trait Transfer: Send + Sync {
    async fn upload(
        &self,
        archive: &Path,
        destination: &Destination,
        services: Services<'_>,
    ) -> Result<()>;

    fn method(&self) -> TransferMethod;
}

pub enum Transport {
    Scp(ScpTransfer),
    Rsync(RsyncTransfer),
    Ftp(FtpTransfer),
    GoogleDrive(RcloneTransfer),
    Nfs(NfsTransfer),
    Sftp(SftpTransfer),
}

impl Transport {
    pub fn from_method(method: TransferMethod, settings: &TransferSettings) -> Self {
        match method {
            TransferMethod::Scp => Transport::Scp(ScpTransfer),
            TransferMethod::Rsync => Transport::Rsync(RsyncTransfer),
            TransferMethod::Ftp => Transport::Ftp(FtpTransfer::new(settings.ftp_password())),
            TransferMethod::GoogleDrive => Transport::GoogleDrive(RcloneTransfer::new(
                settings.rclone_remote.clone(),
                settings.rclone_path.clone(),
            )),
            TransferMethod::Nfs => Transport::Nfs(NfsTransfer::new(
                settings.nfs_export.clone(),
                settings.nfs_mount_root.clone(),
            )),
            TransferMethod::Sftp => Transport::Sftp(SftpTransfer),
        }
    }
}

#[async_trait]
impl Transfer for Transport {
    async fn upload(
        &self,
        archive: &Path,
        destination: &Destination,
        services: Services<'_>,
    ) -> Result<()> {
        match self {
            Transport::Scp(t) => t.upload(archive, destination, services).await,
            Transport::Rsync(t) => t.upload(archive, destination, services).await,
            Transport::Ftp(t) => t.upload(archive, destination, services).await,
            Transport::GoogleDrive(t) => t.upload(archive, destination, services).await,
            Transport::Nfs(t) => t.upload(archive, destination, services).await,
            Transport::Sftp(t) => t.upload(archive, destination, services).await,
        }
    }

    fn method(&self) -> TransferMethod {
        match self {
            Transport::Scp(t) => t.method(),
            Transport::Rsync(t) => t.method(),
            Transport::Ftp(t) => t.method(),
            Transport::GoogleDrive(t) => t.method(),
            Transport::Nfs(t) => t.method(),
            Transport::Sftp(t) => t.method(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_round_trip() {
        for method in TransferMethod::ALL {
            let parsed = TransferMethod::from_selector(&method.number().to_string()).unwrap();
            assert_eq!(parsed, method);
        }
    }

    #[test]
    fn out_of_range_selectors_are_rejected() {
        for selector in ["0", "7", "", "scp", "-1", "256"] {
            assert!(
                matches!(
                    TransferMethod::from_selector(selector),
                    Err(RootfsError::InvalidMethod(_))
                ),
                "{selector:?} should be invalid"
            );
        }
    }

    #[test]
    fn selector_tolerates_whitespace() {
        assert_eq!(
            TransferMethod::from_selector(" 4\n").unwrap(),
            TransferMethod::GoogleDrive
        );
    }

    #[test]
    fn remote_spec_format() {
        let dest = Destination {
            user: "backup".into(),
            host: "10.0.0.5".into(),
            path: "/srv/backups".into(),
        };
        assert_eq!(dest.remote_spec(), "backup@10.0.0.5:/srv/backups");
        assert_eq!(dest.login(), "backup@10.0.0.5");
    }

    #[test]
    fn script_args_are_quoted_when_needed() {
        assert_eq!(script_arg("/srv/backups").unwrap(), "/srv/backups");
        assert_eq!(script_arg("/srv/my backups").unwrap(), "\"/srv/my backups\"");
        assert_eq!(
            quote_script_arg(r#"/tmp/a"b\c"#).unwrap(),
            r#""/tmp/a\"b\\c""#
        );
    }

    #[test]
    fn line_breaks_are_rejected() {
        for value in ["/srv\nrm -rf /", "/srv\r"] {
            assert!(matches!(
                script_arg(value),
                Err(RootfsError::UnsafeScriptArgument(_))
            ));
        }
    }

    #[test]
    fn transport_matches_method() {
        let settings = TransferSettings::default();
        for method in TransferMethod::ALL {
            assert_eq!(Transport::from_method(method, &settings).method(), method);
        }
    }
}
