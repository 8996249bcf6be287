//! Optional TOML configuration.
//!
//! Every section and key is optional. Values present here pre-fill the
//! interactive prompts and tune the backup and extension steps.

use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Result, RootfsError};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backup: BackupConfig,
    pub remote: RemoteConfig,
    pub transfer: TransferSettings,
    pub extend: ExtendConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveEngine {
    /// Shell out to the system `tar`.
    #[default]
    Tar,
    /// Build the archive in-process.
    Builtin,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    Gzip,
    Zstd,
}

impl Compression {
    pub fn extension(self) -> &'static str {
        match self {
            Compression::Gzip => "tar.gz",
            Compression::Zstd => "tar.zst",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Directory the archive is written to
    pub output_dir: PathBuf,
    /// Tree to archive
    pub source_root: PathBuf,
    pub engine: ArchiveEngine,
    pub compression: Compression,
    pub compression_level: Option<u32>,
    /// Extra paths excluded on top of the virtual filesystems
    pub exclude: Vec<String>,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("/tmp"),
            source_root: PathBuf::from("/"),
            engine: ArchiveEngine::default(),
            compression: Compression::default(),
            compression_level: None,
            exclude: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub user: Option<String>,
    pub host: Option<String>,
    pub path: Option<String>,
    pub method: Option<u8>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransferSettings {
    pub ftp_password: Option<String>,
    pub rclone_remote: Option<String>,
    pub rclone_path: Option<String>,
    /// `server:/export`
    pub nfs_export: Option<String>,
    pub nfs_mount_root: PathBuf,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            ftp_password: None,
            rclone_remote: None,
            rclone_path: None,
            nfs_export: None,
            nfs_mount_root: PathBuf::from("/mnt"),
        }
    }
}

impl TransferSettings {
    /// FTP password from the config file, falling back to `FTP_PASSWORD`.
    pub fn ftp_password(&self) -> Option<String> {
        self.ftp_password
            .clone()
            .or_else(|| std::env::var("FTP_PASSWORD").ok())
            .filter(|p| !p.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtendConfig {
    /// Pause after re-reading the partition table
    pub settle_seconds: u64,
}

impl Default for ExtendConfig {
    fn default() -> Self {
        Self { settle_seconds: 2 }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: Option<String>,
}

impl AppConfig {
    /// Load from `path`, or fall back to defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let content = fs::read_to_string(path).map_err(|e| {
                    RootfsError::Config(format!(
                        "Failed to read config file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                Self::parse(&content)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| RootfsError::Config(format!("Failed to parse config file: {}", e)))
    }
}

pub const EXAMPLE_CONFIG: &str = r#"# rootfs-backup configuration
# Every key is optional; anything left out is asked for interactively.

[backup]
# Where the archive is written (excluded from the archive itself)
output_dir = "/tmp"
source_root = "/"
# "tar" shells out to the system tar, "builtin" archives in-process
engine = "tar"
# "gzip" or "zstd"
compression = "gzip"
# compression_level = 6
# Extra paths to skip, on top of /proc /sys /dev /tmp /run /mnt /media /lost+found
exclude = [
    # "/var/cache",
]

[remote]
# user = "backup"
# host = "backup.example.com"
# path = "/srv/backups"
# 1 = SCP, 2 = rsync, 3 = FTP, 4 = Google Drive (rclone), 5 = NFS, 6 = SFTP
# method = 1

[transfer]
# ftp_password = "secret"  # or set FTP_PASSWORD
# rclone_remote = "gdrive"
# rclone_path = "backups"
# nfs_export = "nas.local:/export/backups"
nfs_mount_root = "/mnt"

[extend]
settle_seconds = 2

[logging]
level = "info"
"#;

pub fn write_example_config(output_path: &Path) -> Result<()> {
    let mut file = fs::File::create(output_path)?;
    file.write_all(EXAMPLE_CONFIG.as_bytes())?;
    Ok(())
}
