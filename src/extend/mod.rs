//! Grow the root filesystem onto new disk space.
//!
//! The root device decides the branch: device-mapper paths go through LVM
//! ([`lvm`]), anything else resizes the root partition in place
//! ([`partition`]). Both end with the same filesystem growth step.

pub mod lvm;
pub mod partition;

use std::fmt;
use std::time::Duration;
use tracing::info;

use crate::command::{Cmd, CommandRunner};
use crate::error::{Result, RootfsError};

const DEVICE_MAPPER_PREFIX: &str = "/dev/mapper/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageLayout {
    Lvm,
    Partition,
}

impl fmt::Display for StorageLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageLayout::Lvm => f.write_str("LVM"),
            StorageLayout::Partition => f.write_str("non-LVM"),
        }
    }
}

pub fn is_lvm_device(source: &str) -> bool {
    source.starts_with(DEVICE_MAPPER_PREFIX)
}

/// What `findmnt` reports for `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootFilesystem {
    pub source: String,
    pub fstype: String,
    pub target: String,
}

impl RootFilesystem {
    /// Parse `findmnt -n -r -o SOURCE,FSTYPE,TARGET` output.
    pub fn parse(output: &str) -> Result<Self> {
        let line = output
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .ok_or_else(|| RootfsError::RootDevice("findmnt returned nothing".to_string()))?;

        let mut cols = line.split_whitespace();
        let (Some(source), Some(fstype)) = (cols.next(), cols.next()) else {
            return Err(RootfsError::RootDevice(format!(
                "unexpected findmnt output: {}",
                line
            )));
        };
        let target = cols.next().unwrap_or("/");

        // btrfs reports subvolumes as /dev/sda2[/@]
        let source = source.split('[').next().unwrap_or(source);

        Ok(Self {
            source: source.to_string(),
            fstype: fstype.to_string(),
            target: target.to_string(),
        })
    }

    pub fn layout(&self) -> StorageLayout {
        if is_lvm_device(&self.source) {
            StorageLayout::Lvm
        } else {
            StorageLayout::Partition
        }
    }
}

pub async fn inspect_root(runner: &dyn CommandRunner) -> Result<RootFilesystem> {
    let output = runner
        .run(Cmd::new("findmnt").args(["-n", "-r", "-o", "SOURCE,FSTYPE,TARGET", "/"]))
        .await?;
    RootFilesystem::parse(&output)
}

/// XFS can only grow online through its mount point; everything else is
/// resized through the block device.
pub fn grow_command(fstype: &str, device: &str, mount_point: &str) -> Cmd {
    if fstype == "xfs" {
        Cmd::new("xfs_growfs").arg(mount_point)
    } else {
        Cmd::new("resize2fs").arg(device)
    }
}

pub async fn grow_filesystem(
    runner: &dyn CommandRunner,
    fstype: &str,
    device: &str,
    mount_point: &str,
) -> Result<()> {
    let cmd = grow_command(fstype, device, mount_point);
    info!("Growing {} filesystem with {}", fstype, cmd.program);
    runner.run(cmd).await?;
    Ok(())
}

/// Inspect the root device and run the matching branch.
pub async fn extend_root(runner: &dyn CommandRunner, settle: Duration) -> Result<StorageLayout> {
    let root = inspect_root(runner).await?;
    let layout = root.layout();
    info!(
        "Root filesystem {} ({}) on {} is {}",
        root.target, root.fstype, root.source, layout
    );

    match layout {
        StorageLayout::Lvm => lvm::extend(runner, &root).await?,
        StorageLayout::Partition => partition::extend(runner, &root, settle).await?,
    }
    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_mapper_paths_are_lvm() {
        assert!(is_lvm_device("/dev/mapper/ubuntu--vg-ubuntu--lv"));
        assert!(is_lvm_device("/dev/mapper/centos-root"));
    }

    #[test]
    fn other_paths_are_not_lvm() {
        for source in ["/dev/sda1", "/dev/nvme0n1p2", "/dev/vda1", "/dev/dm-0", "mapper/x", ""] {
            assert!(!is_lvm_device(source), "{source} should not be LVM");
        }
    }

    #[test]
    fn parse_findmnt_line() {
        let root = RootFilesystem::parse("/dev/mapper/vg0-root xfs /\n").unwrap();
        assert_eq!(root.source, "/dev/mapper/vg0-root");
        assert_eq!(root.fstype, "xfs");
        assert_eq!(root.target, "/");
        assert_eq!(root.layout(), StorageLayout::Lvm);
    }

    #[test]
    fn parse_strips_btrfs_subvolume() {
        let root = RootFilesystem::parse("/dev/sda2[/@] btrfs /").unwrap();
        assert_eq!(root.source, "/dev/sda2");
        assert_eq!(root.layout(), StorageLayout::Partition);
    }

    #[test]
    fn parse_rejects_empty_output() {
        assert!(matches!(
            RootFilesystem::parse("\n"),
            Err(RootfsError::RootDevice(_))
        ));
        assert!(RootFilesystem::parse("/dev/sda1").is_err());
    }

    #[test]
    fn xfs_grows_through_mount_point() {
        let cmd = grow_command("xfs", "/dev/sda1", "/");
        assert_eq!(cmd.program, "xfs_growfs");
        assert_eq!(cmd.args, vec!["/"]);
    }

    #[test]
    fn other_filesystems_resize_the_device() {
        for fstype in ["ext4", "ext3", "ext2", "btrfs", ""] {
            let cmd = grow_command(fstype, "/dev/sda1", "/");
            assert_eq!(cmd.program, "resize2fs", "{fstype}");
            assert_eq!(cmd.args, vec!["/dev/sda1"]);
        }
    }
}
