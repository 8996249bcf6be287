//! Non-LVM branch: stretch the root partition to the end of its disk.

use std::time::Duration;
use tracing::info;

use super::{grow_filesystem, RootFilesystem};
use crate::command::{Cmd, CommandRunner};
use crate::error::{Result, RootfsError};

/// Partition number from the trailing digits of the device name, e.g. `2`
/// for `/dev/nvme0n1p2`.
pub fn partition_number(device: &str) -> Option<u32> {
    let digits: String = device
        .chars()
        .rev()
        .take_while(char::is_ascii_digit)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    digits.parse().ok()
}

pub async fn parent_disk(runner: &dyn CommandRunner, device: &str) -> Result<String> {
    let output = runner
        .run(Cmd::new("lsblk").args(["-n", "-p", "-o", "PKNAME"]).arg(device))
        .await?;
    output
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
        .ok_or_else(|| RootfsError::RootDevice(format!("{} has no parent disk", device)))
}

pub async fn extend(
    runner: &dyn CommandRunner,
    root: &RootFilesystem,
    settle: Duration,
) -> Result<()> {
    let disk = parent_disk(runner, &root.source).await?;
    let number = partition_number(&root.source).unwrap_or(1);
    info!("Resizing partition {} on {} to fill the disk", number, disk);

    // parted asks for confirmation when the partition is mounted
    runner
        .run(
            Cmd::new("parted")
                .arg("---pretend-input-tty")
                .arg(&disk)
                .arg("resizepart")
                .arg(number.to_string())
                .arg("100%")
                .stdin("Yes\n"),
        )
        .await?;
    runner.run(Cmd::new("partprobe").arg(&disk)).await?;

    if !settle.is_zero() {
        tokio::time::sleep(settle).await;
    }

    grow_filesystem(runner, &root.fstype, &root.source, &root.target).await
}
