//! LVM branch: add an unused disk to the root volume group and grow the
//! root logical volume over it.

use tracing::info;

use super::{grow_filesystem, RootFilesystem};
use crate::command::{Cmd, CommandRunner};
use crate::error::{Result, RootfsError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalVolume {
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDevice {
    pub name: String,
    pub kind: String,
    pub parent: Option<String>,
    /// Filesystem or other signature (`swap`, `LVM2_member`, ...).
    pub fstype: Option<String>,
    pub mount_point: Option<String>,
}

const LSBLK_COLUMNS: &str = "NAME,TYPE,PKNAME,FSTYPE,MOUNTPOINT";

fn parse_tabbed_line(line: &str) -> Vec<String> {
    line.split('\t')
        .map(|part| part.trim().to_string())
        .collect()
}

/// One name per line, as printed by `vgs`/`pvs` with a single column.
pub fn parse_names(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn parse_logical_volumes(output: &str) -> Vec<LogicalVolume> {
    output
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() {
                return None;
            }
            let cols = parse_tabbed_line(line);
            if cols.len() < 2 {
                return None;
            }
            Some(LogicalVolume {
                name: cols[0].clone(),
                path: cols[1].clone(),
            })
        })
        .collect()
}

/// Parse `lsblk -p -n -r -o NAME,TYPE,PKNAME,FSTYPE,MOUNTPOINT`.
///
/// Raw output escapes blanks inside values, so columns are split on single
/// spaces to keep empty ones in place.
pub fn parse_block_devices(output: &str) -> Vec<BlockDevice> {
    output
        .lines()
        .filter_map(|line| {
            let mut cols = line.split(' ');
            let mut next = || cols.next().filter(|c| !c.is_empty()).map(str::to_string);
            let name = next()?;
            let kind = next()?;
            Some(BlockDevice {
                name,
                kind,
                parent: next(),
                fstype: next(),
                mount_point: next(),
            })
        })
        .collect()
}

pub fn single_volume_group(names: Vec<String>) -> Result<String> {
    match names.len() {
        0 => Err(RootfsError::NoVolumeGroup),
        1 => Ok(names.into_iter().next().unwrap_or_default()),
        _ => Err(RootfsError::AmbiguousVolumeGroup(names)),
    }
}

/// The only logical volume in `vg` that is not swap.
pub fn single_logical_volume(vg: &str, volumes: Vec<LogicalVolume>) -> Result<LogicalVolume> {
    let mut candidates: Vec<LogicalVolume> = volumes
        .into_iter()
        .filter(|lv| !lv.name.contains("swap"))
        .collect();

    match candidates.len() {
        0 => Err(RootfsError::NoLogicalVolume(vg.to_string())),
        1 => Ok(candidates.remove(0)),
        _ => Err(RootfsError::AmbiguousLogicalVolume {
            vg: vg.to_string(),
            names: candidates.into_iter().map(|lv| lv.name).collect(),
        }),
    }
}

/// First whole disk that is not a loop or zram device, not a physical
/// volume, carries no signature or mount, and has no partitions or other
/// children.
pub fn pick_candidate_disk(devices: &[BlockDevice], physical_volumes: &[String]) -> Option<String> {
    devices
        .iter()
        .filter(|d| d.kind == "disk" && !d.name.contains("loop") && !d.name.contains("zram"))
        .filter(|d| d.fstype.is_none() && d.mount_point.is_none())
        .filter(|d| !physical_volumes.iter().any(|pv| pv == &d.name))
        .filter(|d| {
            !devices
                .iter()
                .any(|child| child.parent.as_deref() == Some(d.name.as_str()))
        })
        .map(|d| d.name.clone())
        .next()
}

pub async fn extend(runner: &dyn CommandRunner, root: &RootFilesystem) -> Result<()> {
    let vg = single_volume_group(parse_names(
        &runner
            .run(Cmd::new("vgs").args(["--noheadings", "-o", "vg_name"]))
            .await?,
    ))?;

    let lv = single_logical_volume(
        &vg,
        parse_logical_volumes(
            &runner
                .run(
                    Cmd::new("lvs")
                        .args(["--noheadings", "-o", "lv_name,lv_path", "--separator", "\t"])
                        .arg(&vg),
                )
                .await?,
        ),
    )?;

    let physical_volumes = parse_names(
        &runner
            .run(Cmd::new("pvs").args(["--noheadings", "-o", "pv_name"]))
            .await?,
    );
    let devices = parse_block_devices(
        &runner
            .run(Cmd::new("lsblk").args(["-p", "-n", "-r", "-o", LSBLK_COLUMNS]))
            .await?,
    );
    let disk =
        pick_candidate_disk(&devices, &physical_volumes).ok_or(RootfsError::NoCandidateDisk)?;

    info!(
        "Adding {} to volume group {} and growing {}",
        disk, vg, lv.path
    );

    runner.run(Cmd::new("pvcreate").arg(&disk)).await?;
    runner.run(Cmd::new("vgextend").arg(&vg).arg(&disk)).await?;
    runner
        .run(Cmd::new("lvextend").args(["-l", "+100%FREE"]).arg(&lv.path))
        .await?;

    grow_filesystem(runner, &root.fstype, &lv.path, &root.target).await
}
