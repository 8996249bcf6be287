//! Backup producer: one compressed archive of the whole root filesystem.

use chrono::{DateTime, Local};
use flate2::write::GzEncoder;
use std::fs;
use std::io::Write;
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};
use tar::Builder;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::command::{Cmd, CommandRunner};
use crate::config::{ArchiveEngine, BackupConfig, Compression};
use crate::error::{Result, RootfsError};
use crate::output;

/// Virtual and transient mount points never worth archiving.
pub const DEFAULT_EXCLUDES: [&str; 8] = [
    "/proc",
    "/sys",
    "/dev",
    "/tmp",
    "/run",
    "/mnt",
    "/media",
    "/lost+found",
];

/// GNU tar uses exit status 1 for "some files differ", which a live root
/// filesystem almost always triggers.
const TAR_FILES_CHANGED: i32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupPlan {
    pub archive: PathBuf,
    pub source_root: PathBuf,
    pub excludes: Vec<PathBuf>,
    pub engine: ArchiveEngine,
    pub compression: Compression,
    pub compression_level: Option<u32>,
}

impl BackupPlan {
    pub fn new(config: &BackupConfig, now: DateTime<Local>) -> Self {
        Self {
            archive: config
                .output_dir
                .join(archive_name(now, config.compression)),
            source_root: config.source_root.clone(),
            excludes: resolve_excludes(&config.source_root, &config.exclude),
            engine: config.engine,
            compression: config.compression,
            compression_level: config.compression_level,
        }
    }
}

pub fn archive_name(now: DateTime<Local>, compression: Compression) -> String {
    format!(
        "backup-{}.{}",
        now.format("%Y%m%d-%H%M%S"),
        compression.extension()
    )
}

/// Default exclusions plus `extra`, re-rooted under `source_root`.
pub fn resolve_excludes(source_root: &Path, extra: &[String]) -> Vec<PathBuf> {
    DEFAULT_EXCLUDES
        .iter()
        .copied()
        .chain(extra.iter().map(String::as_str))
        .map(|p| source_root.join(p.trim_start_matches('/')))
        .collect()
}

fn is_excluded(path: &Path, excludes: &[PathBuf]) -> bool {
    excludes.iter().any(|ex| path.starts_with(ex))
}

/// The system `tar` invocation for `plan`. The archive path always follows `-f`.
pub fn tar_command(plan: &BackupPlan) -> Cmd {
    let mut cmd = Cmd::new("tar").args(["-c", "-p"]);
    cmd = match (plan.compression, plan.compression_level) {
        (Compression::Gzip, None) => cmd.arg("-z"),
        (Compression::Zstd, None) => cmd.arg("--zstd"),
        (Compression::Gzip, Some(level)) => cmd.arg("-I").arg(format!("gzip -{}", level.min(9))),
        (Compression::Zstd, Some(level)) => {
            cmd.arg("-I").arg(format!("zstd -{}", level.clamp(1, 19)))
        }
    };
    cmd = cmd.arg("-f").path_arg(&plan.archive);
    for exclude in &plan.excludes {
        cmd = cmd.arg(format!("--exclude={}", exclude.display()));
    }
    cmd.path_arg(&plan.source_root)
}

/// Produce the archive and check that it exists before anything consumes it.
pub async fn create_backup(plan: &BackupPlan, runner: &dyn CommandRunner) -> Result<PathBuf> {
    info!(
        "Creating backup {} from {}",
        plan.archive.display(),
        plan.source_root.display()
    );

    if let Some(dir) = plan.archive.parent() {
        fs::create_dir_all(dir)?;
    }

    match plan.engine {
        ArchiveEngine::Tar => run_system_tar(plan, runner).await?,
        ArchiveEngine::Builtin => {
            let plan = plan.clone();
            tokio::task::spawn_blocking(move || build_archive(&plan))
                .await
                .map_err(|e| RootfsError::Io(std::io::Error::other(e)))??;
        }
    }

    verify_archive(&plan.archive)?;
    Ok(plan.archive.clone())
}

async fn run_system_tar(plan: &BackupPlan, runner: &dyn CommandRunner) -> Result<()> {
    let cmd = tar_command(plan);
    let result = runner.output(&cmd).await?;
    match result.code {
        Some(0) => Ok(()),
        Some(TAR_FILES_CHANGED) => {
            output::warn(
                "Some files changed while being archived; their copies may be inconsistent",
            );
            debug!("tar: {}", result.stderr.trim());
            Ok(())
        }
        _ => Err(result.into_failure("tar")),
    }
}

/// The archive must exist and hold at least one byte.
pub fn verify_archive(archive: &Path) -> Result<()> {
    match fs::metadata(archive) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(()),
        _ => Err(RootfsError::ArchiveMissing(archive.to_path_buf())),
    }
}

/// In-process archive of `plan.source_root`.
pub fn build_archive(plan: &BackupPlan) -> Result<()> {
    let file = fs::File::create(&plan.archive)?;

    match plan.compression {
        Compression::Gzip => {
            let level = plan.compression_level.unwrap_or(6).min(9);
            let encoder = GzEncoder::new(file, flate2::Compression::new(level));
            let mut tar = Builder::new(encoder);
            append_tree(&mut tar, plan)?;
            tar.into_inner()?.finish()?;
        }
        Compression::Zstd => {
            let level = plan.compression_level.unwrap_or(3) as i32;
            let encoder = zstd::Encoder::new(file, level)?;
            let mut tar = Builder::new(encoder);
            append_tree(&mut tar, plan)?;
            tar.into_inner()?.finish()?;
        }
    }
    Ok(())
}

fn append_tree<W: Write>(tar: &mut Builder<W>, plan: &BackupPlan) -> Result<()> {
    tar.follow_symlinks(false);

    let walker = WalkDir::new(&plan.source_root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !is_excluded(e.path(), &plan.excludes) && e.path() != plan.archive);

    let mut appended = 0usize;
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        let path = entry.path();
        let relative = path.strip_prefix(&plan.source_root).unwrap_or(path);
        if relative.as_os_str().is_empty() || entry.file_type().is_socket() {
            continue;
        }

        match tar.append_path_with_name(path, relative) {
            Ok(()) => appended += 1,
            Err(e) => warn!("Skipping {}: {}", path.display(), e),
        }
    }

    debug!("Archived {} entries", appended);
    tar.finish()?;
    Ok(())
}
