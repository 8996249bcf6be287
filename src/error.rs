//! Error types for backup, transfer and disk extension.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RootfsError {
    #[error("This program must be run as root")]
    NotRoot,

    #[error("Backup archive was not created: {}", .0.display())]
    ArchiveMissing(PathBuf),

    #[error("Invalid transfer method '{0}' (expected 1-6)")]
    InvalidMethod(String),

    #[error("Required tool '{tool}' not found in PATH. {hint}")]
    ToolMissing { tool: String, hint: String },

    #[error("Failed to execute {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with status {}: {stderr}", code_label(.code))]
    CommandFailed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Failed to mount {export} on {}: {reason}", .mount_point.display())]
    MountFailed {
        export: String,
        mount_point: PathBuf,
        reason: String,
    },

    #[error("Failed to copy backup to {}: {reason}", .destination.display())]
    CopyFailed { destination: PathBuf, reason: String },

    #[error("Could not determine root device: {0}")]
    RootDevice(String),

    #[error("No LVM volume group found")]
    NoVolumeGroup,

    #[error("Multiple volume groups found ({}); refusing to guess", .0.join(", "))]
    AmbiguousVolumeGroup(Vec<String>),

    #[error("No non-swap logical volume found in volume group {0}")]
    NoLogicalVolume(String),

    #[error("Multiple logical volumes found in {vg} ({}); refusing to guess", .names.join(", "))]
    AmbiguousLogicalVolume { vg: String, names: Vec<String> },

    #[error("No unused disk found to add to the volume group")]
    NoCandidateDisk,

    #[error("Prompt failed: {0}")]
    Prompt(String),

    #[error("Cannot pass {0:?} to a transfer script")]
    UnsafeScriptArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn code_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "signal".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, RootfsError>;
