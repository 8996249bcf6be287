use nix::unistd::{geteuid, Uid};

use crate::error::{Result, RootfsError};

/// Fail unless the effective user is root.
pub fn require_root() -> Result<()> {
    check_uid(geteuid())
}

fn check_uid(uid: Uid) -> Result<()> {
    if uid.is_root() {
        Ok(())
    } else {
        Err(RootfsError::NotRoot)
    }
}
