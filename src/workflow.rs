//! The linear run: collect inputs, back up, upload, confirm, extend.

use chrono::Local;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::backup::{create_backup, verify_archive, BackupPlan};
use crate::command::CommandRunner;
use crate::config::AppConfig;
use crate::error::Result;
use crate::extend::{extend_root, StorageLayout};
use crate::inputs::collect_transfer_config;
use crate::output;
use crate::prompt::{is_affirmative, Prompter};
use crate::transfer::{Services, Transfer, TransferConfig, Transport};

const CONFIRM_QUESTION: &str = "Extend the root filesystem onto new disk space now? (y/N)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Disk extension ran on the given layout.
    Extended(StorageLayout),
    /// The operator declined at the confirmation gate.
    Declined,
}

pub struct Workflow<'a> {
    config: &'a AppConfig,
    runner: &'a dyn CommandRunner,
    prompter: &'a dyn Prompter,
}

impl<'a> Workflow<'a> {
    pub fn new(
        config: &'a AppConfig,
        runner: &'a dyn CommandRunner,
        prompter: &'a dyn Prompter,
    ) -> Self {
        Self {
            config,
            runner,
            prompter,
        }
    }

    fn services(&self) -> Services<'a> {
        Services {
            runner: self.runner,
            prompter: self.prompter,
        }
    }

    pub fn collect_inputs(&self) -> Result<TransferConfig> {
        collect_transfer_config(self.prompter, &self.config.remote)
    }

    pub async fn backup(&self) -> Result<PathBuf> {
        let plan = BackupPlan::new(&self.config.backup, Local::now());
        create_backup(&plan, self.runner).await
    }

    /// Upload an existing archive with the configured method.
    pub async fn upload(&self, archive: &Path, transfer: &TransferConfig) -> Result<()> {
        verify_archive(archive)?;
        let transport = Transport::from_method(transfer.method, &self.config.transfer);
        info!("Dispatching upload via {}", transport.method());
        transport
            .upload(archive, &transfer.destination, self.services())
            .await
    }

    pub fn confirm(&self) -> Result<bool> {
        Ok(is_affirmative(&self.prompter.ask(CONFIRM_QUESTION)?))
    }

    pub async fn extend(&self) -> Result<StorageLayout> {
        let settle = Duration::from_secs(self.config.extend.settle_seconds);
        extend_root(self.runner, settle).await
    }

    /// Confirmation gate followed by disk extension.
    pub async fn confirm_and_extend(&self) -> Result<Outcome> {
        if !self.confirm()? {
            output::info("Disk extension skipped.");
            return Ok(Outcome::Declined);
        }
        let layout = self.extend().await?;
        output::success(&format!("Root filesystem extended ({} layout)", layout));
        Ok(Outcome::Extended(layout))
    }

    pub async fn run(&self) -> Result<Outcome> {
        let transfer = self.collect_inputs()?;

        output::step(1, 3, "Creating backup archive");
        let archive = self.backup().await?;
        output::success(&format!("Backup created: {}", archive.display()));

        output::step(2, 3, &format!("Uploading via {}", transfer.method));
        self.upload(&archive, &transfer).await?;
        output::success("Upload finished");

        output::step(3, 3, "Extending root filesystem");
        self.confirm_and_extend().await
    }
}
