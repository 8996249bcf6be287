use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rootfs_backup::command::SystemRunner;
use rootfs_backup::config::{write_example_config, AppConfig};
use rootfs_backup::prompt::TerminalPrompter;
use rootfs_backup::{logging, output, privilege, Outcome, Workflow};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "rootfs-backup")]
#[command(about = "Back up the root filesystem, upload it, then grow root onto new disk space")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Back up, upload, confirm, then extend the root filesystem (default)
    Run {
        #[command(flatten)]
        remote: RemoteArgs,
    },
    /// Create the backup archive only
    Backup,
    /// Upload an existing backup archive
    Upload {
        /// Archive to upload
        #[arg(short, long)]
        file: PathBuf,
        #[command(flatten)]
        remote: RemoteArgs,
    },
    /// Extend the root filesystem onto new disk space
    Extend,
    /// Generate an example configuration file
    GenerateConfig {
        /// Output path for the config file
        #[arg(short, long, default_value = "rootfs-backup.toml.example")]
        output: PathBuf,
    },
}

/// Answers that would otherwise be prompted for
#[derive(clap::Args, Default)]
struct RemoteArgs {
    /// Remote username
    #[arg(long)]
    user: Option<String>,
    /// Remote host
    #[arg(long)]
    host: Option<String>,
    /// Remote path
    #[arg(long)]
    path: Option<String>,
    /// Transfer method: 1 SCP, 2 rsync, 3 FTP, 4 Google Drive, 5 NFS, 6 SFTP
    #[arg(short, long)]
    method: Option<u8>,
}

impl RemoteArgs {
    fn apply(self, config: &mut AppConfig) {
        let remote = &mut config.remote;
        remote.user = self.user.or(remote.user.take());
        remote.host = self.host.or(remote.host.take());
        remote.path = self.path.or(remote.path.take());
        remote.method = self.method.or(remote.method);
    }
}

fn generate_config(path: &Path) -> Result<()> {
    write_example_config(path)
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;
    output::success(&format!(
        "Example configuration file generated: {}",
        path.display()
    ));
    output::info("Edit it, then pass it with --config");
    Ok(())
}

/// Load configuration, start logging and check privileges. Every command
/// except `generate-config` goes through here first.
fn prepare(config_path: Option<&Path>, verbose: bool) -> Result<AppConfig> {
    let config = AppConfig::load(config_path)?;

    let level = if verbose {
        Some(logging::filter_for("debug"))
    } else {
        config.logging.level.as_deref().map(logging::filter_for)
    };
    logging::init(level.as_deref());

    privilege::require_root()?;
    Ok(config)
}

async fn run(cli: Cli) -> Result<()> {
    let command = cli.command.unwrap_or(Commands::Run {
        remote: RemoteArgs::default(),
    });
    let config_path = cli.config.as_deref();

    let runner = SystemRunner;
    let prompter = TerminalPrompter;

    match command {
        Commands::GenerateConfig { output: path } => generate_config(&path)?,
        Commands::Run { remote } => {
            let mut config = prepare(config_path, cli.verbose)?;
            remote.apply(&mut config);
            let workflow = Workflow::new(&config, &runner, &prompter);
            if workflow.run().await? == Outcome::Declined {
                output::info("Backup and upload completed; nothing else to do.");
            }
        }
        Commands::Backup => {
            let config = prepare(config_path, cli.verbose)?;
            let workflow = Workflow::new(&config, &runner, &prompter);
            let archive = workflow.backup().await?;
            output::success(&format!("Backup created: {}", archive.display()));
        }
        Commands::Upload { file, remote } => {
            let mut config = prepare(config_path, cli.verbose)?;
            remote.apply(&mut config);
            let workflow = Workflow::new(&config, &runner, &prompter);
            let transfer = workflow.collect_inputs()?;
            workflow.upload(&file, &transfer).await?;
            output::success(&format!("Uploaded {}", file.display()));
        }
        Commands::Extend => {
            let config = prepare(config_path, cli.verbose)?;
            let workflow = Workflow::new(&config, &runner, &prompter);
            workflow.confirm_and_extend().await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        output::error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
