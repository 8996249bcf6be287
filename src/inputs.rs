//! Input collector: turns answers (or preset values) into a [`TransferConfig`].

use crate::config::RemoteConfig;
use crate::error::{Result, RootfsError};
use crate::output;
use crate::prompt::{preset_or_ask, Prompter};
use crate::transfer::{Destination, TransferConfig, TransferMethod};

pub fn method_menu() -> Vec<String> {
    TransferMethod::ALL
        .iter()
        .map(|m| format!("  {}) {}", m.number(), m.label()))
        .collect()
}

/// Ask for username, host, path and method, in that order, skipping anything
/// already present in `preset`. An invalid method is fatal.
pub fn collect_transfer_config(
    prompter: &dyn Prompter,
    preset: &RemoteConfig,
) -> Result<TransferConfig> {
    let user = preset_or_ask(preset.user.as_deref(), prompter, "Remote username")?;
    let host = preset_or_ask(preset.host.as_deref(), prompter, "Remote host")?;
    let path = preset_or_ask(preset.path.as_deref(), prompter, "Remote path")?;

    let method = match preset.method {
        Some(number) => TransferMethod::from_number(number)
            .ok_or_else(|| RootfsError::InvalidMethod(number.to_string()))?,
        None => {
            output::info("Transfer methods:");
            for line in method_menu() {
                println!("{}", line);
            }
            TransferMethod::from_selector(&prompter.ask("Transfer method [1-6]")?)?
        }
    };

    Ok(TransferConfig {
        destination: Destination { user, host, path },
        method,
    })
}
