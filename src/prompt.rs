//! Terminal prompting, kept apart from the decision logic.

use dialoguer::{theme::ColorfulTheme, Input};

use crate::error::{Result, RootfsError};

pub trait Prompter: Send + Sync {
    /// Ask a free-form question and return the raw answer.
    fn ask(&self, question: &str) -> Result<String>;
}

/// Reads answers from the controlling terminal.
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn ask(&self, question: &str) -> Result<String> {
        Input::<String>::with_theme(&ColorfulTheme::default())
            .with_prompt(question)
            .allow_empty(true)
            .interact_text()
            .map_err(|e| RootfsError::Prompt(e.to_string()))
    }
}

/// Use `preset` when it holds a non-empty value, otherwise ask.
pub fn preset_or_ask(
    preset: Option<&str>,
    prompter: &dyn Prompter,
    question: &str,
) -> Result<String> {
    match preset.map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) => Ok(value.to_string()),
        None => Ok(prompter.ask(question)?.trim().to_string()),
    }
}

/// Only an explicit `y` or `Y` counts as consent.
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim(), "y" | "Y")
}
