//! Coloured status lines for the operator.

use colored::Colorize;

pub fn info(message: &str) {
    println!("{} {}", "[INFO]".blue().bold(), message);
}

pub fn success(message: &str) {
    println!("{} {}", "[ OK ]".green().bold(), message.green());
}

pub fn warn(message: &str) {
    eprintln!("{} {}", "[WARN]".yellow().bold(), message.yellow());
}

pub fn error(message: &str) {
    eprintln!("{} {}", "[FAIL]".red().bold(), message.red());
}

/// Print a step header
pub fn step(number: usize, total: usize, message: &str) {
    println!("\n{} {}", format!("[{}/{}]", number, total).cyan().bold(), message.bold());
}
