// Test doubles shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use rootfs_backup::command::{Cmd, CommandOutput, CommandRunner};
use rootfs_backup::config::AppConfig;
use rootfs_backup::prompt::Prompter;
use rootfs_backup::{Result, RootfsError};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Records every invocation and answers from canned responses.
///
/// Programs without a queued response succeed with empty output. `tar`
/// writes a small file at the path following `-f`, unless disabled.
pub struct MockRunner {
    calls: Mutex<Vec<Cmd>>,
    responses: Mutex<HashMap<String, VecDeque<CommandOutput>>>,
    missing: HashSet<String>,
    write_archives: bool,
}

impl MockRunner {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            responses: Mutex::new(HashMap::new()),
            missing: HashSet::new(),
            write_archives: true,
        }
    }

    /// `tar` "succeeds" without producing anything.
    pub fn without_archive(mut self) -> Self {
        self.write_archives = false;
        self
    }

    pub fn missing(mut self, program: &str) -> Self {
        self.missing.insert(program.to_string());
        self
    }

    fn push(self, program: &str, output: CommandOutput) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry(program.to_string())
            .or_default()
            .push_back(output);
        self
    }

    pub fn respond(self, program: &str, stdout: &str) -> Self {
        self.push(
            program,
            CommandOutput {
                code: Some(0),
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
        )
    }

    pub fn fail(self, program: &str, code: i32, stderr: &str) -> Self {
        self.push(
            program,
            CommandOutput {
                code: Some(code),
                stdout: String::new(),
                stderr: stderr.to_string(),
            },
        )
    }

    pub fn calls(&self) -> Vec<Cmd> {
        self.calls.lock().unwrap().clone()
    }

    pub fn programs(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.program).collect()
    }

    pub fn calls_to(&self, program: &str) -> Vec<Cmd> {
        self.calls()
            .into_iter()
            .filter(|c| c.program == program)
            .collect()
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn output(&self, cmd: &Cmd) -> Result<CommandOutput> {
        self.calls.lock().unwrap().push(cmd.clone());

        if cmd.program == "tar" && self.write_archives {
            if let Some(i) = cmd.args.iter().position(|a| a == "-f") {
                fs::write(&cmd.args[i + 1], b"archive")?;
            }
        }

        let queued = self
            .responses
            .lock()
            .unwrap()
            .get_mut(&cmd.program)
            .and_then(VecDeque::pop_front);
        Ok(queued.unwrap_or(CommandOutput {
            code: Some(0),
            ..Default::default()
        }))
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        if self.missing.contains(program) {
            None
        } else {
            Some(Path::new("/usr/bin").join(program))
        }
    }
}

/// Answers prompts from a fixed script and remembers what was asked.
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<String>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().map(|a| a.to_string()).collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

impl Prompter for ScriptedPrompter {
    fn ask(&self, question: &str) -> Result<String> {
        self.asked.lock().unwrap().push(question.to_string());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| RootfsError::Prompt(format!("no scripted answer for '{}'", question)))
    }
}

/// Config writing archives into `dir` and never pausing.
pub fn test_config(dir: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.backup.output_dir = dir.join("out");
    config.transfer.nfs_mount_root = dir.join("mnt");
    config.extend.settle_seconds = 0;
    config
}
