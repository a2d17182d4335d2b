//! External text-script execution.

use crate::services::config::CommandTemplate;
use std::fs::File;
use std::path::Path;
use std::process::{Command, Stdio};

/// Executes a whole script against a named database.
pub trait ScriptRunner {
    fn run(&mut self, database: &str, script: &Path) -> Result<(), String>;
}

/// Runs the configured client program with the script on standard input.
pub struct ProcessRunner {
    template: CommandTemplate,
}

impl ProcessRunner {
    pub fn new(template: CommandTemplate) -> Self {
        Self { template }
    }
}

impl ScriptRunner for ProcessRunner {
    fn run(&mut self, database: &str, script: &Path) -> Result<(), String> {
        let input = File::open(script)
            .map_err(|e| format!("Failed to open {}: {e}", script.display()))?;
        let output = Command::new(&self.template.program)
            .args(self.template.render_args(database))
            .stdin(Stdio::from(input))
            .output()
            .map_err(|e| format!("Failed to run {}: {e}", self.template.program))?;

        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        Err(format!(
            "{} exited with {}: {}",
            self.template.program,
            output.status,
            if stderr.trim().is_empty() {
                stdout.trim()
            } else {
                stderr.trim()
            }
        ))
    }
}
